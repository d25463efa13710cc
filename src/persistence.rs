//! Model serialization in the libsvm text format
//!
//! ```text
//! svm_type c_svc
//! kernel_type rbf
//! gamma 0.5
//! nr_class 2
//! total_sv 3
//! rho 0.25
//! label 1 -1
//! nr_sv 2 1
//! SV
//! 0.5 0:1 1:0.25
//! ...
//! ```
//!
//! Reals are written with the shortest representation that parses back to
//! the same `f64`, so a saved model predicts exactly like the one in memory.

use crate::core::{
    row_entries, DetectorError, KernelType, Result, SvmNode, SvmParameter, SvmType,
};
use crate::model::SvmModel;
use log::debug;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Largest feature index accepted in a support vector line
pub const MAX_FEATURE_INDEX: i32 = 1 << 24;

/// Write `model` to `writer`
pub fn write_model<W: Write>(model: &SvmModel, writer: &mut W) -> Result<()> {
    let param = model.param();
    let kernel_type = model.kernel_type();

    writeln!(writer, "svm_type {}", param.svm_type)?;
    writeln!(writer, "kernel_type {}", kernel_type)?;
    if kernel_type == KernelType::Polynomial {
        writeln!(writer, "degree {}", param.degree)?;
    }
    if kernel_type != KernelType::Linear {
        writeln!(writer, "gamma {}", param.gamma)?;
    }
    if matches!(kernel_type, KernelType::Polynomial | KernelType::Sigmoid) {
        writeln!(writer, "coef0 {}", param.coef0)?;
    }

    let labels = model.labels();
    let n_sv = model.n_sv_per_class();
    writeln!(writer, "nr_class 2")?;
    writeln!(writer, "total_sv {}", model.n_support_vectors())?;
    writeln!(writer, "rho {}", model.rho())?;
    writeln!(writer, "label {} {}", labels[0], labels[1])?;
    if let Some((a, b)) = model.probability_parameters() {
        writeln!(writer, "probA {a}")?;
        writeln!(writer, "probB {b}")?;
    }
    writeln!(writer, "nr_sv {} {}", n_sv[0], n_sv[1])?;
    writeln!(writer, "SV")?;

    for (s, coef) in model.sv_coef().iter().enumerate() {
        write!(writer, "{coef}")?;
        for node in row_entries(model.support_vector(s)) {
            write!(writer, " {}:{}", node.index, node.value)?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;

    debug!(
        "Wrote {} model with {} support vectors",
        kernel_type,
        model.n_support_vectors()
    );
    Ok(())
}

/// Header fields collected before the `SV` marker
#[derive(Default)]
struct Header {
    kernel_type: Option<KernelType>,
    degree: Option<u32>,
    gamma: Option<f64>,
    coef0: Option<f64>,
    total_sv: Option<usize>,
    rho: Option<f64>,
    labels: Option<[f64; 2]>,
    n_sv: Option<[usize; 2]>,
    prob_a: Option<f64>,
    prob_b: Option<f64>,
}

/// Read a model written by [`write_model`]
pub fn read_model<R: BufRead>(reader: R) -> Result<SvmModel> {
    let mut lines = reader.lines();
    let mut header = Header::default();
    let mut saw_sv_marker = false;

    for line in lines.by_ref() {
        let line = text_line(line)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "SV" {
            saw_sv_marker = true;
            break;
        }
        parse_header_line(&mut header, line)?;
    }

    if !saw_sv_marker {
        return Err(corrupt("missing SV section"));
    }

    let kernel_type = header.kernel_type.ok_or_else(|| corrupt("missing kernel_type"))?;
    let total_sv = header.total_sv.ok_or_else(|| corrupt("missing total_sv"))?;
    let rho = header.rho.ok_or_else(|| corrupt("missing rho"))?;
    let labels = header.labels.ok_or_else(|| corrupt("missing label"))?;
    let n_sv = header.n_sv.ok_or_else(|| corrupt("missing nr_sv"))?;
    if n_sv[0].checked_add(n_sv[1]) != Some(total_sv) {
        return Err(corrupt(format!(
            "nr_sv {} {} does not add up to total_sv {}",
            n_sv[0], n_sv[1], total_sv
        )));
    }
    let prob = match (header.prob_a, header.prob_b) {
        (Some(a), Some(b)) => Some((a, b)),
        (None, None) => None,
        _ => return Err(corrupt("probA and probB must appear together")),
    };

    let mut nodes = Vec::new();
    let mut sv_offsets = Vec::new();
    let mut sv_coef = Vec::new();
    for line in lines {
        let line = text_line(line)?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if sv_offsets.len() == total_sv {
            return Err(corrupt(format!(
                "more than {total_sv} support vectors"
            )));
        }
        let mut fields = line.split_whitespace();
        let coef = fields
            .next()
            .ok_or_else(|| corrupt("empty support vector line"))
            .and_then(|s| parse_number::<f64>("coefficient", s))?;

        sv_offsets.push(nodes.len());
        sv_coef.push(coef);
        let mut last_index = -1;
        for pair in fields {
            let (index, value) = pair
                .split_once(':')
                .ok_or_else(|| corrupt(format!("invalid node {pair}")))?;
            let index = parse_number::<i32>("index", index)?;
            if index > MAX_FEATURE_INDEX {
                return Err(corrupt(format!("node index {index} out of range")));
            }
            if index <= last_index {
                return Err(corrupt(format!("node indices not increasing at {pair}")));
            }
            last_index = index;
            nodes.push(SvmNode::new(index, parse_number::<f64>("value", value)?));
        }
        nodes.push(SvmNode::sentinel());
    }

    if sv_offsets.len() != total_sv {
        return Err(corrupt(format!(
            "expected {} support vectors, found {}",
            total_sv,
            sv_offsets.len()
        )));
    }

    let param = SvmParameter {
        svm_type: SvmType::CSvc,
        kernel_type,
        degree: header.degree.unwrap_or(3),
        gamma: header.gamma.unwrap_or(0.0),
        coef0: header.coef0.unwrap_or(0.0),
        probability: prob.is_some(),
        ..SvmParameter::default()
    };

    let nodes: Arc<[SvmNode]> = nodes.into();
    let model = SvmModel::from_parts(param, nodes, sv_offsets, sv_coef, rho, labels, n_sv, prob);
    debug!(
        "Read {} model with {} support vectors",
        kernel_type,
        model.n_support_vectors()
    );
    Ok(model)
}

fn parse_header_line(header: &mut Header, line: &str) -> Result<()> {
    let (key, value) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| corrupt(format!("invalid header line {line}")))?;
    let value = value.trim();

    match key {
        "svm_type" => {
            value
                .parse::<SvmType>()
                .map_err(|_| corrupt(format!("unsupported svm_type {value}")))?;
        }
        "kernel_type" => {
            header.kernel_type = Some(value.parse().map_err(|_| {
                corrupt(format!("unknown kernel_type {value}"))
            })?);
        }
        "degree" => header.degree = Some(parse_number("degree", value)?),
        "gamma" => header.gamma = Some(parse_number("gamma", value)?),
        "coef0" => header.coef0 = Some(parse_number("coef0", value)?),
        "nr_class" => {
            let nr_class: usize = parse_number("nr_class", value)?;
            if nr_class != 2 {
                return Err(corrupt(format!("expected 2 classes, found {nr_class}")));
            }
        }
        "total_sv" => header.total_sv = Some(parse_number("total_sv", value)?),
        "rho" => header.rho = Some(parse_number("rho", value)?),
        "label" => header.labels = Some(parse_pair("label", value)?),
        "probA" => header.prob_a = Some(parse_number("probA", value)?),
        "probB" => header.prob_b = Some(parse_number("probB", value)?),
        "nr_sv" => header.n_sv = Some(parse_pair("nr_sv", value)?),
        _ => return Err(corrupt(format!("unknown header field {key}"))),
    }
    Ok(())
}

fn parse_number<T: std::str::FromStr>(what: &str, s: &str) -> Result<T> {
    s.parse::<T>()
        .map_err(|_| corrupt(format!("invalid {what} {s}")))
}

fn parse_pair<T: std::str::FromStr + Copy>(what: &str, s: &str) -> Result<[T; 2]> {
    let values = s
        .split_whitespace()
        .map(|v| parse_number::<T>(what, v))
        .collect::<Result<Vec<T>>>()?;
    match values.as_slice() {
        &[a, b] => Ok([a, b]),
        _ => Err(corrupt(format!("{what} needs two values, got {s}"))),
    }
}

/// Undecodable bytes are bad content, not a failed read
fn text_line(line: io::Result<String>) -> Result<String> {
    line.map_err(|e| match e.kind() {
        io::ErrorKind::InvalidData => corrupt("model is not valid UTF-8"),
        _ => DetectorError::Io(e),
    })
}

fn corrupt(message: impl Into<String>) -> DetectorError {
    DetectorError::CorruptModel(message.into())
}
