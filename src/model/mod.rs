//! Trained SVM decision functions
//!
//! [`train`] turns a [`TrainingProblem`] into an [`SvmModel`]. The model keeps
//! the packed node buffer of the problem alive: support vectors are rows of
//! that buffer, addressed by offset, so nothing is copied out of it.

use crate::core::{
    row_entries, DetectorError, KernelType, Result, SvmNode, SvmParameter,
};
use crate::data::TrainingProblem;
use crate::kernel::{Kernel, KernelFunction};
use crate::solver::{sigmoid_predict, sigmoid_train, SMOSolver};
use log::{debug, info};
use std::sync::Arc;

/// A trained two-class decision function
///
/// `decision(x) = sum_s coef_s * K(sv_s, x) - rho`; positive values predict
/// `labels()[0]`.
#[derive(Debug, Clone)]
pub struct SvmModel {
    param: SvmParameter,
    kernel: KernelFunction,
    nodes: Arc<[SvmNode]>,
    sv_offsets: Vec<usize>,
    sv_coef: Vec<f64>,
    rho: f64,
    labels: [f64; 2],
    n_sv: [usize; 2],
    prob: Option<(f64, f64)>,
    dimension: usize,
}

impl SvmModel {
    /// Assemble a model from its parts.
    ///
    /// `param.gamma` must already be resolved (non-zero for kernels that
    /// use it).
    pub(crate) fn from_parts(
        param: SvmParameter,
        nodes: Arc<[SvmNode]>,
        sv_offsets: Vec<usize>,
        sv_coef: Vec<f64>,
        rho: f64,
        labels: [f64; 2],
        n_sv: [usize; 2],
        prob: Option<(f64, f64)>,
    ) -> Self {
        let dimension = sv_offsets
            .iter()
            .flat_map(|&offset| row_entries(&nodes[offset..]))
            .map(|node| node.index as usize + 1)
            .max()
            .unwrap_or(0);
        let kernel = KernelFunction::from_parameter(&param, dimension);

        Self {
            param,
            kernel,
            nodes,
            sv_offsets,
            sv_coef,
            rho,
            labels,
            n_sv,
            prob,
            dimension,
        }
    }

    /// Continuous decision value for an encoded row
    pub fn decision_value(&self, x: &[SvmNode]) -> f64 {
        let sum: f64 = self
            .sv_offsets
            .iter()
            .zip(self.sv_coef.iter())
            .map(|(&offset, &coef)| coef * self.kernel.compute(&self.nodes[offset..], x))
            .sum();
        sum - self.rho
    }

    /// Predicted class label for an encoded row
    pub fn predict_label(&self, x: &[SvmNode]) -> f64 {
        if self.decision_value(x) > 0.0 {
            self.labels[0]
        } else {
            self.labels[1]
        }
    }

    /// Probability of `labels()[0]`, if the model was trained with
    /// probability estimates
    pub fn predict_probability(&self, x: &[SvmNode]) -> Option<f64> {
        let (a, b) = self.prob?;
        Some(sigmoid_predict(self.decision_value(x), a, b))
    }

    /// Support vector `s` as a sentinel-terminated row
    pub fn support_vector(&self, s: usize) -> &[SvmNode] {
        &self.nodes[self.sv_offsets[s]..]
    }

    pub fn n_support_vectors(&self) -> usize {
        self.sv_offsets.len()
    }

    /// Support vector counts per class, in `labels()` order
    pub fn n_sv_per_class(&self) -> [usize; 2] {
        self.n_sv
    }

    /// Signed coefficients `alpha_s * y_s`
    pub fn sv_coef(&self) -> &[f64] {
        &self.sv_coef
    }

    pub fn rho(&self) -> f64 {
        self.rho
    }

    pub fn labels(&self) -> [f64; 2] {
        self.labels
    }

    pub fn probability_parameters(&self) -> Option<(f64, f64)> {
        self.prob
    }

    pub fn param(&self) -> &SvmParameter {
        &self.param
    }

    pub fn kernel_type(&self) -> KernelType {
        self.kernel.kernel_type()
    }

    /// Highest feature index referenced by a support vector, plus one
    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Train a C-SVC model on `problem`
pub fn train(problem: TrainingProblem, param: &SvmParameter) -> Result<SvmModel> {
    param.check()?;

    let dimension = problem.dimension();
    let (nodes, offsets, labels) = problem.into_parts();

    let class_labels = class_labels(&labels)?;
    let y: Vec<f64> = labels
        .iter()
        .map(|&l| if l == class_labels[0] { 1.0 } else { -1.0 })
        .collect();
    let upper: Vec<f64> = labels.iter().map(|&l| param.c_for_label(l)).collect();

    let mut param = param.clone();
    if param.kernel_type != KernelType::Linear && param.gamma == 0.0 {
        param.gamma = 1.0 / dimension.max(1) as f64;
    }
    let kernel = KernelFunction::from_parameter(&param, dimension);

    info!(
        "Training {} SVM on {} rows of dimension {}",
        param.kernel_type,
        offsets.len(),
        dimension
    );

    let result = {
        let rows: Vec<&[SvmNode]> = offsets.iter().map(|&o| &nodes[o..]).collect();
        SMOSolver::new(&kernel, &param).solve(&rows, &y, &upper)?
    };

    // Support vectors grouped by class: labels[0] first
    let mut sv_offsets = Vec::new();
    let mut sv_coef = Vec::new();
    let mut n_sv = [0usize; 2];
    for (class, sign) in [(0, 1.0), (1, -1.0)] {
        for (k, &alpha) in result.alpha.iter().enumerate() {
            if alpha > 0.0 && y[k] == sign {
                sv_offsets.push(offsets[k]);
                sv_coef.push(alpha * sign);
                n_sv[class] += 1;
            }
        }
    }

    info!(
        "Training finished after {} passes: {} support vectors, rho {:.6}",
        result.iterations,
        sv_offsets.len(),
        result.rho
    );

    let nodes: Arc<[SvmNode]> = nodes.into();
    let mut model = SvmModel::from_parts(
        param,
        nodes,
        sv_offsets,
        sv_coef,
        result.rho,
        class_labels,
        n_sv,
        None,
    );
    // Rows with all-zero trailing entries are still dense, keep the problem's width
    model.dimension = model.dimension.max(dimension);

    if model.param.probability {
        let decision_values: Vec<f64> = offsets
            .iter()
            .map(|&o| model.decision_value(&model.nodes[o..]))
            .collect();
        let (a, b) = sigmoid_train(&decision_values, &y);
        debug!("Platt scaling parameters A={a:.6} B={b:.6}");
        model.prob = Some((a, b));
    }

    Ok(model)
}

/// The two distinct labels of a training set, larger first
fn class_labels(labels: &[f64]) -> Result<[f64; 2]> {
    let mut distinct: Vec<f64> = Vec::with_capacity(2);
    for &label in labels {
        if !label.is_finite() {
            return Err(DetectorError::InvalidLabel(label));
        }
        if !distinct.contains(&label) {
            distinct.push(label);
            if distinct.len() > 2 {
                return Err(DetectorError::InvalidDataset(format!(
                    "Expected two classes, found labels {distinct:?}"
                )));
            }
        }
    }

    match distinct.as_slice() {
        [a, b] => Ok([a.max(*b), a.min(*b)]),
        _ => Err(DetectorError::InvalidDataset(
            "Training data must contain two classes".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Feature;
    use crate::data::encode_feature;

    fn problem(labels: &[f64], rows: &[&[f32]]) -> TrainingProblem {
        let features: Vec<Feature> = rows.iter().map(|r| Feature::new(r.to_vec())).collect();
        TrainingProblem::new(labels, &features).expect("valid problem")
    }

    #[test]
    fn test_class_labels_order() {
        assert_eq!(class_labels(&[-1.0, 1.0, -1.0]).unwrap(), [1.0, -1.0]);
        assert_eq!(class_labels(&[0.0, 3.0]).unwrap(), [3.0, 0.0]);
        assert!(matches!(
            class_labels(&[1.0, 1.0]),
            Err(DetectorError::InvalidDataset(_))
        ));
        assert!(matches!(
            class_labels(&[1.0, 2.0, 3.0]),
            Err(DetectorError::InvalidDataset(_))
        ));
    }

    #[test]
    fn test_train_orthogonal_pair() {
        let model = train(
            problem(&[1.0, -1.0], &[&[1.0, 0.0], &[0.0, 1.0]]),
            &SvmParameter::default(),
        )
        .expect("training succeeds");

        assert_eq!(model.n_support_vectors(), 2);
        assert_eq!(model.n_sv_per_class(), [1, 1]);
        assert_eq!(model.sv_coef(), &[1.0, -1.0]);
        assert_eq!(model.dimension(), 2);
        assert!(model.decision_value(&encode_feature(&[1.0, 0.0])) > 0.0);
        assert!(model.decision_value(&encode_feature(&[0.0, 1.0])) < 0.0);
        assert_eq!(model.predict_label(&encode_feature(&[0.9, 0.1])), 1.0);
    }

    #[test]
    fn test_support_vectors_group_positive_class_first() {
        let model = train(
            problem(&[-1.0, 1.0], &[&[0.0, 1.0], &[1.0, 0.0]]),
            &SvmParameter::default(),
        )
        .expect("training succeeds");

        assert_eq!(model.labels(), [1.0, -1.0]);
        let first: Vec<f64> = row_entries(model.support_vector(0)).map(|n| n.value).collect();
        assert_eq!(first, vec![1.0, 0.0]);
        assert!(model.sv_coef()[0] > 0.0);
    }

    #[test]
    fn test_rbf_gamma_is_resolved() {
        let model = train(
            problem(&[1.0, -1.0], &[&[1.0, 0.0, 0.0, 0.0], &[0.0, 1.0, 0.0, 0.0]]),
            &SvmParameter::default().with_kernel(KernelType::Rbf),
        )
        .expect("training succeeds");
        assert_eq!(model.param().gamma, 0.25);
        assert_eq!(model.kernel_type(), KernelType::Rbf);
    }

    #[test]
    fn test_probability_estimates() {
        let rows: Vec<Vec<f32>> = (0..10)
            .map(|k| {
                let x = 0.5 + k as f32 * 0.3;
                if k % 2 == 0 {
                    vec![x, 0.2]
                } else {
                    vec![-x, -0.2]
                }
            })
            .collect();
        let refs: Vec<&[f32]> = rows.iter().map(|r| r.as_slice()).collect();
        let labels: Vec<f64> = (0..10).map(|k| if k % 2 == 0 { 1.0 } else { -1.0 }).collect();

        let model = train(
            problem(&labels, &refs),
            &SvmParameter::default().with_probability(true),
        )
        .expect("training succeeds");

        let p_pos = model
            .predict_probability(&encode_feature(&[3.0, 0.2]))
            .expect("probability model");
        let p_neg = model
            .predict_probability(&encode_feature(&[-3.0, -0.2]))
            .expect("probability model");
        assert!(p_pos > 0.5);
        assert!(p_neg < 0.5);
    }

    #[test]
    fn test_invalid_parameter_is_rejected() {
        let result = train(
            problem(&[1.0, -1.0], &[&[1.0], &[-1.0]]),
            &SvmParameter::default().with_c(-1.0),
        );
        assert!(matches!(result, Err(DetectorError::InvalidParameter(_))));
    }
}
