//! Marshaling of dense features into solver node rows
//!
//! A feature of dimension `D` becomes `D + 1` nodes: indices `0..D` carrying
//! the values, then a sentinel with index `-1`.

use crate::core::{DetectorError, Feature, Result, SvmNode};
use log::debug;

/// Encode one dense feature as a sentinel-terminated node row
pub fn encode_feature(feature: &[f32]) -> Vec<SvmNode> {
    let mut row = Vec::with_capacity(feature.len() + 1);
    push_row(&mut row, feature);
    row
}

fn push_row(buffer: &mut Vec<SvmNode>, feature: &[f32]) {
    buffer.extend(
        feature
            .iter()
            .enumerate()
            .map(|(i, &v)| SvmNode::new(i as i32, v as f64)),
    );
    buffer.push(SvmNode::sentinel());
}

/// Labeled training rows packed into one contiguous node buffer
#[derive(Debug, Clone)]
pub struct TrainingProblem {
    nodes: Vec<SvmNode>,
    offsets: Vec<usize>,
    labels: Vec<f64>,
    dimension: usize,
}

impl TrainingProblem {
    /// Pack `features` with their positional `labels`
    pub fn new(labels: &[f64], features: &[Feature]) -> Result<Self> {
        if labels.len() != features.len() {
            return Err(DetectorError::SizeMismatch {
                labels: labels.len(),
                features: features.len(),
            });
        }
        let first = features.first().ok_or(DetectorError::EmptyDataset)?;
        let dimension = first.len();

        let mut nodes = Vec::with_capacity(features.len() * (dimension + 1));
        let mut offsets = Vec::with_capacity(features.len());
        for feature in features {
            if feature.len() != dimension {
                return Err(DetectorError::DimensionMismatch {
                    expected: dimension,
                    actual: feature.len(),
                });
            }
            offsets.push(nodes.len());
            push_row(&mut nodes, feature);
        }

        debug!(
            "Packed {} rows of dimension {} into {} nodes",
            offsets.len(),
            dimension,
            nodes.len()
        );

        Ok(Self {
            nodes,
            offsets,
            labels: labels.to_vec(),
            dimension,
        })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    /// Row `k`, running up to and including its sentinel
    pub fn row(&self, k: usize) -> &[SvmNode] {
        let start = self.offsets[k];
        &self.nodes[start..start + self.dimension + 1]
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Split into the packed node buffer, row offsets and labels
    pub fn into_parts(self) -> (Vec<SvmNode>, Vec<usize>, Vec<f64>) {
        (self.nodes, self.offsets, self.labels)
    }
}
