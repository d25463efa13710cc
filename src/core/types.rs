//! Core type definitions: features, SVM nodes and training parameters

use crate::core::{DetectorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

/// Index value marking the end of an encoded feature row
pub const SENTINEL_INDEX: i32 = -1;

/// One image descriptor: a fixed-length sequence of reals
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Feature {
    values: Vec<f32>,
}

impl Feature {
    pub fn new(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Feature of `len` zeros
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.values
    }

    /// Dot product with another feature of the same length
    pub fn dot(&self, other: &Feature) -> f64 {
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(&a, &b)| a as f64 * b as f64)
            .sum()
    }
}

impl Deref for Feature {
    type Target = [f32];

    fn deref(&self) -> &[f32] {
        &self.values
    }
}

impl From<Vec<f32>> for Feature {
    fn from(values: Vec<f32>) -> Self {
        Self::new(values)
    }
}

impl FromIterator<f32> for Feature {
    fn from_iter<I: IntoIterator<Item = f32>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One feature per image, in database order
pub type FeatureCollection = Vec<Feature>;

/// A single `(index, value)` entry of an encoded feature row.
///
/// Rows are terminated by a node whose index is [`SENTINEL_INDEX`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SvmNode {
    pub index: i32,
    pub value: f64,
}

impl SvmNode {
    pub fn new(index: i32, value: f64) -> Self {
        Self { index, value }
    }

    pub fn sentinel() -> Self {
        Self {
            index: SENTINEL_INDEX,
            value: 0.0,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.index == SENTINEL_INDEX
    }
}

/// Nodes of a row up to (not including) its sentinel
pub fn row_entries(row: &[SvmNode]) -> impl Iterator<Item = &SvmNode> + '_ {
    row.iter().take_while(|node| !node.is_sentinel())
}

/// SVM formulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SvmType {
    #[default]
    CSvc,
}

impl fmt::Display for SvmType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SvmType::CSvc => write!(f, "c_svc"),
        }
    }
}

impl FromStr for SvmType {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "c_svc" => Ok(SvmType::CSvc),
            other => Err(DetectorError::InvalidParameter(format!(
                "Unsupported svm_type: {other}"
            ))),
        }
    }
}

/// Kernel family of the decision function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelType {
    #[default]
    Linear,
    Polynomial,
    Rbf,
    Sigmoid,
}

impl fmt::Display for KernelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KernelType::Linear => "linear",
            KernelType::Polynomial => "polynomial",
            KernelType::Rbf => "rbf",
            KernelType::Sigmoid => "sigmoid",
        };
        f.write_str(name)
    }
}

impl FromStr for KernelType {
    type Err = DetectorError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "linear" => Ok(KernelType::Linear),
            "polynomial" => Ok(KernelType::Polynomial),
            "rbf" => Ok(KernelType::Rbf),
            "sigmoid" => Ok(KernelType::Sigmoid),
            other => Err(DetectorError::InvalidParameter(format!(
                "Unknown kernel_type: {other}"
            ))),
        }
    }
}

/// Training hyperparameters
#[derive(Debug, Clone, PartialEq)]
pub struct SvmParameter {
    pub svm_type: SvmType,
    pub kernel_type: KernelType,
    /// Polynomial degree
    pub degree: u32,
    /// Kernel width for polynomial, rbf and sigmoid; 0 means 1 / dimension
    pub gamma: f64,
    pub coef0: f64,
    /// Regularization parameter (upper bound for alpha)
    pub c: f64,
    /// Tolerance for KKT conditions
    pub eps: f64,
    /// Kernel cache size in MB
    pub cache_size: usize,
    /// Enable shrinking heuristic
    pub shrinking: bool,
    /// Fit a sigmoid over decision values for probability estimates
    pub probability: bool,
    /// Per-label multipliers of `c`
    pub weights: Vec<(f64, f64)>,
    /// Maximum number of solver passes
    pub max_iterations: usize,
}

impl Default for SvmParameter {
    fn default() -> Self {
        Self {
            svm_type: SvmType::CSvc,
            kernel_type: KernelType::Linear,
            degree: 3,
            gamma: 0.0,
            coef0: 0.0,
            c: 1.0,
            eps: 1e-3,
            cache_size: 100,
            shrinking: true,
            probability: false,
            weights: Vec::new(),
            max_iterations: 10_000,
        }
    }
}

impl SvmParameter {
    pub fn with_kernel(mut self, kernel_type: KernelType) -> Self {
        self.kernel_type = kernel_type;
        self
    }

    pub fn with_c(mut self, c: f64) -> Self {
        self.c = c;
        self
    }

    pub fn with_eps(mut self, eps: f64) -> Self {
        self.eps = eps;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_degree(mut self, degree: u32) -> Self {
        self.degree = degree;
        self
    }

    pub fn with_coef0(mut self, coef0: f64) -> Self {
        self.coef0 = coef0;
        self
    }

    pub fn with_cache_size(mut self, cache_size_mb: usize) -> Self {
        self.cache_size = cache_size_mb;
        self
    }

    pub fn with_shrinking(mut self, shrinking: bool) -> Self {
        self.shrinking = shrinking;
        self
    }

    pub fn with_probability(mut self, probability: bool) -> Self {
        self.probability = probability;
        self
    }

    /// Scale C for samples carrying `label`
    pub fn with_class_weight(mut self, label: f64, weight: f64) -> Self {
        self.weights.push((label, weight));
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Effective C for samples of `label`
    pub fn c_for_label(&self, label: f64) -> f64 {
        self.weights
            .iter()
            .filter(|(l, _)| *l == label)
            .fold(self.c, |c, (_, w)| c * w)
    }

    /// Validate the parameter combination
    pub fn check(&self) -> Result<()> {
        if !(self.c > 0.0) {
            return Err(DetectorError::InvalidParameter(format!(
                "C must be positive, got {}",
                self.c
            )));
        }
        if !(self.eps > 0.0) {
            return Err(DetectorError::InvalidParameter(format!(
                "eps must be positive, got {}",
                self.eps
            )));
        }
        if self.gamma < 0.0 {
            return Err(DetectorError::InvalidParameter(format!(
                "gamma must not be negative, got {}",
                self.gamma
            )));
        }
        if self.kernel_type == KernelType::Polynomial && self.degree == 0 {
            return Err(DetectorError::InvalidParameter(
                "Polynomial degree must be positive".to_string(),
            ));
        }
        if self.max_iterations == 0 {
            return Err(DetectorError::InvalidParameter(
                "max_iterations must be positive".to_string(),
            ));
        }
        for &(label, weight) in &self.weights {
            if !(weight > 0.0) {
                return Err(DetectorError::InvalidParameter(format!(
                    "Weight for label {label} must be positive, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Result of optimization process
#[derive(Debug, Clone)]
pub struct OptimizationResult {
    /// Lagrange multipliers (alpha values)
    pub alpha: Vec<f64>,
    /// Offset of the decision function, `f(x) = sum - rho`
    pub rho: f64,
    /// Number of solver passes performed
    pub iterations: usize,
    /// Final dual objective value
    pub objective_value: f64,
}
