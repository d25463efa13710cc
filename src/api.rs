//! Binary classifier over image features
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use hogsvm::api::SupportVectorMachine;
//! use hogsvm::core::Feature;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let features = vec![Feature::new(vec![1.0, 0.0]), Feature::new(vec![0.0, 1.0])];
//!
//! let mut svm = SupportVectorMachine::new();
//! svm.train(&[1.0, -1.0], &features)?;
//!
//! let score = svm.predict(&Feature::new(vec![0.8, 0.1]))?;
//! println!("score {score:.3}, bias {:.3}", svm.bias_term()?);
//! # Ok(())
//! # }
//! ```

use crate::core::{
    row_entries, Classifier, DetectorError, Feature, KernelType, Result, SvmNode, SvmParameter,
};
use crate::data::{encode_feature, TrainingProblem};
use crate::model::{self, SvmModel};
use crate::persistence::{read_model, write_model};
use log::{info, warn};
use std::io::{BufRead, Write};
use std::path::Path;

/// Two-class SVM over dense features
///
/// Starts without a model; [`train`](Self::train) or [`load`](Self::load)
/// provides one. Scores are decision values: positive means the larger of
/// the two training labels.
#[derive(Debug, Clone, Default)]
pub struct SupportVectorMachine {
    param: SvmParameter,
    model: Option<SvmModel>,
    feature_dimension: usize,
    /// False for loaded models: stored rows may omit trailing zeros, so
    /// `feature_dimension` is only a lower bound
    exact_dimension: bool,
}

impl SupportVectorMachine {
    /// Empty classifier with default (linear) training parameters
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty classifier training with `param`
    pub fn with_parameter(param: SvmParameter) -> Self {
        Self {
            param,
            ..Self::default()
        }
    }

    /// Classifier holding the model stored at `path`
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut svm = Self::new();
        crate::file_io::load_classifier(path, &mut svm)?;
        Ok(svm)
    }

    pub fn parameter(&self) -> &SvmParameter {
        &self.param
    }

    pub fn set_parameter(&mut self, param: SvmParameter) {
        self.param = param;
    }

    /// Train on `features` with their positional `labels`.
    ///
    /// The current model is replaced only if training succeeds.
    pub fn train(&mut self, labels: &[f64], features: &[Feature]) -> Result<()> {
        let problem = TrainingProblem::new(labels, features)?;
        let dimension = problem.dimension();
        let model = model::train(problem, &self.param)?;

        info!(
            "Trained classifier on {} features: {} support vectors",
            labels.len(),
            model.n_support_vectors()
        );
        self.model = Some(model);
        self.feature_dimension = dimension;
        self.exact_dimension = true;
        Ok(())
    }

    fn trained_model(&self) -> Result<&SvmModel> {
        self.model.as_ref().ok_or(DetectorError::NoModel)
    }

    /// Encode `feature` after checking it against the model dimension
    fn encode(&self, feature: &Feature) -> Result<Vec<SvmNode>> {
        if !self.accepts_dimension(feature.len()) {
            return Err(DetectorError::DimensionMismatch {
                expected: self.feature_dimension,
                actual: feature.len(),
            });
        }
        Ok(encode_feature(feature))
    }

    /// Decision value for one feature
    pub fn predict(&self, feature: &Feature) -> Result<f64> {
        let model = self.trained_model()?;
        let row = self.encode(feature)?;
        Ok(model.decision_value(&row))
    }

    /// Decision values for a collection, in order
    pub fn predict_batch(&self, features: &[Feature]) -> Result<Vec<f64>> {
        features.iter().map(|f| self.predict(f)).collect()
    }

    /// Predicted training label for one feature
    pub fn predict_label(&self, feature: &Feature) -> Result<f64> {
        let model = self.trained_model()?;
        let row = self.encode(feature)?;
        Ok(model.predict_label(&row))
    }

    /// Probability of the positive label
    pub fn predict_probability(&self, feature: &Feature) -> Result<f64> {
        let model = self.trained_model()?;
        let row = self.encode(feature)?;
        model.predict_probability(&row).ok_or_else(|| {
            DetectorError::InvalidParameter(
                "Model was trained without probability estimates".to_string(),
            )
        })
    }

    /// Offset `rho` of the decision function `w . x - rho`
    pub fn bias_term(&self) -> Result<f64> {
        Ok(self.trained_model()?.rho())
    }

    /// Primal weight vector `sum_s coef_s * sv_s`
    ///
    /// Only describes the decision boundary for a linear kernel.
    pub fn weights(&self) -> Result<Feature> {
        let model = self.trained_model()?;
        if model.kernel_type() != KernelType::Linear {
            warn!(
                "Weights of a {} kernel model do not represent its decision boundary",
                model.kernel_type()
            );
        }

        let dimension = self.feature_dimension.max(model.dimension());
        let mut w = vec![0.0f64; dimension];
        for (s, &coef) in model.sv_coef().iter().enumerate() {
            for node in row_entries(model.support_vector(s)) {
                w[node.index as usize] += coef * node.value;
            }
        }
        Ok(w.into_iter().map(|v| v as f32).collect())
    }

    /// Write the model in libsvm text format
    pub fn save<W: Write>(&self, writer: &mut W) -> Result<()> {
        let model = self.trained_model()?;
        write_model(model, writer)
    }

    /// Replace the model with one read from `reader`.
    ///
    /// The current model is dropped first; on error the classifier is empty.
    pub fn load<R: BufRead>(&mut self, reader: R) -> Result<()> {
        self.model = None;
        self.feature_dimension = 0;
        self.exact_dimension = false;

        let model = read_model(reader)?;
        info!(
            "Loaded {} model with {} support vectors",
            model.kernel_type(),
            model.n_support_vectors()
        );
        self.feature_dimension = model.dimension();
        self.model = Some(model);
        Ok(())
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    pub fn model(&self) -> Option<&SvmModel> {
        self.model.as_ref()
    }

    /// Dimension of the features the model accepts, 0 without a model
    pub fn feature_dimension(&self) -> usize {
        self.feature_dimension
    }

    /// Whether features of length `len` can be scored.
    ///
    /// A trained model needs its training dimension exactly; a loaded one
    /// any length covering the indices its support vectors use.
    pub fn accepts_dimension(&self, len: usize) -> bool {
        if self.exact_dimension {
            len == self.feature_dimension
        } else {
            len >= self.feature_dimension
        }
    }

    /// Summary of the current model
    pub fn info(&self) -> Result<ModelInfo> {
        let model = self.trained_model()?;
        Ok(ModelInfo {
            kernel_type: model.kernel_type(),
            n_support_vectors: model.n_support_vectors(),
            n_sv_per_class: model.n_sv_per_class(),
            labels: model.labels(),
            bias: model.rho(),
            feature_dimension: self.feature_dimension,
            probability: model.probability_parameters().is_some(),
        })
    }

    /// Confusion counts of predicted against true labels
    pub fn evaluate(&self, labels: &[f64], features: &[Feature]) -> Result<EvaluationMetrics> {
        if labels.len() != features.len() {
            return Err(DetectorError::SizeMismatch {
                labels: labels.len(),
                features: features.len(),
            });
        }
        let positive = self.trained_model()?.labels()[0];

        let mut metrics = EvaluationMetrics::default();
        for (feature, &actual) in features.iter().zip(labels.iter()) {
            let predicted = self.predict_label(feature)?;
            match (predicted == positive, actual == positive) {
                (true, true) => metrics.true_positives += 1,
                (false, false) => metrics.true_negatives += 1,
                (true, false) => metrics.false_positives += 1,
                (false, true) => metrics.false_negatives += 1,
            }
        }
        Ok(metrics)
    }
}

impl Classifier for SupportVectorMachine {
    fn predict(&self, feature: &Feature) -> Result<f64> {
        SupportVectorMachine::predict(self, feature)
    }

    fn predict_batch(&self, features: &[Feature]) -> Result<Vec<f64>> {
        SupportVectorMachine::predict_batch(self, features)
    }
}

/// Detailed evaluation metrics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvaluationMetrics {
    pub true_positives: usize,
    pub true_negatives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

impl EvaluationMetrics {
    pub fn total(&self) -> usize {
        self.true_positives + self.true_negatives + self.false_positives + self.false_negatives
    }

    /// Calculate accuracy: (TP + TN) / (TP + TN + FP + FN)
    pub fn accuracy(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            (self.true_positives + self.true_negatives) as f64 / total as f64
        }
    }

    /// Calculate precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denominator = self.true_positives + self.false_positives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    /// Calculate recall (sensitivity): TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denominator = self.true_positives + self.false_negatives;
        if denominator == 0 {
            0.0
        } else {
            self.true_positives as f64 / denominator as f64
        }
    }

    pub fn f1_score(&self) -> f64 {
        let p = self.precision();
        let r = self.recall();
        if p + r == 0.0 {
            0.0
        } else {
            2.0 * (p * r) / (p + r)
        }
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub kernel_type: KernelType,
    pub n_support_vectors: usize,
    pub n_sv_per_class: [usize; 2],
    pub labels: [f64; 2],
    pub bias: f64,
    pub feature_dimension: usize,
    pub probability: bool,
}
