//! Core traits shared by the classifier and the detection glue

use crate::core::{Feature, Result};

/// Anything that scores a feature with a continuous decision value
pub trait Classifier: Send + Sync {
    /// Decision value of a single feature; the sign is the predicted class
    fn predict(&self, feature: &Feature) -> Result<f64>;

    /// Decision values of a collection, same length and order
    fn predict_batch(&self, features: &[Feature]) -> Result<Vec<f64>> {
        features.iter().map(|f| self.predict(f)).collect()
    }
}
