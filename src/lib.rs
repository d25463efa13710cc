//! Object detection with HOG features and a support vector machine
//!
//! Images are described by a [`feature::FeatureExtractor`], a
//! [`SupportVectorMachine`] is trained on labeled descriptors, and a
//! [`detection::Detector`] slides a window over new images to find objects.

pub mod api;
pub mod cache;
pub mod core;
pub mod data;
pub mod detection;
pub mod feature;
pub mod file_io;
pub mod kernel;
pub mod model;
pub mod persistence;
pub mod solver;
pub mod utils;

// Re-export main types for convenience
pub use crate::api::{EvaluationMetrics, ModelInfo, SupportVectorMachine};
pub use crate::cache::{CacheStats, KernelCache};
pub use crate::core::traits::*;
pub use crate::core::types::*;
pub use crate::core::{DetectorError, Result};
pub use crate::data::{encode_feature, LabeledImageSet, TrainingProblem};
pub use crate::detection::{Detection, Detector};
pub use crate::feature::{FeatureExtractor, HogFeatureExtractor, ParametersMap};
pub use crate::kernel::{Kernel, KernelFunction};
pub use crate::model::SvmModel;

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
