//! Utility functions over feature collections

use crate::core::{DetectorError, Feature, Result};

/// Feature scaling utilities
pub mod scaling {
    use super::*;

    /// Feature scaling methods
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub enum ScalingMethod {
        /// Min-Max scaling to [min_val, max_val] range
        MinMax { min_val: f64, max_val: f64 },
        /// Standard (Z-score) normalization: (x - mean) / std
        StandardScore,
        /// Unit scaling: x / max(|x|)
        UnitScale,
    }

    impl Default for ScalingMethod {
        fn default() -> Self {
            Self::MinMax {
                min_val: -1.0,
                max_val: 1.0,
            }
        }
    }

    /// Statistics for a single dimension
    #[derive(Debug, Clone, PartialEq)]
    pub struct FeatureStats {
        pub min: f64,
        pub max: f64,
        pub mean: f64,
        pub std: f64,
    }

    /// Per-dimension scaling fitted on a training collection
    #[derive(Debug, Clone)]
    pub struct ScalingParams {
        pub method: ScalingMethod,
        pub feature_stats: Vec<FeatureStats>,
    }

    impl ScalingParams {
        /// Compute scaling parameters from training features
        pub fn fit(features: &[Feature], method: ScalingMethod) -> Result<Self> {
            let dimension = features.first().ok_or(DetectorError::EmptyDataset)?.len();
            if let Some(bad) = features.iter().find(|f| f.len() != dimension) {
                return Err(DetectorError::DimensionMismatch {
                    expected: dimension,
                    actual: bad.len(),
                });
            }

            let n = features.len() as f64;
            let feature_stats = (0..dimension)
                .map(|d| {
                    let values = features.iter().map(|f| f[d] as f64);
                    let min = values.clone().fold(f64::INFINITY, f64::min);
                    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
                    let mean = values.clone().sum::<f64>() / n;
                    let variance = if features.len() > 1 {
                        values.map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)
                    } else {
                        0.0
                    };
                    FeatureStats {
                        min,
                        max,
                        mean,
                        std: variance.sqrt(),
                    }
                })
                .collect();

            Ok(Self {
                method,
                feature_stats,
            })
        }

        pub fn dimension(&self) -> usize {
            self.feature_stats.len()
        }

        /// Transform a single feature using fitted parameters
        pub fn transform(&self, feature: &Feature) -> Result<Feature> {
            if feature.len() != self.dimension() {
                return Err(DetectorError::DimensionMismatch {
                    expected: self.dimension(),
                    actual: feature.len(),
                });
            }
            Ok(feature
                .iter()
                .zip(self.feature_stats.iter())
                .map(|(&value, stats)| self.scale_value(value as f64, stats) as f32)
                .collect())
        }

        /// Transform a collection, keeping its order
        pub fn transform_all(&self, features: &[Feature]) -> Result<Vec<Feature>> {
            features.iter().map(|f| self.transform(f)).collect()
        }

        /// Scale a single value using the appropriate method
        fn scale_value(&self, value: f64, stats: &FeatureStats) -> f64 {
            match self.method {
                ScalingMethod::MinMax { min_val, max_val } => {
                    if (stats.max - stats.min).abs() < 1e-12 {
                        // Constant dimension
                        (min_val + max_val) / 2.0
                    } else {
                        let normalized = (value - stats.min) / (stats.max - stats.min);
                        min_val + normalized * (max_val - min_val)
                    }
                }
                ScalingMethod::StandardScore => {
                    if stats.std < 1e-12 {
                        0.0
                    } else {
                        (value - stats.mean) / stats.std
                    }
                }
                ScalingMethod::UnitScale => {
                    let max_abs = stats.max.abs().max(stats.min.abs());
                    if max_abs < 1e-12 {
                        0.0
                    } else {
                        value / max_abs
                    }
                }
            }
        }
    }

    /// Convenience function: fit and transform in one step
    pub fn fit_transform(
        features: &[Feature],
        method: ScalingMethod,
    ) -> Result<(Vec<Feature>, ScalingParams)> {
        let params = ScalingParams::fit(features, method)?;
        let transformed = params.transform_all(features)?;
        Ok((transformed, params))
    }
}

/// Label checks run before training
pub mod validation {
    /// Count of the larger label, count of the rest, and their ratio
    pub fn check_label_balance(labels: &[f64]) -> (usize, usize, f64) {
        let positive = labels.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let positive_count = labels.iter().filter(|&&l| l == positive).count();
        let negative_count = labels.len() - positive_count;
        let balance_ratio = if negative_count == 0 {
            f64::INFINITY
        } else {
            positive_count as f64 / negative_count as f64
        };
        (positive_count, negative_count, balance_ratio)
    }
}
