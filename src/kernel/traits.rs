//! Kernel trait definition

use crate::core::SvmNode;

/// Kernel function trait
///
/// Rows are sentinel-terminated node slices. A kernel K(x, y) must satisfy
/// Mercer's condition to be valid for SVM training.
pub trait Kernel: Send + Sync {
    /// Compute kernel value K(x, y)
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64;
}
