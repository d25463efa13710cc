//! Polynomial kernel implementation
//!
//! K(x, y) = (γ * <x, y> + r)^d

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy)]
pub struct PolynomialKernel {
    pub gamma: f64,
    pub coef0: f64,
    pub degree: u32,
}

impl PolynomialKernel {
    pub fn new(degree: u32, gamma: f64, coef0: f64) -> Self {
        Self {
            gamma,
            coef0,
            degree,
        }
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        let base = self.gamma * dot(x, y) + self.coef0;
        base.powi(self.degree as i32)
    }
}
