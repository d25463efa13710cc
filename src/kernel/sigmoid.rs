//! Sigmoid kernel implementation
//!
//! K(x, y) = tanh(γ * <x, y> + r). Not positive semi-definite for every
//! parameter choice, so training may stop on a non-convex problem.

use crate::core::SvmNode;
use crate::kernel::linear::dot;
use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct SigmoidKernel {
    pub gamma: f64,
    pub coef0: f64,
}

impl SigmoidKernel {
    pub fn new(gamma: f64, coef0: f64) -> Self {
        Self { gamma, coef0 }
    }
}

impl Kernel for SigmoidKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (self.gamma * dot(x, y) + self.coef0).tanh()
    }
}
