//! RBF (Radial Basis Function) kernel implementation
//!
//! K(x, y) = exp(-γ * ||x - y||²)

use crate::core::SvmNode;
use crate::kernel::Kernel;

#[derive(Debug, Clone, Copy)]
pub struct RBFKernel {
    gamma: f64,
}

impl RBFKernel {
    pub fn new(gamma: f64) -> Self {
        Self { gamma }
    }

    pub fn gamma(&self) -> f64 {
        self.gamma
    }
}

impl Kernel for RBFKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        (-self.gamma * squared_distance(x, y)).exp()
    }
}

/// ||x - y||² over two encoded rows, treating absent indices as zero
fn squared_distance(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut sum = 0.0;
    let mut i = 0;
    let mut j = 0;
    let x_end = x.iter().position(|n| n.is_sentinel()).unwrap_or(x.len());
    let y_end = y.iter().position(|n| n.is_sentinel()).unwrap_or(y.len());

    while i < x_end && j < y_end {
        if x[i].index == y[j].index {
            let d = x[i].value - y[j].value;
            sum += d * d;
            i += 1;
            j += 1;
        } else if x[i].index < y[j].index {
            sum += x[i].value * x[i].value;
            i += 1;
        } else {
            sum += y[j].value * y[j].value;
            j += 1;
        }
    }

    sum += x[i..x_end].iter().map(|n| n.value * n.value).sum::<f64>();
    sum += y[j..y_end].iter().map(|n| n.value * n.value).sum::<f64>();
    sum
}
