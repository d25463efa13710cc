//! Kernel functions for SVM

pub mod linear;
pub mod polynomial;
pub mod rbf;
pub mod sigmoid;
pub mod traits;

pub use self::linear::*;
pub use self::polynomial::*;
pub use self::rbf::*;
pub use self::sigmoid::*;
pub use self::traits::*;

use crate::core::{KernelType, SvmNode, SvmParameter};

/// Kernel selected at runtime from an [`SvmParameter`]
#[derive(Debug, Clone, Copy)]
pub enum KernelFunction {
    Linear(LinearKernel),
    Polynomial(PolynomialKernel),
    Rbf(RBFKernel),
    Sigmoid(SigmoidKernel),
}

impl KernelFunction {
    /// Build the kernel described by `param`.
    ///
    /// `gamma == 0` is resolved to `1 / dimension`.
    pub fn from_parameter(param: &SvmParameter, dimension: usize) -> Self {
        let gamma = if param.gamma > 0.0 {
            param.gamma
        } else {
            1.0 / dimension.max(1) as f64
        };

        match param.kernel_type {
            KernelType::Linear => KernelFunction::Linear(LinearKernel::new()),
            KernelType::Polynomial => KernelFunction::Polynomial(PolynomialKernel::new(
                param.degree,
                gamma,
                param.coef0,
            )),
            KernelType::Rbf => KernelFunction::Rbf(RBFKernel::new(gamma)),
            KernelType::Sigmoid => {
                KernelFunction::Sigmoid(SigmoidKernel::new(gamma, param.coef0))
            }
        }
    }

    pub fn kernel_type(&self) -> KernelType {
        match self {
            KernelFunction::Linear(_) => KernelType::Linear,
            KernelFunction::Polynomial(_) => KernelType::Polynomial,
            KernelFunction::Rbf(_) => KernelType::Rbf,
            KernelFunction::Sigmoid(_) => KernelType::Sigmoid,
        }
    }
}

impl Kernel for KernelFunction {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        match self {
            KernelFunction::Linear(k) => k.compute(x, y),
            KernelFunction::Polynomial(k) => k.compute(x, y),
            KernelFunction::Rbf(k) => k.compute(x, y),
            KernelFunction::Sigmoid(k) => k.compute(x, y),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_gamma_uses_dimension() {
        let param = SvmParameter::default().with_kernel(KernelType::Rbf);
        match KernelFunction::from_parameter(&param, 4) {
            KernelFunction::Rbf(k) => assert_eq!(k.gamma(), 0.25),
            other => panic!("unexpected kernel {other:?}"),
        }
    }

    #[test]
    fn test_explicit_gamma_is_kept() {
        let param = SvmParameter::default()
            .with_kernel(KernelType::Sigmoid)
            .with_gamma(2.0)
            .with_coef0(-1.0);
        let kernel = KernelFunction::from_parameter(&param, 10);
        assert_eq!(kernel.kernel_type(), KernelType::Sigmoid);
        match kernel {
            KernelFunction::Sigmoid(k) => {
                assert_eq!(k.gamma, 2.0);
                assert_eq!(k.coef0, -1.0);
            }
            other => panic!("unexpected kernel {other:?}"),
        }
    }
}
