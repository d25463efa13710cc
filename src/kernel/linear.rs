//! Linear kernel implementation

use crate::core::SvmNode;
use crate::kernel::Kernel;

/// Linear kernel: K(x, y) = x^T * y
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearKernel;

impl LinearKernel {
    pub fn new() -> Self {
        Self
    }
}

impl Kernel for LinearKernel {
    fn compute(&self, x: &[SvmNode], y: &[SvmNode]) -> f64 {
        dot(x, y)
    }
}

/// Dot product of two encoded rows.
///
/// Both rows list indices in ascending order, so a merge walk up to the
/// first sentinel of either row is enough.
pub fn dot(x: &[SvmNode], y: &[SvmNode]) -> f64 {
    let mut result = 0.0;
    let mut i = 0;
    let mut j = 0;

    while i < x.len() && j < y.len() && !x[i].is_sentinel() && !y[j].is_sentinel() {
        let x_idx = x[i].index;
        let y_idx = y[j].index;

        if x_idx == y_idx {
            result += x[i].value * y[j].value;
            i += 1;
            j += 1;
        } else if x_idx < y_idx {
            i += 1;
        } else {
            j += 1;
        }
    }

    result
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn row(pairs: &[(i32, f64)]) -> Vec<SvmNode> {
        pairs
            .iter()
            .map(|&(i, v)| SvmNode::new(i, v))
            .chain(std::iter::once(SvmNode::sentinel()))
            .collect()
    }

    #[test]
    fn test_linear_kernel_basic() {
        let kernel = LinearKernel::new();

        let x = row(&[(0, 1.0), (2, 2.0), (4, 3.0)]);
        let y = row(&[(1, 1.0), (2, 2.0), (3, 3.0)]);

        // Only index 2 overlaps
        assert_eq!(kernel.compute(&x, &y), 4.0);
    }

    #[test]
    fn test_linear_kernel_identical() {
        let kernel = LinearKernel::new();
        let x = row(&[(0, 1.0), (1, 2.0), (2, 3.0)]);
        assert_eq!(kernel.compute(&x, &x), 14.0);
    }

    #[test]
    fn test_dot_stops_at_sentinel() {
        // Packed buffer: the second row follows the first sentinel
        let mut packed = row(&[(0, 1.0), (1, 1.0)]);
        packed.extend(row(&[(0, 5.0), (1, 5.0)]));
        let y = row(&[(0, 2.0), (1, 3.0)]);

        assert_eq!(dot(&packed, &y), 5.0);
        assert_eq!(dot(&packed[3..], &y), 25.0);
    }

    #[test]
    fn test_dot_empty_rows() {
        let empty = row(&[]);
        let y = row(&[(0, 1.0)]);
        assert_eq!(dot(&empty, &y), 0.0);
        assert_eq!(dot(&y, &empty), 0.0);
    }
}
