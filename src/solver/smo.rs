//! Sequential Minimal Optimization (SMO) solver implementation
//!
//! Solves the C-SVC dual by repeatedly optimizing pairs of Lagrange
//! multipliers. Upper bounds are per sample so that class weights can scale C.

use crate::cache::KernelCache;
use crate::core::{DetectorError, OptimizationResult, Result, SvmNode, SvmParameter};
use crate::kernel::Kernel;
use crate::solver::shrinking::ShrinkingStrategy;
use log::{debug, warn};

/// Solver passes between two shrinking checks
const SHRINKING_INTERVAL: usize = 20;

/// SMO solver for SVM optimization
pub struct SMOSolver<'a, K: Kernel> {
    kernel: &'a K,
    eps: f64,
    max_iterations: usize,
    cache_size_mb: usize,
    shrinking: bool,
}

/// Mutable state of one optimization run
struct SolverState<'r> {
    rows: &'r [&'r [SvmNode]],
    y: &'r [f64],
    upper: &'r [f64],
    alpha: Vec<f64>,
    /// E_i = sum_j alpha_j y_j K(i, j) - y_i (bias excluded)
    error_cache: Vec<f64>,
    cache: KernelCache,
}

impl<'r> SolverState<'r> {
    fn is_free(&self, i: usize) -> bool {
        self.alpha[i] > 0.0 && self.alpha[i] < self.upper[i]
    }

    /// alpha_i can move so that y_i alpha_i grows
    fn in_up_set(&self, i: usize) -> bool {
        if self.y[i] > 0.0 {
            self.alpha[i] < self.upper[i]
        } else {
            self.alpha[i] > 0.0
        }
    }

    /// alpha_i can move so that y_i alpha_i shrinks
    fn in_low_set(&self, i: usize) -> bool {
        if self.y[i] > 0.0 {
            self.alpha[i] > 0.0
        } else {
            self.alpha[i] < self.upper[i]
        }
    }

    /// `(b_up, b_low)`: smallest error over the up set, largest over the low
    /// set. The optimum is reached once `b_low <= b_up`, whatever the bias.
    fn error_bounds(&self, active_set: &[usize]) -> (f64, f64) {
        let mut b_up = f64::INFINITY;
        let mut b_low = f64::NEG_INFINITY;
        for &k in active_set {
            let e_k = self.error_cache[k];
            if self.in_up_set(k) {
                b_up = b_up.min(e_k);
            }
            if self.in_low_set(k) {
                b_low = b_low.max(e_k);
            }
        }
        (b_up, b_low)
    }
}

impl<'a, K: Kernel> SMOSolver<'a, K> {
    pub fn new(kernel: &'a K, param: &SvmParameter) -> Self {
        Self {
            kernel,
            eps: param.eps,
            max_iterations: param.max_iterations,
            cache_size_mb: param.cache_size,
            shrinking: param.shrinking,
        }
    }

    /// Solve the dual problem.
    ///
    /// `rows` are sentinel-terminated training rows, `y` their labels in
    /// {-1, +1} and `upper` the per-sample bound on alpha.
    pub fn solve(
        &self,
        rows: &[&[SvmNode]],
        y: &[f64],
        upper: &[f64],
    ) -> Result<OptimizationResult> {
        if rows.is_empty() {
            return Err(DetectorError::EmptyDataset);
        }
        if rows.len() != y.len() || rows.len() != upper.len() {
            return Err(DetectorError::SizeMismatch {
                labels: y.len(),
                features: rows.len(),
            });
        }
        if let Some(&bad) = y.iter().find(|&&label| label != 1.0 && label != -1.0) {
            return Err(DetectorError::InvalidLabel(bad));
        }

        let n = rows.len();
        let mut state = SolverState {
            rows,
            y,
            upper,
            alpha: vec![0.0; n],
            // All alphas start at zero, so every output is zero
            error_cache: y.iter().map(|&label| -label).collect(),
            cache: KernelCache::with_budget_mb(self.cache_size_mb, n),
        };

        let all: Vec<usize> = (0..n).collect();
        let mut iterations = self.optimize(&mut state, all.clone(), self.shrinking, 0);

        if self.shrinking && iterations < self.max_iterations {
            // Variables shrunk away may violate KKT on the full problem
            iterations = self.optimize(&mut state, all, false, iterations);
        }

        if iterations >= self.max_iterations {
            warn!(
                "SMO stopped after reaching max_iterations={}",
                self.max_iterations
            );
        }

        let rho = self.calculate_rho(&state);
        let objective_value = self.calculate_objective(&state);
        let stats = state.cache.stats();
        debug!(
            "SMO finished: {} passes, objective {:.6}, kernel cache hit rate {:.2} ({} entries)",
            iterations,
            objective_value,
            state.cache.hit_rate(),
            stats.size
        );

        Ok(OptimizationResult {
            alpha: state.alpha,
            rho,
            iterations,
            objective_value,
        })
    }

    /// Run SMO passes over `active_set` and return the total pass count
    fn optimize(
        &self,
        state: &mut SolverState<'_>,
        mut active_set: Vec<usize>,
        shrinking: bool,
        mut iterations: usize,
    ) -> usize {
        let n = state.rows.len();
        let mut shrinking_strategy = if shrinking {
            Some(ShrinkingStrategy::new(n, SHRINKING_INTERVAL))
        } else {
            None
        };

        let mut num_changed = 0;
        let mut examine_all = true;

        while (num_changed > 0 || examine_all) && iterations < self.max_iterations {
            num_changed = 0;

            for pos in 0..active_set.len() {
                let i = active_set[pos];
                if !examine_all && !state.is_free(i) {
                    continue;
                }
                if self.examine_example(i, state, &active_set) {
                    num_changed += 1;
                }
            }

            if let Some(ref mut strategy) = shrinking_strategy {
                strategy.update(&state.alpha, &state.error_cache, state.y, state.upper);

                if strategy.has_sufficient_history() {
                    let shrinkable = strategy.shrinkable_variables();
                    if !shrinkable.is_empty() {
                        active_set.retain(|i| !shrinkable.contains(i));
                        debug!(
                            "Shrinking removed {} variables, {} remain active",
                            shrinkable.len(),
                            active_set.len()
                        );
                        strategy.reset_history();
                    }
                }
            }

            if examine_all {
                examine_all = false;
            } else if num_changed == 0 {
                examine_all = true;
            }

            iterations += 1;
        }

        iterations
    }

    fn kernel_at(&self, state: &mut SolverState<'_>, i: usize, j: usize) -> f64 {
        let (rows, kernel) = (state.rows, self.kernel);
        state
            .cache
            .get_or_compute(i, j, || kernel.compute(rows[i], rows[j]))
    }

    /// Check KKT conditions for `i` and try to make progress on it.
    ///
    /// The error cache carries no bias, so `i` is measured against the
    /// extreme errors of the other side rather than against zero.
    fn examine_example(&self, i: usize, state: &mut SolverState<'_>, active_set: &[usize]) -> bool {
        let e_i = state.error_cache[i];
        let (b_up, b_low) = state.error_bounds(active_set);

        let violates = (state.in_up_set(i) && e_i < b_low - self.eps)
            || (state.in_low_set(i) && e_i > b_up + self.eps);
        if !violates {
            return false;
        }

        // Second choice heuristic: maximum |E_i - E_j|
        let mut best_j = None;
        let mut max_diff = 0.0;
        for &j in active_set {
            if j == i {
                continue;
            }
            let diff = (e_i - state.error_cache[j]).abs();
            if diff > max_diff {
                max_diff = diff;
                best_j = Some(j);
            }
        }
        if let Some(j) = best_j {
            if self.take_step(i, j, state) {
                return true;
            }
        }

        // Fall back to free variables, then to everything
        for &j in active_set {
            if j != i && state.is_free(j) && self.take_step(i, j, state) {
                return true;
            }
        }
        for &j in active_set {
            if j != i && !state.is_free(j) && self.take_step(i, j, state) {
                return true;
            }
        }

        false
    }

    /// Jointly optimize alpha_i and alpha_j
    fn take_step(&self, i: usize, j: usize, state: &mut SolverState<'_>) -> bool {
        let y_i = state.y[i];
        let y_j = state.y[j];
        let c_i = state.upper[i];
        let c_j = state.upper[j];
        let alpha_i_old = state.alpha[i];
        let alpha_j_old = state.alpha[j];
        let e_i = state.error_cache[i];
        let e_j = state.error_cache[j];
        let s = y_i * y_j;

        // Feasible segment for alpha_j
        let (low, high) = if y_i != y_j {
            let diff = alpha_j_old - alpha_i_old;
            (0.0_f64.max(diff), c_j.min(c_i + diff))
        } else {
            let sum = alpha_i_old + alpha_j_old;
            (0.0_f64.max(sum - c_i), c_j.min(sum))
        };

        if low >= high {
            return false;
        }

        let k_ii = self.kernel_at(state, i, i);
        let k_jj = self.kernel_at(state, j, j);
        let k_ij = self.kernel_at(state, i, j);
        let eta = k_ii + k_jj - 2.0 * k_ij;

        if eta <= 0.0 {
            // Objective is not strictly convex along this pair
            return false;
        }

        let alpha_j_new = (alpha_j_old + y_j * (e_i - e_j) / eta).clamp(low, high);

        if (alpha_j_new - alpha_j_old).abs() < self.eps * (alpha_j_new + alpha_j_old + self.eps) {
            return false;
        }

        let alpha_i_new = (alpha_i_old + s * (alpha_j_old - alpha_j_new)).clamp(0.0, c_i);

        state.alpha[i] = alpha_i_new;
        state.alpha[j] = alpha_j_new;

        let delta_i = y_i * (alpha_i_new - alpha_i_old);
        let delta_j = y_j * (alpha_j_new - alpha_j_old);

        for k in 0..state.rows.len() {
            let k_ik = self.kernel_at(state, i, k);
            let k_jk = self.kernel_at(state, j, k);
            state.error_cache[k] += delta_i * k_ik + delta_j * k_jk;
        }

        true
    }

    /// Offset of the decision function.
    ///
    /// Averages over free support vectors; without any, takes the midpoint of
    /// the interval allowed by the bounded ones.
    fn calculate_rho(&self, state: &SolverState<'_>) -> f64 {
        let mut upper_bound = f64::INFINITY;
        let mut lower_bound = f64::NEG_INFINITY;
        let mut sum_free = 0.0;
        let mut nr_free = 0;

        for i in 0..state.rows.len() {
            let e_i = state.error_cache[i];
            let positive = state.y[i] > 0.0;

            if state.alpha[i] >= state.upper[i] {
                if positive {
                    lower_bound = lower_bound.max(e_i);
                } else {
                    upper_bound = upper_bound.min(e_i);
                }
            } else if state.alpha[i] <= 0.0 {
                if positive {
                    upper_bound = upper_bound.min(e_i);
                } else {
                    lower_bound = lower_bound.max(e_i);
                }
            } else {
                sum_free += e_i;
                nr_free += 1;
            }
        }

        if nr_free > 0 {
            sum_free / nr_free as f64
        } else if upper_bound.is_finite() && lower_bound.is_finite() {
            (upper_bound + lower_bound) / 2.0
        } else if upper_bound.is_finite() {
            upper_bound
        } else if lower_bound.is_finite() {
            lower_bound
        } else {
            0.0
        }
    }

    /// Dual objective sum(alpha) - 1/2 sum_ij alpha_i alpha_j y_i y_j K_ij,
    /// read off the error cache
    fn calculate_objective(&self, state: &SolverState<'_>) -> f64 {
        (0..state.rows.len())
            .map(|i| {
                let a = state.alpha[i];
                let output = state.error_cache[i] + state.y[i];
                a - 0.5 * a * state.y[i] * output
            })
            .sum()
    }
}
