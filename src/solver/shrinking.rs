//! Shrinking heuristic
//!
//! Variables that sat at a bound with a comfortable KKT margin for the last
//! `history_size` passes are dropped from the working set. The solver runs a
//! final pass over the full problem afterwards.

use std::collections::VecDeque;

/// Margin a bounded variable must keep to count as settled
const SETTLED_MARGIN: f64 = 1e-3;

#[derive(Debug)]
pub struct ShrinkingStrategy {
    lower_bound_history: Vec<VecDeque<bool>>,
    upper_bound_history: Vec<VecDeque<bool>>,
    history_size: usize,
    current_iteration: usize,
}

impl ShrinkingStrategy {
    pub fn new(n_samples: usize, history_size: usize) -> Self {
        Self {
            lower_bound_history: vec![VecDeque::with_capacity(history_size); n_samples],
            upper_bound_history: vec![VecDeque::with_capacity(history_size); n_samples],
            history_size,
            current_iteration: 0,
        }
    }

    /// Record which variables currently look settled at a bound.
    ///
    /// With outputs `f_i = E_i + y_i - rho`, a variable at alpha = 0 is
    /// settled when `y_i f_i > 1`, one at alpha = C when `y_i f_i < 1`.
    pub fn update(&mut self, alpha: &[f64], error_cache: &[f64], y: &[f64], upper: &[f64]) {
        let rho = Self::estimate_rho(alpha, error_cache, upper);

        for i in 0..alpha.len() {
            let margin = y[i] * (error_cache[i] + y[i] - rho);

            let at_lower_bound = alpha[i] <= 0.0 && margin > 1.0 + SETTLED_MARGIN;
            let at_upper_bound = alpha[i] >= upper[i] && margin < 1.0 - SETTLED_MARGIN;

            Self::push_history(
                &mut self.lower_bound_history[i],
                at_lower_bound,
                self.history_size,
            );
            Self::push_history(
                &mut self.upper_bound_history[i],
                at_upper_bound,
                self.history_size,
            );
        }

        self.current_iteration += 1;
    }

    /// Mean error over free variables
    fn estimate_rho(alpha: &[f64], error_cache: &[f64], upper: &[f64]) -> f64 {
        let (sum, count) = alpha
            .iter()
            .zip(upper.iter())
            .zip(error_cache.iter())
            .filter(|((&a, &c), _)| a > 0.0 && a < c)
            .fold((0.0, 0usize), |(s, n), (_, &e)| (s + e, n + 1));

        if count > 0 {
            sum / count as f64
        } else {
            0.0
        }
    }

    fn push_history(history: &mut VecDeque<bool>, value: bool, history_size: usize) {
        if history.len() >= history_size {
            history.pop_front();
        }
        history.push_back(value);
    }

    /// Variables settled at either bound for the whole history window
    pub fn shrinkable_variables(&self) -> Vec<usize> {
        let settled = |history: &VecDeque<bool>| {
            history.len() == self.history_size && history.iter().all(|&x| x)
        };

        (0..self.lower_bound_history.len())
            .filter(|&i| {
                settled(&self.lower_bound_history[i]) || settled(&self.upper_bound_history[i])
            })
            .collect()
    }

    pub fn has_sufficient_history(&self) -> bool {
        self.current_iteration >= self.history_size
    }

    pub fn reset_history(&mut self) {
        for history in &mut self.lower_bound_history {
            history.clear();
        }
        for history in &mut self.upper_bound_history {
            history.clear();
        }
        self.current_iteration = 0;
    }
}
