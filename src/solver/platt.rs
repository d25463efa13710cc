//! Platt scaling: fit P(y = +1 | f) = 1 / (1 + exp(A f + B))
//!
//! Newton's method with backtracking line search on the regularized
//! targets of Platt (1999), following Lin, Lin and Weng's stable variant.

use log::warn;

const MAX_ITERATIONS: usize = 100;
const MIN_STEP: f64 = 1e-10;
const HESSIAN_RIDGE: f64 = 1e-12;
const GRADIENT_EPS: f64 = 1e-5;

/// Fit sigmoid parameters `(A, B)` to decision values and {-1, +1} labels
pub fn sigmoid_train(decision_values: &[f64], labels: &[f64]) -> (f64, f64) {
    let prior1 = labels.iter().filter(|&&y| y > 0.0).count() as f64;
    let prior0 = labels.len() as f64 - prior1;

    let hi_target = (prior1 + 1.0) / (prior1 + 2.0);
    let lo_target = 1.0 / (prior0 + 2.0);
    let targets: Vec<f64> = labels
        .iter()
        .map(|&y| if y > 0.0 { hi_target } else { lo_target })
        .collect();

    let objective = |a: f64, b: f64| -> f64 {
        decision_values
            .iter()
            .zip(targets.iter())
            .map(|(&f, &t)| {
                let f_ap_b = f * a + b;
                if f_ap_b >= 0.0 {
                    t * f_ap_b + (-f_ap_b).exp().ln_1p()
                } else {
                    (t - 1.0) * f_ap_b + f_ap_b.exp().ln_1p()
                }
            })
            .sum()
    };

    let mut a = 0.0;
    let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
    let mut fval = objective(a, b);

    for _ in 0..MAX_ITERATIONS {
        let mut h11 = HESSIAN_RIDGE;
        let mut h22 = HESSIAN_RIDGE;
        let mut h21 = 0.0;
        let mut g1 = 0.0;
        let mut g2 = 0.0;

        for (&f, &t) in decision_values.iter().zip(targets.iter()) {
            let f_ap_b = f * a + b;
            let (p, q) = if f_ap_b >= 0.0 {
                let e = (-f_ap_b).exp();
                (e / (1.0 + e), 1.0 / (1.0 + e))
            } else {
                let e = f_ap_b.exp();
                (1.0 / (1.0 + e), e / (1.0 + e))
            };
            let d2 = p * q;
            h11 += f * f * d2;
            h22 += d2;
            h21 += f * d2;
            let d1 = t - p;
            g1 += f * d1;
            g2 += d1;
        }

        if g1.abs() < GRADIENT_EPS && g2.abs() < GRADIENT_EPS {
            break;
        }

        let det = h11 * h22 - h21 * h21;
        let d_a = -(h22 * g1 - h21 * g2) / det;
        let d_b = -(-h21 * g1 + h11 * g2) / det;
        let gd = g1 * d_a + g2 * d_b;

        let mut step = 1.0;
        while step >= MIN_STEP {
            let new_a = a + step * d_a;
            let new_b = b + step * d_b;
            let new_f = objective(new_a, new_b);
            if new_f < fval + 1e-4 * step * gd {
                a = new_a;
                b = new_b;
                fval = new_f;
                break;
            }
            step /= 2.0;
        }

        if step < MIN_STEP {
            warn!("Platt scaling line search failed");
            break;
        }
    }

    (a, b)
}

/// Probability of the positive class for a decision value
pub fn sigmoid_predict(decision_value: f64, a: f64, b: f64) -> f64 {
    let f_ap_b = decision_value * a + b;
    if f_ap_b >= 0.0 {
        let e = (-f_ap_b).exp();
        e / (1.0 + e)
    } else {
        1.0 / (1.0 + f_ap_b.exp())
    }
}
