//! Length adjustment for Karlin-Altschul statistics.
//!
//! An alignment cannot start within its own expected length of the end of
//! either sequence, so effective lengths are shortened by `ell`, the fixed
//! point of
//!
//! ```text
//! ell = alpha / lambda * (ln K + ln((m - ell) * (n - N * ell))) + beta
//! ```
//!
//! where `m` is the query length, `n` the database length and `N` the number
//! of database sequences. The iteration keeps a bracket `[ell_min, ell_max]`
//! around the fixed point and falls back to bisection when a step leaves it.

use super::tables::KarlinParams;

const MAX_ITERATIONS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthAdjustment {
    pub length: i64,
    pub converged: bool,
}

pub fn compute_length_adjustment(
    query_length: i64,
    db_length: i64,
    db_num_seqs: i64,
    params: &KarlinParams,
) -> LengthAdjustment {
    let m = query_length as f64;
    let n = db_length as f64;
    let n_seqs = db_num_seqs.max(1) as f64;
    let log_k = params.log_k();
    let alpha_d_lambda = params.alpha / params.lambda;
    let beta = params.beta;

    if m <= 0.0 || n <= 0.0 || params.k <= 0.0 || params.lambda <= 0.0 {
        return LengthAdjustment {
            length: 0,
            converged: false,
        };
    }

    // Largest ell with K * (m - ell) * (n - N * ell) > max(m, n): the smaller
    // root of N ell^2 - (m N + n) ell + (m n - max(m, n) / K)
    let a = n_seqs;
    let minus_b = m * n_seqs + n;
    let c = n * m - m.max(n) / params.k;
    if c < 0.0 {
        return LengthAdjustment {
            length: 0,
            converged: true,
        };
    }
    let discriminant = minus_b * minus_b - 4.0 * a * c;
    if discriminant < 0.0 {
        return LengthAdjustment {
            length: 0,
            converged: false,
        };
    }

    let fixed_point_rhs = |ell: f64| {
        let ss = (m - ell) * (n - n_seqs * ell);
        alpha_d_lambda * (log_k + ss.ln()) + beta
    };

    let mut ell_min = 0.0_f64;
    let mut ell_max = 2.0 * c / (minus_b + discriminant.sqrt());
    let mut ell_next = 0.0_f64;
    let mut converged = false;

    for i in 1..=MAX_ITERATIONS {
        let ell = ell_next;
        let ell_bar = fixed_point_rhs(ell);
        if ell_bar >= ell {
            ell_min = ell;
            if ell_bar - ell_min <= 1.0 {
                converged = true;
                break;
            }
            if ell_min == ell_max {
                break;
            }
        } else {
            ell_max = ell;
        }

        ell_next = if ell_min <= ell_bar && ell_bar <= ell_max {
            ell_bar
        } else if i == 1 {
            ell_max
        } else {
            (ell_min + ell_max) / 2.0
        };
    }

    let mut length = ell_min as i64;
    if converged {
        // floor(ell_min) may be one short of floor(fixed point)
        let ell_ceil = ell_min.ceil();
        if ell_ceil <= ell_max && fixed_point_rhs(ell_ceil) >= ell_ceil {
            length = ell_ceil as i64;
        }
    }

    LengthAdjustment { length, converged }
}
