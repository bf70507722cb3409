//! Published Karlin-Altschul parameters for gapped nucleotide scoring.

use crate::config::NuclScoring;
use crate::error::SearchError;

/// Karlin-Altschul statistical parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KarlinParams {
    pub lambda: f64,
    pub k: f64,
    /// Relative entropy
    pub h: f64,
    /// Slope and intercept of the expected alignment length, used by the
    /// length adjustment
    pub alpha: f64,
    pub beta: f64,
}

impl KarlinParams {
    #[inline]
    pub fn log_k(&self) -> f64 {
        self.k.ln()
    }

    pub fn is_valid(&self) -> bool {
        self.lambda > 0.0 && self.k > 0.0 && self.h > 0.0
    }
}

/// (gap_open, gap_extend, lambda, k, h, alpha, beta)
type Entry = (i32, i32, f64, f64, f64, f64, f64);

// Gap costs 0/0 denote the linear gap model.
const REWARD1_PENALTY5: &[Entry] = &[
    (0, 0, 1.39, 0.747, 1.38, 1.00, 0.0),
    (3, 3, 1.39, 0.747, 1.38, 1.00, 0.0),
];

const REWARD1_PENALTY4: &[Entry] = &[
    (0, 0, 1.383, 0.738, 1.36, 1.02, 0.0),
    (1, 2, 1.36, 0.67, 1.2, 1.1, 0.0),
    (0, 2, 1.26, 0.43, 0.90, 1.4, -1.0),
    (2, 1, 1.35, 0.61, 1.1, 1.2, -1.0),
    (1, 1, 1.22, 0.35, 0.72, 1.7, -3.0),
];

const REWARD2_PENALTY7: &[Entry] = &[
    (0, 0, 0.69, 0.73, 1.34, 0.515, 0.0),
    (2, 4, 0.68, 0.67, 1.2, 0.55, 0.0),
    (0, 4, 0.63, 0.43, 0.90, 0.7, -1.0),
    (4, 2, 0.675, 0.62, 1.1, 0.6, -1.0),
    (2, 2, 0.61, 0.35, 0.72, 1.7, -3.0),
];

const REWARD1_PENALTY3: &[Entry] = &[
    (0, 0, 1.374, 0.711, 1.31, 1.05, 0.0),
    (2, 2, 1.37, 0.70, 1.2, 1.1, 0.0),
    (1, 2, 1.35, 0.64, 1.1, 1.2, -1.0),
    (0, 2, 1.25, 0.42, 0.83, 1.5, -2.0),
    (2, 1, 1.34, 0.60, 1.1, 1.2, -1.0),
    (1, 1, 1.21, 0.34, 0.71, 1.7, -2.0),
];

const REWARD2_PENALTY5: &[Entry] = &[
    (0, 0, 0.675, 0.65, 1.1, 0.6, -1.0),
    (2, 4, 0.67, 0.59, 1.1, 0.6, -1.0),
    (0, 4, 0.62, 0.39, 0.78, 0.8, -2.0),
    (4, 2, 0.67, 0.61, 1.0, 0.65, -2.0),
    (2, 2, 0.56, 0.32, 0.59, 0.95, -4.0),
];

const REWARD1_PENALTY2: &[Entry] = &[
    (0, 0, 1.28, 0.46, 0.85, 1.5, -2.0),
    (2, 2, 1.33, 0.62, 1.1, 1.2, 0.0),
    (1, 2, 1.30, 0.52, 0.93, 1.4, -2.0),
    (0, 2, 1.19, 0.34, 0.66, 1.8, -3.0),
    (3, 1, 1.32, 0.57, 1.0, 1.3, -1.0),
    (2, 1, 1.29, 0.49, 0.92, 1.4, -1.0),
    (1, 1, 1.14, 0.26, 0.52, 2.2, -5.0),
];

const REWARD2_PENALTY3: &[Entry] = &[
    (0, 0, 0.55, 0.21, 0.46, 1.2, -5.0),
    (4, 4, 0.63, 0.42, 0.84, 0.75, -2.0),
    (2, 4, 0.615, 0.37, 0.72, 0.85, -3.0),
    (0, 4, 0.55, 0.21, 0.46, 1.2, -5.0),
    (3, 3, 0.615, 0.37, 0.68, 0.9, -3.0),
    (6, 2, 0.63, 0.42, 0.84, 0.75, -2.0),
    (5, 2, 0.625, 0.41, 0.78, 0.8, -2.0),
    (4, 2, 0.61, 0.35, 0.68, 0.9, -3.0),
    (2, 2, 0.515, 0.14, 0.33, 1.55, -9.0),
];

const REWARD3_PENALTY4: &[Entry] = &[
    (6, 3, 0.389, 0.25, 0.56, 0.7, -5.0),
    (5, 3, 0.375, 0.21, 0.47, 0.8, -6.0),
    (4, 3, 0.351, 0.14, 0.35, 1.0, -9.0),
    (6, 2, 0.362, 0.16, 0.45, 0.8, -4.0),
    (5, 2, 0.330, 0.092, 0.28, 1.2, -13.0),
    (4, 2, 0.281, 0.046, 0.16, 1.8, -23.0),
];

const REWARD4_PENALTY5: &[Entry] = &[
    (0, 0, 0.22, 0.061, 0.22, 1.0, -15.0),
    (6, 5, 0.28, 0.21, 0.47, 0.6, -7.0),
    (5, 5, 0.27, 0.17, 0.39, 0.7, -9.0),
    (4, 5, 0.25, 0.10, 0.31, 0.8, -10.0),
    (3, 5, 0.23, 0.065, 0.25, 0.9, -11.0),
];

const REWARD1_PENALTY1: &[Entry] = &[
    (3, 2, 1.09, 0.31, 0.55, 2.0, -2.0),
    (2, 2, 1.07, 0.27, 0.49, 2.2, -3.0),
    (1, 2, 1.02, 0.21, 0.36, 2.8, -6.0),
    (0, 2, 0.80, 0.064, 0.17, 4.8, -16.0),
    (4, 1, 1.08, 0.28, 0.54, 2.0, -2.0),
    (3, 1, 1.06, 0.25, 0.46, 2.3, -4.0),
    (2, 1, 0.99, 0.17, 0.30, 3.3, -10.0),
];

const REWARD3_PENALTY2: &[Entry] = &[(5, 5, 0.208, 0.030, 0.072, 2.9, -47.0)];

const REWARD5_PENALTY4: &[Entry] = &[
    (10, 6, 0.163, 0.068, 0.16, 1.0, -19.0),
    (8, 6, 0.146, 0.039, 0.11, 1.3, -29.0),
];

fn table_for(reward: i32, penalty: i32) -> Option<&'static [Entry]> {
    let table = match (reward, penalty.abs()) {
        (1, 5) => REWARD1_PENALTY5,
        (1, 4) => REWARD1_PENALTY4,
        (2, 7) => REWARD2_PENALTY7,
        (1, 3) => REWARD1_PENALTY3,
        (2, 5) => REWARD2_PENALTY5,
        (1, 2) => REWARD1_PENALTY2,
        (2, 3) => REWARD2_PENALTY3,
        (3, 4) => REWARD3_PENALTY4,
        (4, 5) => REWARD4_PENALTY5,
        (1, 1) => REWARD1_PENALTY1,
        (3, 2) => REWARD3_PENALTY2,
        (5, 4) => REWARD5_PENALTY4,
        _ => return None,
    };
    Some(table)
}

/// Gapped parameters for a reward/penalty scheme. Gap costs of 0/0 select the
/// scheme's first (default) entry; any other pair must be listed.
pub fn gapped_nucleotide_params(scoring: &NuclScoring) -> Result<KarlinParams, SearchError> {
    let unsupported = || SearchError::UnsupportedScoring {
        reward: scoring.reward,
        penalty: scoring.penalty,
    };
    let table = table_for(scoring.reward, scoring.penalty).ok_or_else(unsupported)?;
    let (open, extend) = (scoring.gap_open.abs(), scoring.gap_extend.abs());
    let entry = if open == 0 && extend == 0 {
        table.first()
    } else {
        table.iter().find(|e| e.0 == open && e.1 == extend)
    };
    let &(_, _, lambda, k, h, alpha, beta) = entry.ok_or_else(unsupported)?;
    Ok(KarlinParams {
        lambda,
        k,
        h,
        alpha,
        beta,
    })
}
