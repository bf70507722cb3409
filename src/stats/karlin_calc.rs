//! Ungapped Karlin-Altschul parameters from a score distribution.
//!
//! Lambda is the positive root of `sum_s p(s) e^(lambda s) = 1`, H the
//! relative entropy at that root, and K follows from the Karlin-Altschul
//! series over the distribution of summed scores. Nucleotide schemes use the
//! reward/penalty distribution under uniform base composition.

use crate::config::NuclScoring;
use crate::error::SearchError;
use crate::sequence::encoding::NUCL_ALPHABET;

use super::tables::KarlinParams;

const LAMBDA_TOLERANCE: f64 = 1.0e-10;
const LAMBDA_ITER_MAX: usize = 100;
const K_SUMLIMIT: f64 = 1.0e-4;
const K_ITER_MAX: usize = 100;

/// Probability of each score, indexed from the lowest observed score
#[derive(Debug, Clone)]
pub struct ScoreProfile {
    low: i32,
    high: i32,
    probs: Vec<f64>,
    mean: f64,
}

fn gcd(mut a: i32, mut b: i32) -> i32 {
    a = a.abs();
    b = b.abs();
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

impl ScoreProfile {
    /// Build from (score, weight) pairs; weights are normalised. Zero-weight
    /// scores are ignored.
    pub fn from_weights(pairs: &[(i32, f64)]) -> Result<Self, SearchError> {
        let observed: Vec<(i32, f64)> = pairs.iter().copied().filter(|&(_, w)| w > 0.0).collect();
        let total: f64 = observed.iter().map(|&(_, w)| w).sum();
        let (low, high) = match (
            observed.iter().map(|&(s, _)| s).min(),
            observed.iter().map(|&(s, _)| s).max(),
        ) {
            (Some(low), Some(high)) if total > 0.0 => (low, high),
            _ => {
                return Err(SearchError::Statistics(
                    "score distribution is empty".to_string(),
                ))
            }
        };
        if low >= 0 || high <= 0 {
            return Err(SearchError::Statistics(format!(
                "score range [{}, {}] must contain both signs",
                low, high
            )));
        }

        let mut probs = vec![0.0; (high - low + 1) as usize];
        for &(score, weight) in &observed {
            probs[(score - low) as usize] += weight / total;
        }
        let mean: f64 = probs
            .iter()
            .enumerate()
            .map(|(i, p)| (low + i as i32) as f64 * p)
            .sum();
        Ok(Self {
            low,
            high,
            probs,
            mean,
        })
    }

    /// Match/mismatch distribution of a reward/penalty scheme over uniformly
    /// distributed bases
    pub fn nucleotide(reward: i32, penalty: i32) -> Result<Self, SearchError> {
        let n = NUCL_ALPHABET as f64;
        Self::from_weights(&[(reward, 1.0 / n), (penalty, (n - 1.0) / n)])
    }

    #[inline]
    pub fn prob(&self, score: i32) -> f64 {
        if score < self.low || score > self.high {
            0.0
        } else {
            self.probs[(score - self.low) as usize]
        }
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Greatest common divisor of all scores with non-zero probability
    fn divisor(&self) -> i32 {
        self.probs
            .iter()
            .enumerate()
            .filter(|&(_, &p)| p > 0.0)
            .fold(0, |d, (i, _)| gcd(d, self.low + i as i32))
    }

    fn moment(&self, lambda: f64, power: i32) -> f64 {
        self.probs
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let s = (self.low + i as i32) as f64;
                p * s.powi(power) * (lambda * s).exp()
            })
            .sum()
    }
}

/// Positive root of the moment generating function, by Newton steps kept
/// inside a shrinking bracket
fn solve_lambda(profile: &ScoreProfile) -> Result<f64, SearchError> {
    let f = |l: f64| profile.moment(l, 0) - 1.0;

    let mut lo = 0.0;
    let mut hi = 0.5;
    while f(hi) <= 0.0 {
        hi *= 2.0;
        if hi > 1.0e3 {
            return Err(SearchError::Statistics("lambda did not bracket".to_string()));
        }
    }

    let mut x = hi;
    for _ in 0..LAMBDA_ITER_MAX {
        let fx = f(x);
        if fx > 0.0 {
            hi = x;
        } else {
            lo = x;
        }
        if hi - lo < LAMBDA_TOLERANCE * hi {
            return Ok((lo + hi) / 2.0);
        }
        let slope = profile.moment(x, 1);
        let next = x - fx / slope;
        if slope > 0.0 && next > lo && next < hi {
            if (next - x).abs() < LAMBDA_TOLERANCE * x {
                return Ok(next);
            }
            x = next;
        } else {
            x = (lo + hi) / 2.0;
        }
    }
    Ok(x)
}

fn solve_k(profile: &ScoreProfile, lambda: f64, h: f64) -> Result<f64, SearchError> {
    let d = profile.divisor();
    let low = profile.low / d;
    let high = profile.high / d;
    let lambda = lambda * d as f64;
    let range = (high - low) as usize;
    let step: Vec<f64> = (0..=range)
        .map(|i| profile.prob((low + i as i32) * d))
        .collect();

    let mut first_term = h / lambda;
    if low == -1 && high == 1 {
        let (p_low, p_high) = (step[0], step[range]);
        return Ok((p_low - p_high) * (p_low - p_high) / p_low);
    }
    if low == -1 || high == 1 {
        if high != 1 {
            let mean = profile.mean / d as f64;
            first_term = mean * mean / first_term;
        }
        return Ok(first_term * (1.0 - (-lambda).exp()));
    }

    // Distribution of the sum of n steps, indexed from n * low
    let mut dist = vec![1.0];
    let mut outer = 0.0;
    for n in 1..=K_ITER_MAX {
        let mut next = vec![0.0; dist.len() + range];
        for (i, &p) in dist.iter().enumerate().filter(|&(_, &p)| p > 0.0) {
            for (j, &q) in step.iter().enumerate() {
                next[i + j] += p * q;
            }
        }
        dist = next;

        let base = n as i32 * low;
        let inner: f64 = dist
            .iter()
            .enumerate()
            .map(|(i, &p)| {
                let score = base + i as i32;
                if score < 0 {
                    p * (lambda * score as f64).exp()
                } else {
                    p
                }
            })
            .sum::<f64>()
            / n as f64;
        outer += inner;
        if inner <= K_SUMLIMIT {
            break;
        }
    }

    let k = -(-2.0 * outer).exp() / (first_term * (-lambda).exp_m1());
    if k > 0.0 && k.is_finite() {
        Ok(k)
    } else {
        Err(SearchError::Statistics(format!("computed K {} is not positive", k)))
    }
}

/// Lambda, K and H of a score distribution. The expected score must be
/// negative. Alpha is lambda / H and beta zero, the ungapped convention.
pub fn ungapped_params(profile: &ScoreProfile) -> Result<KarlinParams, SearchError> {
    if profile.mean >= 0.0 {
        return Err(SearchError::Statistics(format!(
            "expected score {} must be negative",
            profile.mean
        )));
    }
    let lambda = solve_lambda(profile)?;
    let h = lambda * profile.moment(lambda, 1);
    let k = solve_k(profile, lambda, h)?;
    Ok(KarlinParams {
        lambda,
        k,
        h,
        alpha: lambda / h,
        beta: 0.0,
    })
}

/// Ungapped parameters of a reward/penalty scheme. A scheme with a
/// non-negative expected score cannot be used for local alignment.
pub fn ungapped_nucleotide_params(scoring: &NuclScoring) -> Result<KarlinParams, SearchError> {
    let unsupported = SearchError::UnsupportedScoring {
        reward: scoring.reward,
        penalty: scoring.penalty,
    };
    if scoring.reward <= 0 || scoring.penalty >= 0 {
        return Err(unsupported);
    }
    let profile = ScoreProfile::nucleotide(scoring.reward, scoring.penalty)?;
    if profile.mean() >= 0.0 {
        return Err(unsupported);
    }
    ungapped_params(&profile)
}
