//! Sum statistics for sets of linked HSPs.
//!
//! A linked set of `r` HSPs is scored by the sum of its normalised scores
//! `xsum = sum(lambda * S_i - ln K)`. Its P-value is the probability that `r`
//! random HSPs reach that sum, which for `r <= 4` is read from interpolation
//! tables and otherwise obtained by double Romberg integration. The E-value
//! is scaled from the pair's own search space to the effective one and
//! divided by a gap-decay weight that penalises large sets.

/// Largest E-value reported; sums beyond it are clamped
const SUM_E_MAX: f64 = i32::MAX as f64;

/// Lengths and search space a linked set is evaluated against
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairSpace {
    /// Effective length of the query context
    pub query_len: f64,
    /// Effective length of the subject
    pub subject_len: f64,
    /// Effective search space of the whole search
    pub search_space: f64,
}

impl PairSpace {
    #[inline]
    fn pair_space(&self) -> f64 {
        self.query_len * self.subject_len
    }
}

/// Normalised score: lambda * S - ln K
#[inline]
pub fn normalize_score(raw_score: i32, lambda: f64, log_k: f64) -> f64 {
    lambda * raw_score as f64 - log_k
}

/// Weight dividing the E-value of a set of `num_segments` HSPs:
/// (1 - rate) * rate^(n - 1)
pub fn gap_decay_divisor(decay_rate: f64, num_segments: usize) -> f64 {
    if num_segments == 0 {
        return 1.0;
    }
    (1.0 - decay_rate) * decay_rate.powi(num_segments as i32 - 1)
}

/// ln(n!)
pub fn ln_factorial(n: usize) -> f64 {
    (2..=n).map(|k| (k as f64).ln()).sum()
}

/// E = -ln(1 - P)
pub fn p_to_e(p: f64) -> f64 {
    if !(0.0..=1.0).contains(&p) {
        return i32::MIN as f64;
    }
    if p == 1.0 {
        return SUM_E_MAX;
    }
    -(-p).ln_1p()
}

/// P = 1 - e^(-E)
pub fn e_to_p(e: f64) -> f64 {
    if e < 0.0 {
        return 0.0;
    }
    -(-e).exp_m1()
}

// P-values of sets of 2, 3 and 4 HSPs sampled at half-unit steps of the
// adjusted sum, from high to low.
const SUM_P_2: &[f64] = &[
    0.01669, 0.0249, 0.03683, 0.05390, 0.07794, 0.1111, 0.1559, 0.2146, 0.2890, 0.3794, 0.4836,
    0.5965, 0.7092, 0.8114, 0.8931, 0.9490, 0.9806, 0.9944, 0.9989,
];

const SUM_P_3: &[f64] = &[
    0.0001682, 0.0002542, 0.0003829, 0.0005745, 0.0008587, 0.001278, 0.001893, 0.002789,
    0.004088, 0.005958, 0.008627, 0.01240, 0.01770, 0.02505, 0.03514, 0.04880, 0.06704, 0.09103,
    0.1220, 0.1612, 0.2097, 0.2682, 0.3368, 0.4145, 0.4994, 0.5881, 0.6765, 0.7596, 0.8326,
    0.8922, 0.9367, 0.9667, 0.9846, 0.9939, 0.9980,
];

const SUM_P_4: &[f64] = &[
    2.658e-07, 4.064e-07, 6.203e-07, 9.450e-07, 1.437e-06, 2.181e-06, 3.302e-06, 4.990e-06,
    7.524e-06, 1.132e-05, 1.698e-05, 2.541e-05, 3.791e-05, 5.641e-05, 8.368e-05, 0.0001237,
    0.0001823, 0.0002677, 0.0003915, 0.0005704, 0.0008275, 0.001195, 0.001718, 0.002457,
    0.003494, 0.004942, 0.006948, 0.009702, 0.01346, 0.01853, 0.02532, 0.03431, 0.04607,
    0.06128, 0.08068, 0.1051, 0.1352, 0.1719, 0.2157, 0.2669, 0.3254, 0.3906, 0.4612, 0.5355,
    0.6110, 0.6849, 0.7544, 0.8168, 0.8699, 0.9127, 0.9451, 0.9679, 0.9827, 0.9915, 0.9963,
];

/// Romberg integration of `f` over [p, q]. At least `min_iter` refinements
/// are made and `eps_iter` consecutive ones must agree to within relative
/// `eps`. Returns infinity if that never happens.
fn romberg<F>(f: &mut F, p: f64, q: f64, eps: f64, eps_iter: usize, min_iter: usize) -> f64
where
    F: FnMut(f64) -> f64,
{
    const MAX_DIAGS: usize = 20;
    let min_iter = min_iter.clamp(1, MAX_DIAGS - 1);
    let eps_iter = eps_iter.clamp(1, 3);

    let mut romb = [0.0_f64; MAX_DIAGS];
    let mut h = q - p;
    let mut npts = 1usize;

    let (fp, fq) = (f(p), f(q));
    if !fp.is_finite() {
        return fp;
    }
    if !fq.is_finite() {
        return fq;
    }
    romb[0] = 0.5 * h * (fp + fq);

    let mut agreeing = 0;
    for i in 1..MAX_DIAGS {
        let mut sum = 0.0;
        let mut x = p + 0.5 * h;
        for _ in 0..npts {
            let y = f(x);
            if !y.is_finite() {
                return y;
            }
            sum += y;
            x += h;
        }
        romb[i] = 0.5 * (romb[i - 1] + h * sum);

        let mut n = 4.0;
        for j in (0..i).rev() {
            romb[j] = (n * romb[j + 1] - romb[j]) / (n - 1.0);
            n *= 4.0;
        }

        if i + eps_iter > min_iter {
            if (romb[1] - romb[0]).abs() > eps * romb[0].abs() {
                agreeing = 0;
            } else {
                agreeing += 1;
                if i >= min_iter && agreeing >= eps_iter {
                    return romb[0];
                }
            }
        }

        npts *= 2;
        h *= 0.5;
    }
    f64::INFINITY
}

/// P-value of `r > 1` HSPs reaching adjusted sum `s`, by integration
fn sum_p_integrated(r: usize, s: f64) -> f64 {
    const EPSILON: f64 = 0.002;
    let rf = r as f64;

    let hopeless_below = match r {
        0..=7 => Some(-2.3),
        8..=14 => Some(-2.5),
        15..=26 => Some(-3.0),
        27..=50 => Some(-3.4),
        51..=100 => Some(-4.0),
        _ => None,
    };
    if let Some(factor) = hopeless_below {
        if s <= factor * rf {
            return 1.0;
        }
    }

    let stddev4 = 4.0 * rf.sqrt();
    if r > 100 && s <= -rf * (rf - 1.0) - stddev4 {
        return 1.0;
    }

    let log_r = rf.ln();
    let mean = rf * (1.0 - log_r) - 0.5;
    if s <= mean - stddev4 {
        return 1.0;
    }

    let (upper, mut min_iter) = if s >= mean {
        (s + 1.5 * stddev4, 1)
    } else {
        (mean + 1.5 * stddev4, 2)
    };

    let adj1 = (rf - 2.0) * log_r - ln_factorial(r - 2) - ln_factorial(r - 1);
    let power = (r - 2) as f64;

    let mut inner = |s_var: f64| {
        let adj2 = adj1 - s_var;
        let sdvir = s_var / rf;
        let upper_x = if s_var > 0.0 { sdvir + 3.0 } else { 3.0 };
        let mut outer = |x: f64| {
            let y = (x - sdvir).exp();
            if !y.is_finite() {
                0.0
            } else if r == 2 {
                (adj2 - y).exp()
            } else if x == 0.0 {
                0.0
            } else {
                (power * x.ln() + adj2 - y).exp()
            }
        };
        romberg(&mut outer, 0.0, upper_x, EPSILON, 0, 1)
    };

    loop {
        let d = romberg(&mut inner, s, upper, EPSILON, 0, min_iter);
        if !d.is_finite() {
            return d;
        }
        if !(s < mean && d < 0.4 && min_iter < 4) {
            return d.min(1.0);
        }
        min_iter += 1;
    }
}

/// P-value of `r` HSPs reaching adjusted sum `s`
pub fn sum_p(r: usize, s: f64) -> f64 {
    match r {
        0 => 0.0,
        1 => -(-(-s).exp()).exp_m1(),
        2..=4 => {
            let rf = r as f64;
            if s >= rf * rf + rf - 1.0 {
                let a = ln_factorial(r);
                return rf * ((rf - 1.0) * s.ln() - s - a - a).exp();
            }
            if s > -2.0 * rf {
                let table = [SUM_P_2, SUM_P_3, SUM_P_4][r - 2];
                let mut a = s + s + 4.0 * rf;
                let steps = a as usize;
                a -= steps as f64;
                if let Some(idx) = (table.len() - 1).checked_sub(steps) {
                    if idx > 0 {
                        return a * table[idx - 1] + (1.0 - a) * table[idx];
                    }
                }
            }
            1.0
        }
        _ => sum_p_integrated(r, s),
    }
}

fn weighted(sum_e: f64, weight_divisor: f64) -> f64 {
    if weight_divisor == 0.0 {
        return SUM_E_MAX;
    }
    (sum_e / weight_divisor).min(SUM_E_MAX)
}

/// Scale a set's P-value from the pair's search space to the effective one
fn scaled_e(space: &PairSpace, num: usize, adjusted_xsum: f64) -> f64 {
    p_to_e(sum_p(num, adjusted_xsum)) * (space.search_space / space.pair_space())
}

/// E-value of `num` HSPs separated by small gaps; `starting_points` is the
/// number of start positions allowed between consecutive HSPs.
pub fn small_gap_sum_e(
    space: &PairSpace,
    starting_points: f64,
    num: usize,
    xsum: f64,
    weight_divisor: f64,
) -> f64 {
    let sum_e = if num <= 1 {
        space.search_space * (-xsum).exp()
    } else {
        let adjusted = xsum
            - space.pair_space().ln()
            - 2.0 * (num - 1) as f64 * starting_points.ln()
            - ln_factorial(num);
        scaled_e(space, num, adjusted)
    };
    weighted(sum_e, weight_divisor)
}

/// E-value of `num` HSPs with separately bounded query and subject gaps
pub fn uneven_gap_sum_e(
    space: &PairSpace,
    query_start_points: f64,
    subject_start_points: f64,
    num: usize,
    xsum: f64,
    weight_divisor: f64,
) -> f64 {
    let sum_e = if num <= 1 {
        space.search_space * (-xsum).exp()
    } else {
        let adjusted = xsum
            - space.pair_space().ln()
            - (num - 1) as f64 * (query_start_points.ln() + subject_start_points.ln())
            - ln_factorial(num);
        scaled_e(space, num, adjusted)
    };
    weighted(sum_e, weight_divisor)
}

/// E-value of `num` HSPs with unbounded gaps
pub fn large_gap_sum_e(space: &PairSpace, num: usize, xsum: f64, weight_divisor: f64) -> f64 {
    let sum_e = if num <= 1 {
        space.search_space * (-xsum).exp()
    } else {
        let adjusted = xsum - num as f64 * space.pair_space().ln() + ln_factorial(num);
        scaled_e(space, num, adjusted)
    };
    weighted(sum_e, weight_divisor)
}
