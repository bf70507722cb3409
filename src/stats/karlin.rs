use super::search_space::SearchSpace;
use super::tables::KarlinParams;

/// Bit score of a raw score: S' = (lambda * S - ln K) / ln 2
pub fn bit_score(raw_score: i32, params: &KarlinParams) -> f64 {
    (params.lambda * raw_score as f64 - params.log_k()) / std::f64::consts::LN_2
}

/// E-value from a bit score: E = m * n * 2^(-S') over the effective space
pub fn evalue(bit_score: f64, search_space: &SearchSpace) -> f64 {
    search_space.effective_space * 2.0_f64.powf(-bit_score)
}

/// Bit score and E-value of a raw score
pub fn calculate_statistics(
    raw_score: i32,
    params: &KarlinParams,
    search_space: &SearchSpace,
) -> (f64, f64) {
    let bs = bit_score(raw_score, params);
    (bs, evalue(bs, search_space))
}

/// Lowest raw score whose E-value does not exceed `e_value`:
/// S = ceil((ln K + ln(m n) - ln E) / lambda)
pub fn raw_score_from_evalue(
    e_value: f64,
    params: &KarlinParams,
    search_space: &SearchSpace,
) -> i32 {
    if e_value <= 0.0 {
        return i32::MAX;
    }
    let score = (params.log_k() + search_space.effective_space.ln() - e_value.ln()) / params.lambda;
    score.ceil() as i32
}

/// Raw score corresponding to a bit score, rounded up
pub fn raw_score_from_bit_score(bit_score: f64, params: &KarlinParams) -> i32 {
    ((bit_score * std::f64::consts::LN_2 + params.log_k()) / params.lambda).ceil() as i32
}
