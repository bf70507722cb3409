use super::length_adjustment::compute_length_adjustment;
use super::tables::KarlinParams;

/// Effective search space with length-adjusted values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSpace {
    pub effective_query_len: f64,
    pub effective_db_len: f64,
    pub effective_space: f64,
    pub length_adjustment: i64,
}

impl SearchSpace {
    /// Search space of the nominal lengths
    pub fn simple(query_len: usize, db_len: usize) -> Self {
        let q = query_len as f64;
        let d = db_len as f64;
        Self {
            effective_query_len: q,
            effective_db_len: d,
            effective_space: q * d,
            length_adjustment: 0,
        }
    }

    /// Search space of one query context against a database of
    /// `num_sequences` subjects. The query loses the length adjustment once,
    /// the database once per sequence.
    pub fn for_database_search(
        query_len: usize,
        total_db_len: usize,
        num_sequences: usize,
        params: &KarlinParams,
        use_length_adjustment: bool,
    ) -> Self {
        if !use_length_adjustment {
            return Self::simple(query_len, total_db_len);
        }

        let adjustment = compute_length_adjustment(
            query_len as i64,
            total_db_len as i64,
            num_sequences as i64,
            params,
        );
        let ell = adjustment.length as f64;
        let effective_query_len = (query_len as f64 - ell).max(1.0);
        let effective_db_len = (total_db_len as f64 - ell * num_sequences.max(1) as f64).max(1.0);

        Self {
            effective_query_len,
            effective_db_len,
            effective_space: effective_query_len * effective_db_len,
            length_adjustment: adjustment.length,
        }
    }
}
