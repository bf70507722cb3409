//! Error and warning types.
//!
//! `SearchError` covers everything that aborts a search before the first
//! subject is scanned. Conditions that arise while workers are running are
//! never fatal; they are collected as `SearchWarning` values and returned
//! alongside the ranked hits.

use std::fmt;

use thiserror::Error;

/// Setup-phase failures. Returned synchronously by
/// [`SearchCoordinator::new`](crate::engine::SearchCoordinator::new).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchError {
    #[error("unsupported scoring scheme: reward {reward}, penalty {penalty}")]
    UnsupportedScoring { reward: i32, penalty: i32 },

    #[error("query context {context} has length {length}, shorter than word width {word_width}")]
    QueryTooShort {
        context: usize,
        length: usize,
        word_width: usize,
    },

    #[error("query set has no contexts")]
    EmptyQuery,

    #[error("statistical parameter computation failed: {0}")]
    Statistics(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Non-fatal conditions recorded while the search is running.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchWarning {
    /// The per-subject HSP store reached its hard cap; only the best-scoring
    /// HSPs were kept for this subject.
    CapacityExhausted { subject: String, cap: usize },
    /// Fewer worker threads than requested could be started.
    WorkerSpawn { requested: usize, granted: usize },
}

impl fmt::Display for SearchWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchWarning::CapacityExhausted { subject, cap } => write!(
                f,
                "HSP store for subject {} reached its cap of {} entries; keeping best-scoring HSPs",
                subject, cap
            ),
            SearchWarning::WorkerSpawn { requested, granted } => write!(
                f,
                "could only start {} of {} requested worker threads",
                granted, requested
            ),
        }
    }
}
