pub mod config;
pub mod error;
pub mod sequence;
pub mod utils;

pub mod lookup;
pub mod seed;
pub mod extension;
pub mod stats;
pub mod hsp;
pub mod link;
pub mod ranker;
pub mod engine;

pub mod cli;

pub use config::{NuclScoring, SearchConfig};
pub use engine::{CancelToken, ProgressSink, SearchCoordinator, SearchInputs, SearchOutcome, SearchStats};
pub use error::{SearchError, SearchWarning};
pub use ranker::{ResultHitlist, ResultRanker};
