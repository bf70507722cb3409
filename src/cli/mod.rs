//! Command-line driver: FASTA in, one tab-separated line per HSP out.

pub mod args;
pub mod run;

pub use args::SearchArgs;
pub use run::run;
