use clap::Args;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{LinkMode, SearchConfig};

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[arg(short, long)]
    pub query: PathBuf,
    #[arg(short, long)]
    pub subject: PathBuf,
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(short, long, default_value_t = 11)]
    pub word_size: usize,
    /// Two-hit window (0 = one-hit seeding)
    #[arg(long, default_value_t = 0)]
    pub two_hit_window: usize,
    #[arg(long, default_value_t = 1)]
    pub reward: i32,
    #[arg(long, default_value_t = -3, allow_hyphen_values = true)]
    pub penalty: i32,
    #[arg(long, default_value_t = 10.0)]
    pub evalue: f64,
    #[arg(long, default_value_t = 500)]
    pub hitlist_size: usize,
    #[arg(short = 'n', long, default_value_t = 0)]
    pub num_threads: usize,
    /// HSP linking: off, even or uneven
    #[arg(long, default_value = "even")]
    pub link: LinkMode,
    #[arg(long, default_value_t = 40)]
    pub link_gap_size: usize,
    #[arg(long, default_value_t = 9)]
    pub link_overlap: usize,
    /// Largest query gap between linked HSPs (uneven linking)
    #[arg(long, default_value_t = 40)]
    pub query_window: usize,
    /// Largest subject gap between linked HSPs (uneven linking)
    #[arg(long, default_value_t = 4000)]
    pub max_intron: usize,
    /// Only search the plus strand of the queries
    #[arg(long, default_value_t = false)]
    pub plus_only: bool,
    /// Run a cheap exploratory pass before scanning each subject in full
    #[arg(long, default_value_t = false)]
    pub prescreen: bool,
    /// Stop after this many seconds and report what was found
    #[arg(long)]
    pub timeout: Option<u64>,
    /// Log a heartbeat when no subject finished for this many seconds
    #[arg(long)]
    pub heartbeat: Option<u64>,
    /// Subjects longer than this are scanned in overlapping windows
    #[arg(long, default_value_t = 5_000_000)]
    pub max_subject_window: usize,
    #[arg(long, default_value_t = 100_000)]
    pub split_overlap: usize,
}

impl SearchArgs {
    pub fn to_config(&self) -> SearchConfig {
        let mut config = SearchConfig::default();
        config.seed.word_width = self.word_size;
        config.seed.two_hit_window = self.two_hit_window;
        config.seed.prescreen = self.prescreen;
        config.stats.evalue = self.evalue;
        config.hitlist_size = self.hitlist_size;
        config.linking.mode = self.link;
        config.linking.gap_size = self.link_gap_size;
        config.linking.overlap_size = self.link_overlap;
        config.linking.query_window = self.query_window;
        config.linking.max_intron = self.max_intron;
        config.engine.num_workers = self.num_threads;
        config.engine.timeout = self.timeout.map(Duration::from_secs);
        config.engine.heartbeat = self.heartbeat.map(Duration::from_secs);
        config.engine.max_subject_window = self.max_subject_window;
        config.engine.split_overlap = self.split_overlap;
        config
    }
}
