//! Search configuration.
//!
//! Everything the core consumes is carried by [`SearchConfig`]; nothing in
//! the library parses arguments or files. Defaults follow BLASTN-style
//! nucleotide searching.

pub mod scoring;

pub use scoring::NuclScoring;

use std::time::Duration;

use crate::error::SearchError;

/// Seeding parameters
#[derive(Debug, Clone, Copy)]
pub struct SeedConfig {
    /// Word width W (symbols per seed)
    pub word_width: usize,
    /// Two-hit window (0 = one-hit seeding)
    pub two_hit_window: usize,
    /// Run an exploratory scan first and only rescan subjects that produced a hit
    pub prescreen: bool,
}

impl Default for SeedConfig {
    fn default() -> Self {
        Self {
            word_width: 11,
            two_hit_window: 0,
            prescreen: false,
        }
    }
}

/// X-drop and gap-trigger thresholds, in bits
#[derive(Debug, Clone, Copy)]
pub struct ExtensionConfig {
    /// Dropoff for ungapped extension of seeds
    pub xdrop_ungapped_bits: f64,
    /// Dropoff handed to the gapped aligner
    pub xdrop_gapped_bits: f64,
    /// Minimum score (bits) for an HSP or linked set to be sent to gapped refinement
    pub gap_trigger_bits: f64,
    /// Hand qualifying HSPs to the gapped aligner
    pub gapped: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            xdrop_ungapped_bits: 20.0,
            xdrop_gapped_bits: 30.0,
            gap_trigger_bits: 27.0,
            gapped: false,
        }
    }
}

/// Significance thresholds
#[derive(Debug, Clone, Copy)]
pub struct StatsConfig {
    /// E-value threshold for reporting
    pub evalue: f64,
    /// Apply the Karlin-Altschul length adjustment to effective lengths
    pub use_length_adjustment: bool,
    /// HSPs that stay outside a split overlap are dropped before merging when their
    /// preliminary E-value exceeds `evalue * split_relaxation`
    pub split_relaxation: f64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            evalue: 10.0,
            use_length_adjustment: true,
            split_relaxation: 100.0,
        }
    }
}

/// How HSPs of one subject are combined into linked sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// No linking: every HSP is judged on its own E-value
    Off,
    /// Even-gap linking; the bounded-gap model is enabled when lengths allow it
    #[default]
    EvenGap,
    /// Greedy linking that permits intron-like subject gaps
    UnevenGap,
}

impl std::str::FromStr for LinkMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(LinkMode::Off),
            "even" | "even-gap" => Ok(LinkMode::EvenGap),
            "uneven" | "uneven-gap" => Ok(LinkMode::UnevenGap),
            _ => Err(format!(
                "Unknown link mode: {}. Use 'off', 'even' or 'uneven'",
                s
            )),
        }
    }
}

/// Sum-statistics linking parameters
#[derive(Debug, Clone, Copy)]
pub struct LinkingConfig {
    pub mode: LinkMode,
    /// Largest gap between linked HSPs under the bounded-gap model
    pub gap_size: usize,
    /// Overlap tolerated between consecutive linked HSPs
    pub overlap_size: usize,
    /// Prior probability of the bounded-gap model
    pub gap_prob: f64,
    /// Decay rate penalising sets with many segments, in (0, 1)
    pub gap_decay_rate: f64,
    /// Query-side window for uneven-gap linking
    pub query_window: usize,
    /// Longest subject-side gap (intron) for uneven-gap linking
    pub max_intron: usize,
}

impl LinkingConfig {
    /// gap + overlap + 1
    pub fn window(&self) -> usize {
        self.gap_size + self.overlap_size + 1
    }

    /// Trim applied to both ends of an HSP before the window test
    pub fn trim(&self) -> usize {
        (self.overlap_size + 1) / 2
    }
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            mode: LinkMode::EvenGap,
            gap_size: 40,
            overlap_size: 9,
            gap_prob: 0.5,
            gap_decay_rate: 0.5,
            query_window: 40,
            max_intron: 4000,
        }
    }
}

/// Per-subject HSP storage limits
#[derive(Debug, Clone, Copy)]
pub struct StoreConfig {
    pub initial_capacity: usize,
    /// Multiplier applied when the store grows
    pub growth_factor: usize,
    /// Number of HSPs a store may hold for one subject
    pub hard_cap: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
            growth_factor: 2,
            hard_cap: 100_000,
        }
    }
}

/// How the database is cut into chunks handed to workers
#[derive(Debug, Clone, Copy)]
pub struct ChunkPolicy {
    /// Upper bound on subjects per chunk
    pub max_chunk: usize,
    /// Chunks each worker should receive on average
    pub chunks_per_worker: usize,
}

impl ChunkPolicy {
    /// Chunk size for a database of `num_subjects` shared by `workers` workers.
    /// Small databases get small chunks so that every worker stays busy.
    pub fn chunk_size(&self, num_subjects: usize, workers: usize) -> usize {
        let target = workers.max(1) * self.chunks_per_worker.max(1);
        (num_subjects / target).clamp(1, self.max_chunk.max(1))
    }
}

impl Default for ChunkPolicy {
    fn default() -> Self {
        Self {
            max_chunk: 1024,
            chunks_per_worker: 4,
        }
    }
}

/// Thread pool, progress and cancellation settings
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Worker threads (0 = number of logical CPUs)
    pub num_workers: usize,
    pub chunk: ChunkPolicy,
    /// Wall-clock limit; when exceeded the search returns what it has ranked so far
    pub timeout: Option<Duration>,
    /// Fire the progress callback every this many subjects
    pub progress_interval: usize,
    /// Emit a heartbeat when no progress tick happened for this long
    pub heartbeat: Option<Duration>,
    /// Subjects longer than this are scanned in overlapping windows
    pub max_subject_window: usize,
    /// Overlap between consecutive windows of a split subject
    pub split_overlap: usize,
}

impl EngineConfig {
    pub fn resolved_workers(&self) -> usize {
        if self.num_workers == 0 {
            num_cpus::get()
        } else {
            self.num_workers
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            num_workers: 0,
            chunk: ChunkPolicy::default(),
            timeout: None,
            progress_interval: 100,
            heartbeat: None,
            max_subject_window: 5_000_000,
            split_overlap: 100_000,
        }
    }
}

/// Full configuration surface of a search
#[derive(Debug, Clone, Copy)]
pub struct SearchConfig {
    pub seed: SeedConfig,
    pub extension: ExtensionConfig,
    pub stats: StatsConfig,
    pub linking: LinkingConfig,
    pub store: StoreConfig,
    pub engine: EngineConfig,
    /// Maximum number of subjects in the final result (K)
    pub hitlist_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            seed: SeedConfig::default(),
            extension: ExtensionConfig::default(),
            stats: StatsConfig::default(),
            linking: LinkingConfig::default(),
            store: StoreConfig::default(),
            engine: EngineConfig::default(),
            hitlist_size: 500,
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), SearchError> {
        let invalid = |msg: &str| Err(SearchError::InvalidConfig(msg.to_string()));

        if self.seed.word_width == 0 {
            return invalid("word width must be positive");
        }
        if self.seed.word_width > 32 {
            return invalid("word width above 32 does not fit the word index");
        }
        if self.seed.two_hit_window != 0 && self.seed.two_hit_window <= self.seed.word_width {
            return invalid("two-hit window must exceed the word width");
        }
        if self.hitlist_size == 0 {
            return invalid("hit list size must be positive");
        }
        if !(self.stats.evalue > 0.0) {
            return invalid("E-value threshold must be positive");
        }
        if self.stats.split_relaxation < 1.0 {
            return invalid("split relaxation factor must be at least 1");
        }
        if self.extension.xdrop_ungapped_bits <= 0.0 {
            return invalid("ungapped X-drop must be positive");
        }
        if !(self.linking.gap_decay_rate > 0.0 && self.linking.gap_decay_rate < 1.0) {
            return invalid("gap decay rate must lie in (0, 1)");
        }
        if !(0.0..1.0).contains(&self.linking.gap_prob) {
            return invalid("gap probability must lie in [0, 1)");
        }
        if self.store.growth_factor < 2 {
            return invalid("store growth factor must be at least 2");
        }
        if self.store.initial_capacity == 0 || self.store.hard_cap < self.store.initial_capacity {
            return invalid("store hard cap must be at least the initial capacity");
        }
        if self.engine.progress_interval == 0 {
            return invalid("progress interval must be positive");
        }
        if self.engine.split_overlap >= self.engine.max_subject_window {
            return invalid("split overlap must be shorter than the subject window");
        }
        if self.engine.split_overlap < self.seed.word_width {
            return invalid("split overlap must cover at least one word");
        }
        Ok(())
    }
}
