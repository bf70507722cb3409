//! Integer cutoffs derived from Karlin-Altschul statistics.
//!
//! Every query context gets a [`StatisticalContext`]: its parameters,
//! effective search space, the raw score needed to report, the score an
//! ungapped extension needs to be kept, the gap trigger and the X-drop
//! values converted from bits. Ungapped and gapped modes use different
//! parameters and therefore different effective lengths, so contexts are
//! built per mode.
//!
//! The linking cutoffs decide once per search whether the bounded-gap model
//! applies: it needs query and subject to be long compared to the linking
//! window, otherwise only the large-gap model is used.

use log::debug;

use crate::config::{LinkMode, LinkingConfig, NuclScoring, SearchConfig};
use crate::error::SearchError;
use crate::sequence::QuerySet;

use super::karlin::{raw_score_from_bit_score, raw_score_from_evalue};
use super::karlin_calc::ungapped_nucleotide_params;
use super::search_space::SearchSpace;
use super::tables::{gapped_nucleotide_params, KarlinParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsMode {
    Ungapped,
    Gapped,
}

/// Per-context statistics, fixed for the whole search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StatisticalContext {
    /// Parameters E-values are computed with in this mode
    pub params: KarlinParams,
    pub search_space: SearchSpace,
    /// Lowest raw score whose E-value reaches the reporting threshold
    pub report_cutoff: i32,
    /// Lowest score for which an ungapped extension is stored
    pub extension_cutoff: i32,
    /// Lowest (linked) score offered to the gapped aligner
    pub gap_trigger: i32,
    pub xdrop_ungapped: i32,
    pub xdrop_gapped: i32,
}

impl StatisticalContext {
    /// Effective subject length of a subject of `len` residues
    pub fn effective_subject_len(&self, len: usize) -> f64 {
        (len as f64 - self.search_space.length_adjustment as f64).max(1.0)
    }
}

/// Which linking model applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRegime {
    /// Both the small-gap and the large-gap model are evaluated
    BoundedGap,
    /// Sequences are too short for the small-gap model
    LargeGapOnly,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinkCutoffs {
    /// HSPs must score above this to enter a small-gap chain
    pub small_gap: i32,
    /// HSPs must score above this to enter a large-gap chain
    pub large_gap: i32,
    /// Prior of the small-gap model; 0 under [`LinkRegime::LargeGapOnly`]
    pub gap_prob: f64,
    pub regime: LinkRegime,
}

/// Linking strategy, chosen once at setup
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LinkStrategy {
    Disabled,
    EvenGap(LinkCutoffs),
    UnevenGap { query_window: usize, max_intron: usize },
}

/// Averages the linking cutoffs are computed from
#[derive(Debug, Clone, Copy)]
pub struct LinkInputs {
    pub avg_query_len: f64,
    pub avg_subject_len: f64,
    pub db_len: f64,
    /// Smallest extension cutoff over all contexts
    pub cutoff_score_min: i32,
}

/// Cutoffs deciding which HSPs may be linked and under which model.
/// `params` should be those of the context with the smallest lambda.
pub fn link_cutoffs(params: &KarlinParams, inputs: &LinkInputs, linking: &LinkingConfig) -> LinkCutoffs {
    const EPSILON: f64 = 1.0e-9;
    let window = linking.window() as f64;
    let decay = linking.gap_decay_rate;

    let expected_len = ((params.k * inputs.avg_query_len * inputs.avg_subject_len).ln() / params.h)
        .round()
        .max(0.0);
    let query_len = (inputs.avg_query_len - expected_len).max(1.0);
    let subject_len = (inputs.avg_subject_len - expected_len).max(1.0);

    let y = if inputs.db_len > subject_len {
        (inputs.db_len / subject_len).ln() * params.k / decay
    } else {
        ((subject_len + expected_len) / subject_len).ln() * params.k / decay
    };
    let search_sp = query_len * subject_len;
    let x = 0.25 * y * search_sp;
    let to_cutoff = |x: f64| (x.ln() / params.lambda).floor() as i32 + 1;

    if search_sp > 8.0 * window * window {
        let gap_prob = linking.gap_prob;
        let large_gap = to_cutoff(x / (1.0 - gap_prob + EPSILON));
        let small_gap = to_cutoff(y * window * window / (gap_prob + EPSILON)).max(inputs.cutoff_score_min);
        LinkCutoffs {
            small_gap,
            large_gap,
            gap_prob,
            regime: LinkRegime::BoundedGap,
        }
    } else {
        LinkCutoffs {
            small_gap: 0,
            large_gap: to_cutoff(x),
            gap_prob: 0.0,
            regime: LinkRegime::LargeGapOnly,
        }
    }
}

/// Converts statistical parameters and configuration into cutoffs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CutoffCalculator {
    ungapped: KarlinParams,
    gapped: Option<KarlinParams>,
    round_down: bool,
}

impl CutoffCalculator {
    /// Parameters supplied by the caller, e.g. for a position-specific
    /// scorer. `round_down` forces scores to even values before statistics.
    pub fn new(
        ungapped: KarlinParams,
        gapped: Option<KarlinParams>,
        round_down: bool,
    ) -> Result<Self, SearchError> {
        if !ungapped.is_valid() || gapped.map_or(false, |g| !g.is_valid()) {
            return Err(SearchError::Statistics(
                "lambda, K and H must be positive".to_string(),
            ));
        }
        Ok(Self {
            ungapped,
            gapped,
            round_down,
        })
    }

    /// Parameters of a reward/penalty scheme. Gapped parameters are only
    /// looked up when `gapped` is set.
    pub fn nucleotide(scoring: &NuclScoring, gapped: bool) -> Result<Self, SearchError> {
        let ungapped = ungapped_nucleotide_params(scoring)?;
        let gapped = if gapped {
            Some(gapped_nucleotide_params(scoring)?)
        } else {
            None
        };
        Self::new(ungapped, gapped, scoring.requires_even_scores())
    }

    pub fn ungapped_params(&self) -> &KarlinParams {
        &self.ungapped
    }

    pub fn gapped_params(&self) -> Option<&KarlinParams> {
        self.gapped.as_ref()
    }

    /// Parameters E-values are computed with in `mode`
    pub fn params(&self, mode: StatsMode) -> Result<&KarlinParams, SearchError> {
        match mode {
            StatsMode::Ungapped => Ok(&self.ungapped),
            StatsMode::Gapped => self.gapped.as_ref().ok_or_else(|| {
                SearchError::Statistics("gapped statistics requested without gapped parameters".to_string())
            }),
        }
    }

    /// Even-score schemes round odd scores down
    #[inline]
    pub fn adjust_score(&self, score: i32) -> i32 {
        if self.round_down {
            score & !1
        } else {
            score
        }
    }

    fn xdrop(bits: f64, params: &KarlinParams) -> i32 {
        (bits * std::f64::consts::LN_2 / params.lambda).ceil() as i32
    }

    /// Cutoffs of one context of length `query_len` against the database
    pub fn compute_cutoffs(
        &self,
        mode: StatsMode,
        query_len: usize,
        db_len: usize,
        num_seqs: usize,
        config: &SearchConfig,
    ) -> Result<StatisticalContext, SearchError> {
        let params = *self.params(mode)?;
        let search_space = SearchSpace::for_database_search(
            query_len,
            db_len,
            num_seqs,
            &params,
            config.stats.use_length_adjustment,
        );
        let report_cutoff = raw_score_from_evalue(config.stats.evalue, &params, &search_space).max(1);
        let gap_trigger = raw_score_from_bit_score(config.extension.gap_trigger_bits, &self.ungapped).max(1);
        let extension_cutoff = report_cutoff.min(gap_trigger).max(1);

        let gapped_lambda = self.gapped.as_ref().unwrap_or(&self.ungapped);
        Ok(StatisticalContext {
            params,
            search_space,
            report_cutoff,
            extension_cutoff,
            gap_trigger,
            xdrop_ungapped: Self::xdrop(config.extension.xdrop_ungapped_bits, &self.ungapped),
            xdrop_gapped: Self::xdrop(config.extension.xdrop_gapped_bits, gapped_lambda),
        })
    }

    /// One [`StatisticalContext`] per query context
    pub fn build_contexts(
        &self,
        mode: StatsMode,
        queries: &QuerySet,
        db_len: usize,
        num_seqs: usize,
        config: &SearchConfig,
    ) -> Result<Vec<StatisticalContext>, SearchError> {
        queries
            .contexts()
            .iter()
            .map(|ctx| {
                let stats = self.compute_cutoffs(mode, ctx.len(), db_len, num_seqs, config)?;
                debug!(
                    "context {} ({:?}): len {}, adj {}, space {:.3e}, report {}, extension {}, xdrop {}",
                    ctx.index,
                    mode,
                    ctx.len(),
                    stats.search_space.length_adjustment,
                    stats.search_space.effective_space,
                    stats.report_cutoff,
                    stats.extension_cutoff,
                    stats.xdrop_ungapped
                );
                Ok(stats)
            })
            .collect()
    }

    /// Decide the linking strategy for the whole search
    pub fn link_strategy(
        &self,
        contexts: &[StatisticalContext],
        queries: &QuerySet,
        db_len: usize,
        num_seqs: usize,
        linking: &LinkingConfig,
    ) -> LinkStrategy {
        match linking.mode {
            LinkMode::Off => LinkStrategy::Disabled,
            LinkMode::UnevenGap => LinkStrategy::UnevenGap {
                query_window: linking.query_window,
                max_intron: linking.max_intron,
            },
            LinkMode::EvenGap => {
                let params = contexts
                    .iter()
                    .map(|c| c.params)
                    .filter(|p| p.lambda > 0.0)
                    .min_by(|a, b| a.lambda.total_cmp(&b.lambda))
                    .unwrap_or(self.ungapped);
                let total_query: usize = queries.contexts().iter().map(|c| c.len()).sum();
                let inputs = LinkInputs {
                    avg_query_len: total_query as f64 / queries.len().max(1) as f64,
                    avg_subject_len: db_len as f64 / num_seqs.max(1) as f64,
                    db_len: db_len as f64,
                    cutoff_score_min: contexts.iter().map(|c| c.extension_cutoff).min().unwrap_or(1),
                };
                let cutoffs = link_cutoffs(&params, &inputs, linking);
                debug!(
                    "linking regime {:?}: small-gap cutoff {}, large-gap cutoff {}, gap prob {}",
                    cutoffs.regime, cutoffs.small_gap, cutoffs.large_gap, cutoffs.gap_prob
                );
                LinkStrategy::EvenGap(cutoffs)
            }
        }
    }
}
