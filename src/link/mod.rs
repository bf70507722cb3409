//! Sum-statistics linking of the HSPs of one subject.
//!
//! HSPs are grouped by query context and subject strand; only members of the
//! same group may be linked. Each group is linked with the strategy chosen at
//! setup. Every HSP leaves linking finalized: chain members share the
//! chain's E-value and an HSP that ends up alone keeps its individual
//! E-value.

pub mod even_gap;
pub mod uneven_gap;

use log::trace;

use crate::config::LinkingConfig;
use crate::hsp::{Hsp, LinkInfo, LinkOrdering};
use crate::stats::sum_statistics::{normalize_score, PairSpace};
use crate::stats::{LinkStrategy, StatisticalContext};

/// Counts reported by one linking pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkSummary {
    /// Chains of two or more HSPs
    pub chains: usize,
    /// HSPs that belong to such a chain
    pub linked_hsps: usize,
}

impl LinkSummary {
    fn add(&mut self, other: LinkSummary) {
        self.chains += other.chains;
        self.linked_hsps += other.linked_hsps;
    }
}

/// `next` may follow `prev` in a chain: it starts strictly after `prev` and
/// ends after it on both sequences, `prev` ends no more than `overlap` past
/// the start of `next`, and the gaps between them respect the given bounds.
pub fn compatible(
    prev: &Hsp,
    next: &Hsp,
    overlap: usize,
    max_query_gap: Option<usize>,
    max_subject_gap: Option<usize>,
) -> bool {
    if prev.context != next.context || prev.s_frame.signum() != next.s_frame.signum() {
        return false;
    }
    let ordered = next.q_start > prev.q_start
        && next.s_start > prev.s_start
        && next.q_end > prev.q_end
        && next.s_end > prev.s_end;
    let overlap_ok = prev.q_end <= next.q_start + overlap && prev.s_end <= next.s_start + overlap;
    let q_gap = next.q_start.saturating_sub(prev.q_end);
    let s_gap = next.s_start.saturating_sub(prev.s_end);
    ordered
        && overlap_ok
        && max_query_gap.map_or(true, |max| q_gap <= max)
        && max_subject_gap.map_or(true, |max| s_gap <= max)
}

/// Lengths and search space a group is evaluated against
pub(crate) fn pair_space(ctx: &StatisticalContext, subject_len: usize) -> PairSpace {
    PairSpace {
        query_len: ctx.search_space.effective_query_len,
        subject_len: ctx.effective_subject_len(subject_len),
        search_space: ctx.search_space.effective_space,
    }
}

#[inline]
pub(crate) fn xscore(hsp: &Hsp, ctx: &StatisticalContext) -> f64 {
    normalize_score(hsp.score, ctx.params.lambda, ctx.params.log_k())
}

/// Record `members` (head first) as one finalized chain
pub(crate) fn finalize_chain(
    hsps: &mut [Hsp],
    members: &[usize],
    ordering: LinkOrdering,
    xsum: f64,
    evalue: f64,
) {
    let Some(&head) = members.first() else {
        return;
    };
    for (pos, &idx) in members.iter().enumerate() {
        hsps[idx].link = LinkInfo {
            ordering,
            num: members.len(),
            xsum,
            evalue: Some(evalue),
            prev: pos.checked_sub(1).map(|p| members[p]),
            next: members.get(pos + 1).copied(),
            head: pos == 0,
            chain: Some(head),
        };
    }
}

/// Record `idx` as a chain of its own with its individual E-value
pub(crate) fn finalize_single(hsps: &mut [Hsp], idx: usize, xsum: f64) {
    let evalue = hsps[idx].evalue;
    finalize_chain(hsps, &[idx], LinkOrdering::None, xsum, evalue);
}

/// Applies the linking strategy chosen at setup
#[derive(Debug, Clone, Copy)]
pub struct HspLinker {
    strategy: LinkStrategy,
    config: LinkingConfig,
}

impl HspLinker {
    pub fn new(strategy: LinkStrategy, config: LinkingConfig) -> Self {
        Self { strategy, config }
    }

    pub fn strategy(&self) -> &LinkStrategy {
        &self.strategy
    }

    /// Link the HSPs of one subject of length `subject_len`. Individual
    /// E-values must already be set. Chain indices refer to positions in
    /// `hsps`.
    pub fn link(
        &self,
        hsps: &mut [Hsp],
        contexts: &[StatisticalContext],
        subject_len: usize,
    ) -> LinkSummary {
        let mut summary = LinkSummary::default();
        for group in strand_groups(hsps) {
            let ctx = &contexts[hsps[group[0]].context];
            let linked = match self.strategy {
                LinkStrategy::Disabled => {
                    for &idx in &group {
                        let xs = xscore(&hsps[idx], ctx);
                        finalize_single(hsps, idx, xs);
                    }
                    LinkSummary::default()
                }
                LinkStrategy::EvenGap(cutoffs) => {
                    even_gap::link_group(hsps, &group, ctx, subject_len, &cutoffs, &self.config)
                }
                LinkStrategy::UnevenGap {
                    query_window,
                    max_intron,
                } => uneven_gap::link_group(
                    hsps,
                    &group,
                    ctx,
                    subject_len,
                    query_window,
                    max_intron,
                    &self.config,
                ),
            };
            summary.add(linked);
        }
        trace!(
            "linked {} HSPs into {} chains",
            summary.linked_hsps,
            summary.chains
        );
        summary
    }
}

/// Indices of `hsps` grouped by (context, subject strand), groups in
/// ascending key order
fn strand_groups(hsps: &[Hsp]) -> Vec<Vec<usize>> {
    let mut order: Vec<usize> = (0..hsps.len()).collect();
    order.sort_by_key(|&i| (hsps[i].context, hsps[i].s_frame.signum()));
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut last_key = None;
    for idx in order {
        let key = (hsps[idx].context, hsps[idx].s_frame.signum());
        if last_key != Some(key) {
            groups.push(Vec::new());
            last_key = Some(key);
        }
        if let Some(group) = groups.last_mut() {
            group.push(idx);
        }
    }
    groups
}
