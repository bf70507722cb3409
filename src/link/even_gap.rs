//! Even-gap linking.
//!
//! HSPs of a group are sorted by descending query offset, and chains are
//! found by a longest-path pass over that order under two orderings at once:
//! the small-gap model (successor within `window` of the trimmed end on both
//! sequences) and the large-gap model (any later successor). Each round the
//! better of the two best chains by sum E-value is finalized and removed,
//! and the pass is repeated only if the next best chain used a removed HSP.
//!
//! HSP ends are trimmed by `min(trim, len / 4)` before the window test, so
//! neighbours may overlap slightly. A chain is only accepted when its
//! E-value is no worse than the best individual E-value among its members;
//! otherwise that member is finalized alone.

use std::cmp::Ordering;

use log::trace;

use super::{finalize_chain, finalize_single, pair_space, xscore, LinkSummary};
use crate::config::LinkingConfig;
use crate::hsp::{Hsp, LinkOrdering};
use crate::stats::sum_statistics::{gap_decay_divisor, large_gap_sum_e, small_gap_sum_e};
use crate::stats::{LinkCutoffs, LinkRegime, StatisticalContext};

const SMALL_GAP: usize = 0;
const LARGE_GAP: usize = 1;

/// Largest E-value a chain can be assigned
const MAX_CHAIN_E: f64 = i32::MAX as f64;

#[derive(Debug, Clone)]
struct LinkNode {
    /// Position in the subject's HSP array
    hsp: usize,
    score: i32,
    q_start: usize,
    q_end: usize,
    s_start: usize,
    s_end: usize,
    q_off_trim: usize,
    s_off_trim: usize,
    q_end_trim: usize,
    s_end_trim: usize,
    xscore: f64,
    sum: [i32; 2],
    xsum: [f64; 2],
    num: [usize; 2],
    /// Successor in the best chain starting here, per ordering
    link: [Option<usize>; 2],
    removed: bool,
}

impl LinkNode {
    fn new(hsp_idx: usize, hsp: &Hsp, xscore: f64, trim: usize) -> Self {
        let qt = trim.min(hsp.q_len() / 4);
        let st = trim.min(hsp.s_len() / 4);
        Self {
            hsp: hsp_idx,
            score: hsp.score,
            q_start: hsp.q_start,
            q_end: hsp.q_end,
            s_start: hsp.s_start,
            s_end: hsp.s_end,
            q_off_trim: hsp.q_start + qt,
            s_off_trim: hsp.s_start + st,
            q_end_trim: hsp.q_end - qt,
            s_end_trim: hsp.s_end - st,
            xscore,
            sum: [0, 0],
            xsum: [xscore, xscore],
            num: [1, 1],
            link: [None, None],
            removed: false,
        }
    }

    /// `next` starts and ends after `self` on both sequences
    #[inline]
    fn precedes(&self, next: &LinkNode) -> bool {
        next.q_start > self.q_start
            && next.s_start > self.s_start
            && next.q_end > self.q_end
            && next.s_end > self.s_end
    }
}

/// Large-gap pass helper: `next_larger` is the nearest earlier entry with a
/// strictly larger sum, so runs of smaller sums are skipped in one step.
#[derive(Debug, Clone, Copy)]
struct Helper {
    node: usize,
    sum: i32,
    next_larger: Option<usize>,
}

struct GroupLinker<'a> {
    nodes: Vec<LinkNode>,
    /// Indices of unfinalized nodes, in sorted order
    active: Vec<usize>,
    cutoffs: &'a LinkCutoffs,
    window: usize,
    trim: usize,
    use_small: bool,
}

impl<'a> GroupLinker<'a> {
    fn run_dp(&mut self) {
        let mut helpers: Vec<Helper> = Vec::with_capacity(self.active.len());
        for pos in 0..self.active.len() {
            let i = self.active[pos];
            if self.use_small {
                self.small_gap_step(pos, i);
            }
            let new_sum = self.large_gap_step(&helpers, pos, i);

            let mut prev = pos.checked_sub(1);
            while let Some(p) = prev {
                if helpers[p].sum > new_sum {
                    break;
                }
                prev = helpers[p].next_larger;
            }
            helpers.push(Helper {
                node: i,
                sum: new_sum,
                next_larger: prev,
            });
        }
    }

    fn small_gap_step(&mut self, pos: usize, i: usize) {
        let cutoff = self.cutoffs.small_gap;
        let (mut h_sum, mut h_xsum, mut h_num, mut h_link) = (0, 0.0, 0, None);
        if self.nodes[i].score > cutoff {
            let h = &self.nodes[i];
            let q_gap_end = h.q_end_trim + self.window;
            let s_gap_end = h.s_end_trim + self.window;
            for &j in self.active[..pos].iter().rev() {
                let cand = &self.nodes[j];
                if cand.q_off_trim > q_gap_end + self.trim {
                    break;
                }
                if cand.q_off_trim <= h.q_end_trim
                    || cand.s_off_trim <= h.s_end_trim
                    || cand.q_off_trim > q_gap_end
                    || cand.s_off_trim > s_gap_end
                    || !h.precedes(cand)
                {
                    continue;
                }
                if cand.sum[SMALL_GAP] > h_sum {
                    h_sum = cand.sum[SMALL_GAP];
                    h_xsum = cand.xsum[SMALL_GAP];
                    h_num = cand.num[SMALL_GAP];
                    h_link = Some(j);
                }
            }
        }
        let node = &mut self.nodes[i];
        node.sum[SMALL_GAP] = h_sum + node.score - cutoff;
        node.xsum[SMALL_GAP] = h_xsum + node.xscore;
        node.num[SMALL_GAP] = h_num + 1;
        node.link[SMALL_GAP] = h_link;
    }

    fn large_gap_step(&mut self, helpers: &[Helper], pos: usize, i: usize) -> i32 {
        let cutoff = self.cutoffs.large_gap;
        let (mut h_sum, mut h_xsum, mut h_num, mut h_link) = (0, 0.0, 0, None);
        if self.nodes[i].score > cutoff {
            let h = &self.nodes[i];
            let mut cursor = pos.checked_sub(1);
            while let Some(p) = cursor {
                let helper = helpers[p];
                let too_small = helper.sum <= h_sum;
                cursor = if too_small {
                    helper.next_larger
                } else {
                    p.checked_sub(1)
                };
                if too_small {
                    continue;
                }
                let cand = &self.nodes[helper.node];
                if cand.q_off_trim > h.q_end_trim && cand.s_off_trim > h.s_end_trim && h.precedes(cand) {
                    h_sum = cand.sum[LARGE_GAP];
                    h_xsum = cand.xsum[LARGE_GAP];
                    h_num = cand.num[LARGE_GAP];
                    h_link = Some(helper.node);
                }
            }
        }
        let node = &mut self.nodes[i];
        node.sum[LARGE_GAP] = h_sum + node.score - cutoff;
        node.xsum[LARGE_GAP] = h_xsum + node.xscore;
        node.num[LARGE_GAP] = h_num + 1;
        node.link[LARGE_GAP] = h_link;
        node.sum[LARGE_GAP]
    }

    /// Raw score of the chain starting at `node` under `ordering`
    fn chain_score(&self, node: &LinkNode, ordering: usize) -> i32 {
        let cutoff = if ordering == SMALL_GAP {
            self.cutoffs.small_gap
        } else {
            self.cutoffs.large_gap
        };
        node.sum[ordering] + cutoff * node.num[ordering] as i32
    }

    /// Head of the best chain per ordering. Equal sums go to the chain with
    /// the higher raw score, then to the later node in active order.
    fn best_heads(&self) -> [Option<usize>; 2] {
        let mut best: [Option<usize>; 2] = [None, None];
        let mut best_sum = [-self.cutoffs.small_gap, -self.cutoffs.large_gap];
        for &i in &self.active {
            let node = &self.nodes[i];
            for k in [SMALL_GAP, LARGE_GAP] {
                if k == SMALL_GAP && !self.use_small {
                    continue;
                }
                let better = match node.sum[k].cmp(&best_sum[k]) {
                    Ordering::Greater => true,
                    Ordering::Less => false,
                    Ordering::Equal => best[k].map_or(true, |b| {
                        self.chain_score(node, k) >= self.chain_score(&self.nodes[b], k)
                    }),
                };
                if better {
                    best_sum[k] = node.sum[k];
                    best[k] = Some(i);
                }
            }
        }
        best
    }

    fn chain(&self, head: usize, ordering: usize) -> Vec<usize> {
        let mut members = vec![head];
        let mut cur = head;
        while let Some(next) = self.nodes[cur].link[ordering] {
            members.push(next);
            cur = next;
        }
        members
    }

    fn chain_intact(&self, head: Option<usize>, ordering: usize) -> bool {
        head.map_or(true, |h| self.chain(h, ordering).iter().all(|&n| !self.nodes[n].removed))
    }

    fn remove(&mut self, members: &[usize]) {
        for &n in members {
            self.nodes[n].removed = true;
        }
        let nodes = &self.nodes;
        self.active.retain(|&i| !nodes[i].removed);
    }
}

fn scale_by_prior(evalue: f64, prior: f64) -> f64 {
    if prior == 0.0 || evalue / prior > MAX_CHAIN_E {
        MAX_CHAIN_E
    } else {
        evalue / prior
    }
}

/// Link one (context, subject strand) group. `group` holds positions in
/// `hsps`; every one of them is finalized on return.
pub(crate) fn link_group(
    hsps: &mut [Hsp],
    group: &[usize],
    ctx: &StatisticalContext,
    subject_len: usize,
    cutoffs: &LinkCutoffs,
    config: &LinkingConfig,
) -> LinkSummary {
    let trim = config.trim();
    let mut nodes: Vec<LinkNode> = group
        .iter()
        .map(|&idx| LinkNode::new(idx, &hsps[idx], xscore(&hsps[idx], ctx), trim))
        .collect();
    nodes.sort_by(|a, b| {
        b.q_start
            .cmp(&a.q_start)
            .then(b.q_end.cmp(&a.q_end))
            .then(b.s_start.cmp(&a.s_start))
            .then(b.s_end.cmp(&a.s_end))
            .then(a.hsp.cmp(&b.hsp))
    });

    let mut linker = GroupLinker {
        active: (0..nodes.len()).collect(),
        nodes,
        cutoffs,
        window: config.window(),
        trim,
        use_small: cutoffs.regime == LinkRegime::BoundedGap,
    };
    let space = pair_space(ctx, subject_len);
    let decay = config.gap_decay_rate;
    let mut summary = LinkSummary::default();
    let mut first_pass = true;

    while !linker.active.is_empty() {
        let mut best = linker.best_heads();
        if first_pass
            || !linker.chain_intact(best[SMALL_GAP], SMALL_GAP)
            || !linker.chain_intact(best[LARGE_GAP], LARGE_GAP)
        {
            linker.run_dp();
            best = linker.best_heads();
            first_pass = false;
        }

        let mut prob = [f64::MAX, f64::MAX];
        if let Some(b) = best[SMALL_GAP] {
            let node = &linker.nodes[b];
            let num = node.num[SMALL_GAP];
            prob[SMALL_GAP] = small_gap_sum_e(
                &space,
                linker.window as f64,
                num,
                node.xsum[SMALL_GAP],
                gap_decay_divisor(decay, num),
            );
            if num > 1 {
                prob[SMALL_GAP] = scale_by_prior(prob[SMALL_GAP], cutoffs.gap_prob);
            }
        }
        if let Some(b) = best[LARGE_GAP] {
            let node = &linker.nodes[b];
            let num = node.num[LARGE_GAP];
            prob[LARGE_GAP] = large_gap_sum_e(
                &space,
                num,
                node.xsum[LARGE_GAP],
                gap_decay_divisor(decay, num),
            );
            if num > 1 {
                prob[LARGE_GAP] = scale_by_prior(prob[LARGE_GAP], 1.0 - cutoffs.gap_prob);
            }
        }

        let ordering = if linker.use_small && best[SMALL_GAP].is_some() && prob[SMALL_GAP] <= prob[LARGE_GAP] {
            SMALL_GAP
        } else {
            LARGE_GAP
        };
        let Some(head) = best[ordering].or(best[1 - ordering]) else {
            break;
        };
        let members = linker.chain(head, ordering);
        let evalue = prob[ordering];

        if members.len() == 1 {
            let node = &linker.nodes[head];
            finalize_single(hsps, node.hsp, node.xscore);
            linker.remove(&members);
            continue;
        }

        let best_member = members
            .iter()
            .copied()
            .min_by(|&a, &b| {
                let (ha, hb) = (&hsps[linker.nodes[a].hsp], &hsps[linker.nodes[b].hsp]);
                ha.evalue
                    .total_cmp(&hb.evalue)
                    .then(hb.score.cmp(&ha.score))
            })
            .unwrap_or(head);
        let best_individual = hsps[linker.nodes[best_member].hsp].evalue;
        if evalue > best_individual {
            trace!(
                "chain of {} (E {:.3e}) is worse than its best member (E {:.3e})",
                members.len(),
                evalue,
                best_individual
            );
            let node = &linker.nodes[best_member];
            finalize_single(hsps, node.hsp, node.xscore);
            linker.remove(&[best_member]);
            continue;
        }

        let tag = if ordering == SMALL_GAP {
            LinkOrdering::SmallGap
        } else {
            LinkOrdering::LargeGap
        };
        let xsum = linker.nodes[head].xsum[ordering];
        let hsp_members: Vec<usize> = members.iter().map(|&n| linker.nodes[n].hsp).collect();
        finalize_chain(hsps, &hsp_members, tag, xsum, evalue);
        summary.chains += 1;
        summary.linked_hsps += members.len();
        linker.remove(&members);
    }
    summary
}
