//! Greedy linking with intron-sized subject gaps.
//!
//! HSPs are taken in order of normalized score. Each unlinked HSP starts a
//! chain, which repeatedly absorbs the one compatible unlinked neighbour
//! (before its head or after its tail) that lowers the chain's E-value the
//! most. Query gaps are bounded by the query window and subject gaps by the
//! maximum intron length.

use std::collections::VecDeque;

use super::{compatible, finalize_chain, finalize_single, pair_space, xscore, LinkSummary};
use crate::config::LinkingConfig;
use crate::hsp::{score_compare_hsps, Hsp, LinkOrdering};
use crate::stats::sum_statistics::{gap_decay_divisor, uneven_gap_sum_e};
use crate::stats::StatisticalContext;

pub(crate) fn link_group(
    hsps: &mut [Hsp],
    group: &[usize],
    ctx: &StatisticalContext,
    subject_len: usize,
    query_window: usize,
    max_intron: usize,
    config: &LinkingConfig,
) -> LinkSummary {
    let space = pair_space(ctx, subject_len);
    let xscores: Vec<f64> = group.iter().map(|&i| xscore(&hsps[i], ctx)).collect();

    let mut order: Vec<usize> = (0..group.len()).collect();
    order.sort_by(|&a, &b| {
        xscores[b]
            .total_cmp(&xscores[a])
            .then_with(|| score_compare_hsps(&hsps[group[a]], &hsps[group[b]]))
    });

    let fits = |prev: &Hsp, next: &Hsp| {
        compatible(prev, next, config.overlap_size, Some(query_window), Some(max_intron))
    };

    let mut used = vec![false; group.len()];
    let mut summary = LinkSummary::default();

    for &start in &order {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut chain: VecDeque<usize> = VecDeque::from([start]);
        let mut xsum = xscores[start];
        let mut evalue = hsps[group[start]].evalue;

        loop {
            let (Some(&head), Some(&tail)) = (chain.front(), chain.back()) else {
                break;
            };
            let mut best: Option<(usize, bool, f64)> = None;
            for &cand in &order {
                if used[cand] {
                    continue;
                }
                let c = &hsps[group[cand]];
                let append = fits(&hsps[group[tail]], c);
                let prepend = !append && fits(c, &hsps[group[head]]);
                if !(append || prepend) {
                    continue;
                }
                let num = chain.len() + 1;
                let e = uneven_gap_sum_e(
                    &space,
                    query_window as f64,
                    max_intron as f64,
                    num,
                    xsum + xscores[cand],
                    gap_decay_divisor(config.gap_decay_rate, num),
                );
                if e < evalue && best.map_or(true, |(_, _, be)| e < be) {
                    best = Some((cand, prepend, e));
                }
            }
            let Some((cand, prepend, e)) = best else {
                break;
            };
            used[cand] = true;
            if prepend {
                chain.push_front(cand);
            } else {
                chain.push_back(cand);
            }
            xsum += xscores[cand];
            evalue = e;
        }

        if chain.len() > 1 {
            let members: Vec<usize> = chain.iter().map(|&m| group[m]).collect();
            finalize_chain(hsps, &members, LinkOrdering::UnevenGap, xsum, evalue);
            summary.chains += 1;
            summary.linked_hsps += members.len();
        } else {
            finalize_single(hsps, group[start], xsum);
        }
    }
    summary
}
