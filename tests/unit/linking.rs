//! Pairwise soundness of the linking strategies

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedlink::config::{LinkingConfig, NuclScoring, SearchConfig};
use seedlink::hsp::Hsp;
use seedlink::link::{compatible, HspLinker};
use seedlink::stats::{
    calculate_statistics, link_cutoffs, CutoffCalculator, LinkInputs, LinkStrategy, StatisticalContext,
    StatsMode,
};

use super::helpers::make_hsp;

const SUBJECT_LEN: usize = 10_000;

fn context() -> StatisticalContext {
    CutoffCalculator::nucleotide(&NuclScoring::new(1, -3), false)
        .and_then(|calc| {
            calc.compute_cutoffs(StatsMode::Ungapped, 1000, 1_000_000, 100, &SearchConfig::default())
        })
        .unwrap()
}

fn even_gap(ctx: &StatisticalContext, linking: &LinkingConfig) -> LinkStrategy {
    let inputs = LinkInputs {
        avg_query_len: 1000.0,
        avg_subject_len: SUBJECT_LEN as f64,
        db_len: 1_000_000.0,
        cutoff_score_min: ctx.extension_cutoff,
    };
    LinkStrategy::EvenGap(link_cutoffs(&ctx.params, &inputs, linking))
}

fn scored(ctx: &StatisticalContext, score: i32, q_start: usize, s_start: usize, len: usize) -> Hsp {
    let mut hsp = make_hsp(0, score, (q_start, q_start + len), (s_start, s_start + len));
    let (bits, evalue) = calculate_statistics(score, &ctx.params, &ctx.search_space);
    hsp.bit_score = bits;
    hsp.evalue = evalue;
    hsp
}

/// A first HSP anywhere and a second one near it, usually downstream
fn random_pair(rng: &mut StdRng, ctx: &StatisticalContext) -> Vec<Hsp> {
    let len_a = rng.gen_range(10..80);
    let q_a = rng.gen_range(100..800);
    let s_a = rng.gen_range(100..8000);
    let len_b = rng.gen_range(10..80);
    let dq: isize = rng.gen_range(-60..150);
    let ds: isize = dq + rng.gen_range(-40..60);
    let q_b = (q_a as isize + dq).max(0) as usize;
    let s_b = (s_a as isize + ds).max(0) as usize;
    let score_a = rng.gen_range(12..len_a as i32 + 12);
    let score_b = rng.gen_range(12..len_b as i32 + 12);
    vec![
        scored(ctx, score_a, q_a, s_a, len_a),
        scored(ctx, score_b, q_b, s_b, len_b),
    ]
}

/// Check one linked pair and return whether it was linked
fn check_pair(
    hsps: &[Hsp],
    overlap: usize,
    max_query_gap: Option<usize>,
    max_subject_gap: Option<usize>,
) -> bool {
    for hsp in hsps {
        assert!(hsp.link.evalue.is_some(), "every HSP is finalized");
    }
    let fits_ab = compatible(&hsps[0], &hsps[1], overlap, max_query_gap, max_subject_gap);
    let fits_ba = compatible(&hsps[1], &hsps[0], overlap, max_query_gap, max_subject_gap);
    let linked = hsps[0].link.num == 2;
    assert_eq!(linked, hsps[1].link.num == 2);
    if !linked {
        assert_eq!(hsps[0].link.evalue, Some(hsps[0].evalue));
        assert_eq!(hsps[1].link.evalue, Some(hsps[1].evalue));
        return false;
    }

    assert!(fits_ab || fits_ba, "incompatible pair was linked: {:?}", hsps);
    let (head, tail) = if hsps[0].link.head { (0, 1) } else { (1, 0) };
    assert_eq!(hsps[head].link.next, Some(tail));
    assert_eq!(hsps[tail].link.prev, Some(head));
    assert!(compatible(&hsps[head], &hsps[tail], overlap, max_query_gap, max_subject_gap));

    let chain_e = hsps[0].effective_evalue();
    assert_eq!(chain_e, hsps[1].effective_evalue());
    assert!(chain_e <= hsps[0].evalue.min(hsps[1].evalue));
    true
}

#[test]
fn test_even_gap_links_only_compatible_pairs() {
    let ctx = context();
    let linking = LinkingConfig::default();
    let linker = HspLinker::new(even_gap(&ctx, &linking), linking);
    let mut rng = StdRng::seed_from_u64(11);
    let mut linked = 0;
    for _ in 0..3000 {
        let mut hsps = random_pair(&mut rng, &ctx);
        let summary = linker.link(&mut hsps, &[ctx], SUBJECT_LEN);
        // Large-gap chains are not bounded in gap length
        if check_pair(&hsps, linking.overlap_size, None, None) {
            linked += 1;
            assert_eq!(summary.chains, 1);
        } else {
            assert_eq!(summary.chains, 0);
        }
    }
    assert!(linked > 0);
}

#[test]
fn test_uneven_gap_respects_window_and_intron() {
    let ctx = context();
    let linking = LinkingConfig {
        query_window: 30,
        max_intron: 50,
        ..LinkingConfig::default()
    };
    let strategy = LinkStrategy::UnevenGap {
        query_window: linking.query_window,
        max_intron: linking.max_intron,
    };
    let linker = HspLinker::new(strategy, linking);
    let mut rng = StdRng::seed_from_u64(12);
    let mut linked = 0;
    for _ in 0..3000 {
        let mut hsps = random_pair(&mut rng, &ctx);
        linker.link(&mut hsps, &[ctx], SUBJECT_LEN);
        if check_pair(
            &hsps,
            linking.overlap_size,
            Some(linking.query_window),
            Some(linking.max_intron),
        ) {
            linked += 1;
        }
    }
    assert!(linked > 0);
}

#[test]
fn test_disabled_keeps_individual_evalues() {
    let ctx = context();
    let linker = HspLinker::new(LinkStrategy::Disabled, LinkingConfig::default());
    let mut hsps = vec![scored(&ctx, 30, 0, 100, 30), scored(&ctx, 30, 40, 140, 30)];
    let summary = linker.link(&mut hsps, &[ctx], SUBJECT_LEN);
    assert_eq!(summary.chains, 0);
    for hsp in &hsps {
        assert_eq!(hsp.link.num, 1);
        assert_eq!(hsp.effective_evalue(), hsp.evalue);
    }
}

#[test]
fn test_other_contexts_never_link() {
    let ctx = context();
    let linking = LinkingConfig::default();
    let linker = HspLinker::new(even_gap(&ctx, &linking), linking);
    let mut hsps = vec![scored(&ctx, 40, 0, 100, 40), scored(&ctx, 40, 50, 150, 40)];
    hsps[1].context = 1;
    let summary = linker.link(&mut hsps, &[ctx, ctx], SUBJECT_LEN);
    assert_eq!(summary.chains, 0);
    assert!(hsps.iter().all(|h| h.link.num == 1));
}
