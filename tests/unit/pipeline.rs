//! Per-subject stages after the scan: ambiguity rescoring, gapped
//! refinement and the exploratory prescreen

use std::ops::Range;
use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::SeedableRng;

use seedlink::config::{LinkMode, NuclScoring, SearchConfig};
use seedlink::engine::{SearchCoordinator, SearchInputs, SearchOutcome};
use seedlink::extension::gapped::ungapped_edits;
use seedlink::extension::{GappedAligner, GappedAlignment};
use seedlink::lookup::{WordEncoding, WordLookup};
use seedlink::sequence::{InMemorySource, QuerySet};
use seedlink::stats::CutoffCalculator;
use seedlink::utils::matrix::{Scorer, ScoringMatrix};

use super::helpers::{hsp_extents, plant, planted_subject, random_dna, random_query, search, test_config};

const REFINED_SCORE: i32 = 500;

/// Accepts every offered span unchanged under a fixed score
#[derive(Default)]
struct SpanAligner {
    offered: Mutex<Vec<(Range<usize>, Range<usize>)>>,
}

impl GappedAligner for SpanAligner {
    fn refine<S: Scorer + ?Sized>(
        &self,
        query: &[u8],
        subject: &[u8],
        q_range: Range<usize>,
        s_range: Range<usize>,
        _xdrop: i32,
        _scorer: &S,
    ) -> Option<GappedAlignment> {
        self.offered.lock().unwrap().push((q_range.clone(), s_range.clone()));
        Some(GappedAlignment {
            score: REFINED_SCORE,
            edits: ungapped_edits(&query[q_range.clone()], &subject[s_range.clone()]),
            q_range,
            s_range,
        })
    }
}

/// Declines every span
struct DecliningAligner;

impl GappedAligner for DecliningAligner {
    fn refine<S: Scorer + ?Sized>(
        &self,
        _query: &[u8],
        _subject: &[u8],
        _q_range: Range<usize>,
        _s_range: Range<usize>,
        _xdrop: i32,
        _scorer: &S,
    ) -> Option<GappedAlignment> {
        None
    }
}

fn gapped_search<A: GappedAligner>(
    queries: &QuerySet,
    source: &InMemorySource,
    config: SearchConfig,
    aligner: &A,
) -> SearchOutcome {
    let scoring = NuclScoring::new(1, -3);
    let lookup = WordLookup::build(queries, WordEncoding::nucleotide(config.seed.word_width).unwrap());
    let matrix = ScoringMatrix::nucleotide(scoring.reward, scoring.penalty);
    let coordinator = SearchCoordinator::new(
        config,
        SearchInputs {
            queries,
            lookup: &lookup,
            source,
            scorer: &matrix,
            aligner,
            calculator: CutoffCalculator::nucleotide(&scoring, true).unwrap(),
        },
    )
    .unwrap();
    coordinator.run()
}

fn linked_pieces() -> (QuerySet, InMemorySource) {
    let mut rng = StdRng::seed_from_u64(31);
    let query = random_dna(&mut rng, 300);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let mut subject = random_dna(&mut rng, 2000);
    plant(&mut subject, 500, &query[20..60]);
    plant(&mut subject, 560, &query[75..115]);
    (queries, InMemorySource::from_nucleotides([("s", subject.as_slice())]))
}

#[test]
fn test_gapped_refinement_replaces_a_linked_chain() {
    let (queries, source) = linked_pieces();
    let mut config = test_config(11);
    config.linking.mode = LinkMode::EvenGap;
    config.extension.gapped = true;
    let aligner = SpanAligner::default();
    let outcome = gapped_search(&queries, &source, config, &aligner);

    assert!(outcome.stats.hsps_refined >= 1);
    assert!(!aligner.offered.lock().unwrap().is_empty());
    let hit = &outcome.hits[0];
    let refined: Vec<_> = hit.hsps.iter().filter(|h| h.edits.is_some()).collect();
    assert_eq!(refined.len(), outcome.stats.hsps_refined);
    // Both planted pieces end up inside one refined span
    let chain = refined
        .iter()
        .find(|h| h.q_start <= 20 && h.q_end >= 115)
        .expect("linked pieces were not refined together");
    assert_eq!(chain.score, REFINED_SCORE);
    assert!(chain.s_start <= 500 && chain.s_end >= 600);
    assert_eq!(chain.link.num, 1);
    assert_eq!(chain.edits.as_ref().map(Vec::len), Some(chain.q_len().min(chain.s_len())));
    // Members of a refined chain are gone
    assert_eq!(hit.hsps.iter().filter(|h| h.s_end > 500 && h.s_start < 600).count(), 1);
}

#[test]
fn test_declined_refinement_keeps_ungapped_hsps() {
    let (queries, source) = linked_pieces();
    let mut config = test_config(11);
    config.linking.mode = LinkMode::EvenGap;
    config.extension.gapped = true;
    let declined = gapped_search(&queries, &source, config, &DecliningAligner);

    config.extension.gapped = false;
    let ungapped = gapped_search(&queries, &source, config, &DecliningAligner);

    assert_eq!(declined.stats.hsps_refined, 0);
    assert!(declined.hits[0].hsps.iter().all(|h| h.edits.is_none()));
    assert_eq!(hsp_extents(&declined), hsp_extents(&ungapped));
}

/// A-free query whose `query[50..70]` is a run of A
fn query_with_a_run() -> Vec<u8> {
    let mut query = random_query(41, 120);
    query[50..70].fill(b'A');
    query
}

/// Poly-C subject of 600 with `piece` at 300, its A run optionally masked by N
fn ambiguous_subject(piece: &[u8], a_run: Range<usize>, masked: bool) -> Vec<u8> {
    let mut subject = vec![b'C'; 600];
    plant(&mut subject, 300, piece);
    if masked {
        subject[300 + a_run.start..300 + a_run.end].fill(b'N');
    }
    subject
}

#[test]
fn test_hit_made_of_ambiguity_codes_is_rejected() {
    let query = query_with_a_run();
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let scoring = NuclScoring::new(1, -3);

    let clean = ambiguous_subject(&query[50..70], 0..20, false);
    let masked = ambiguous_subject(&query[50..70], 0..20, true);
    let clean = search(&queries, &InMemorySource::from_nucleotides([("s", clean.as_slice())]), scoring, test_config(11));
    let masked = search(&queries, &InMemorySource::from_nucleotides([("s", masked.as_slice())]), scoring, test_config(11));

    assert_eq!(clean.hits.len(), 1);
    assert_eq!(clean.stats.hsps_rescore_rejected, 0);
    // N scans as A, so the word finder sees the same hit
    assert!(masked.stats.hsps_stored > 0);
    assert!(masked.stats.hsps_rescore_rejected > 0);
    assert!(masked.hits.is_empty());
}

#[test]
fn test_rescoring_trims_at_ambiguity_codes() {
    let query = query_with_a_run();
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let scoring = NuclScoring::new(1, -3);

    // query[20..70]: 30 clean bases then the A run
    let masked = ambiguous_subject(&query[20..70], 30..50, true);
    let source = InMemorySource::from_nucleotides([("s", masked.as_slice())]);
    let outcome = search(&queries, &source, scoring, test_config(11));

    let best = outcome.hits[0]
        .hsps
        .iter()
        .max_by_key(|h| h.score)
        .unwrap();
    assert_eq!((best.q_end, best.s_end), (50, 330));
    assert!(best.score >= 30 && best.score < 50);
}

#[test]
fn test_prescreen_drops_only_hitless_subjects() {
    let query = random_query(42, 300);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let mut source = InMemorySource::new();
    let mut hitless = 0;
    for i in 0..12 {
        let subject = match i % 4 {
            0 => planted_subject(&query, 800, &[(100, 10..70)]),
            1 => planted_subject(&query, 800, &[(200, 100..140), (500, 150..230)]),
            _ => {
                hitless += 1;
                vec![b'A'; 800]
            }
        };
        source.push_nucleotide(&format!("s{}", i), &subject);
    }
    let scoring = NuclScoring::new(1, -3);

    let full = search(&queries, &source, scoring, test_config(11));
    let mut config = test_config(11);
    config.seed.prescreen = true;
    let screened = search(&queries, &source, scoring, config);

    assert_eq!(full.stats.subjects_prescreened_out, 0);
    assert_eq!(screened.stats.subjects_prescreened_out, hitless);
    assert_eq!(screened.hits.len(), full.hits.len());
    assert_eq!(hsp_extents(&screened), hsp_extents(&full));
    let ids = |outcome: &SearchOutcome| -> Vec<String> {
        outcome.hits.iter().map(|h| h.subject_id.clone()).collect()
    };
    assert_eq!(ids(&screened), ids(&full));
}
