//! Work distribution, window splitting, cancellation and setup failures

use std::collections::BTreeSet;
use std::sync::Mutex;
use std::time::Duration;

use seedlink::config::{NuclScoring, SearchConfig};
use seedlink::engine::{ChunkCursor, ProgressSink, SearchCoordinator, SearchInputs};
use seedlink::error::{SearchError, SearchWarning};
use seedlink::extension::NoGappedAligner;
use seedlink::lookup::{WordEncoding, WordLookup};
use seedlink::sequence::{InMemorySource, QuerySet};
use seedlink::stats::CutoffCalculator;
use seedlink::utils::matrix::ScoringMatrix;

use super::helpers::{hsp_extents, planted_subject, random_query, search, test_config, try_search};

type Coordinator<'a> = SearchCoordinator<'a, WordLookup, InMemorySource, ScoringMatrix, NoGappedAligner>;

fn with_coordinator<R>(
    queries: &QuerySet,
    source: &InMemorySource,
    config: SearchConfig,
    body: impl FnOnce(&Coordinator<'_>) -> R,
) -> R {
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
            aligner: &NoGappedAligner,
            calculator: CutoffCalculator::nucleotide(&scoring, false).unwrap(),
        },
    )
    .unwrap();
    body(&coordinator)
}

#[test]
fn test_chunk_cursor_partitions_across_threads() {
    let cursor = ChunkCursor::new(1003, 7);
    let handed_out = Mutex::new(Vec::new());
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                while let Some(chunk) = cursor.next_chunk() {
                    handed_out.lock().unwrap().push(chunk);
                }
            });
        }
    });
    let mut chunks = handed_out.into_inner().unwrap();
    chunks.sort_by_key(|c| c.start);
    let mut expected_start = 0;
    for chunk in &chunks {
        assert_eq!(chunk.start, expected_start);
        assert!(chunk.len() <= 7 && !chunk.is_empty());
        expected_start = chunk.end;
    }
    assert_eq!(expected_start, 1003);
}

#[test]
fn test_split_subject_matches_unsplit_search() {
    let query = random_query(21, 400);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let subject = planted_subject(&query, 3000, &[(200, 0..80), (960, 100..180), (1850, 250..330)]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let scoring = NuclScoring::new(1, -3);

    let whole = search(&queries, &source, scoring, test_config(11));

    let mut config = test_config(11);
    config.engine.max_subject_window = 1000;
    config.engine.split_overlap = 100;
    let split = search(&queries, &source, scoring, config);

    assert_eq!(split.stats.subjects_split, 1);
    assert_eq!(whole.stats.subjects_split, 0);
    let extents = hsp_extents(&whole);
    assert_eq!(extents.len(), 3);
    assert_eq!(hsp_extents(&split), extents);
    // The piece across the first window boundary is found whole
    assert!(extents.iter().any(|&(q0, q1, s0, s1, _)| (q0, q1, s0, s1) == (100, 180, 960, 1040)));
}

/// `random_query` with `query[dst..dst + repeat]` copied from `src`; the copy
/// is the only repeated stretch
fn query_with_repeat(seed: u64, len: usize, src: usize, dst: usize, repeat: usize) -> Vec<u8> {
    (seed..)
        .map(|seed| {
            let mut query = random_query(seed, len);
            query.copy_within(src..src + repeat, dst);
            query
        })
        .find(|query| {
            let words: BTreeSet<&[u8]> = query.windows(11).collect();
            words.len() == len - 10 - (repeat - 10)
        })
        .unwrap()
}

#[test]
fn test_split_keeps_hsps_inside_longer_alignments() {
    let scoring = NuclScoring::new(1, -3);
    for seed in 0..8 {
        // query[200..230] repeats query[0..30], so the long planted piece
        // carries shorter HSPs on two other diagonals
        let query = query_with_repeat(100 + 50 * seed, 500, 0, 200, 30);
        let queries = QuerySet::from_nucleotide("q", &query, false);
        let subject = planted_subject(&query, 3000, &[(820, 0..300), (1760, 320..480)]);
        let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);

        let whole = search(&queries, &source, scoring, test_config(11));
        let mut config = test_config(11);
        config.engine.max_subject_window = 1000;
        config.engine.split_overlap = 100;
        let split = search(&queries, &source, scoring, config);
        assert_eq!(split.stats.subjects_split, 1);

        let extents = hsp_extents(&whole);
        assert_eq!(hsp_extents(&split), extents, "seed {}", seed);
        let has = |q: (usize, usize), s: (usize, usize)| {
            extents.iter().any(|&(q0, q1, s0, s1, _)| (q0, q1, s0, s1) == (q.0, q.1, s.0, s.1))
        };
        assert!(has((0, 300), (820, 1120)), "seed {}", seed);
        assert!(has((320, 480), (1760, 1920)), "seed {}", seed);
        assert!(extents.iter().any(|e| e.0 == 200 && e.2 == 820), "seed {}", seed);
        assert!(extents.iter().any(|e| e.0 == 0 && e.2 == 1020), "seed {}", seed);
    }
}

#[test]
fn test_cancel_before_run_scans_nothing() {
    let query = random_query(22, 100);
    let queries = QuerySet::from_nucleotide("q", &query, true);
    let subject = planted_subject(&query, 500, &[(100, 0..100)]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    with_coordinator(&queries, &source, test_config(11), |coordinator| {
        coordinator.cancel_token().cancel();
        let outcome = coordinator.run();
        assert!(outcome.cancelled);
        assert!(!outcome.timed_out);
        assert!(outcome.hits.is_empty());
        assert_eq!(outcome.stats.subjects_scanned, 0);
    });
}

#[test]
fn test_zero_timeout_reports_timed_out() {
    let query = random_query(23, 100);
    let queries = QuerySet::from_nucleotide("q", &query, true);
    let subject = planted_subject(&query, 500, &[(100, 0..100)]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let mut config = test_config(11);
    config.engine.timeout = Some(Duration::ZERO);
    let outcome = search(&queries, &source, NuclScoring::new(1, -3), config);
    assert!(outcome.timed_out);
    assert!(outcome.cancelled);
    assert_eq!(outcome.stats.subjects_scanned, 0);
}

#[test]
fn test_cancel_is_cleared_for_the_next_run() {
    let query = random_query(28, 100);
    let queries = QuerySet::from_nucleotide("q", &query, true);
    let subject = planted_subject(&query, 500, &[(100, 0..100)]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    with_coordinator(&queries, &source, test_config(11), |coordinator| {
        coordinator.cancel_token().cancel();
        assert!(coordinator.run().cancelled);

        let outcome = coordinator.run();
        assert!(!outcome.cancelled);
        assert_eq!(outcome.hits.len(), 1);
        assert_eq!(outcome.stats.subjects_scanned, 1);
    });
}

#[test]
fn test_timeout_counts_from_the_start_of_each_run() {
    let query = random_query(29, 100);
    let queries = QuerySet::from_nucleotide("q", &query, true);
    let subject = planted_subject(&query, 500, &[(100, 0..100)]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let mut config = test_config(11);
    config.engine.timeout = Some(Duration::from_millis(500));
    with_coordinator(&queries, &source, config, |coordinator| {
        let first = coordinator.run();
        assert!(!first.timed_out);
        assert_eq!(first.hits.len(), 1);

        std::thread::sleep(Duration::from_millis(600));
        let second = coordinator.run();
        assert!(!second.timed_out);
        assert!(!second.cancelled);
        assert_eq!(second.hits.len(), 1);
    });
}

#[test]
fn test_setup_errors() {
    let source = InMemorySource::from_nucleotides([("s", b"ACGTACGTACGTACGT".as_slice())]);
    let scoring = NuclScoring::new(1, -3);

    let short = QuerySet::from_nucleotide("q", b"ACGT", false);
    assert_eq!(
        try_search(&short, &source, scoring, test_config(11)).unwrap_err(),
        SearchError::QueryTooShort {
            context: 0,
            length: 4,
            word_width: 11
        }
    );

    let query = QuerySet::from_nucleotide("q", b"ACGTTGCAACGGTTCAGG", false);
    assert_eq!(
        try_search(&QuerySet::new(), &source, scoring, test_config(11)).unwrap_err(),
        SearchError::EmptyQuery
    );
    assert!(matches!(
        try_search(&query, &source, NuclScoring::new(1, 1), test_config(11)),
        Err(SearchError::UnsupportedScoring { reward: 1, penalty: 1 })
    ));

    let mut invalid = test_config(11);
    invalid.hitlist_size = 0;
    assert!(matches!(
        try_search(&query, &source, scoring, invalid),
        Err(SearchError::InvalidConfig(_))
    ));

    // Word index built for another width
    let lookup = WordLookup::build(&query, WordEncoding::nucleotide(8).unwrap());
    let matrix = ScoringMatrix::nucleotide(1, -3);
    let result = SearchCoordinator::new(
        test_config(11),
        SearchInputs {
            queries: &query,
            lookup: &lookup,
            source: &source,
            scorer: &matrix,
            aligner: &NoGappedAligner,
            calculator: CutoffCalculator::nucleotide(&scoring, false).unwrap(),
        },
    );
    assert!(matches!(result, Err(SearchError::InvalidConfig(_))));
}

#[test]
fn test_subjects_shorter_than_a_word_are_skipped() {
    let query = random_query(24, 100);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let subject = planted_subject(&query, 300, &[(50, 10..90)]);
    let source = InMemorySource::from_nucleotides([
        ("tiny", b"ACGTA".as_slice()),
        ("hit", subject.as_slice()),
        ("short", &query[..10]),
    ]);
    let outcome = search(&queries, &source, NuclScoring::new(1, -3), test_config(11));
    assert_eq!(outcome.stats.subjects_skipped, 2);
    assert_eq!(outcome.stats.subjects_scanned, 1);
    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.hits[0].subject_id, "hit");
}

#[test]
fn test_store_cap_warns_once_and_keeps_best() {
    let query = random_query(25, 400);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let subject = planted_subject(
        &query,
        2000,
        &[(100, 0..40), (300, 50..110), (500, 120..170), (700, 200..290), (900, 300..350)],
    );
    let source = InMemorySource::from_nucleotides([("crowded", subject.as_slice())]);
    let mut config = test_config(11);
    config.store.initial_capacity = 1;
    config.store.hard_cap = 2;
    let outcome = search(&queries, &source, NuclScoring::new(1, -3), config);

    let capacity_warnings: Vec<&SearchWarning> = outcome
        .warnings
        .iter()
        .filter(|w| matches!(w, SearchWarning::CapacityExhausted { .. }))
        .collect();
    assert_eq!(
        capacity_warnings,
        vec![&SearchWarning::CapacityExhausted {
            subject: "crowded".to_string(),
            cap: 2
        }]
    );
    // The two longest pieces survive
    let lengths: BTreeSet<usize> = outcome.hits[0].hsps.iter().map(|h| h.q_len()).collect();
    assert_eq!(lengths, BTreeSet::from([60, 90]));
}

#[derive(Default)]
struct Recorder {
    calls: Mutex<Vec<(usize, usize)>>,
}

impl ProgressSink for Recorder {
    fn on_progress(&self, subjects_done: usize, positive_hits: usize) {
        self.calls.lock().unwrap().push((subjects_done, positive_hits));
    }
}

#[test]
fn test_progress_reports_final_count() {
    let query = random_query(26, 100);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let with_hit = planted_subject(&query, 300, &[(100, 0..60)]);
    let without = vec![b'A'; 300];
    let mut source = InMemorySource::new();
    for i in 0..10 {
        let seq = if i % 3 == 0 { &with_hit } else { &without };
        source.push_nucleotide(&format!("s{}", i), seq);
    }
    let mut config = test_config(11);
    config.engine.progress_interval = 3;
    let recorder = Recorder::default();
    let outcome = with_coordinator(&queries, &source, config, |c| c.run_with_progress(&recorder));

    let calls = recorder.calls.into_inner().unwrap();
    let done: Vec<usize> = calls.iter().map(|c| c.0).collect();
    assert_eq!(done, vec![3, 6, 9, 10]);
    assert_eq!(calls.last(), Some(&(10, 4)));
    assert_eq!(outcome.hits.len(), 4);
}

#[test]
fn test_hitlist_size_keeps_best_subjects() {
    let query = random_query(27, 200);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let mut source = InMemorySource::new();
    for (i, len) in [40usize, 90, 55, 120, 70, 100].into_iter().enumerate() {
        let subject = planted_subject(&query, 400, &[(100, 0..len)]);
        source.push_nucleotide(&format!("s{}", i), &subject);
    }
    let mut config = test_config(11);
    config.hitlist_size = 3;
    let outcome = search(&queries, &source, NuclScoring::new(1, -3), config);

    let ids: Vec<&str> = outcome.hits.iter().map(|h| h.subject_id.as_str()).collect();
    assert_eq!(ids, vec!["s3", "s5", "s1"]);
    assert!(outcome
        .hits
        .windows(2)
        .all(|w| w[0].best_evalue <= w[1].best_evalue));
}
