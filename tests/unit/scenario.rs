//! End-to-end searches on small fixed inputs

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedlink::config::{LinkMode, NuclScoring};
use seedlink::sequence::{InMemorySource, QuerySet};

use super::helpers::{hsp_extents, plant, random_dna, render, search, test_config};

const QUERY: &[u8] = b"ACGTACGTACGT";

fn scoring() -> NuclScoring {
    NuclScoring::new(2, -3)
}

#[test]
fn test_two_clusters_separated_by_t_run() {
    // The T run cuts each copy to eight residues on diagonals 0 and 12; the
    // periodic query also lines up TACG... on diagonal 8
    let queries = QuerySet::from_nucleotide("q", QUERY, false);
    let source = InMemorySource::from_nucleotides([("s", b"ACGTACGTTTTTACGTACGT".as_slice())]);
    let outcome = search(&queries, &source, scoring(), test_config(4));

    assert_eq!(outcome.hits.len(), 1);
    assert_eq!(outcome.hits[0].best_score, 18);
    let extents = hsp_extents(&outcome);
    assert!(extents.contains(&(0, 8, 0, 8, 16)));
    assert!(extents.contains(&(0, 8, 12, 20, 16)));
    assert!(extents.contains(&(3, 12, 11, 20, 18)));
}

#[test]
fn test_full_copies_score_twenty_four() {
    let queries = QuerySet::from_nucleotide("q", QUERY, false);
    let subject = [QUERY, b"TTTTT".as_slice(), QUERY].concat();
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let outcome = search(&queries, &source, scoring(), test_config(4));

    assert_eq!(outcome.hits[0].best_score, 24);
    let extents = hsp_extents(&outcome);
    assert!(extents.contains(&(0, 12, 0, 12, 24)));
    assert!(extents.contains(&(0, 12, 17, 29, 24)));
    assert!(extents.iter().all(|e| e.4 <= 24));
}

#[test]
fn test_copies_of_the_same_query_range_are_not_linked() {
    let queries = QuerySet::from_nucleotide("q", QUERY, false);
    let subject = [QUERY, b"TTTTT".as_slice(), QUERY].concat();
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let mut config = test_config(4);
    config.linking.mode = LinkMode::EvenGap;
    let outcome = search(&queries, &source, scoring(), config);

    let full: Vec<_> = outcome.hits[0].hsps.iter().filter(|h| h.score == 24).collect();
    assert_eq!(full.len(), 2);
    for hsp in full {
        assert_eq!(hsp.link.num, 1);
        assert_eq!(hsp.effective_evalue(), hsp.evalue);
    }
}

#[test]
fn test_linked_pieces_beat_their_members() {
    let mut rng = StdRng::seed_from_u64(31);
    let query = random_dna(&mut rng, 300);
    let queries = QuerySet::from_nucleotide("q", &query, false);
    let mut subject = random_dna(&mut rng, 2000);
    // Two collinear pieces with a short gap on both sequences
    plant(&mut subject, 500, &query[20..60]);
    plant(&mut subject, 560, &query[75..115]);
    let source = InMemorySource::from_nucleotides([("s", subject.as_slice())]);
    let mut config = test_config(11);
    config.linking.mode = LinkMode::EvenGap;
    let outcome = search(&queries, &source, NuclScoring::new(1, -3), config);

    let hit = &outcome.hits[0];
    let linked: Vec<_> = hit.hsps.iter().filter(|h| h.link.is_linked()).collect();
    assert!(linked.len() >= 2);
    for hsp in linked {
        assert!(hsp.effective_evalue() <= hsp.evalue);
    }
}

#[test]
fn test_repeated_runs_render_identically() {
    let mut rng = StdRng::seed_from_u64(32);
    let query = random_dna(&mut rng, 250);
    let queries = QuerySet::from_nucleotide("q", &query, true);
    let mut source = InMemorySource::new();
    for i in 0..40 {
        let mut subject = random_dna(&mut rng, 800);
        for _ in 0..rng.gen_range(0..3) {
            let from = rng.gen_range(0..200);
            let len = rng.gen_range(20..50);
            let at = rng.gen_range(0..700);
            plant(&mut subject, at, &query[from..from + len]);
        }
        source.push_nucleotide(&format!("subject{}", i), &subject);
    }
    let mut config = test_config(11);
    config.engine.num_workers = 4;
    config.engine.chunk.max_chunk = 3;
    config.linking.mode = LinkMode::EvenGap;

    let first = render(&search(&queries, &source, NuclScoring::new(1, -3), config));
    assert!(!first.is_empty());
    for _ in 0..3 {
        assert_eq!(render(&search(&queries, &source, NuclScoring::new(1, -3), config)), first);
    }
}
