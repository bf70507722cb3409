//! Diagonal bookkeeping observed through the word finder

use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedlink::lookup::{WordEncoding, WordLookup};
use seedlink::seed::{DiagonalTracker, ScanMode, SeedOutcome, WordFinder};
use seedlink::sequence::encoding::encode;
use seedlink::sequence::QuerySet;

use super::helpers::random_dna;

#[test]
fn test_levels_never_decrease_and_covered_seeds_are_skipped() {
    let mut rng = StdRng::seed_from_u64(7);
    for round in 0..20 {
        let query = random_dna(&mut rng, 200);
        let mut subject = random_dna(&mut rng, 2000);
        // Repeats give many seeds per diagonal
        for k in 0..10 {
            let at = 150 * k + rng.gen_range(0..50);
            let from = rng.gen_range(0..150);
            subject[at..at + 50].copy_from_slice(&query[from..from + 50]);
        }
        let queries = QuerySet::from_nucleotide("q", &query, round % 2 == 0);
        let lookup = WordLookup::build(&queries, WordEncoding::nucleotide(8).unwrap());
        let finder = WordFinder::new(&lookup, 0);
        let mut tracker = DiagonalTracker::new(queries.len(), queries.max_context_len(), 0);
        let subject = encode(&subject);

        let mut levels: HashMap<(usize, isize), usize> = HashMap::new();
        let mut last_offset = 0;
        let report = finder.scan(&subject, &mut tracker, ScanMode::Exhaustive, |seed| {
            assert!(seed.s_offset >= last_offset, "seeds arrive in subject order");
            last_offset = seed.s_offset;
            let key = (seed.context, seed.diagonal());
            let level = levels.get(&key).copied().unwrap_or(0);
            assert!(
                seed.s_end() > level,
                "seed ending at {} inside level {}",
                seed.s_end(),
                level
            );
            let reach = seed.s_end() + rng.gen_range(0..40);
            levels.insert(key, reach.min(subject.len()));
            SeedOutcome {
                reach: reach.min(subject.len()),
                stored: false,
            }
        });
        assert!(report.extensions <= report.seeds);
        // Folded slots only ever hold a level at least as high
        for (&(context, diagonal), &level) in &levels {
            assert!(tracker.recorded_level(context, diagonal) >= level);
        }
    }
}

#[test]
fn test_lower_level_is_ignored() {
    let mut tracker = DiagonalTracker::new(1, 50, 0);
    tracker.advance(0, 5, 100);
    tracker.advance(0, 5, 60);
    assert_eq!(tracker.recorded_level(0, 5), 100);
}

#[test]
fn test_two_hit_needs_a_second_word() {
    let queries = QuerySet::from_nucleotide("q", b"ACGTTGCAACGGTTCA", false);
    let lookup = WordLookup::build(&queries, WordEncoding::nucleotide(4).unwrap());
    let finder = WordFinder::new(&lookup, 10);
    let mut tracker = DiagonalTracker::new(1, queries.max_context_len(), 10);

    // A lone copy of the first word never triggers
    let lone = encode(b"TTTTACGTTTTT");
    let mut extended = 0;
    finder.scan(&lone, &mut tracker, ScanMode::Exhaustive, |seed| {
        extended += 1;
        SeedOutcome::rejected(&seed)
    });
    assert_eq!(extended, 0);

    // The whole query holds non-overlapping words on one diagonal
    tracker.reset();
    let full = encode(b"ACGTTGCAACGGTTCA");
    finder.scan(&full, &mut tracker, ScanMode::Exhaustive, |seed| {
        extended += 1;
        SeedOutcome::rejected(&seed)
    });
    assert!(extended > 0);
}
