//! Ungapped X-drop extension checked against brute-force prefix sums

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedlink::extension::UngappedExtender;
use seedlink::seed::Seed;
use seedlink::utils::matrix::ScoringMatrix;

fn random_matrix(rng: &mut StdRng) -> ScoringMatrix {
    let rows: Vec<Vec<i32>> = (0..4)
        .map(|a| {
            (0..4)
                .map(|b| if a == b { rng.gen_range(1..=5) } else { rng.gen_range(-5..=1) })
                .collect()
        })
        .collect();
    ScoringMatrix::from_rows(&rows, -100).unwrap()
}

fn random_codes(rng: &mut StdRng, len: usize) -> Vec<u8> {
    (0..len).map(|_| rng.gen_range(0..4u8)).collect()
}

/// Largest positive sum of a contiguous run, if any
fn max_subarray(scores: &[i32]) -> Option<i32> {
    let mut best = 0;
    for i in 0..scores.len() {
        let mut sum = 0;
        for &s in &scores[i..] {
            sum += s;
            best = best.max(sum);
        }
    }
    (best > 0).then_some(best)
}

/// Best prefix sum over `scores`, the empty prefix included
fn best_prefix(scores: impl Iterator<Item = i32>) -> i32 {
    let mut run = 0;
    let mut best = 0;
    for s in scores {
        run += s;
        best = best.max(run);
    }
    best
}

#[test]
fn test_extension_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    for _ in 0..2000 {
        let matrix = random_matrix(&mut rng);
        let extender = UngappedExtender::new(&matrix);
        let (q_len, s_len) = (rng.gen_range(8..60), rng.gen_range(8..60));
        let query = random_codes(&mut rng, q_len);
        let subject = random_codes(&mut rng, s_len);
        let length = rng.gen_range(1..=8);
        let seed = Seed {
            context: 0,
            q_offset: rng.gen_range(0..=query.len() - length),
            s_offset: rng.gen_range(0..=subject.len() - length),
            length,
        };
        let dropoff = rng.gen_range(0..15);
        let pair = |q: usize, s: usize| matrix.get(query[q], subject[s]);

        let word: Vec<i32> = (0..length)
            .map(|k| pair(seed.q_offset + k, seed.s_offset + k))
            .collect();
        let Some(ext) = extender.extend(&query, &subject, &seed, dropoff) else {
            assert_eq!(max_subarray(&word), None);
            continue;
        };
        let core = max_subarray(&word).unwrap();
        let anchor_score =
            extender.segment_score(&query, &subject, ext.q_anchor, ext.s_anchor, ext.anchor_len);
        assert_eq!(anchor_score, core);

        // The reported segment scores what it claims
        assert_eq!(ext.s_start as isize - ext.q_start as isize, seed.diagonal());
        assert_eq!(
            extender.segment_score(&query, &subject, ext.q_start, ext.s_start, ext.len()),
            ext.score
        );

        // Best left and right prefixes within the examined range
        let d = ext.s_anchor as isize - ext.q_anchor as isize;
        let on_diag = |q: usize| pair(q, (q as isize + d) as usize);
        let left = best_prefix((ext.q_scan_start..ext.q_anchor).rev().map(on_diag));
        let q_anchor_end = ext.q_anchor + ext.anchor_len;
        let q_reach = (ext.s_reach as isize - d) as usize;
        let right = best_prefix((q_anchor_end..q_reach).map(on_diag));
        assert_eq!(ext.score, core + left + right);
        assert!(ext.q_scan_start <= ext.q_start);
        assert!(ext.s_end <= ext.s_reach);

        // A walk stopping short of the sequence ends did so by falling
        // more than the dropoff below its best
        if ext.q_scan_start > 0 && ext.q_scan_start as isize + d > 0 {
            let fall: i32 = (ext.q_scan_start..ext.q_anchor).map(on_diag).sum();
            assert!(left - fall > dropoff);
        }
    }
}

#[test]
fn test_right_walk_stops_when_running_score_would_go_negative() {
    let matrix = ScoringMatrix::nucleotide(1, -3);
    let extender = UngappedExtender::new(&matrix);
    let query = seedlink::sequence::encoding::encode(b"ACGGGGGGGG");
    let subject = seedlink::sequence::encoding::encode(b"ACTTTTTTTT");
    let seed = Seed {
        context: 0,
        q_offset: 0,
        s_offset: 0,
        length: 2,
    };
    let ext = extender.extend(&query, &subject, &seed, 100).unwrap();
    assert_eq!(ext.score, 2);
    // One mismatch takes the running score below zero
    assert_eq!(ext.s_reach, 3);
}
