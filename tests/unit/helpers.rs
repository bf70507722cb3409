//! Shared fixtures for the integration tests

use std::collections::BTreeSet;
use std::ops::Range;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use seedlink::config::{LinkMode, NuclScoring, SearchConfig};
use seedlink::engine::{SearchCoordinator, SearchInputs, SearchOutcome};
use seedlink::error::SearchError;
use seedlink::extension::NoGappedAligner;
use seedlink::hsp::{Hsp, LinkInfo};
use seedlink::lookup::{WordEncoding, WordLookup};
use seedlink::sequence::{InMemorySource, QuerySet};
use seedlink::stats::CutoffCalculator;
use seedlink::utils::matrix::ScoringMatrix;

pub fn random_dna(rng: &mut StdRng, len: usize) -> Vec<u8> {
    const BASES: &[u8] = b"ACGT";
    (0..len).map(|_| BASES[rng.gen_range(0..4)]).collect()
}

/// Copy `piece` into `target` starting at `at`
pub fn plant(target: &mut [u8], at: usize, piece: &[u8]) {
    target[at..at + piece.len()].copy_from_slice(piece);
}

/// Small-search defaults: fixed worker count, linking off
pub fn test_config(word_width: usize) -> SearchConfig {
    let mut config = SearchConfig::default();
    config.seed.word_width = word_width;
    config.linking.mode = LinkMode::Off;
    config.engine.num_workers = 2;
    config.engine.split_overlap = config.engine.split_overlap.max(word_width);
    config
}

pub fn try_search(
    queries: &QuerySet,
    source: &InMemorySource,
    scoring: NuclScoring,
    config: SearchConfig,
) -> Result<SearchOutcome, SearchError> {
    let lookup = WordLookup::build(queries, WordEncoding::nucleotide(config.seed.word_width)?);
    let matrix = ScoringMatrix::nucleotide(scoring.reward, scoring.penalty);
    let calculator = CutoffCalculator::nucleotide(&scoring, false)?;
    let coordinator = SearchCoordinator::new(
        config,
        SearchInputs {
            queries,
            lookup: &lookup,
            source,
            scorer: &matrix,
            aligner: &NoGappedAligner,
            calculator,
        },
    )?;
    Ok(coordinator.run())
}

pub fn search(
    queries: &QuerySet,
    source: &InMemorySource,
    scoring: NuclScoring,
    config: SearchConfig,
) -> SearchOutcome {
    try_search(queries, source, scoring, config).expect("search setup failed")
}

/// (q_start, q_end, s_start, s_end, score) of every reported HSP, sorted
pub fn hsp_extents(outcome: &SearchOutcome) -> Vec<(usize, usize, usize, usize, i32)> {
    let mut extents: Vec<_> = outcome
        .hits
        .iter()
        .flat_map(|hit| hit.hsps.iter())
        .map(|h| (h.q_start, h.q_end, h.s_start, h.s_end, h.score))
        .collect();
    extents.sort_unstable();
    extents
}

/// Tab-separated rendering of a whole outcome
pub fn render(outcome: &SearchOutcome) -> String {
    let mut out = String::new();
    for hit in &outcome.hits {
        for h in &hit.hsps {
            out.push_str(&format!(
                "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{:e}\t{}\n",
                hit.subject_id,
                h.context,
                h.q_start,
                h.q_end,
                h.s_start,
                h.s_end,
                h.score,
                h.effective_evalue(),
                h.link.num
            ));
        }
    }
    out
}

/// Poly-A subject of `len` with query pieces planted at the given offsets
pub fn planted_subject(query: &[u8], len: usize, pieces: &[(usize, Range<usize>)]) -> Vec<u8> {
    let mut subject = vec![b'A'; len];
    for (at, range) in pieces {
        plant(&mut subject, *at, &query[range.clone()]);
    }
    subject
}

/// A-free query without repeated 11-mers, so planted pieces match only
/// themselves and poly-A flanks never extend them
pub fn random_query(seed: u64, len: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    loop {
        let query: Vec<u8> = random_dna(&mut rng, len)
            .into_iter()
            .map(|b| if b == b'A' { b'T' } else { b })
            .collect();
        let words: BTreeSet<&[u8]> = query.windows(11).collect();
        if words.len() == len - 10 {
            return query;
        }
    }
}

pub fn make_hsp(context: usize, score: i32, q: (usize, usize), s: (usize, usize)) -> Hsp {
    Hsp {
        context,
        q_start: q.0,
        q_end: q.1,
        s_start: s.0,
        s_end: s.1,
        q_frame: 1,
        s_frame: 1,
        score,
        bit_score: 0.0,
        evalue: f64::MAX,
        link: LinkInfo::default(),
        edits: None,
    }
}
