//! Residue scoring used by ungapped extension and rescoring.
//!
//! Two scoring flavours exist: a plain substitution matrix indexed by the two
//! residues, and a position-specific matrix indexed by query position and
//! subject residue. Both implement [`Scorer`]; the flavour is fixed once when
//! the search is set up and passed down as a generic parameter.

use crate::error::SearchError;
use crate::sequence::encoding::{BASE_SETS, BLASTNA_SIZE, NUCL_ALPHABET, SENTINEL};

/// Score of any pair involving a sentinel. Large enough that a single
/// sentinel ends every X-drop walk.
pub const SENTINEL_SCORE: i32 = -(1 << 16);

pub trait Scorer: Sync {
    /// Score of aligning query residue `q` (at context offset `q_pos`) with
    /// subject residue `s`.
    fn score(&self, q_pos: usize, q: u8, s: u8) -> i32;
}

/// Square substitution matrix over an encoded alphabet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoringMatrix {
    size: usize,
    scores: Vec<i32>,
    /// Score for residues outside the alphabet
    default_score: i32,
}

/// NCBI-style rounding to nearest, halves away from zero
#[inline]
fn nint(x: f64) -> i32 {
    if x >= 0.0 {
        (x + 0.5) as i32
    } else {
        (x - 0.5) as i32
    }
}

impl ScoringMatrix {
    /// Build from explicit rows; every row must have as many columns as there are rows.
    pub fn from_rows(rows: &[Vec<i32>], default_score: i32) -> Result<Self, SearchError> {
        let size = rows.len();
        if size == 0 || rows.iter().any(|r| r.len() != size) {
            return Err(SearchError::InvalidConfig(format!(
                "scoring matrix must be square, got {} rows",
                size
            )));
        }
        Ok(Self {
            size,
            scores: rows.iter().flatten().copied().collect(),
            default_score,
        })
    }

    /// BLASTNA matrix for a reward/penalty scheme. A pair involving an
    /// ambiguity code scores the expected value over the bases it may stand
    /// for, rounded to the nearest integer; disjoint base sets score the
    /// penalty and the sentinel scores [`SENTINEL_SCORE`] against everything.
    pub fn nucleotide(reward: i32, penalty: i32) -> Self {
        let mut scores = vec![0; BLASTNA_SIZE * BLASTNA_SIZE];
        for a in 0..BLASTNA_SIZE {
            for b in 0..BLASTNA_SIZE {
                let score = if a == SENTINEL as usize || b == SENTINEL as usize {
                    SENTINEL_SCORE
                } else if a < NUCL_ALPHABET && b < NUCL_ALPHABET {
                    if a == b {
                        reward
                    } else {
                        penalty
                    }
                } else if BASE_SETS[a] & BASE_SETS[b] != 0 {
                    let degeneracy = BASE_SETS[a]
                        .count_ones()
                        .max(BASE_SETS[b].count_ones()) as i32;
                    nint(((degeneracy - 1) * penalty + reward) as f64 / degeneracy as f64)
                } else {
                    penalty
                };
                scores[a * BLASTNA_SIZE + b] = score;
            }
        }
        Self {
            size: BLASTNA_SIZE,
            scores,
            default_score: SENTINEL_SCORE,
        }
    }

    #[inline]
    pub fn get(&self, a: u8, b: u8) -> i32 {
        let (a, b) = (a as usize, b as usize);
        if a < self.size && b < self.size {
            self.scores[a * self.size + b]
        } else {
            self.default_score
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Scorer for ScoringMatrix {
    #[inline]
    fn score(&self, _q_pos: usize, q: u8, s: u8) -> i32 {
        self.get(q, s)
    }
}

/// Position-specific scores: one row per query position, one column per
/// subject residue code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionSpecific {
    rows: Vec<Vec<i32>>,
    default_score: i32,
}

impl PositionSpecific {
    pub fn new(rows: Vec<Vec<i32>>, default_score: i32) -> Self {
        Self {
            rows,
            default_score,
        }
    }

    /// Expand a substitution matrix along a query, which is what a
    /// position-specific matrix degenerates to without a profile.
    pub fn from_query(query: &[u8], matrix: &ScoringMatrix) -> Self {
        let rows = query
            .iter()
            .map(|&q| (0..matrix.size()).map(|s| matrix.get(q, s as u8)).collect())
            .collect();
        Self::new(rows, matrix.default_score)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl Scorer for PositionSpecific {
    #[inline]
    fn score(&self, q_pos: usize, _q: u8, s: u8) -> i32 {
        self.rows
            .get(q_pos)
            .and_then(|row| row.get(s as usize))
            .copied()
            .unwrap_or(self.default_score)
    }
}
