//! BLASTNA nucleotide encoding.
//!
//! Codes 0..=3 are the unambiguous bases A, C, G, T; 4..=14 are the IUPAC
//! ambiguity codes; 15 doubles as gap and sentinel. The word index only ever
//! sees codes below [`NUCL_ALPHABET`]; every other code breaks a word.

pub const A: u8 = 0;
pub const C: u8 = 1;
pub const G: u8 = 2;
pub const T: u8 = 3;
pub const N: u8 = 14;
pub const SENTINEL: u8 = 15;

/// Number of unambiguous nucleotide codes
pub const NUCL_ALPHABET: usize = 4;
/// Number of BLASTNA codes including ambiguity codes and the sentinel
pub const BLASTNA_SIZE: usize = 16;

/// IUPAC letter for each BLASTNA code
pub const BLASTNA_LETTERS: &[u8; BLASTNA_SIZE] = b"ACGTRYMKWSBDHVN-";

/// Bases covered by each code, as bits A=1, C=2, G=4, T=8
pub const BASE_SETS: [u8; BLASTNA_SIZE] = [
    0b0001, // A
    0b0010, // C
    0b0100, // G
    0b1000, // T
    0b0101, // R = A|G
    0b1010, // Y = C|T
    0b0011, // M = A|C
    0b1100, // K = G|T
    0b1001, // W = A|T
    0b0110, // S = C|G
    0b1110, // B = C|G|T
    0b1101, // D = A|G|T
    0b1011, // H = A|C|T
    0b0111, // V = A|C|G
    0b1111, // N
    0b0000, // gap / sentinel
];

const COMPLEMENT: [u8; BLASTNA_SIZE] = [
    T, G, C, A, // A C G T
    5, 4, // R <-> Y
    7, 6, // M <-> K
    8, 9, // W, S are self-complementary
    13, 12, 11, 10, // B <-> V, D <-> H
    N, SENTINEL,
];

/// Encode one IUPAC character. `U` reads as `T`; anything unknown becomes `N`.
#[inline]
pub fn encode_base(ch: u8) -> u8 {
    match ch.to_ascii_uppercase() {
        b'A' => A,
        b'C' => C,
        b'G' => G,
        b'T' | b'U' => T,
        b'R' => 4,
        b'Y' => 5,
        b'M' => 6,
        b'K' => 7,
        b'W' => 8,
        b'S' => 9,
        b'B' => 10,
        b'D' => 11,
        b'H' => 12,
        b'V' => 13,
        b'-' => SENTINEL,
        _ => N,
    }
}

pub fn encode(seq: &[u8]) -> Vec<u8> {
    seq.iter().map(|&c| encode_base(c)).collect()
}

pub fn decode(codes: &[u8]) -> String {
    codes
        .iter()
        .map(|&c| BLASTNA_LETTERS[(c as usize).min(BLASTNA_SIZE - 1)] as char)
        .collect()
}

#[inline]
pub fn complement(code: u8) -> u8 {
    COMPLEMENT[(code as usize).min(BLASTNA_SIZE - 1)]
}

pub fn reverse_complement(codes: &[u8]) -> Vec<u8> {
    codes.iter().rev().map(|&c| complement(c)).collect()
}

#[inline]
pub fn is_ambiguous(code: u8) -> bool {
    (code as usize) >= NUCL_ALPHABET
}

/// Replace every ambiguity code by the first base it covers, giving the
/// 2-bit-safe form scanned by the word finder. The true residues are kept
/// separately for rescoring.
pub fn compress(codes: &[u8]) -> Vec<u8> {
    codes
        .iter()
        .map(|&c| {
            let set = BASE_SETS[(c as usize).min(BLASTNA_SIZE - 1)];
            if set == 0 {
                A
            } else {
                set.trailing_zeros() as u8
            }
        })
        .collect()
}
