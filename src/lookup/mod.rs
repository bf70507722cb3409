//! Word index mapping fixed-width words to query positions.
//!
//! The search core only consumes [`LookupIndex`]. [`WordLookup`] is a simple
//! hash-backed implementation for callers that have no prebuilt index.

use rustc_hash::FxHashMap;

use crate::error::SearchError;
use crate::sequence::QuerySet;

/// How words are packed into integers: each symbol takes `bits_per_symbol`
/// bits and only codes below `alphabet_size` may appear inside a word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordEncoding {
    pub bits_per_symbol: u32,
    pub alphabet_size: usize,
    pub word_width: usize,
}

impl WordEncoding {
    pub fn new(
        bits_per_symbol: u32,
        alphabet_size: usize,
        word_width: usize,
    ) -> Result<Self, SearchError> {
        if word_width == 0 || bits_per_symbol == 0 {
            return Err(SearchError::InvalidConfig(
                "word width and symbol size must be positive".to_string(),
            ));
        }
        if bits_per_symbol as usize * word_width > 64 {
            return Err(SearchError::InvalidConfig(format!(
                "a word of {} symbols at {} bits does not fit in 64 bits",
                word_width, bits_per_symbol
            )));
        }
        if alphabet_size > 1usize << bits_per_symbol {
            return Err(SearchError::InvalidConfig(format!(
                "alphabet of {} codes does not fit in {} bits",
                alphabet_size, bits_per_symbol
            )));
        }
        Ok(Self {
            bits_per_symbol,
            alphabet_size,
            word_width,
        })
    }

    /// 2 bits per base over A, C, G, T
    pub fn nucleotide(word_width: usize) -> Result<Self, SearchError> {
        Self::new(2, crate::sequence::encoding::NUCL_ALPHABET, word_width)
    }

    #[inline]
    pub fn mask(&self) -> u64 {
        let bits = self.bits_per_symbol as usize * self.word_width;
        if bits >= 64 {
            u64::MAX
        } else {
            (1u64 << bits) - 1
        }
    }

    #[inline]
    pub fn is_word_symbol(&self, code: u8) -> bool {
        (code as usize) < self.alphabet_size
    }

    /// Slide the word one symbol to the right
    #[inline]
    pub fn push(&self, word: u64, code: u8) -> u64 {
        ((word << self.bits_per_symbol) | code as u64) & self.mask()
    }

    /// Encode a whole word; `None` if it contains a non-word symbol
    pub fn encode(&self, symbols: &[u8]) -> Option<u64> {
        if symbols.len() != self.word_width {
            return None;
        }
        symbols.iter().try_fold(0u64, |word, &code| {
            self.is_word_symbol(code).then(|| self.push(word, code))
        })
    }
}

/// One occurrence of a word in the queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct QueryHit {
    /// Offset of the word's first symbol within its context
    pub query_offset: u32,
    pub context: u32,
}

/// Read-only map from packed words to query occurrences
pub trait LookupIndex: Sync {
    fn encoding(&self) -> WordEncoding;

    fn hits_for_word(&self, word: u64) -> &[QueryHit];
}

/// Hash-backed word index over all contexts of a [`QuerySet`]
#[derive(Debug, Clone)]
pub struct WordLookup {
    encoding: WordEncoding,
    table: FxHashMap<u64, Vec<QueryHit>>,
}

impl WordLookup {
    pub fn build(queries: &QuerySet, encoding: WordEncoding) -> Self {
        Self::build_filtered(queries, encoding, None)
    }

    /// Like [`build`](Self::build), but words occurring more than
    /// `max_hits_per_word` times are left out of the index.
    pub fn build_filtered(
        queries: &QuerySet,
        encoding: WordEncoding,
        max_hits_per_word: Option<usize>,
    ) -> Self {
        let mut table: FxHashMap<u64, Vec<QueryHit>> = FxHashMap::default();
        let width = encoding.word_width;

        for ctx in queries.contexts() {
            let residues = ctx.residues();
            let mut word = 0u64;
            let mut valid = 0usize;
            for (pos, &code) in residues.iter().enumerate() {
                if !encoding.is_word_symbol(code) {
                    valid = 0;
                    word = 0;
                    continue;
                }
                word = encoding.push(word, code);
                valid += 1;
                if valid >= width {
                    table.entry(word).or_default().push(QueryHit {
                        query_offset: (pos + 1 - width) as u32,
                        context: ctx.index as u32,
                    });
                }
            }
        }

        if let Some(limit) = max_hits_per_word {
            table.retain(|_, hits| hits.len() <= limit);
        }

        Self { encoding, table }
    }

    /// Number of distinct words indexed
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl LookupIndex for WordLookup {
    fn encoding(&self) -> WordEncoding {
        self.encoding
    }

    fn hits_for_word(&self, word: u64) -> &[QueryHit] {
        self.table.get(&word).map(Vec::as_slice).unwrap_or(&[])
    }
}
