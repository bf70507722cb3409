//! Random access to the subject database.

use std::borrow::Cow;

use super::encoding;

/// Indexed access to encoded subject sequences. Implementations are shared by
/// all workers and must be safe to call concurrently.
pub trait SequenceSource: Sync {
    fn num_sequences(&self) -> usize;

    /// Sum of all subject lengths
    fn total_length(&self) -> usize;

    fn length(&self, oid: usize) -> usize;

    /// Identifier reported for subject `oid`
    fn id(&self, oid: usize) -> &str;

    /// `len` encoded residues starting at `start`, in the alphabet the word
    /// index was built for. Ambiguous positions may be replaced by a concrete
    /// code; use [`true_bytes`](Self::true_bytes) to see the real residues.
    fn bytes(&self, oid: usize, start: usize, len: usize) -> Cow<'_, [u8]>;

    fn has_ambiguities(&self, _oid: usize) -> bool {
        false
    }

    /// Residues including ambiguity codes. `None` when the source keeps no
    /// separate representation.
    fn true_bytes(&self, _oid: usize, _start: usize, _len: usize) -> Option<Cow<'_, [u8]>> {
        None
    }
}

#[derive(Debug, Clone)]
struct SubjectRecord {
    id: String,
    scan: Vec<u8>,
    /// Present only when `scan` differs from the true residues
    exact: Option<Vec<u8>>,
}

/// A database held entirely in memory
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    records: Vec<SubjectRecord>,
    total_length: usize,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a nucleotide subject given as IUPAC text
    pub fn push_nucleotide(&mut self, id: &str, seq: &[u8]) -> usize {
        let codes = encoding::encode(seq);
        let exact = codes
            .iter()
            .any(|&c| encoding::is_ambiguous(c))
            .then(|| codes.clone());
        let scan = match exact {
            Some(ref exact) => encoding::compress(exact),
            None => codes,
        };
        self.push_record(id, scan, exact)
    }

    /// Add a subject that is already encoded in the scanning alphabet
    pub fn push_encoded(&mut self, id: &str, codes: Vec<u8>) -> usize {
        self.push_record(id, codes, None)
    }

    fn push_record(&mut self, id: &str, scan: Vec<u8>, exact: Option<Vec<u8>>) -> usize {
        self.total_length += scan.len();
        self.records.push(SubjectRecord {
            id: id.to_string(),
            scan,
            exact,
        });
        self.records.len() - 1
    }

    pub fn from_nucleotides<'a, I>(subjects: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a [u8])>,
    {
        let mut source = Self::new();
        for (id, seq) in subjects {
            source.push_nucleotide(id, seq);
        }
        source
    }
}

fn window(data: &[u8], start: usize, len: usize) -> &[u8] {
    let start = start.min(data.len());
    let end = start.saturating_add(len).min(data.len());
    &data[start..end]
}

impl SequenceSource for InMemorySource {
    fn num_sequences(&self) -> usize {
        self.records.len()
    }

    fn total_length(&self) -> usize {
        self.total_length
    }

    fn length(&self, oid: usize) -> usize {
        self.records[oid].scan.len()
    }

    fn id(&self, oid: usize) -> &str {
        &self.records[oid].id
    }

    fn bytes(&self, oid: usize, start: usize, len: usize) -> Cow<'_, [u8]> {
        Cow::Borrowed(window(&self.records[oid].scan, start, len))
    }

    fn has_ambiguities(&self, oid: usize) -> bool {
        self.records[oid].exact.is_some()
    }

    fn true_bytes(&self, oid: usize, start: usize, len: usize) -> Option<Cow<'_, [u8]>> {
        self.records[oid]
            .exact
            .as_deref()
            .map(|exact| Cow::Borrowed(window(exact, start, len)))
    }
}
