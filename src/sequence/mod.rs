//! Encoded sequences, query contexts and subject sources.

pub mod encoding;
pub mod source;

pub use source::{InMemorySource, SequenceSource};

/// An owned encoded residue buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceBlock {
    data: Vec<u8>,
    /// Strand (+1/-1) or translation frame; 0 when not applicable
    pub frame: i8,
}

impl SequenceBlock {
    pub fn new(residues: Vec<u8>, frame: i8) -> Self {
        Self { data: residues, frame }
    }

    #[inline]
    pub fn residues(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// One searchable strand or frame of a query. Statistics, cutoffs and the
/// diagonal table are kept per context.
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Position of this context in its [`QuerySet`]
    pub index: usize,
    /// Identifier of the query the context was derived from
    pub query_id: String,
    pub block: SequenceBlock,
}

impl QueryContext {
    #[inline]
    pub fn residues(&self) -> &[u8] {
        self.block.residues()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.block.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.block.is_empty()
    }

    #[inline]
    pub fn frame(&self) -> i8 {
        self.block.frame
    }
}

/// All contexts of the queries in one search
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    contexts: Vec<QueryContext>,
}

impl QuerySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an already-encoded context and return its index
    pub fn push(&mut self, query_id: &str, residues: Vec<u8>, frame: i8) -> usize {
        let index = self.contexts.len();
        self.contexts.push(QueryContext {
            index,
            query_id: query_id.to_string(),
            block: SequenceBlock::new(residues, frame),
        });
        index
    }

    /// Add a nucleotide query given as IUPAC text: the plus strand and, if
    /// requested, the reverse complement as a second context.
    pub fn push_nucleotide(&mut self, query_id: &str, seq: &[u8], both_strands: bool) {
        let plus = encoding::encode(seq);
        let minus = both_strands.then(|| encoding::reverse_complement(&plus));
        self.push(query_id, plus, 1);
        if let Some(minus) = minus {
            self.push(query_id, minus, -1);
        }
    }

    pub fn from_nucleotide(query_id: &str, seq: &[u8], both_strands: bool) -> Self {
        let mut set = Self::new();
        set.push_nucleotide(query_id, seq, both_strands);
        set
    }

    #[inline]
    pub fn contexts(&self) -> &[QueryContext] {
        &self.contexts
    }

    #[inline]
    pub fn context(&self, index: usize) -> &QueryContext {
        &self.contexts[index]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }

    pub fn max_context_len(&self) -> usize {
        self.contexts.iter().map(|c| c.len()).max().unwrap_or(0)
    }
}
