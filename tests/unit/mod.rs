//! Integration tests for seedlink
//!
//! Tests are organized by component:
//! - `diagonal` - diagonal tracker replay through the word finder
//! - `extension` - X-drop extension against a brute-force scan
//! - `linking` - pairwise soundness of both linking strategies
//! - `ranker` - top-K selection
//! - `coordinator` - chunking, splitting, cancellation and setup failures
//! - `pipeline` - ambiguity rescoring, gapped refinement and prescreening
//! - `scenario` - end-to-end searches on small fixed inputs

pub mod helpers;

pub mod coordinator;
pub mod diagonal;
pub mod extension;
pub mod linking;
pub mod pipeline;
pub mod scenario;
