//! Seed extension, ambiguity rescoring and the gapped-alignment boundary.

pub mod gapped;
pub mod reevaluate;
pub mod ungapped;

pub use gapped::{EditOp, GappedAligner, GappedAlignment, NoGappedAligner};
pub use reevaluate::{rescore_ungapped, Rescored};
pub use ungapped::{Extension, UngappedExtender};
