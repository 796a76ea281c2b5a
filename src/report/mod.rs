//! Structured visit reports and the merge engine that accepts them

pub mod merge;
mod types;

pub use merge::{merge, status_after, MergeError, MergeOutcome};
pub use types::{NoteSection, Report, SoapNote, NOT_AVAILABLE};
