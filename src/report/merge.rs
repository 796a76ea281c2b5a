//! Report merge engine
//!
//! The oracle is handed the prior report as context and returns a whole,
//! self-consistent report. Merging is therefore full replacement; the only
//! real work here is rejecting output that does not fit the report shape.

use super::types::Report;
use crate::visit::VisitStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("oracle output is not a valid report: {0}")]
    Shape(#[from] serde_json::Error),

    #[error("section {section} has a blank parameter")]
    BlankParameter { section: &'static str },

    #[error("section {section} has a blank evidence entry")]
    BlankEvidence { section: &'static str },
}

/// Result of merging one oracle output into the stored report
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    /// The report to store, exactly the validated oracle output
    pub report: Report,

    /// Whether a prior report existed and is being replaced
    pub replaced_prior: bool,
}

/// Validate raw oracle output and merge it over the prior report.
pub fn merge(prior: Option<&Report>, oracle_output: &str) -> Result<MergeOutcome, MergeError> {
    let report = validate(oracle_output)?;

    Ok(MergeOutcome {
        report,
        replaced_prior: prior.is_some(),
    })
}

/// Parse oracle output and check every section carries usable content.
pub fn validate(oracle_output: &str) -> Result<Report, MergeError> {
    let report: Report = serde_json::from_str(oracle_output)?;

    for (name, section) in report.soap_note.sections() {
        if section.parameter.trim().is_empty() {
            return Err(MergeError::BlankParameter { section: name });
        }
        if section.evidence.iter().any(|e| e.trim().is_empty()) {
            return Err(MergeError::BlankEvidence { section: name });
        }
    }

    Ok(report)
}

/// Status written alongside a successfully merged report.
pub fn status_after(chunk_number: u32, is_final: bool) -> VisitStatus {
    if is_final {
        VisitStatus::Completed
    } else {
        VisitStatus::Processed { chunk_number }
    }
}
