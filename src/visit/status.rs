use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const CREATED: &str = "created";
const COMPLETED: &str = "completed";
const FAILED: &str = "Failed...";
const REOPENED: &str = "reopened";
const PROCESSING_PREFIX: &str = "processing chunk:";
const PROCESSED_PREFIX: &str = "Processed chunk number: ";
const PROCESSED_SUFFIX: &str = " completed";

/// Visit status as observed by status readers.
///
/// Rendered and parsed as the exact strings stored in the record, e.g.
/// `processing chunk:3` or `Processed chunk number: 3 completed`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VisitStatus {
    Created,
    Processing { chunk_number: u32 },
    Processed { chunk_number: u32 },
    Completed,
    Failed,
    Reopened,
    /// A status string written by something other than this pipeline
    Other(String),
}

impl VisitStatus {
    /// Whether the visit has reached a state that ends normal processing.
    pub fn is_terminal(&self) -> bool {
        matches!(self, VisitStatus::Completed | VisitStatus::Failed)
    }

    /// Transition table for status changes requested through the coordinator.
    pub fn can_transition_to(&self, next: &VisitStatus) -> bool {
        use VisitStatus::*;

        match (self, next) {
            (Created | Processing { .. } | Processed { .. } | Failed | Reopened, Processing { .. }) => {
                true
            }
            (Processing { .. }, Processed { .. } | Completed | Failed) => true,
            (Failed, Processed { .. } | Completed) => true,
            (Completed, Reopened) => true,
            (Other(_), Processing { .. }) => true,
            _ => false,
        }
    }
}

impl fmt::Display for VisitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VisitStatus::Created => f.write_str(CREATED),
            VisitStatus::Processing { chunk_number } => {
                write!(f, "{}{}", PROCESSING_PREFIX, chunk_number)
            }
            VisitStatus::Processed { chunk_number } => {
                write!(f, "{}{}{}", PROCESSED_PREFIX, chunk_number, PROCESSED_SUFFIX)
            }
            VisitStatus::Completed => f.write_str(COMPLETED),
            VisitStatus::Failed => f.write_str(FAILED),
            VisitStatus::Reopened => f.write_str(REOPENED),
            VisitStatus::Other(raw) => f.write_str(raw),
        }
    }
}

impl FromStr for VisitStatus {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let status = match s {
            CREATED => VisitStatus::Created,
            COMPLETED => VisitStatus::Completed,
            FAILED => VisitStatus::Failed,
            REOPENED => VisitStatus::Reopened,
            _ => {
                if let Some(n) = s
                    .strip_prefix(PROCESSING_PREFIX)
                    .and_then(|rest| rest.parse().ok())
                {
                    VisitStatus::Processing { chunk_number: n }
                } else if let Some(n) = s
                    .strip_prefix(PROCESSED_PREFIX)
                    .and_then(|rest| rest.strip_suffix(PROCESSED_SUFFIX))
                    .and_then(|n| n.parse().ok())
                {
                    VisitStatus::Processed { chunk_number: n }
                } else {
                    VisitStatus::Other(s.to_string())
                }
            }
        };

        Ok(status)
    }
}

impl From<&str> for VisitStatus {
    fn from(s: &str) -> Self {
        match s.parse() {
            Ok(status) => status,
            Err(never) => match never {},
        }
    }
}

impl Serialize for VisitStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VisitStatus {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(VisitStatus::from(raw.as_str()))
    }
}
