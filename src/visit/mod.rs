//! Visit aggregate and its status state machine.

mod status;

pub use status::VisitStatus;

use crate::report::Report;
use serde::{Deserialize, Serialize};

/// A single clinical encounter as read back from the record store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Visit {
    pub visit_id: String,

    /// Free-form classification, e.g. "initial" or "follow-up"
    pub visit_type: Option<String>,

    pub status: VisitStatus,

    /// Latest merged report, absent until a chunk completes
    pub report: Option<Report>,
}
