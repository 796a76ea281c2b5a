use serde::{Deserialize, Serialize};

/// Placeholder parameter for a section with nothing recorded yet
pub const NOT_AVAILABLE: &str = "N/A";

/// One SOAP section: a short finding plus verbatim transcript evidence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteSection {
    /// Short text summarizing the section
    pub parameter: String,

    /// Exact words from the transcription supporting `parameter`
    pub evidence: Vec<String>,
}

impl NoteSection {
    pub fn new(parameter: impl Into<String>, evidence: Vec<String>) -> Self {
        Self {
            parameter: parameter.into(),
            evidence,
        }
    }

    /// A section that explicitly records that nothing is known yet.
    pub fn not_available() -> Self {
        Self::new(NOT_AVAILABLE, Vec::new())
    }

    pub fn is_available(&self) -> bool {
        self.parameter != NOT_AVAILABLE
    }
}

/// The four-section clinical note accumulated across chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoapNote {
    #[serde(rename = "Subjective")]
    pub subjective: NoteSection,

    #[serde(rename = "Objective")]
    pub objective: NoteSection,

    #[serde(rename = "Assessment")]
    pub assessment: NoteSection,

    #[serde(rename = "Plan")]
    pub plan: NoteSection,
}

impl SoapNote {
    /// Sections paired with their display names, in note order.
    pub fn sections(&self) -> [(&'static str, &NoteSection); 4] {
        [
            ("Subjective", &self.subjective),
            ("Objective", &self.objective),
            ("Assessment", &self.assessment),
            ("Plan", &self.plan),
        ]
    }
}

impl Default for SoapNote {
    fn default() -> Self {
        Self {
            subjective: NoteSection::not_available(),
            objective: NoteSection::not_available(),
            assessment: NoteSection::not_available(),
            plan: NoteSection::not_available(),
        }
    }
}

/// Structured visit report produced by the oracle and stored per visit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Information learned from the chunk that produced this report
    pub detailed_summary: String,

    #[serde(rename = "SOAP_note_so_far")]
    pub soap_note: SoapNote,
}
