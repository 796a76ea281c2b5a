//! Prompt and response schema sent to the oracle

use crate::report::Report;
use serde_json::{json, Value};

const CHUNK_PREAMBLE: &str = "You are given an audio transcript chunk from a clinical scenario.";

const PRIOR_REPORT_INTRO: &str =
    "Here is the previous report to update with new information (include exact evidences):";

const TASKS: &str = "Your tasks:\n\
1. Provide a detailed summary of the new information.\n\
2. Update or draft the SOAP note so far, including evidence (exact transcription words) for each section.\n\
Use \"N/A\" as the parameter of any section with nothing recorded yet.";

/// Build the text prompt that accompanies an audio chunk.
pub fn build_prompt(context_label: &str, prior_report: Option<&Report>) -> String {
    let mut parts = vec![
        format!("Type of Visit: {}", context_label),
        CHUNK_PREAMBLE.to_string(),
    ];

    if let Some(report) = prior_report {
        parts.push(PRIOR_REPORT_INTRO.to_string());
        // Report always serializes; fall back to Debug rather than drop context
        parts.push(serde_json::to_string_pretty(report).unwrap_or_else(|_| format!("{:?}", report)));
    }

    parts.push(TASKS.to_string());
    parts.join("\n\n")
}

/// JSON schema of `Report` in the oracle's response-schema dialect.
pub fn report_schema() -> Value {
    let section = json!({
        "type": "OBJECT",
        "properties": {
            "parameter": { "type": "STRING" },
            "evidence": { "type": "ARRAY", "items": { "type": "STRING" } }
        },
        "required": ["parameter", "evidence"]
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "detailed_summary": { "type": "STRING" },
            "SOAP_note_so_far": {
                "type": "OBJECT",
                "properties": {
                    "Subjective": section.clone(),
                    "Objective": section.clone(),
                    "Assessment": section.clone(),
                    "Plan": section
                },
                "required": ["Subjective", "Objective", "Assessment", "Plan"]
            }
        },
        "required": ["detailed_summary", "SOAP_note_so_far"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::SoapNote;

    #[test]
    fn test_prompt_without_prior_report() {
        let prompt = build_prompt("follow-up", None);

        assert!(prompt.starts_with("Type of Visit: follow-up"));
        assert!(prompt.contains("Your tasks:"));
        assert!(!prompt.contains("previous report"));
    }

    #[test]
    fn test_prompt_includes_prior_report() {
        let prior = Report {
            detailed_summary: "Patient reports dizziness".to_string(),
            soap_note: SoapNote::default(),
        };

        let prompt = build_prompt("initial", Some(&prior));

        assert!(prompt.contains("previous report to update"));
        assert!(prompt.contains("Patient reports dizziness"));
        assert!(prompt.contains("SOAP_note_so_far"));
    }

    #[test]
    fn test_schema_requires_all_sections() {
        let schema = report_schema();
        let required = &schema["properties"]["SOAP_note_so_far"]["required"];
        assert_eq!(required.as_array().map(|a| a.len()), Some(4));
    }
}
