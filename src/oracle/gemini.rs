use super::prompt::{build_prompt, report_schema};
use super::{OracleClient, OracleError, OracleRequest};
use crate::config::OracleConfig;
use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Oracle backed by the Gemini `generateContent` endpoint
pub struct GeminiOracle {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| OracleError::Config("oracle.api_key is not set".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        info!("Gemini oracle configured (model={})", config.model);

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl OracleClient for GeminiOracle {
    async fn summarize(&self, request: OracleRequest<'_>) -> Result<String, OracleError> {
        let prompt = build_prompt(request.context_label, request.prior_report);
        let audio_b64 = base64::engine::general_purpose::STANDARD.encode(&request.audio.bytes);

        let body = json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": request.audio.mime_type, "data": audio_b64 } }
                ]
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": report_schema()
            }
        });

        let started = Instant::now();
        debug!(
            "Calling oracle {} for {} ({} audio bytes, prior report: {})",
            self.model,
            request.context_label,
            request.audio.bytes.len(),
            request.prior_report.is_some()
        );

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(OracleError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        info!(
            "Oracle {} responded in {:.2}s",
            self.model,
            started.elapsed().as_secs_f64()
        );

        extract_report_text(&text)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}

/// Pull the generated JSON text out of a `generateContent` response body.
fn extract_report_text(body: &str) -> Result<String, OracleError> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| OracleError::EmptyResponse(format!("unparseable response envelope: {}", e)))?;

    response
        .candidates
        .into_iter()
        .filter_map(|c| c.content)
        .flat_map(|c| c.parts)
        .find_map(|p| p.text.filter(|t| !t.trim().is_empty()))
        .ok_or_else(|| OracleError::EmptyResponse("no candidate text".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_report_text() {
        let body = r#"{
            "candidates": [{
                "content": { "parts": [{ "text": "{\"detailed_summary\":\"x\"}" }], "role": "model" },
                "finishReason": "STOP"
            }]
        }"#;

        assert_eq!(extract_report_text(body).unwrap(), r#"{"detailed_summary":"x"}"#);
    }

    #[test]
    fn test_extract_without_candidates() {
        let err = extract_report_text(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap_err();
        assert!(matches!(err, OracleError::EmptyResponse(_)));
        assert!(err.is_transient());
    }

    #[test]
    fn test_missing_api_key_is_config_error() {
        let config = OracleConfig {
            api_key: None,
            ..OracleConfig::default()
        };

        assert!(matches!(GeminiOracle::new(&config), Err(OracleError::Config(_))));
    }

    #[test]
    fn test_endpoint_uses_model() {
        let config = OracleConfig {
            api_key: Some("k".to_string()),
            base_url: "https://example.test/".to_string(),
            model: "gemini-2.0-flash".to_string(),
            ..OracleConfig::default()
        };

        let oracle = GeminiOracle::new(&config).unwrap();
        assert_eq!(
            oracle.endpoint(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
    }
}
