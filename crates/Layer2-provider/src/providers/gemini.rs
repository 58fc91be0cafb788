//! Google Gemini generator (`generateContent` REST endpoint)

use async_trait::async_trait;
use medimind_foundation::GeneratorConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::ProviderError;
use crate::r#trait::{find_language, QuestionAnswerer, Summarizer};

/// Gemini-backed summarizer and question answerer
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: Option<u32>,
}

impl GeminiClient {
    /// Create a client from configuration, reading the API key from the
    /// configured environment variable
    pub fn from_config(config: &GeneratorConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key()
            .map_err(|e| ProviderError::NotConfigured(e.to_string()))?;
        Self::new(api_key, config)
    }

    pub fn new(api_key: impl Into<String>, config: &GeneratorConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key: api_key.into(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: config.max_output_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn generate_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        )
    }

    fn build_request(&self, prompt: String) -> GeminiRequest {
        GeminiRequest {
            contents: vec![GeminiContent {
                role: "user".to_string(),
                parts: vec![GeminiPart { text: prompt }],
            }],
            generation_config: self.max_output_tokens.map(|max| GeminiGenerationConfig {
                max_output_tokens: Some(max),
            }),
        }
    }

    async fn generate(&self, prompt: String) -> Result<String, ProviderError> {
        let request = self.build_request(prompt);
        debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(self.generate_url())
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_error_response(status.as_u16(), &body));
        }

        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        extract_text(body)
    }
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiClient")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Summarizer for GeminiClient {
    async fn summarize(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        self.generate(summary_prompt(text, target_language)).await
    }
}

#[async_trait]
impl QuestionAnswerer for GeminiClient {
    async fn answer(&self, text: &str, question: &str) -> Result<String, ProviderError> {
        self.generate(answer_prompt(text, question)).await
    }
}

fn summary_prompt(report: &str, target_language: &str) -> String {
    let language = find_language(target_language)
        .map(|l| l.name)
        .unwrap_or(target_language);
    format!(
        "Summarize this medical report for a clinician. Be clear and concise and \
         write the summary in {language}.\n\nMedical report:\n{report}\n\nSummary:"
    )
}

fn answer_prompt(report: &str, question: &str) -> String {
    format!(
        "Answer the question using only the medical report below.\n\n\
         Medical report:\n{report}\n\nQuestion: {question}\n\nAnswer:"
    )
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GeminiResponse) -> Result<String, ProviderError> {
    let candidate = response.candidates.into_iter().next().ok_or_else(|| {
        match response.prompt_feedback.and_then(|f| f.block_reason) {
            Some(reason) => ProviderError::ContentFiltered(reason),
            None => ProviderError::InvalidResponse("No candidates in response".to_string()),
        }
    })?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(ProviderError::ContentFiltered(
                "response blocked for safety".to_string(),
            ));
        }
        warn!(finish_reason = ?candidate.finish_reason, "empty generation");
        return Err(ProviderError::InvalidResponse("Empty response text".to_string()));
    }
    Ok(text)
}

fn parse_error_response(status: u16, body: &str) -> ProviderError {
    // Try to parse as JSON error
    if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(body) {
        let error = error_response.error;
        let message = error.message;

        return match error.status.as_deref() {
            Some("RESOURCE_EXHAUSTED") => ProviderError::RateLimited {
                retry_after_ms: None,
            },
            Some("INVALID_ARGUMENT") => {
                if message.contains("API key") {
                    ProviderError::Authentication(message)
                } else {
                    ProviderError::InvalidRequest(message)
                }
            }
            Some("PERMISSION_DENIED") | Some("UNAUTHENTICATED") => {
                ProviderError::Authentication(message)
            }
            Some("NOT_FOUND") => ProviderError::ModelNotFound(message),
            _ => ProviderError::from_http_status(status, &message),
        };
    }

    ProviderError::from_http_status(status, body)
}

// ============================================================================
// Gemini API Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: String,
}

// Response types
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

// Error types
#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    message: String,
    status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new("test-key", &GeneratorConfig::default()).unwrap()
    }

    #[test]
    fn test_generate_url() {
        assert_eq!(
            client().generate_url(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent?key=test-key"
        );
    }

    #[test]
    fn test_request_shape() {
        let request = client().build_request("hello".to_string());
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hello");
        assert!(json.get("generationConfig").is_none());
    }

    #[test]
    fn test_prompts_mention_inputs() {
        let prompt = summary_prompt("HbA1c 7.2%", "hi");
        assert!(prompt.contains("HbA1c 7.2%"));
        assert!(prompt.contains("Hindi"));

        let prompt = answer_prompt("HbA1c 7.2%", "Is this diabetic?");
        assert!(prompt.contains("Is this diabetic?"));
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "Normal "}, {"text": "results."}]}, "finishReason": "STOP"}]}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert_eq!(extract_text(response).unwrap(), "Normal results.");
    }

    #[test]
    fn test_blocked_prompt() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        let response: GeminiResponse = serde_json::from_str(body).unwrap();
        assert!(matches!(
            extract_text(response),
            Err(ProviderError::ContentFiltered(_))
        ));
    }

    #[test]
    fn test_parse_error_response() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert!(matches!(
            parse_error_response(400, body),
            ProviderError::Authentication(_)
        ));

        let body = r#"{"error": {"code": 429, "message": "quota", "status": "RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            parse_error_response(429, body),
            ProviderError::RateLimited { .. }
        ));

        assert!(matches!(
            parse_error_response(502, "<html>bad gateway</html>"),
            ProviderError::ServerError(_)
        ));
    }

    #[test]
    fn test_missing_key() {
        let config = GeneratorConfig {
            api_key_env: "MEDIMIND_TEST_UNSET_GEMINI_KEY".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            GeminiClient::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }
}
