//! Google Translate (public `translate_a/single` endpoint)
//!
//! One request translates at most `max_request_chars` characters; longer
//! texts must be chunked by the caller.

use async_trait::async_trait;
use medimind_foundation::TranslatorConfig;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::ProviderError;
use crate::r#trait::Translator;

/// Google Translate client
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: Client,
    base_url: String,
    source_language: String,
    max_request_chars: usize,
}

impl GoogleTranslator {
    pub fn from_config(config: &TranslatorConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            source_language: config.source_language.clone(),
            max_request_chars: config.max_request_chars,
        })
    }

    fn query<'a>(&'a self, text: &'a str, target_language: &'a str) -> [(&'static str, &'a str); 5] {
        [
            ("client", "gtx"),
            ("sl", self.source_language.as_str()),
            ("tl", target_language),
            ("dt", "t"),
            ("q", text),
        ]
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, ProviderError> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let chars = text.chars().count();
        if chars > self.max_request_chars {
            return Err(ProviderError::InvalidRequest(format!(
                "text of {} chars exceeds the {} char translation limit",
                chars, self.max_request_chars
            )));
        }

        debug!(target_language, chars, "sending translation request");
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.query(text, target_language))
            .send()
            .await
            .map_err(|e| ProviderError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(match status {
                400 => ProviderError::InvalidRequest(format!(
                    "translation to '{}' rejected: {}",
                    target_language, body
                )),
                _ => ProviderError::from_http_status(status, &body),
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        parse_translation(&body)
    }

    fn max_request_chars(&self) -> Option<usize> {
        Some(self.max_request_chars)
    }
}

/// The response is `[[["translated", "original", ...], ...], ...]`
fn parse_translation(body: &Value) -> Result<String, ProviderError> {
    let segments = body
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| ProviderError::InvalidResponse("missing translation segments".to_string()))?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn translator(max_request_chars: usize) -> GoogleTranslator {
        GoogleTranslator::from_config(&TranslatorConfig {
            max_request_chars,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_parse_translation() {
        let body = json!([
            [["नमस्ते ", "Hello ", null, null, 10], ["दुनिया", "world", null, null, 10]],
            null,
            "en"
        ]);
        assert_eq!(parse_translation(&body).unwrap(), "नमस्ते दुनिया");
        assert!(parse_translation(&json!({"error": "x"})).is_err());
    }

    #[test]
    fn test_query_params() {
        let t = translator(5000);
        let query = t.query("hi there", "te");
        assert_eq!(query[1], ("sl", "auto"));
        assert_eq!(query[2], ("tl", "te"));
        assert_eq!(query[4], ("q", "hi there"));
        assert_eq!(t.max_request_chars(), Some(5000));
    }

    #[tokio::test]
    async fn test_limits_checked_before_request() {
        let t = translator(4);
        let err = t.translate("too long", "hi").await.unwrap_err();
        assert!(matches!(err, ProviderError::InvalidRequest(_)));

        assert_eq!(t.translate("   ", "hi").await.unwrap(), "   ");
    }
}
