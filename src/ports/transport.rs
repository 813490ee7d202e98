use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::AppError;

/// One speech-provider transcription request.
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// Raw audio payload.
    pub audio: Vec<u8>,
    /// File name attached to the multipart upload.
    pub file_name: String,
    pub mime_type: String,
    pub model: String,
    /// Optional language hint (ISO 639-1 code).
    pub language: Option<String>,
    pub api_key: String,
}

/// Provider-supplied segment, when the provider reports a breakdown.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechSegment {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// Speech provider response shape.
#[derive(Debug, Clone, Deserialize)]
pub struct SpeechResponse {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub segments: Option<Vec<SpeechSegment>>,
}

/// One request to the generative provider's `:generateContent` call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub parts: Vec<Part>,
    pub generation_config: Option<GenerationConfig>,
    pub api_key: String,
}

impl GenerateRequest {
    /// Serialize the request into the provider's JSON body shape.
    pub fn body(&self) -> Result<serde_json::Value, AppError> {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": serde_json::to_value(&self.parts)?,
            }],
        });
        if let Some(config) = &self.generation_config {
            body["generationConfig"] = serde_json::to_value(config)?;
        }
        Ok(body)
    }
}

/// One part of a generative request: plain text or inline binary data.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Part {
    Text { text: String },
    InlineData { inline_data: InlineData },
}

/// Base64-encoded inline payload.
#[derive(Debug, Clone, Serialize)]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

/// Generation knobs forwarded to the provider.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(rename = "maxOutputTokens", skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

/// Generative provider response shape.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<CandidateContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CandidateContent {
    #[serde(default)]
    pub parts: Vec<TextPart>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextPart {
    #[serde(default)]
    pub text: String,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate, or `None` when the
    /// response carries no content at all. An empty string is a valid
    /// (content-poor) result and is returned as `Some`.
    pub fn first_text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        Some(
            content
                .parts
                .iter()
                .map(|p| p.text.as_str())
                .collect::<Vec<_>>()
                .join(""),
        )
    }
}

/// Provider transport port. The orchestrator's algorithm is written
/// once against this seam; the native implementation calls providers
/// directly, the web implementation routes through the same-origin
/// proxy. Implementations bound every call by [`request_timeout`].
///
/// [`request_timeout`]: Transport::request_timeout
#[async_trait]
pub trait Transport: Send + Sync {
    /// Dispatch audio to the speech provider.
    async fn transcribe_audio(&self, request: SpeechRequest) -> Result<SpeechResponse, AppError>;

    /// Dispatch a content-generation request to the generative provider.
    async fn generate_content(&self, request: GenerateRequest)
        -> Result<GenerateResponse, AppError>;

    /// Upper bound applied to each provider call.
    fn request_timeout(&self) -> Duration;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_body_shape() {
        let request = GenerateRequest {
            model: "gemini-1.5-flash".to_string(),
            parts: vec![
                Part::Text {
                    text: "Transcribe this".to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: "audio/wav".to_string(),
                        data: "AAAA".to_string(),
                    },
                },
            ],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: None,
            }),
            api_key: "k".to_string(),
        };

        let body = request.body().unwrap();
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Transcribe this");
        assert_eq!(
            body["contents"][0]["parts"][1]["inline_data"]["mime_type"],
            "audio/wav"
        );
        assert_eq!(body["generationConfig"]["temperature"], 0.0);
        assert!(body["generationConfig"].get("maxOutputTokens").is_none());
    }

    #[test]
    fn test_first_text_joins_parts() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(response.first_text(), Some("Hello world".to_string()));
    }

    #[test]
    fn test_first_text_empty_response() {
        let response: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(response.first_text(), None);
    }

    #[test]
    fn test_speech_response_minimal_shape() {
        let response: SpeechResponse = serde_json::from_str(r#"{"text":"hi"}"#).unwrap();
        assert_eq!(response.text, "hi");
        assert!(response.segments.is_none());
        assert!(response.duration.is_none());
    }
}
