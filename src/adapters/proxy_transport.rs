use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;
use url::Url;

use crate::domain::transcription::ProviderKind;
use crate::domain::AppError;
use crate::ports::transport::{
    GenerateRequest, GenerateResponse, SpeechRequest, SpeechResponse, Transport,
};

/// Timeout for proxied provider calls on the web target. Looser than
/// the direct timeout: the proxy hop adds latency on large uploads.
pub const PROXIED_TIMEOUT: Duration = Duration::from_secs(60);

const WHISPER_ROUTE: &str = "/api/whisper";
const GEMINI_ROUTE: &str = "/api/gemini";

/// Error body the proxy returns when it relays a provider failure.
#[derive(Debug, Deserialize)]
struct ProxyErrorBody {
    #[serde(default)]
    error: String,
    #[serde(default)]
    status: Option<u16>,
}

/// Web transport: routes the same logical provider calls through the
/// same-origin proxy, which attaches the secret server-side. The
/// `x-api-key` header exists to satisfy browser cross-origin
/// restrictions, not for security.
pub struct ProxyTransport {
    client: Client,
    base: String,
}

impl ProxyTransport {
    pub fn new(base: &str) -> Result<Self, AppError> {
        let trimmed = base.trim().trim_end_matches('/');
        Url::parse(trimmed)
            .map_err(|e| AppError::Config(format!("invalid proxy base URL '{}': {}", base, e)))?;

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(format!("ChartScribe/{}", env!("CARGO_PKG_VERSION")))
            .timeout(PROXIED_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base: trimmed.to_string(),
        })
    }
}

fn map_send_error(provider: ProviderKind, err: reqwest::Error) -> AppError {
    let message = if err.is_timeout() {
        "proxied request timed out".to_string()
    } else {
        err.to_string()
    };
    AppError::provider(provider, err.status().map(|s| s.as_u16()), message)
}

/// Map a non-2xx proxy response into a provider error, preferring the
/// relayed `{error, status}` JSON over the raw HTTP envelope.
async fn into_proxy_error(provider: ProviderKind, response: reqwest::Response) -> AppError {
    let http_status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ProxyErrorBody>(&body) {
        Ok(relayed) if !relayed.error.is_empty() => AppError::provider(
            provider,
            relayed.status.or(Some(http_status)),
            relayed.error,
        ),
        _ => AppError::provider(
            provider,
            Some(http_status),
            format!("HTTP {}: {}", http_status, body),
        ),
    }
}

#[async_trait]
impl Transport for ProxyTransport {
    async fn transcribe_audio(&self, request: SpeechRequest) -> Result<SpeechResponse, AppError> {
        let part = multipart::Part::bytes(request.audio)
            .file_name(request.file_name)
            .mime_str(&request.mime_type)
            .map_err(|e| {
                AppError::InvalidInput(format!("invalid MIME type '{}': {}", request.mime_type, e))
            })?;

        let mut form = multipart::Form::new()
            .part("file", part)
            .text("model", request.model);
        if let Some(language) = request.language {
            form = form.text("language", language);
        }

        let url = format!("{}{}", self.base, WHISPER_ROUTE);
        debug!(url = %url, "dispatching speech transcription via proxy");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &request.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_send_error(ProviderKind::Speech, e))?;

        if !response.status().is_success() {
            return Err(into_proxy_error(ProviderKind::Speech, response).await);
        }

        response.json::<SpeechResponse>().await.map_err(|e| {
            AppError::provider(
                ProviderKind::Speech,
                None,
                format!("malformed response: {}", e),
            )
        })
    }

    async fn generate_content(
        &self,
        request: GenerateRequest,
    ) -> Result<GenerateResponse, AppError> {
        // The proxy needs the model name to build the upstream URL.
        let mut body = request.body()?;
        body["model"] = serde_json::Value::String(request.model.clone());

        let url = format!("{}{}", self.base, GEMINI_ROUTE);
        debug!(url = %url, "dispatching generative request via proxy");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(ProviderKind::Generative, e))?;

        if !response.status().is_success() {
            return Err(into_proxy_error(ProviderKind::Generative, response).await);
        }

        response.json::<GenerateResponse>().await.map_err(|e| {
            AppError::provider(
                ProviderKind::Generative,
                None,
                format!("malformed response: {}", e),
            )
        })
    }

    fn request_timeout(&self) -> Duration {
        PROXIED_TIMEOUT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn speech_request() -> SpeechRequest {
        SpeechRequest {
            audio: vec![0u8; 32],
            file_name: "take.wav".to_string(),
            mime_type: "audio/wav".to_string(),
            model: "whisper-1".to_string(),
            language: None,
            api_key: "proxy-key".to_string(),
        }
    }

    #[tokio::test]
    async fn test_proxy_speech_route_and_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/whisper")
            .match_header("x-api-key", "proxy-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text":"via proxy"}"#)
            .create_async()
            .await;

        let transport = ProxyTransport::new(&server.url()).unwrap();
        let response = transport.transcribe_audio(speech_request()).await.unwrap();

        assert_eq!(response.text, "via proxy");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_relayed_error_body_wins_over_http_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/whisper")
            .with_status(502)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error":"rate limit exceeded","status":429}"#)
            .create_async()
            .await;

        let transport = ProxyTransport::new(&server.url()).unwrap();
        let err = transport.transcribe_audio(speech_request()).await.unwrap_err();

        match &err {
            AppError::Provider {
                status, message, ..
            } => {
                assert_eq!(*status, Some(429));
                assert_eq!(message, "rate limit exceeded");
            }
            other => panic!("expected provider error, got {:?}", other.to_string()),
        }
        assert!(err.is_rate_limited());
    }

    #[tokio::test]
    async fn test_non_json_error_falls_back_to_envelope() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/gemini")
            .with_status(500)
            .with_body("proxy crashed")
            .create_async()
            .await;

        let transport = ProxyTransport::new(&server.url()).unwrap();
        let request = GenerateRequest {
            model: "gemini-1.5-flash".to_string(),
            parts: vec![crate::ports::Part::Text {
                text: "hi".to_string(),
            }],
            generation_config: None,
            api_key: "k".to_string(),
        };
        let err = transport.generate_content(request).await.unwrap_err();

        match err {
            AppError::Provider {
                status, message, ..
            } => {
                assert_eq!(status, Some(500));
                assert!(message.contains("proxy crashed"));
            }
            other => panic!("expected provider error, got {:?}", other.to_string()),
        }
    }

    #[tokio::test]
    async fn test_proxy_gemini_body_carries_model() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/gemini")
            .match_header("x-api-key", "k")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gemini-1.5-flash"
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#)
            .create_async()
            .await;

        let transport = ProxyTransport::new(&server.url()).unwrap();
        let request = GenerateRequest {
            model: "gemini-1.5-flash".to_string(),
            parts: vec![crate::ports::Part::Text {
                text: "hi".to_string(),
            }],
            generation_config: None,
            api_key: "k".to_string(),
        };

        let response = transport.generate_content(request).await.unwrap();
        assert_eq!(response.first_text(), Some("ok".to_string()));
        mock.assert_async().await;
    }

    #[test]
    fn test_timeout_is_looser_than_direct() {
        assert!(PROXIED_TIMEOUT > crate::adapters::direct_transport::DIRECT_TIMEOUT);
    }
}
