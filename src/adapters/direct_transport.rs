use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::domain::transcription::ProviderKind;
use crate::domain::AppError;
use crate::ports::transport::{
    GenerateRequest, GenerateResponse, SpeechRequest, SpeechResponse, Transport,
};

/// Timeout for direct provider calls on the native target.
pub const DIRECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Native transport: calls both providers directly over HTTPS.
///
/// The speech provider receives the audio as multipart form data with
/// Bearer auth; the generative provider receives JSON with the key in
/// its API-key header.
pub struct DirectTransport {
    client: Client,
    speech_base: String,
    generative_base: String,
}

impl DirectTransport {
    pub fn new(speech_base: &str, generative_base: &str) -> Result<Self, AppError> {
        let speech_base = normalize_base(speech_base)?;
        let generative_base = normalize_base(generative_base)?;

        let client = Client::builder()
            .use_rustls_tls()
            .user_agent(format!("ChartScribe/{}", env!("CARGO_PKG_VERSION")))
            .timeout(DIRECT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            speech_base,
            generative_base,
        })
    }
}

fn normalize_base(base: &str) -> Result<String, AppError> {
    let trimmed = base.trim().trim_end_matches('/');
    Url::parse(trimmed)
        .map_err(|e| AppError::Config(format!("invalid provider base URL '{}': {}", base, e)))?;
    Ok(trimmed.to_string())
}

fn map_send_error(provider: ProviderKind, err: reqwest::Error) -> AppError {
    let message = if err.is_timeout() {
        "request timed out".to_string()
    } else {
        err.to_string()
    };
    AppError::provider(provider, err.status().map(|s| s.as_u16()), message)
}

async fn into_provider_error(provider: ProviderKind, response: reqwest::Response) -> AppError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    AppError::provider(
        provider,
        Some(status.as_u16()),
        format!("HTTP {}: {}", status, body),
    )
}

#[async_trait]
impl Transport for DirectTransport {
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

        let url = format!("{}/audio/transcriptions", self.speech_base);
        debug!(url = %url, "dispatching speech transcription");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&request.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(|e| map_send_error(ProviderKind::Speech, e))?;

        if !response.status().is_success() {
            return Err(into_provider_error(ProviderKind::Speech, response).await);
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
        let url = format!(
            "{}/models/{}:generateContent",
            self.generative_base, request.model
        );
        let body = request.body()?;
        debug!(url = %url, "dispatching generative request");

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &request.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| map_send_error(ProviderKind::Generative, e))?;

        if !response.status().is_success() {
            return Err(into_provider_error(ProviderKind::Generative, response).await);
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
        DIRECT_TIMEOUT
    }
}
