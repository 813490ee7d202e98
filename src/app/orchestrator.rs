use std::sync::Arc;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::{debug, info, warn};

use crate::app::credentials::{CredentialResolver, GENERATIVE_API_KEY, SPEECH_API_KEY};
use crate::domain::transcription::{
    estimate_duration_secs, synthesize_segments, ProviderAttempt, ProviderKind, Segment,
    TranscriptionResult, DEFAULT_LANGUAGE, GENERATIVE_CONFIDENCE, SPEECH_CONFIDENCE,
};
use crate::domain::{AppError, AudioHandle, GenerativeProviderConfig, SpeechProviderConfig};
use crate::ports::transport::{
    GenerateRequest, GenerationConfig, InlineData, Part, SpeechRequest, SpeechResponse, Transport,
};

/// Pause inserted before the fallback attempt when the primary failure
/// is a rate-limit condition.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_millis(1000);

/// Instruction sent with the audio when the generative provider is
/// repurposed as the transcription fallback.
const TRANSCRIBE_INSTRUCTION: &str = "Transcribe the spoken audio verbatim. \
Return only the transcript text, with no commentary or formatting.";

/// Turns a recorded [`AudioHandle`] into a normalized
/// [`TranscriptionResult`], trying the speech provider first and the
/// generative provider second. Providers run strictly sequentially; at
/// most one extra attempt per call.
pub struct TranscriptionOrchestrator {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialResolver>,
    speech: SpeechProviderConfig,
    generative: GenerativeProviderConfig,
}

impl TranscriptionOrchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialResolver>,
        speech: SpeechProviderConfig,
        generative: GenerativeProviderConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            speech,
            generative,
        }
    }

    /// Transcribe the audio behind `handle`.
    ///
    /// The handle is consumed: its underlying resource is released on
    /// every exit path, success or failure. When both providers fail,
    /// the returned error carries both causes.
    pub async fn transcribe(&self, handle: AudioHandle) -> Result<TranscriptionResult, AppError> {
        let result = self.transcribe_inner(&handle).await;
        // Release failure is non-fatal and logged inside release().
        handle.release();
        result
    }

    async fn transcribe_inner(
        &self,
        handle: &AudioHandle,
    ) -> Result<TranscriptionResult, AppError> {
        if !handle.exists() {
            return Err(AppError::InvalidInput(
                "audio handle is missing or already released".to_string(),
            ));
        }

        // Zero-length audio is still dispatched: only an explicit
        // provider failure ends an attempt.
        let audio = handle.read_bytes()?;
        let byte_len = audio.len() as u64;
        debug!(
            bytes = byte_len,
            mime = handle.mime_type(),
            timeout = ?self.transport.request_timeout(),
            "starting transcription"
        );

        // Primary: the speech provider. A credential miss skips the
        // attempt (it is not a provider attempt); a dispatch failure
        // records one.
        let primary_cause = match self.credentials.resolve(SPEECH_API_KEY) {
            Ok(key) => {
                let request = SpeechRequest {
                    audio: audio.clone(),
                    file_name: handle.file_name(),
                    mime_type: handle.mime_type().to_string(),
                    model: self.speech.model.clone(),
                    language: self.speech.language.clone(),
                    api_key: key.expose().to_string(),
                };

                match self.transport.transcribe_audio(request).await {
                    Ok(response) => {
                        info!(
                            provider = %ProviderKind::Speech,
                            chars = response.text.len(),
                            "transcription succeeded"
                        );
                        return Ok(normalize_speech(
                            response,
                            byte_len,
                            self.speech.language.as_deref(),
                        ));
                    }
                    Err(err) => {
                        let attempt = ProviderAttempt {
                            provider: ProviderKind::Speech,
                            error: err.to_string(),
                        };
                        warn!(
                            provider = %attempt.provider,
                            error = %attempt.error,
                            "primary transcription failed, falling back"
                        );
                        if err.is_rate_limited() {
                            debug!("rate limit detected, pausing before fallback");
                            tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                        }
                        attempt.error
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "speech credential unavailable, skipping primary provider");
                err.to_string()
            }
        };

        // Secondary: the generative provider, audio inline as base64.
        let key = self
            .credentials
            .resolve(GENERATIVE_API_KEY)
            .map_err(|err| AppError::Transcription {
                primary: primary_cause.clone(),
                fallback: err.to_string(),
            })?;

        let request = GenerateRequest {
            model: self.generative.model.clone(),
            parts: vec![
                Part::Text {
                    text: TRANSCRIBE_INSTRUCTION.to_string(),
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: handle.mime_type().to_string(),
                        data: BASE64.encode(&audio),
                    },
                },
            ],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.0),
                max_output_tokens: None,
            }),
            api_key: key.expose().to_string(),
        };

        match self.transport.generate_content(request).await {
            Ok(response) => match response.first_text() {
                Some(text) => {
                    info!(
                        provider = %ProviderKind::Generative,
                        chars = text.len(),
                        "fallback transcription succeeded"
                    );
                    Ok(normalize_generative(text, byte_len))
                }
                None => Err(AppError::Transcription {
                    primary: primary_cause,
                    fallback: "generative provider returned no content".to_string(),
                }),
            },
            Err(err) => Err(AppError::Transcription {
                primary: primary_cause,
                fallback: err.to_string(),
            }),
        }
    }
}

/// Normalize the speech provider's response shape.
fn normalize_speech(
    response: SpeechResponse,
    byte_len: u64,
    language_hint: Option<&str>,
) -> TranscriptionResult {
    let SpeechResponse {
        text,
        language,
        duration,
        segments,
    } = response;

    let duration_secs = duration
        .filter(|d| d.is_finite() && *d > 0.0)
        .unwrap_or_else(|| estimate_duration_secs(byte_len));
    let language = language
        .or_else(|| language_hint.map(str::to_string))
        .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());

    let segments = match segments {
        Some(provided) if !provided.is_empty() => provided
            .into_iter()
            .enumerate()
            .map(|(index, s)| Segment {
                index,
                text: s.text,
                start: s.start,
                end: s.end,
                confidence: s.confidence.unwrap_or(SPEECH_CONFIDENCE),
            })
            .collect(),
        _ => synthesize_segments(&text, duration_secs, SPEECH_CONFIDENCE),
    };

    TranscriptionResult {
        text,
        confidence: SPEECH_CONFIDENCE,
        language,
        duration_secs,
        segments,
        provider: ProviderKind::Speech,
    }
}

/// Normalize the generative fallback's plain-text output.
fn normalize_generative(text: String, byte_len: u64) -> TranscriptionResult {
    let text = text.trim().to_string();
    let duration_secs = estimate_duration_secs(byte_len);
    let segments = synthesize_segments(&text, duration_secs, GENERATIVE_CONFIDENCE);

    TranscriptionResult {
        text,
        confidence: GENERATIVE_CONFIDENCE,
        language: DEFAULT_LANGUAGE.to_string(),
        duration_secs,
        segments,
        provider: ProviderKind::Generative,
    }
}
