use thiserror::Error;

use crate::domain::transcription::ProviderKind;

/// Classification of a note-generation failure, derived from the
/// provider's HTTP status for caller-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationKind {
    /// The provider rejected the API key (HTTP 403).
    Credential,
    /// The provider reported a rate limit (HTTP 429).
    RateLimit,
    /// Any other provider or transport failure.
    Other,
}

/// Domain-level errors for ChartScribe.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("{provider} provider request failed: {message}")]
    Provider {
        provider: ProviderKind,
        status: Option<u16>,
        message: String,
    },

    #[error("all transcription providers failed; primary: {primary}; fallback: {fallback}")]
    Transcription { primary: String, fallback: String },

    #[error("note generation failed: {message}")]
    Generation {
        kind: GenerationKind,
        message: String,
    },

    #[error("Audio error: {0}")]
    Audio(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Build a provider error with an HTTP status attached.
    pub fn provider(provider: ProviderKind, status: Option<u16>, message: impl Into<String>) -> Self {
        AppError::Provider {
            provider,
            status,
            message: message.into(),
        }
    }

    /// Whether this error is a provider-reported rate-limit condition.
    ///
    /// Detects HTTP 429 as well as rate-limit wording in the provider
    /// message, since one provider reports limits only in prose.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            AppError::Provider { status, message, .. } => {
                if *status == Some(429) {
                    return true;
                }
                let lowered = message.to_lowercase();
                lowered.contains("rate limit")
                    || lowered.contains("rate_limit")
                    || lowered.contains("quota exceeded")
            }
            _ => false,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_detection_by_status() {
        let err = AppError::provider(ProviderKind::Speech, Some(429), "Too Many Requests");
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_rate_limit_detection_by_message() {
        let err = AppError::provider(
            ProviderKind::Speech,
            Some(400),
            "Rate limit reached for requests",
        );
        assert!(err.is_rate_limited());
    }

    #[test]
    fn test_non_rate_limit_errors() {
        let err = AppError::provider(ProviderKind::Generative, Some(500), "internal error");
        assert!(!err.is_rate_limited());
        assert!(!AppError::Config("missing key".to_string()).is_rate_limited());
    }

    #[test]
    fn test_transcription_error_renders_both_causes() {
        let err = AppError::Transcription {
            primary: "HTTP 503: unavailable".to_string(),
            fallback: "connection refused".to_string(),
        };
        let rendered = err.to_string();
        assert!(rendered.contains("HTTP 503: unavailable"));
        assert!(rendered.contains("connection refused"));
    }
}
