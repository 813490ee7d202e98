use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Deployment target. Decides the transport (direct vs. proxied), the
/// capture sink (file vs. in-memory blob), and the credential source
/// order. Selected once at context construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    #[default]
    Native,
    Web,
}

impl Platform {
    #[must_use]
    pub fn is_native(&self) -> bool {
        matches!(self, Platform::Native)
    }
}

/// Primary (speech-specific) provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechProviderConfig {
    /// API base URL.
    pub base_url: String,
    /// Transcription model name.
    pub model: String,
    /// Optional language hint (ISO 639-1 code).
    pub language: Option<String>,
}

impl Default for SpeechProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "whisper-1".to_string(),
            language: None,
        }
    }
}

/// Secondary (generative) provider configuration, used both as the
/// transcription fallback and for note generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerativeProviderConfig {
    /// API base URL.
    pub base_url: String,
    /// Generative model name.
    pub model: String,
}

impl Default for GenerativeProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
        }
    }
}

/// Same-origin proxy configuration (web target only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Base URL of the same-origin proxy.
    pub base_url: String,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787".to_string(),
        }
    }
}

/// Audio capture configuration. The capture profile is fixed: mono,
/// 16-bit, resampled to `sample_rate`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target sample rate in Hz.
    pub sample_rate: u32,
    /// Maximum recording duration in seconds (ring buffer size).
    pub buffer_duration_secs: u32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16_000,
            buffer_duration_secs: 300,
        }
    }
}

impl CaptureConfig {
    /// Ring buffer capacity in samples.
    pub fn buffer_capacity(&self) -> usize {
        self.buffer_duration_secs as usize * self.sample_rate as usize
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Enable file logging with rotation.
    pub file_logging: bool,
    /// Maximum number of log files to keep.
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
            max_files: 7,
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub platform: Platform,
    pub speech: SpeechProviderConfig,
    pub generative: GenerativeProviderConfig,
    pub proxy: ProxyConfig,
    pub capture: CaptureConfig,
    pub logging: LoggingConfig,
    /// Bundled credential values shipped with the app build. One of
    /// the resolver's layered sources, never the only one.
    pub credentials: HashMap<String, String>,
}

impl AppConfig {
    /// Create a new AppConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::new();
        assert!(config.platform.is_native());
        assert_eq!(config.speech.model, "whisper-1");
        assert_eq!(config.capture.sample_rate, 16_000);
        assert!(config.credentials.is_empty());
    }

    #[test]
    fn test_capture_buffer_capacity() {
        let capture = CaptureConfig::default();
        assert_eq!(capture.buffer_capacity(), 300 * 16_000);
    }

    #[test]
    fn test_partial_toml_uses_section_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            platform = "web"

            [speech]
            model = "whisper-large-v3"
            "#,
        )
        .unwrap();
        assert_eq!(config.platform, Platform::Web);
        assert_eq!(config.speech.model, "whisper-large-v3");
        assert_eq!(config.speech.base_url, "https://api.openai.com/v1");
        assert_eq!(config.logging.level, "info");
    }
}
