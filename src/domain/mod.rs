pub mod audio;
pub mod config;
pub mod error;
pub mod note;
pub mod transcription;

pub use audio::{AtomicCaptureState, AudioHandle, CaptureState};
pub use config::{AppConfig, CaptureConfig, GenerativeProviderConfig, Platform, SpeechProviderConfig};
pub use error::{AppError, GenerationKind};
pub use note::{ClinicalNote, NoteDraft};
pub use transcription::{ProviderAttempt, ProviderKind, Segment, TranscriptionResult};
