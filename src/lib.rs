#![forbid(unsafe_code)]

//! Clinician dictation core: record audio, transcribe it through a
//! primary speech provider with a generative-provider fallback,
//! compile the transcript into a structured clinical note, and persist
//! it.
//!
//! The crate is organized hexagonally: `domain` holds the data model
//! and error taxonomy, `ports` the trait seams, `adapters` the
//! platform implementations (direct vs. proxied transport, file vs.
//! in-memory capture), and `app` the orchestration built once against
//! those seams. Construct an [`AppContext`] for a deployment target
//! and drive the flow from there.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod infrastructure;
pub mod ports;

pub use app::{
    AppContext, Credential, CredentialResolver, NoteCompiler, TranscriptionOrchestrator,
    GENERATIVE_API_KEY, SPEECH_API_KEY,
};
pub use domain::{
    AppConfig, AppError, AudioHandle, CaptureState, ClinicalNote, GenerationKind, NoteDraft,
    Platform, ProviderKind, Segment, TranscriptionResult,
};
pub use ports::{NotePage, NoteStore, Page, Recorder, Transport};
