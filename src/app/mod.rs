pub mod compiler;
pub mod context;
pub mod credentials;
pub mod orchestrator;

pub use compiler::NoteCompiler;
pub use context::AppContext;
pub use credentials::{Credential, CredentialResolver, GENERATIVE_API_KEY, SPEECH_API_KEY};
pub use orchestrator::TranscriptionOrchestrator;
