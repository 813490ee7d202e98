pub mod capture;
pub mod config;
pub mod credentials;
pub mod store;
pub mod transport;

pub use capture::Recorder;
pub use config::ConfigStore;
pub use credentials::CredentialSource;
pub use store::{NotePage, NoteStore, Page};
pub use transport::{
    GenerateRequest, GenerateResponse, GenerationConfig, InlineData, Part, SpeechRequest,
    SpeechResponse, SpeechSegment, Transport,
};
