pub mod config_store;
pub mod credentials;
pub mod direct_transport;
pub mod memory_store;
pub mod proxy_transport;
pub mod recorder;
pub mod sinks;

pub use config_store::TomlConfigStore;
pub use credentials::{
    BundledConfigSource, EnvSource, LocalOverrideSource, SecureFileStore, SecureStoreSource,
};
pub use direct_transport::DirectTransport;
pub use memory_store::InMemoryNoteStore;
pub use proxy_transport::ProxyTransport;
pub use recorder::CpalRecorder;
pub use sinks::{AudioSink, MemoryBlobSink, WavFileSink};
