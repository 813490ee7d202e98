use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use crate::adapters::sinks::AudioSink;
use crate::adapters::{
    CpalRecorder, DirectTransport, InMemoryNoteStore, MemoryBlobSink, ProxyTransport,
    TomlConfigStore, WavFileSink,
};
use crate::app::compiler::NoteCompiler;
use crate::app::credentials::CredentialResolver;
use crate::app::orchestrator::TranscriptionOrchestrator;
use crate::domain::{AppConfig, AppError, ClinicalNote, Platform};
use crate::infrastructure::init_logging;
use crate::ports::{ConfigStore, NoteStore, Recorder, Transport};

/// Application context: every component is constructed here, once, at
/// process start, and handed to whoever needs it. There is no global
/// mutable state.
pub struct AppContext {
    config: RwLock<AppConfig>,
    config_store: Arc<TomlConfigStore>,
    credentials: Arc<CredentialResolver>,
    recorder: Arc<dyn Recorder>,
    notes: Arc<dyn NoteStore>,
    orchestrator: TranscriptionOrchestrator,
    compiler: NoteCompiler,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    /// Initialize the context for the given deployment target.
    ///
    /// Loads configuration, sets up logging, and wires the platform's
    /// transport, capture sink, and credential source order.
    pub fn initialize(platform: Platform) -> Result<Self, AppError> {
        // Step 1: Configuration
        let config_store = Arc::new(TomlConfigStore::new()?);
        let mut config = config_store.load()?;
        config.platform = platform;

        // Step 2: Logging
        let log_guard = init_logging(
            &config_store.logs_dir(),
            &config.logging.level,
            config.logging.file_logging,
        )?;

        info!(platform = ?platform, "ChartScribe core starting up");

        // Step 3: Platform transport
        let transport: Arc<dyn Transport> = match platform {
            Platform::Native => Arc::new(DirectTransport::new(
                &config.speech.base_url,
                &config.generative.base_url,
            )?),
            Platform::Web => Arc::new(ProxyTransport::new(&config.proxy.base_url)?),
        };

        // Step 4: Credentials, capture, persistence
        let credentials = Arc::new(CredentialResolver::for_platform(
            platform,
            &config,
            &config_store.data_dir(),
        )?);

        let sink: Arc<dyn AudioSink> = match platform {
            Platform::Native => Arc::new(WavFileSink::new(config_store.data_dir().join("recordings"))),
            Platform::Web => Arc::new(MemoryBlobSink),
        };
        let recorder: Arc<dyn Recorder> =
            Arc::new(CpalRecorder::new(config.capture.clone(), sink)?);

        let notes: Arc<dyn NoteStore> = Arc::new(InMemoryNoteStore::new());

        // Step 5: The orchestration core
        let orchestrator = TranscriptionOrchestrator::new(
            Arc::clone(&transport),
            Arc::clone(&credentials),
            config.speech.clone(),
            config.generative.clone(),
        );
        let compiler = NoteCompiler::new(
            Arc::clone(&transport),
            Arc::clone(&credentials),
            config.generative.clone(),
        );

        info!("AppContext initialized");

        Ok(Self {
            config: RwLock::new(config),
            config_store,
            credentials,
            recorder,
            notes,
            orchestrator,
            compiler,
            _log_guard: log_guard,
        })
    }

    /// Get the current configuration.
    pub fn config(&self) -> AppConfig {
        self.config.read().clone()
    }

    /// Update and persist the configuration.
    pub fn update_config(&self, config: AppConfig) -> Result<(), AppError> {
        self.config_store.save(&config)?;
        *self.config.write() = config;
        info!("Configuration updated");
        Ok(())
    }

    pub fn credentials(&self) -> &CredentialResolver {
        &self.credentials
    }

    pub fn recorder(&self) -> &dyn Recorder {
        self.recorder.as_ref()
    }

    pub fn notes(&self) -> &dyn NoteStore {
        self.notes.as_ref()
    }

    pub fn orchestrator(&self) -> &TranscriptionOrchestrator {
        &self.orchestrator
    }

    pub fn compiler(&self) -> &NoteCompiler {
        &self.compiler
    }

    /// End-to-end dictation flow: stop the active recording, transcribe
    /// it (with fallback), compile the structured note, and persist it
    /// for the user. Capture resources are cleaned up on every path.
    pub async fn finish_dictation(&self, user_id: &str) -> Result<ClinicalNote, AppError> {
        let handle = match self.recorder.stop().await? {
            Some(handle) => handle,
            None => {
                return Err(AppError::InvalidInput(
                    "no active recording to finish".to_string(),
                ))
            }
        };

        let transcription = match self.orchestrator.transcribe(handle).await {
            Ok(result) => result,
            Err(err) => {
                // The orchestrator released the handle; this covers the
                // recorder's own reference.
                self.recorder.cleanup().await;
                return Err(err);
            }
        };
        self.recorder.cleanup().await;

        let draft = self.compiler.compile(&transcription.text).await?;
        self.notes.save(user_id, draft).await
    }
}
