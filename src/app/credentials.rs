use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};
use zeroize::Zeroize;

use crate::adapters::credentials::{
    BundledConfigSource, EnvSource, LocalOverrideSource, SecureFileStore, SecureStoreSource,
};
use crate::domain::{AppConfig, AppError, Platform};
use crate::ports::CredentialSource;

/// Credential name of the primary (speech) provider key.
pub const SPEECH_API_KEY: &str = "OPENAI_API_KEY";

/// Credential name of the secondary (generative) provider key.
pub const GENERATIVE_API_KEY: &str = "GEMINI_API_KEY";

/// A resolved credential value, zeroed on drop.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// Resolves named credentials from an ordered list of sources.
///
/// Source order is platform-specific; the first source with a
/// non-empty value wins. Resolved values are cached process-wide; the
/// cache is read-mostly and safe for concurrent reads.
pub struct CredentialResolver {
    platform: Platform,
    sources: Vec<Box<dyn CredentialSource>>,
    secure_store: Option<Arc<SecureFileStore>>,
    cache: RwLock<HashMap<String, String>>,
}

impl CredentialResolver {
    /// Compose the platform's source order:
    /// - native: secure store -> bundled config -> local overrides
    /// - web: bundled config -> environment -> local overrides
    pub fn for_platform(
        platform: Platform,
        config: &AppConfig,
        data_dir: &Path,
    ) -> Result<Self, AppError> {
        let mut sources: Vec<Box<dyn CredentialSource>> = Vec::new();
        let mut secure_store = None;

        match platform {
            Platform::Native => {
                let store = Arc::new(SecureFileStore::open(data_dir)?);
                sources.push(Box::new(SecureStoreSource::new(Arc::clone(&store))));
                sources.push(Box::new(BundledConfigSource::new(config.credentials.clone())));
                sources.push(Box::new(LocalOverrideSource::load(data_dir)));
                secure_store = Some(store);
            }
            Platform::Web => {
                sources.push(Box::new(BundledConfigSource::new(config.credentials.clone())));
                sources.push(Box::new(EnvSource));
                sources.push(Box::new(LocalOverrideSource::load(data_dir)));
            }
        }

        Ok(Self {
            platform,
            sources,
            secure_store,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Build a resolver over an explicit source list (tests, embedders).
    pub fn with_sources(
        platform: Platform,
        sources: Vec<Box<dyn CredentialSource>>,
        secure_store: Option<Arc<SecureFileStore>>,
    ) -> Self {
        Self {
            platform,
            sources,
            secure_store,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Resolve one credential by name.
    pub fn resolve(&self, name: &str) -> Result<Credential, AppError> {
        if let Some(value) = self.cache.read().get(name) {
            return Ok(Credential(value.clone()));
        }

        for source in &self.sources {
            match source.get(name) {
                Ok(Some(value)) if !value.trim().is_empty() => {
                    debug!(credential = name, source = source.name(), "credential resolved");
                    self.cache.write().insert(name.to_string(), value.clone());
                    return Ok(Credential(value));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(
                        credential = name,
                        source = source.name(),
                        error = %e,
                        "credential source failed, trying next"
                    );
                }
            }
        }

        Err(AppError::Config(format!(
            "no configured source provides credential '{}'",
            name
        )))
    }

    /// Persist a credential to the secure on-device store.
    ///
    /// Accepted only on the native target; on web this is a warning
    /// no-op, never an error.
    pub fn save(&self, name: &str, value: &str) -> Result<(), AppError> {
        if !self.platform.is_native() {
            warn!(credential = name, "credential save is a no-op on the web target");
            return Ok(());
        }

        let store = self
            .secure_store
            .as_ref()
            .ok_or_else(|| AppError::Config("secure store unavailable".to_string()))?;
        store.put(name, value)?;

        self.cache
            .write()
            .insert(name.to_string(), value.to_string());
        debug!(credential = name, "credential saved to secure store");
        Ok(())
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }
}
