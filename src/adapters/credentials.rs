use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use crate::domain::AppError;
use crate::ports::CredentialSource;

/// File name of the explicit local development overrides, resolved as
/// the last credential source on every platform.
pub const LOCAL_OVERRIDES_FILE: &str = "credentials.local.toml";

const SECRET_STORE_FILE: &str = "secrets.toml";

/// File-backed secure credential store, the on-device secure-storage
/// analog for the native target. Owner-only permissions on Unix.
pub struct SecureFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl SecureFileStore {
    /// Open (or create) the store under the given data directory.
    pub fn open(dir: &Path) -> Result<Self, AppError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(SECRET_STORE_FILE);

        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            toml::from_str(&content)?
        } else {
            HashMap::new()
        };

        info!(path = ?path, "secure credential store opened");
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().get(key).cloned()
    }

    pub fn put(&self, key: &str, value: &str) -> Result<(), AppError> {
        let mut entries = self.entries.lock();
        entries.insert(key.to_string(), value.to_string());

        let content = toml::to_string_pretty(&*entries)?;
        fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = fs::metadata(&self.path)?.permissions();
            perms.set_mode(0o600);
            fs::set_permissions(&self.path, perms)?;
        }

        Ok(())
    }
}

/// Secure on-device store (native only, first in order).
pub struct SecureStoreSource {
    store: Arc<SecureFileStore>,
}

impl SecureStoreSource {
    pub fn new(store: Arc<SecureFileStore>) -> Self {
        Self { store }
    }
}

impl CredentialSource for SecureStoreSource {
    fn name(&self) -> &'static str {
        "secure-store"
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.store.get(key))
    }
}

/// Credential values bundled with the app build's configuration.
pub struct BundledConfigSource {
    values: HashMap<String, String>,
}

impl BundledConfigSource {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }
}

impl CredentialSource for BundledConfigSource {
    fn name(&self) -> &'static str {
        "bundled-config"
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).cloned())
    }
}

/// Environment-style public variables (web target).
pub struct EnvSource;

impl CredentialSource for EnvSource {
    fn name(&self) -> &'static str {
        "environment"
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(std::env::var(key).ok().filter(|v| !v.trim().is_empty()))
    }
}

/// Explicit local development overrides file. This replaces the
/// hard-coded fallback keys the original app embedded: with no
/// configured source the resolver fails instead.
pub struct LocalOverrideSource {
    values: HashMap<String, String>,
}

impl LocalOverrideSource {
    /// Load `credentials.local.toml` from the data directory. A missing
    /// or unreadable file yields an empty source.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(LOCAL_OVERRIDES_FILE);
        let values = match fs::read_to_string(&path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(values) => values,
                Err(e) => {
                    warn!(path = ?path, error = %e, "ignoring malformed local overrides file");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        Self { values }
    }
}

impl CredentialSource for LocalOverrideSource {
    fn name(&self) -> &'static str {
        "local-overrides"
    }

    fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.values.get(key).cloned())
    }
}
