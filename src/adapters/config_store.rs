use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use crate::domain::{AppConfig, AppError};
use crate::ports::ConfigStore;

/// TOML-based configuration store with OS-specific paths.
pub struct TomlConfigStore {
    data_dir: PathBuf,
}

impl TomlConfigStore {
    /// Create a new TomlConfigStore.
    /// Uses OS-specific application data directories.
    pub fn new() -> Result<Self, AppError> {
        let data_dir = Self::get_data_dir()?;

        // Ensure the data directory exists
        fs::create_dir_all(&data_dir)?;

        info!(data_dir = ?data_dir, "ConfigStore initialized");

        Ok(Self { data_dir })
    }

    /// Create a store rooted at an explicit directory (tests, embedders).
    pub fn with_data_dir(data_dir: PathBuf) -> Result<Self, AppError> {
        fs::create_dir_all(&data_dir)?;
        Ok(Self { data_dir })
    }

    /// Get the OS-specific application data directory.
    /// - macOS: ~/Library/Application Support/ChartScribe/
    /// - Windows: %APPDATA%\ChartScribe\
    /// - Linux: ~/.config/ChartScribe/
    fn get_data_dir() -> Result<PathBuf, AppError> {
        #[cfg(target_os = "macos")]
        {
            dirs::data_dir()
                .map(|p| p.join("ChartScribe"))
                .ok_or_else(|| {
                    AppError::Config("Could not find application data directory".to_string())
                })
        }

        #[cfg(target_os = "windows")]
        {
            dirs::config_dir()
                .map(|p| p.join("ChartScribe"))
                .ok_or_else(|| {
                    AppError::Config("Could not find application data directory".to_string())
                })
        }

        #[cfg(target_os = "linux")]
        {
            dirs::config_dir()
                .map(|p| p.join("ChartScribe"))
                .ok_or_else(|| {
                    AppError::Config("Could not find application data directory".to_string())
                })
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            Err(AppError::Config("Unsupported operating system".to_string()))
        }
    }

    /// Get the OS-specific log directory.
    fn get_logs_dir(&self) -> PathBuf {
        #[cfg(target_os = "macos")]
        {
            self.data_dir.join("logs")
        }

        #[cfg(target_os = "windows")]
        {
            dirs::data_local_dir()
                .map(|p| p.join("ChartScribe").join("logs"))
                .unwrap_or_else(|| self.data_dir.join("logs"))
        }

        #[cfg(target_os = "linux")]
        {
            dirs::data_dir()
                .map(|p| p.join("ChartScribe").join("logs"))
                .unwrap_or_else(|| self.data_dir.join("logs"))
        }

        #[cfg(not(any(target_os = "macos", target_os = "windows", target_os = "linux")))]
        {
            self.data_dir.join("logs")
        }
    }
}

impl ConfigStore for TomlConfigStore {
    fn load(&self) -> Result<AppConfig, AppError> {
        let config_path = self.config_path();

        if config_path.exists() {
            debug!(path = ?config_path, "Loading configuration");
            let content = fs::read_to_string(&config_path)?;
            let config: AppConfig = toml::from_str(&content)?;
            info!(path = ?config_path, "Configuration loaded");
            Ok(config)
        } else {
            info!(path = ?config_path, "Configuration file not found, creating default");
            let config = AppConfig::new();
            self.save(&config)?;
            Ok(config)
        }
    }

    fn save(&self, config: &AppConfig) -> Result<(), AppError> {
        let config_path = self.config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(config)?;
        fs::write(&config_path, content)?;

        info!(path = ?config_path, "Configuration saved");
        Ok(())
    }

    fn config_path(&self) -> PathBuf {
        self.data_dir.join("config.toml")
    }

    fn data_dir(&self) -> PathBuf {
        self.data_dir.clone()
    }

    fn logs_dir(&self) -> PathBuf {
        self.get_logs_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Platform;

    #[test]
    fn test_config_store_paths() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        let config_path = store.config_path();
        assert!(config_path.ends_with("config.toml"));
    }

    #[test]
    fn test_config_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        // Create and save a config
        let mut config = AppConfig::new();
        config.platform = Platform::Web;
        config.logging.level = "debug".to_string();
        config
            .credentials
            .insert("OPENAI_API_KEY".to_string(), "bundled-key".to_string());

        store.save(&config).unwrap();

        // Load it back
        let loaded = store.load().unwrap();
        assert_eq!(loaded.platform, Platform::Web);
        assert_eq!(loaded.logging.level, "debug");
        assert_eq!(
            loaded.credentials.get("OPENAI_API_KEY").map(String::as_str),
            Some("bundled-key")
        );
    }

    #[test]
    fn test_load_creates_default_when_missing() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = TomlConfigStore::with_data_dir(temp_dir.path().to_path_buf()).unwrap();

        let config = store.load().unwrap();
        assert!(config.platform.is_native());
        assert!(store.config_path().exists());
    }
}
