use crate::{AppConfig, ConfigError};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

const ORG: &str = "io";
const AUTHOR: &str = "NeuraMail";
const APP: &str = "NeuraMail";

#[derive(Debug, Clone)]
pub struct ConfigManager {
    config_path: PathBuf,
    data_dir: PathBuf,
}

impl ConfigManager {
    pub fn new() -> Result<Self, ConfigError> {
        let dirs = ProjectDirs::from(ORG, AUTHOR, APP).ok_or(ConfigError::MissingDirectories)?;
        Self::at(
            dirs.config_dir().to_path_buf(),
            dirs.data_dir().to_path_buf(),
        )
    }

    /// Anchors both the config file and data dir under one root instead of
    /// the platform directories. Used by tests and portable installs.
    pub fn from_root(root: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let root = root.into();
        Self::at(root.join("config"), root.join("data"))
    }

    fn at(config_dir: PathBuf, data_dir: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&config_dir)?;
        fs::create_dir_all(&data_dir)?;

        let config_path = config_dir.join("config.toml");
        if !config_path.exists() {
            let initial = AppConfig::default();
            let content = toml::to_string_pretty(&initial)?;
            fs::write(&config_path, content)?;
            tracing::info!(path = %config_path.display(), "wrote default config");
        }

        Ok(Self {
            config_path,
            data_dir,
        })
    }

    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let content = fs::read_to_string(&self.config_path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content)?;
        Ok(())
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::ConfigManager;

    #[test]
    fn writes_defaults_and_round_trips() {
        let root = tempfile::tempdir().expect("temp root");
        let manager = ConfigManager::from_root(root.path()).expect("manager");

        let config = manager.load().expect("default config loads");
        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.backend.fetch_timeout_secs, 180);
        assert_eq!(config.automation.poll_interval_secs, 60);
        assert_eq!(config.assistant.model, "gpt-3.5-turbo");

        let mut changed = config.clone();
        changed.automation.poll_interval_secs = 5;
        manager.save(&changed).expect("save");

        let reloaded = manager.load().expect("reload");
        assert_eq!(reloaded.automation.poll_interval_secs, 5);
        assert_eq!(reloaded.backend.base_url, config.backend.base_url);
    }

    #[test]
    fn reuses_existing_config_file() {
        let root = tempfile::tempdir().expect("temp root");
        {
            let manager = ConfigManager::from_root(root.path()).expect("manager");
            let mut config = manager.load().expect("load");
            config.assistant.max_context_chars = 512;
            manager.save(&config).expect("save");
        }

        let manager = ConfigManager::from_root(root.path()).expect("second manager");
        let config = manager.load().expect("load");
        assert_eq!(config.assistant.max_context_chars, 512);
    }
}
