//! Client configuration: an optional RON file plus environment overrides.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{ensure, Context, Result};
use docqa_core::{DEFAULT_TOP_K, TOP_K_RANGE};
use docqa_engine::{ApiSettings, ControllerSettings};
use serde::Deserialize;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "docqa.ron";
pub const API_BASE_ENV: &str = "DOCQA_API_BASE";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base: String,
    pub connect_timeout_secs: u64,
    pub request_timeout_secs: Option<u64>,
    pub embed_delay_ms: u64,
    pub health_interval_secs: u64,
    /// Directory holding the question history and the log file.
    pub data_dir: PathBuf,
    pub top_k: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        let api = ApiSettings::default();
        let controllers = ControllerSettings::default();
        Self {
            api_base: api.base_url,
            connect_timeout_secs: api.connect_timeout.as_secs(),
            request_timeout_secs: api.request_timeout.map(|timeout| timeout.as_secs()),
            embed_delay_ms: controllers.embed_delay.as_millis() as u64,
            health_interval_secs: controllers.health_interval.as_secs(),
            data_dir: PathBuf::from("."),
            top_k: DEFAULT_TOP_K,
        }
    }
}

impl AppConfig {
    /// Reads `path`, or `docqa.ron` if present, or falls back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the controllers cannot run with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.health_interval_secs > 0,
            "health_interval_secs must be at least 1"
        );
        ensure!(
            TOP_K_RANGE.contains(&self.top_k),
            "top_k must be between {} and {}, got {}",
            TOP_K_RANGE.start(),
            TOP_K_RANGE.end(),
            self.top_k
        );
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ron::from_str(content)?)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base) = lookup(API_BASE_ENV).filter(|value| !value.trim().is_empty()) {
            self.api_base = base.trim().to_string();
        }
    }

    pub fn api_settings(&self) -> ApiSettings {
        ApiSettings {
            base_url: self.api_base.clone(),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            request_timeout: self.request_timeout_secs.map(Duration::from_secs),
        }
    }

    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            embed_delay: Duration::from_millis(self.embed_delay_ms),
            health_interval: Duration::from_secs(self.health_interval_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_service_contract() {
        let config = AppConfig::default();
        assert_eq!(config.api_base, "http://localhost:8000");
        assert_eq!(config.request_timeout_secs, None);
        assert_eq!(config.embed_delay_ms, 400);
        assert_eq!(config.health_interval_secs, 30);
        assert_eq!(config.top_k, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = AppConfig::parse(r#"(api_base: "http://docs.internal:9000", top_k: 8)"#).unwrap();
        assert_eq!(config.api_base, "http://docs.internal:9000");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.health_interval_secs, 30);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn env_overrides_base_address() {
        let mut config = AppConfig::default();
        config.apply_env(|key| (key == API_BASE_ENV).then(|| " http://10.0.0.5:8000 ".to_string()));
        assert_eq!(config.api_base, "http://10.0.0.5:8000");

        config.apply_env(|_| Some("   ".to_string()));
        assert_eq!(config.api_base, "http://10.0.0.5:8000");
    }

    #[test]
    fn reads_config_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.ron");
        fs::write(&path, "(embed_delay_ms: 50, request_timeout_secs: Some(20))").unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.controller_settings().embed_delay, Duration::from_millis(50));
        assert_eq!(config.api_settings().request_timeout, Some(Duration::from_secs(20)));
    }

    #[test]
    fn zero_health_interval_is_rejected() {
        let config = AppConfig::parse("(health_interval_secs: 0)").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("health_interval_secs"));
    }

    #[test]
    fn top_k_outside_range_is_rejected() {
        for top_k in [0, 21, 500] {
            let config = AppConfig::parse(&format!("(top_k: {top_k})")).unwrap();
            assert!(config.validate().is_err(), "top_k {top_k} accepted");
        }
        for top_k in [1, 20] {
            let config = AppConfig::parse(&format!("(top_k: {top_k})")).unwrap();
            assert!(config.validate().is_ok());
        }
    }

    #[test]
    fn load_validates_file_contents() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("bad.ron");
        fs::write(&path, "(top_k: 0)").unwrap();

        let err = AppConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{err:#}").contains("top_k"));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(AppConfig::load(Some(Path::new("/definitely/not/here.ron"))).is_err());
    }
}
