// Application settings
// Loaded from ~/.config/payeekit/settings.toml

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use payeekit_dedup::DuplicateConfig;
use payeekit_recon::ClassificationConfig;
use serde::{Deserialize, Serialize};

/// Where the oracle lives and how patiently to wait for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OracleSettings {
    pub api_base: String,
    /// Provider name used for the API key lookup (`PAYEEKIT_<PROVIDER>_KEY`).
    pub provider: String,
    pub poll_interval_ms: u64,
    pub max_wait_secs: u64,
}

impl Default for OracleSettings {
    fn default() -> Self {
        Self {
            api_base: "https://api.payeekit.dev".to_string(),
            provider: "oracle".to_string(),
            poll_interval_ms: 2_000,
            max_wait_secs: 3_600,
        }
    }
}

impl OracleSettings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_secs(self.max_wait_secs)
    }
}

/// Classification result cache, persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
    /// Cache file. Defaults to `<cache dir>/payeekit/classifications.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 86_400,
            path: None,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn file(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("payeekit")
                .join("classifications.json")
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub classification: ClassificationConfig,
    pub duplicates: DuplicateConfig,
    pub oracle: OracleSettings,
    pub cache: CacheSettings,
}

#[derive(Debug)]
pub enum SettingsError {
    Io { path: PathBuf, source: io::Error },
    Parse(String),
    Invalid(String),
}

impl fmt::Display for SettingsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Parse(msg) => write!(f, "invalid settings file: {msg}"),
            Self::Invalid(msg) => write!(f, "invalid settings: {msg}"),
        }
    }
}

impl std::error::Error for SettingsError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl Settings {
    /// Get the settings file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("payeekit")
            .join("settings.toml")
    }

    pub fn from_toml(input: &str) -> Result<Self, SettingsError> {
        let settings: Settings =
            toml::from_str(input).map_err(|e| SettingsError::Parse(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml(&self) -> Result<String, SettingsError> {
        toml::to_string_pretty(self).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    /// Validate every section. Engine sections use their own rules.
    pub fn validate(&self) -> Result<(), SettingsError> {
        self.classification
            .validate()
            .map_err(|e| SettingsError::Invalid(format!("[classification] {e}")))?;
        self.duplicates
            .validate()
            .map_err(|e| SettingsError::Invalid(format!("[duplicates] {e}")))?;

        let api_base = self.oracle.api_base.trim();
        if !(api_base.starts_with("http://") || api_base.starts_with("https://")) {
            return Err(SettingsError::Invalid(format!(
                "[oracle] api_base must be an http(s) URL, got '{}'",
                self.oracle.api_base
            )));
        }
        if self.oracle.provider.trim().is_empty() {
            return Err(SettingsError::Invalid("[oracle] provider must not be empty".into()));
        }
        if self.oracle.poll_interval_ms == 0 {
            return Err(SettingsError::Invalid("[oracle] poll_interval_ms must be at least 1".into()));
        }
        if self.oracle.max_wait_secs == 0 {
            return Err(SettingsError::Invalid("[oracle] max_wait_secs must be at least 1".into()));
        }
        if self.cache.enabled && self.cache.ttl_secs == 0 {
            return Err(SettingsError::Invalid("[cache] ttl_secs must be at least 1 when enabled".into()));
        }
        Ok(())
    }

    /// Read and validate a settings file.
    pub fn load_from(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    /// Load `explicit` if given, else the default location. Only a missing
    /// default file falls back to defaults; an explicit path must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self, SettingsError> {
        if let Some(path) = explicit {
            return Self::load_from(path);
        }

        let path = Self::config_path();
        if !path.exists() {
            log::debug!("no settings file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        log::debug!("loading settings from {}", path.display());
        Self::load_from(&path)
    }
}
