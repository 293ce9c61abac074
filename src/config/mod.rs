//! Configuration management.
//!
//! Configuration is read from a TOML file and then overridden by environment
//! variables:
//!
//! | Variable | Overrides |
//! |----------|-----------|
//! | `LINKAGE_DATA_DIR` | `data_dir` |
//! | `LINKAGE_PSEUDONYMIZER` | `pseudonymizer.algorithm` |
//! | `LINKAGE_LOG_FORMAT` | `logging.format` |
//! | `LINKAGE_LOG_LEVEL` | `logging.level` |

use crate::security::{HmacPseudonymizer, Pseudonymizer, Sha256Pseudonymizer};
use crate::storage::SqliteIdentityStore;
use crate::storage::sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "LINKAGE_CONFIG_PATH";

/// Default environment variable holding the HMAC pepper.
pub const DEFAULT_SECRET_ENV: &str = "LINKAGE_PSEUDONYM_KEY";

/// Default database file name, relative to the data directory.
pub const DEFAULT_DATABASE: &str = "identities.sqlite";

/// Default lease timeout in milliseconds.
pub const DEFAULT_LEASE_TIMEOUT_MS: u64 = 5000;

const APP_DIR: &str = "aadhaar-linkage";

/// Main configuration for the linkage engine.
#[derive(Debug, Clone)]
pub struct LinkageConfig {
    /// Path to the data directory.
    pub data_dir: PathBuf,
    /// Database file; relative paths resolve against `data_dir`.
    pub database: PathBuf,
    /// How long an operation waits for a conflicting one.
    pub lease_timeout: Duration,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
    /// Pseudonymizer selection.
    pub pseudonymizer: PseudonymizerSettings,
    /// Logging settings.
    pub logging: LoggingSettings,
    /// File the configuration was loaded from, if any.
    pub source_file: Option<PathBuf>,
}

/// Available pseudonymization algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PseudonymizerAlgorithm {
    /// Unkeyed SHA-256.
    #[default]
    Sha256,
    /// HMAC-SHA256 with a secret pepper.
    Hmac,
}

impl PseudonymizerAlgorithm {
    /// Parses an algorithm name.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "sha256" | "sha-256" => Some(Self::Sha256),
            "hmac" | "hmac-sha256" | "hmac_sha256" => Some(Self::Hmac),
            _ => None,
        }
    }

    /// Returns the algorithm name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sha256 => "sha256",
            Self::Hmac => "hmac",
        }
    }
}

impl fmt::Display for PseudonymizerAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Pseudonymizer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PseudonymizerSettings {
    /// Algorithm to use.
    pub algorithm: PseudonymizerAlgorithm,
    /// Environment variable holding the HMAC pepper.
    pub secret_env: String,
}

impl Default for PseudonymizerSettings {
    fn default() -> Self {
        Self {
            algorithm: PseudonymizerAlgorithm::default(),
            secret_env: DEFAULT_SECRET_ENV.to_string(),
        }
    }
}

/// Logging section of the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoggingSettings {
    /// Filter directive, e.g. `info` or `aadhaar_linkage=debug`.
    pub level: Option<String>,
    /// `pretty` or `json`.
    pub format: Option<String>,
    /// Log file path; stderr when absent.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Data directory.
    pub data_dir: Option<String>,
    /// Database file.
    pub database: Option<String>,
    /// Lease timeout in milliseconds.
    pub lease_timeout_ms: Option<u64>,
    /// `SQLite` busy timeout in milliseconds.
    pub busy_timeout_ms: Option<u32>,
    /// Pseudonymizer section.
    pub pseudonymizer: Option<ConfigFilePseudonymizer>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// Pseudonymizer section in config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFilePseudonymizer {
    /// Algorithm name.
    pub algorithm: Option<String>,
    /// Secret environment variable name.
    pub secret_env: Option<String>,
}

impl Default for LinkageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: PathBuf::from(DEFAULT_DATABASE),
            lease_timeout: Duration::from_millis(DEFAULT_LEASE_TIMEOUT_MS),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            pseudonymizer: PseudonymizerSettings::default(),
            logging: LoggingSettings::default(),
            source_file: None,
        }
    }
}

impl LinkageConfig {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let mut config = Self::from_toml(&contents)?;
        config.source_file = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parses configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid config file.
    pub fn from_toml(contents: &str) -> Result<Self> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Self::from_config_file(file)
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the platform config dir (`~/.config/aadhaar-linkage/config.toml`
    /// on Linux) and returns defaults if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join(APP_DIR).join("config.toml");
        if platform_config.exists() {
            match Self::load_from_file(&platform_config) {
                Ok(config) => return config,
                Err(e) => tracing::warn!(
                    path = %platform_config.display(),
                    error = %e,
                    "Ignoring unreadable config file"
                ),
            }
        }

        Self::default()
    }

    /// Resolves configuration the way the binary does.
    ///
    /// An explicit path wins, then `LINKAGE_CONFIG_PATH`, then the default
    /// location. Environment overrides are applied last.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be loaded or an
    /// override is invalid.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = explicit {
            Self::load_from_file(path)?
        } else {
            match std::env::var(CONFIG_PATH_ENV) {
                Ok(path) if !path.trim().is_empty() => Self::load_from_file(Path::new(&path))?,
                _ => Self::load_default(),
            }
        };

        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Applies environment-style overrides from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if `LINKAGE_PSEUDONYMIZER` names an unknown algorithm.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        let lookup = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(dir) = lookup("LINKAGE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(algorithm) = lookup("LINKAGE_PSEUDONYMIZER") {
            self.pseudonymizer.algorithm = parse_algorithm(&algorithm)?;
        }
        if let Some(format) = lookup("LINKAGE_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(level) = lookup("LINKAGE_LOG_LEVEL") {
            self.logging.level = Some(level);
        }
        Ok(())
    }

    /// Converts a `ConfigFile` to `LinkageConfig`.
    fn from_config_file(file: ConfigFile) -> Result<Self> {
        let mut config = Self::default();

        if let Some(data_dir) = file.data_dir {
            config.data_dir = PathBuf::from(data_dir);
        }
        if let Some(database) = file.database {
            config.database = PathBuf::from(database);
        }
        if let Some(ms) = file.lease_timeout_ms {
            config.lease_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = file.busy_timeout_ms {
            config.busy_timeout_ms = ms;
        }
        if let Some(pseudonymizer) = file.pseudonymizer {
            if let Some(algorithm) = pseudonymizer.algorithm {
                config.pseudonymizer.algorithm = parse_algorithm(&algorithm)?;
            }
            if let Some(secret_env) = pseudonymizer.secret_env {
                config.pseudonymizer.secret_env = secret_env;
            }
        }
        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        Ok(config)
    }

    /// Sets the data directory.
    #[must_use]
    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = path.into();
        self
    }

    /// Sets the pseudonymization algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: PseudonymizerAlgorithm) -> Self {
        self.pseudonymizer.algorithm = algorithm;
        self
    }

    /// Returns the resolved database path.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        if self.database.is_absolute() {
            self.database.clone()
        } else {
            self.data_dir.join(&self.database)
        }
    }

    /// Builds the configured pseudonymizer, reading the HMAC pepper from the
    /// process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if HMAC is selected and the secret is missing or empty.
    pub fn build_pseudonymizer(&self) -> Result<Box<dyn Pseudonymizer>> {
        self.build_pseudonymizer_with(|name| std::env::var(name).ok())
    }

    /// Builds the configured pseudonymizer, reading the pepper via `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if HMAC is selected and the secret is missing or empty.
    pub fn build_pseudonymizer_with(
        &self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Box<dyn Pseudonymizer>> {
        match self.pseudonymizer.algorithm {
            PseudonymizerAlgorithm::Sha256 => Ok(Box::new(Sha256Pseudonymizer)),
            PseudonymizerAlgorithm::Hmac => {
                let env = &self.pseudonymizer.secret_env;
                let secret = lookup(env).ok_or_else(|| Error::OperationFailed {
                    operation: "load_pseudonymizer_secret".to_string(),
                    cause: format!("{env} is not set"),
                })?;
                let pseudonymizer = HmacPseudonymizer::new(&SecretString::from(secret))?;
                Ok(Box::new(pseudonymizer))
            },
        }
    }

    /// Opens the `SQLite` identity store, creating the data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or database cannot be created.
    pub fn open_store(&self) -> Result<SqliteIdentityStore> {
        SqliteIdentityStore::with_busy_timeout(self.database_path(), self.busy_timeout_ms)
    }
}

impl fmt::Display for LinkageConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self
            .source_file
            .as_ref()
            .map_or_else(|| "(defaults)".to_string(), |p| p.display().to_string());
        writeln!(f, "config_file      = {source}")?;
        writeln!(f, "data_dir         = {}", self.data_dir.display())?;
        writeln!(f, "database         = {}", self.database_path().display())?;
        writeln!(f, "lease_timeout_ms = {}", self.lease_timeout.as_millis())?;
        writeln!(f, "busy_timeout_ms  = {}", self.busy_timeout_ms)?;
        writeln!(f, "pseudonymizer    = {}", self.pseudonymizer.algorithm)?;
        writeln!(f, "secret_env       = {}", self.pseudonymizer.secret_env)?;
        writeln!(
            f,
            "log_level        = {}",
            self.logging.level.as_deref().unwrap_or("info")
        )?;
        write!(
            f,
            "log_format       = {}",
            self.logging.format.as_deref().unwrap_or("pretty")
        )
    }
}

fn parse_algorithm(s: &str) -> Result<PseudonymizerAlgorithm> {
    PseudonymizerAlgorithm::parse(s).ok_or_else(|| Error::OperationFailed {
        operation: "parse_config".to_string(),
        cause: format!("unknown pseudonymizer algorithm: {s}"),
    })
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".aadhaar-linkage"),
        |dirs| dirs.data_local_dir().join(APP_DIR),
    )
}
