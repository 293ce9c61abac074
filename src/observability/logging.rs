//! Structured logging configuration.

use crate::config::LoggingSettings;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Default filter directive.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable multi-line output.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Parses a format name, falling back to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Resolved logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// `EnvFilter` directive.
    pub directive: String,
    /// Log file; stderr when absent.
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            directive: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

impl LoggingConfig {
    /// Builds logging configuration from config settings with env overrides.
    ///
    /// The filter comes from `LINKAGE_LOG`, then `RUST_LOG`, then `--verbose`
    /// (debug), then the configured level.
    #[must_use]
    pub fn from_settings(settings: &LoggingSettings, verbose: bool) -> Self {
        Self::from_settings_with(settings, verbose, |name| std::env::var(name).ok())
    }

    /// Same as [`Self::from_settings`], reading variables via `lookup`.
    #[must_use]
    pub fn from_settings_with(
        settings: &LoggingSettings,
        verbose: bool,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let from_env = lookup("LINKAGE_LOG")
            .or_else(|| lookup("RUST_LOG"))
            .filter(|v| !v.trim().is_empty());
        let directive = from_env
            .or_else(|| verbose.then(|| "debug".to_string()))
            .or_else(|| settings.level.clone())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        Self {
            format: settings
                .format
                .as_deref()
                .map_or_else(LogFormat::default, LogFormat::parse),
            directive,
            file: settings.file.clone(),
        }
    }

    /// Builds the subscriber filter, falling back to the default level on an
    /// invalid directive.
    #[must_use]
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_new(&self.directive).unwrap_or_else(|e| {
            eprintln!("Invalid log filter '{}': {e}", self.directive);
            EnvFilter::new(DEFAULT_LOG_LEVEL)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(level: Option<&str>, format: Option<&str>) -> LoggingSettings {
        LoggingSettings {
            level: level.map(str::to_string),
            format: format.map(str::to_string),
            file: None,
        }
    }

    #[test]
    fn test_defaults() {
        let config = LoggingConfig::from_settings_with(&settings(None, None), false, |_| None);
        assert_eq!(config, LoggingConfig::default());
    }

    #[test]
    fn test_filter_precedence() {
        let s = settings(Some("warn"), Some("json"));

        let config = LoggingConfig::from_settings_with(&s, false, |_| None);
        assert_eq!(config.directive, "warn");
        assert_eq!(config.format, LogFormat::Json);

        let config = LoggingConfig::from_settings_with(&s, true, |_| None);
        assert_eq!(config.directive, "debug");

        let config = LoggingConfig::from_settings_with(&s, true, |name| {
            (name == "RUST_LOG").then(|| "trace".to_string())
        });
        assert_eq!(config.directive, "trace");

        let config = LoggingConfig::from_settings_with(&s, true, |name| match name {
            "LINKAGE_LOG" => Some("aadhaar_linkage=debug".to_string()),
            "RUST_LOG" => Some("trace".to_string()),
            _ => None,
        });
        assert_eq!(config.directive, "aadhaar_linkage=debug");
    }

    #[test]
    fn test_format_parse() {
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("compact"), LogFormat::Pretty);
    }
}
