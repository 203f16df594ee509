//! Logging configuration
//!
//! Controls the internal logging behavior of DustDevil.

use std::path::PathBuf;

use serde::Deserialize;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - very verbose
    Trace,
    /// Debug level - debugging information
    Debug,
    /// Info level - normal operation (default)
    #[default]
    Info,
    /// Warn level - warnings only
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Logging configuration
///
/// When both `path` and `file` are set, logs go to that file; a SIGUSR2
/// reopens it if `rotate` is enabled. Otherwise logs go to stdout.
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// path = "/var/log/dustdevil"
/// file = "dustdevil.log"
/// rotate = true
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    /// Default: info
    pub level: LogLevel,

    /// Output format (console, json)
    /// Default: console
    pub format: LogFormat,

    /// Log directory; empty means stdout
    pub path: String,

    /// Log file name within `path`
    pub file: String,

    /// Reopen the log file on SIGUSR2
    /// Default: false
    pub rotate: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Console,
            path: String::new(),
            file: String::new(),
            rotate: false,
        }
    }
}

impl LogConfig {
    /// The log file destination, if file logging is configured
    pub fn file_path(&self) -> Option<PathBuf> {
        if self.path.is_empty() || self.file.is_empty() {
            return None;
        }
        Some(PathBuf::from(&self.path).join(&self.file))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, LogLevel::Info);
        assert_eq!(config.format, LogFormat::Console);
        assert!(config.file_path().is_none());
        assert!(!config.rotate);
    }

    #[test]
    fn test_deserialize_all_levels() {
        for (s, expected) in [
            ("trace", LogLevel::Trace),
            ("debug", LogLevel::Debug),
            ("info", LogLevel::Info),
            ("warn", LogLevel::Warn),
            ("error", LogLevel::Error),
        ] {
            let toml = format!("level = \"{}\"", s);
            let config: LogConfig = toml::from_str(&toml).unwrap();
            assert_eq!(config.level, expected);
        }
    }

    #[test]
    fn test_file_path() {
        let toml = r#"
path = "/var/log/dustdevil"
file = "dustdevil.log"
"#;
        let config: LogConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.file_path(),
            Some(PathBuf::from("/var/log/dustdevil/dustdevil.log"))
        );
    }

    #[test]
    fn test_file_path_requires_both() {
        let config: LogConfig = toml::from_str("path = \"/var/log\"").unwrap();
        assert!(config.file_path().is_none());
    }
}
