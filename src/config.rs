//! Relay configuration, loaded once at process start.
//!
//! The config file is optional; a missing file yields `Config::default()`,
//! which carries the public CORS relays the hosted app depends on. Unknown
//! keys are silently ignored by serde, though we log a warning when the file
//! contains potential typos. The relay list is validated at load time and is
//! read-only afterwards; a bad relay setup is a startup error, never a
//! per-call one.
use crate::net::RelayEndpoint;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),

    /// The relay list is empty; discovery cannot fall back anywhere.
    #[error("No relay endpoints configured")]
    NoRelays,

    /// A relay template lacks the `{url}` placeholder.
    #[error("Relay '{0}' template has no {{url}} placeholder")]
    BadTemplate(String),
}

/// One `[[relays]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    pub name: String,
    pub template: String,
}

/// Top-level configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Relay endpoints in priority order (first entry is tried first).
    pub relays: Vec<RelayConfig>,

    /// Timeout for the direct fetch tier, in seconds.
    pub direct_timeout_secs: u64,

    /// Timeout per relay attempt, in seconds.
    pub relay_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relays: vec![
                RelayConfig {
                    name: "allorigins".to_owned(),
                    template: "https://api.allorigins.win/raw?url={url}".to_owned(),
                },
                RelayConfig {
                    name: "corsproxy".to_owned(),
                    template: "https://corsproxy.io/?url={url}".to_owned(),
                },
                RelayConfig {
                    name: "codetabs".to_owned(),
                    template: "https://api.codetabs.com/v1/proxy?quest={url}".to_owned(),
                },
            ],
            direct_timeout_secs: 10,
            relay_timeout_secs: 8,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    /// - Empty relay list / bad template → startup error
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading to avoid slurping a corrupted file
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Race: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        // Parse as a raw table first to warn about unknown keys
        if let Ok(raw) = content.parse::<toml::Table>() {
            let known_keys = ["relays", "direct_timeout_secs", "relay_timeout_secs"];
            for key in raw.keys() {
                if !known_keys.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            relays = config.relays.len(),
            "Loaded relay configuration"
        );
        Ok(config)
    }

    /// Startup invariants: at least one relay, every template substitutable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relays.is_empty() {
            return Err(ConfigError::NoRelays);
        }
        for relay in &self.relays {
            if !relay.template.contains("{url}") {
                return Err(ConfigError::BadTemplate(relay.name.clone()));
            }
        }
        Ok(())
    }

    pub fn relay_endpoints(&self) -> Vec<RelayEndpoint> {
        self.relays
            .iter()
            .map(|r| RelayEndpoint::new(r.name.clone(), r.template.clone()))
            .collect()
    }

    pub fn direct_timeout(&self) -> Duration {
        Duration::from_secs(self.direct_timeout_secs)
    }

    pub fn relay_timeout(&self) -> Duration {
        Duration::from_secs(self.relay_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.relays.len(), 3);
        assert_eq!(config.relays[0].name, "allorigins");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = Config::load(Path::new("/nonexistent/feedscout/relays.toml")).unwrap();
        assert_eq!(config.relays.len(), Config::default().relays.len());
    }

    #[test]
    fn test_parse_overrides_relay_order() {
        let toml = r#"
direct_timeout_secs = 5

[[relays]]
name = "mine"
template = "https://relay.mine/fetch?u={url}"

[[relays]]
name = "backup"
template = "https://backup.mine/{url}"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.direct_timeout(), Duration::from_secs(5));
        // Unspecified keys keep defaults
        assert_eq!(config.relay_timeout(), Duration::from_secs(8));
        let endpoints = config.relay_endpoints();
        assert_eq!(endpoints[0].name, "mine");
        assert_eq!(endpoints[1].name, "backup");
    }

    #[test]
    fn test_empty_relay_list_rejected() {
        let config: Config = toml::from_str("relays = []").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::NoRelays)));
    }

    #[test]
    fn test_template_without_placeholder_rejected() {
        let toml = r#"
[[relays]]
name = "broken"
template = "https://relay.example/fetch"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BadTemplate(name)) if name == "broken"
        ));
    }
}
