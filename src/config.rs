use std::{fs, path::Path, time::Duration};

use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("read config: {0}")]
    Read(#[from] std::io::Error),
    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("max_sessions must be at least 1, omit it to accept without limit")]
    ZeroSessions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub listen: String,
    pub dial_timeout_ms: u64,
    pub keepalive: bool,
    /// Upper bound on concurrent sessions. `None` accepts without limit.
    pub max_sessions: Option<usize>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1:1080".to_string(),
            dial_timeout_ms: 2000,
            keepalive: true,
            max_sessions: None,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_sessions == Some(0) {
            return Err(ConfigError::ZeroSessions);
        }
        Ok(())
    }

    pub fn dial_timeout(&self) -> Duration {
        Duration::from_millis(self.dial_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.listen, "127.0.0.1:1080");
        assert_eq!(config.dial_timeout(), Duration::from_secs(2));
        assert!(config.keepalive);
        assert_eq!(config.max_sessions, None);
    }

    #[test]
    fn explicit_values_win() {
        let config = Config::parse(
            r#"
            listen = "0.0.0.0:9050"
            dial_timeout_ms = 500
            keepalive = false
            max_sessions = 64
            "#,
        )
        .unwrap();
        assert_eq!(config.listen, "0.0.0.0:9050");
        assert_eq!(config.dial_timeout(), Duration::from_millis(500));
        assert!(!config.keepalive);
        assert_eq!(config.max_sessions, Some(64));
    }

    #[test]
    fn malformed_config_is_rejected() {
        assert!(matches!(
            Config::parse("listen = 1080"),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            Config::parse("listen = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_max_sessions_is_rejected() {
        assert!(matches!(
            Config::parse("max_sessions = 0"),
            Err(ConfigError::ZeroSessions)
        ));
        assert_eq!(Config::parse("max_sessions = 1").unwrap().max_sessions, Some(1));
    }

    #[test]
    fn missing_file_is_read_error() {
        assert!(matches!(
            Config::load("/nonexistent/socks5-relay.toml"),
            Err(ConfigError::Read(_))
        ));
    }
}
