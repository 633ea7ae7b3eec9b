//! Process configuration, read once at startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::factory::ProviderConfig;
use crate::logging::LoggingConfig;
use crate::relay::RelayOptions;
use crate::Error;

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5001;

/// Everything the binary needs to start serving.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub provider: ProviderConfig,
    pub host: String,
    pub port: u16,
    /// `sled` directory; records stay in memory when unset.
    pub record_store_path: Option<PathBuf>,
    pub generation_timeout: Option<Duration>,
    pub logging: LoggingConfig,
}

impl RelayConfig {
    /// Create configuration from environment variables.
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read every setting through `lookup`. Missing provider credentials are
    /// an error; everything else has a default.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let port = match var("PORT") {
            Some(port) => port
                .trim()
                .parse()
                .map_err(|_| Error::config(format!("PORT must be a port number, got '{port}'")))?,
            None => DEFAULT_PORT,
        };

        // Zero is the same as unset: no timeout.
        let generation_timeout = match var("GENERATION_TIMEOUT_SECS") {
            Some(secs) => {
                let secs: u64 = secs.trim().parse().map_err(|_| {
                    Error::config(format!(
                        "GENERATION_TIMEOUT_SECS must be a whole number of seconds, got '{secs}'"
                    ))
                })?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            provider: ProviderConfig::from_lookup(&lookup)?,
            host: var("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            record_store_path: var("RECORD_STORE_PATH").map(PathBuf::from),
            generation_timeout,
            logging: LoggingConfig::from_lookup(&lookup)?,
        })
    }

    pub fn bind_address(&self) -> Result<SocketAddr, Error> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::config(format!("Invalid HOST '{}': {e}", self.host)))
    }

    pub fn relay_options(&self) -> RelayOptions {
        RelayOptions {
            timeout: self.generation_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<RelayConfig, Error> {
        let vars: HashMap<&str, &str> = vars.iter().copied().collect();
        RelayConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string()))
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("GEMINI_API_KEY", "secret")]).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.bind_address().unwrap().to_string(), "0.0.0.0:5001");
        assert_eq!(config.record_store_path, None);
        assert_eq!(config.relay_options(), RelayOptions::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("GEMINI_API_KEY", "secret"),
            ("HOST", "127.0.0.1"),
            ("PORT", "8080"),
            ("RECORD_STORE_PATH", "/var/lib/care-relay"),
            ("GENERATION_TIMEOUT_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.bind_address().unwrap().to_string(), "127.0.0.1:8080");
        assert_eq!(
            config.record_store_path,
            Some(PathBuf::from("/var/lib/care-relay"))
        );
        assert_eq!(config.generation_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_zero_timeout_is_off() {
        let config =
            config_from(&[("GEMINI_API_KEY", "secret"), ("GENERATION_TIMEOUT_SECS", "0")])
                .unwrap();
        assert_eq!(config.generation_timeout, None);
    }

    #[test]
    fn test_bad_port() {
        let result = config_from(&[("GEMINI_API_KEY", "secret"), ("PORT", "http")]);
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        assert!(matches!(config_from(&[]), Err(Error::Config(_))));
    }
}
