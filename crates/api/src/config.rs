//! Application configuration loaded from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use common::{IdError, StoreCode};
use store::{DEFAULT_RESERVATION_TTL, NodeConfig};
use thiserror::Error;
use wire::DEFAULT_TIMEOUT;

/// Store run when `STORE_CODE` is unset.
pub const DEFAULT_STORE_CODE: &str = "QC";

/// A variable that is set but cannot be used.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid STORE_CODE: {0}")]
    StoreCode(#[from] IdError),

    #[error("invalid {var}: {value:?}")]
    Invalid { var: &'static str, value: String },
}

/// Node and server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `STORE_CODE`: which store this node runs (default: `"QC"`)
/// - `HOST`: HTTP bind address (default: `"0.0.0.0"`)
/// - `PORT`: HTTP listen port (default: `3000`)
/// - `UDP_PORT`: peer listener port (default: the store's directory port)
/// - `PEER_TIMEOUT_MS`: wait for a peer's answer (default: `5000`)
/// - `RESERVATION_TTL_SECS`: idle exchange hold lifetime (default: `60`)
/// - `SEED_SAMPLE_DATA`: stock the sample items at startup (default: `true`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub store_code: StoreCode,
    pub host: String,
    pub port: u16,
    pub udp_port: Option<u16>,
    pub peer_timeout: Duration,
    pub reservation_ttl: Duration,
    pub seed_sample_data: bool,
    pub log_level: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Loads configuration from `lookup`, which maps a variable name to its value.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let number = |var: &'static str| -> Result<Option<u64>, ConfigError> {
            lookup(var)
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::Invalid { var, value })
                })
                .transpose()
        };
        let port = |var: &'static str| -> Result<Option<u16>, ConfigError> {
            number(var)?
                .map(|n| {
                    u16::try_from(n).map_err(|_| ConfigError::Invalid {
                        var,
                        value: n.to_string(),
                    })
                })
                .transpose()
        };
        let seed_sample_data = match lookup("SEED_SAMPLE_DATA") {
            None => true,
            Some(value) => match value.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" => false,
                _ => {
                    return Err(ConfigError::Invalid {
                        var: "SEED_SAMPLE_DATA",
                        value,
                    });
                }
            },
        };

        Ok(Self {
            store_code: StoreCode::new(
                lookup("STORE_CODE")
                    .map(|code| code.trim().to_ascii_uppercase())
                    .unwrap_or_else(|| DEFAULT_STORE_CODE.to_string()),
            )?,
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: port("PORT")?.unwrap_or(3000),
            udp_port: port("UDP_PORT")?,
            peer_timeout: number("PEER_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(DEFAULT_TIMEOUT),
            reservation_ttl: number("RESERVATION_TTL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_RESERVATION_TTL),
            seed_sample_data,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the store node this process runs.
    ///
    /// An explicit `UDP_PORT` also replaces this store's entry in the peer
    /// directory.
    pub fn node_config(&self) -> NodeConfig {
        let mut node = NodeConfig::new(self.store_code.clone())
            .with_peer_timeout(self.peer_timeout)
            .with_reservation_ttl(self.reservation_ttl);
        if let Some(addr) = self.udp_addr() {
            node.peers = node.peers.with_address(self.store_code.clone(), addr);
        }
        node
    }

    fn udp_addr(&self) -> Option<SocketAddr> {
        let port = self.udp_port?;
        let base = NodeConfig::new(self.store_code.clone())
            .listen_addr()
            .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 0)));
        Some(SocketAddr::new(base.ip(), port))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_default_values() {
        let config = Config::from_lookup(|_| None).unwrap();
        assert_eq!(config.store_code.as_str(), "QC");
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.peer_timeout, Duration::from_secs(5));
        assert!(config.seed_sample_data);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::from_lookup(|_| None).unwrap()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }

    #[test]
    fn test_reads_variables() {
        let config = Config::from_lookup(lookup(&[
            ("STORE_CODE", "on"),
            ("PORT", "3002"),
            ("PEER_TIMEOUT_MS", "250"),
            ("RESERVATION_TTL_SECS", "5"),
            ("SEED_SAMPLE_DATA", "false"),
        ]))
        .unwrap();
        assert_eq!(config.store_code.as_str(), "ON");
        assert_eq!(config.port, 3002);
        assert_eq!(config.peer_timeout, Duration::from_millis(250));
        assert_eq!(config.reservation_ttl, Duration::from_secs(5));
        assert!(!config.seed_sample_data);

        let node = config.node_config();
        assert_eq!(node.listen_addr(), Some("127.0.0.1:8002".parse().unwrap()));
        assert_eq!(node.peer_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_udp_port_overrides_directory_entry() {
        let config = Config::from_lookup(lookup(&[("UDP_PORT", "9101")])).unwrap();
        let node = config.node_config();
        assert_eq!(node.listen_addr(), Some("127.0.0.1:9101".parse().unwrap()));
        let on = StoreCode::new("ON").unwrap();
        assert_eq!(node.peers.address(&on), Some("127.0.0.1:8002".parse().unwrap()));
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            Config::from_lookup(lookup(&[("STORE_CODE", "QUEBEC")])),
            Err(ConfigError::StoreCode(_))
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("PORT", "70000")])),
            Err(ConfigError::Invalid { var: "PORT", .. })
        ));
        assert!(matches!(
            Config::from_lookup(lookup(&[("SEED_SAMPLE_DATA", "maybe")])),
            Err(ConfigError::Invalid { .. })
        ));
    }
}
