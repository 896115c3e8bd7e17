//! Server settings

use copilot_core::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listening port
pub const DEFAULT_PORT: u16 = 3000;

/// Default directory holding uploaded chart images
pub const DEFAULT_UPLOADS_DIR: &str = "uploads/images";

/// Bind address and uploads location
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    pub uploads_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            uploads_dir: PathBuf::from(DEFAULT_UPLOADS_DIR),
        }
    }
}

impl ServerConfig {
    /// Read `PORT` and `UPLOADS_DIR`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(port) = lookup("PORT") {
            config.port = port
                .trim()
                .parse()
                .map_err(|e| Error::Configuration(format!("PORT is not a valid port: {e}")))?;
        }
        if let Some(dir) = lookup("UPLOADS_DIR").filter(|d| !d.trim().is_empty()) {
            config.uploads_dir = PathBuf::from(dir);
        }
        Ok(config)
    }

    /// Address to listen on, all interfaces
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind_addr().to_string(), "0.0.0.0:3000");
    }

    #[test]
    fn test_overrides() {
        let config =
            ServerConfig::from_lookup(lookup(&[("PORT", "8080"), ("UPLOADS_DIR", "/data/charts")]))
                .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.uploads_dir, PathBuf::from("/data/charts"));
    }

    #[test]
    fn test_bad_port() {
        let err = ServerConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert_eq!(err.kind(), "configuration_error");
    }
}
