use crate::{ConfigError, env_optional};
use std::net::{Ipv4Addr, SocketAddr};

/// Address an HTTP endpoint binds to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ListenConfig {
    pub addr: SocketAddr,
}

impl ListenConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self { addr }
    }

    /// Reads `key` as `host:port` or a bare port bound on all interfaces.
    /// Returns `None` when the variable is unset.
    pub fn from_env_key(key: &str) -> Result<Option<Self>, ConfigError> {
        let Some(raw) = env_optional(key) else {
            return Ok(None);
        };
        let raw = raw.trim();

        let addr = match raw.parse::<u16>() {
            Ok(port) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)),
            Err(_) => raw.parse().map_err(|e| ConfigError::ParseError {
                key: key.to_string(),
                details: format!("{e}"),
            })?,
        };

        Ok(Some(Self { addr }))
    }
}
