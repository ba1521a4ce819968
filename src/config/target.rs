// ABOUTME: Remote endpoint for the SSH connection.
// ABOUTME: Renders "host:port" with a decimal port, bracketing IPv6 literals.

use crate::error::{Error, Result};
use std::fmt;

pub const DEFAULT_PORT: u16 = 22;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    /// A bracketed IPv6 literal such as `[::1]` is stored without brackets
    /// so it resolves as an address.
    pub fn new(host: impl Into<String>, port: u16) -> Result<Self> {
        let host = host.into();
        let host = host.trim();
        let host = host
            .strip_prefix('[')
            .and_then(|inner| inner.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();
        if host.is_empty() {
            return Err(Error::InvalidConfig("host cannot be empty".to_string()));
        }
        if port == 0 {
            return Err(Error::InvalidConfig("port must be between 1 and 65535".to_string()));
        }
        Ok(Self { host, port })
    }

    /// `host:port` as used in logs and error messages.
    pub fn address(&self) -> String {
        self.to_string()
    }

    fn is_ipv6_literal(&self) -> bool {
        self.host.contains(':')
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ipv6_literal() {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
