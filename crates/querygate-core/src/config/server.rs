//! HTTP listener configuration.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address, e.g. "0.0.0.0:3001"
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Answer CORS preflights for any origin.
    #[serde(default = "default_true")]
    pub cors_allow_any_origin: bool,
}

fn default_bind() -> String {
    "0.0.0.0:3001".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            cors_allow_any_origin: default_true(),
        }
    }
}

impl ServerConfig {
    /// Parse `bind` into a socket address.
    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        self.bind
            .parse()
            .map_err(|e| format!("'{}' is not a socket address: {}", self.bind, e))
    }

    /// Keep the bind host, replace only the port.
    pub fn set_port(&mut self, port: u16) {
        let host = match self.bind.rsplit_once(':') {
            Some((host, _)) if !host.is_empty() => host.to_string(),
            _ => "0.0.0.0".to_string(),
        };
        self.bind = format!("{}:{}", host, port);
    }
}
