//! Configuration types for the querygate gateway.
//!
//! Configuration is read from a single TOML file (`querygate.toml` by default)
//! and then overlaid with the classic process environment variables
//! (`PORT`, `DB_USER`, `DB_HOST`, `DB_DATABASE`, `DB_PASSWORD`, `DB_PORT`).
//! Every section has defaults, so an absent file is a valid configuration.

pub mod auth;
pub mod server;
pub mod upstream;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

pub use auth::{AuthConfig, CredentialScheme};
pub use server::ServerConfig;
pub use upstream::{ConnectionPoolConfig, SslMode, UpstreamConfig};

/// Complete gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Upstream Postgres connection.
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// Credential lookup settings.
    #[serde(default)]
    pub auth: AuthConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl GatewayConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::from)
    }

    /// Load the file if it exists (defaults otherwise), apply process
    /// environment overrides, and validate the result.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Overlay values from an environment lookup. Unset or blank variables
    /// leave the file value untouched.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(port) = get("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid("PORT", format!("'{}' is not a port", port)))?;
            self.server.set_port(port);
        }

        if let Some(user) = get("DB_USER") {
            self.upstream.username = user;
        }
        if let Some(host) = get("DB_HOST") {
            self.upstream.host = host;
        }
        if let Some(database) = get("DB_DATABASE") {
            self.upstream.database = database;
        }
        if let Some(password) = get("DB_PASSWORD") {
            self.upstream.password = Some(password);
        }
        if let Some(port) = get("DB_PORT") {
            self.upstream.port = port.trim().parse().map_err(|_| {
                ConfigError::invalid("DB_PORT", format!("'{}' is not a port", port))
            })?;
        }

        Ok(())
    }

    /// Check cross-field constraints that serde defaults cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server
            .socket_addr()
            .map_err(|reason| ConfigError::invalid("server.bind", reason))?;

        if !is_valid_table_name(&self.auth.users_table) {
            return Err(ConfigError::invalid(
                "auth.users_table",
                format!("'{}' is not a plain SQL identifier", self.auth.users_table),
            ));
        }

        if let Some(pool) = &self.upstream.pool {
            if pool.max_connections == 0 {
                return Err(ConfigError::invalid(
                    "upstream.pool.max_connections",
                    "must be at least 1",
                ));
            }
            if pool.min_connections > pool.max_connections {
                return Err(ConfigError::invalid(
                    "upstream.pool.min_connections",
                    "must not exceed max_connections",
                ));
            }
        }

        Ok(())
    }

    /// Render the effective configuration as TOML with secrets masked.
    pub fn to_redacted_toml(&self) -> Result<String, toml::ser::Error> {
        let mut redacted = self.clone();
        if redacted.upstream.password.is_some() {
            redacted.upstream.password = Some("********".to_string());
        }
        if redacted.upstream.database_url.is_some() {
            redacted.upstream.database_url = Some("********".to_string());
        }
        toml::to_string_pretty(&redacted)
    }
}

/// `name` or `schema.name`, each part `[A-Za-z_][A-Za-z0-9_]*`.
fn is_valid_table_name(name: &str) -> bool {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 {
        return false;
    }
    parts.iter().all(|part| {
        let mut chars = part.chars();
        match chars.next() {
            Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = GatewayConfig::from_toml("").unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:3001");
        assert_eq!(config.auth.users_table, "users");
        assert_eq!(config.auth.credential_scheme, CredentialScheme::Plaintext);
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_file() {
        let config = GatewayConfig::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:8080"
            cors_allow_any_origin = false

            [upstream]
            host = "db.internal"
            port = 6543
            database = "shop"
            username = "gateway"

            [upstream.pool]
            max_connections = 4

            [auth]
            credential_scheme = "argon2"
            users_table = "app.users"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert!(!config.server.cors_allow_any_origin);
        assert_eq!(config.upstream.port, 6543);
        assert_eq!(config.upstream.pool.as_ref().unwrap().max_connections, 4);
        assert_eq!(config.auth.credential_scheme, CredentialScheme::Argon2);
        config.validate().unwrap();
    }

    #[test]
    fn test_env_overrides_replace_file_values() {
        let mut config = GatewayConfig::default();
        let vars = env(&[
            ("PORT", "4000"),
            ("DB_USER", "svc"),
            ("DB_HOST", "pg"),
            ("DB_DATABASE", "inventory"),
            ("DB_PASSWORD", "s3cret"),
            ("DB_PORT", "5544"),
        ]);
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();

        assert_eq!(config.server.bind, "0.0.0.0:4000");
        assert_eq!(
            config.upstream.connection_string(),
            "postgresql://svc:s3cret@pg:5544/inventory"
        );
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = GatewayConfig::default();
        let vars = env(&[("DB_HOST", "  ")]);
        config.apply_overrides(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(config.upstream.host, "localhost");
    }

    #[test]
    fn test_bad_port_override_is_rejected() {
        let mut config = GatewayConfig::default();
        let vars = env(&[("DB_PORT", "not-a-port")]);
        let err = config.apply_overrides(|k| vars.get(k).cloned()).unwrap_err();
        assert!(err.to_string().contains("DB_PORT"));
    }

    #[test]
    fn test_users_table_must_be_identifier() {
        assert!(is_valid_table_name("users"));
        assert!(is_valid_table_name("public.users"));
        assert!(is_valid_table_name("_shadow_users2"));
        assert!(!is_valid_table_name("users; DROP TABLE x"));
        assert!(!is_valid_table_name("a.b.c"));
        assert!(!is_valid_table_name("1users"));
        assert!(!is_valid_table_name(""));

        let mut config = GatewayConfig::default();
        config.auth.users_table = "users--".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pool_bounds_validated() {
        let mut config = GatewayConfig::default();
        config.upstream.pool = Some(ConnectionPoolConfig {
            min_connections: 5,
            max_connections: 2,
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_redacted_output_hides_password() {
        let mut config = GatewayConfig::default();
        config.upstream.password = Some("hunter2".to_string());
        let rendered = config.to_redacted_toml().unwrap();
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("********"));
    }
}
