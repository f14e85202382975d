//! Credential lookup configuration.

use serde::{Deserialize, Serialize};

/// How the stored credential column is compared with the submitted one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialScheme {
    /// Exact string match against a plaintext column. Insecure; kept for
    /// compatibility with existing user tables.
    #[default]
    Plaintext,
    /// Column holds an Argon2 PHC string.
    Argon2,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default)]
    pub credential_scheme: CredentialScheme,

    /// Table holding `username`, `password` and `role` columns.
    #[serde(default = "default_users_table")]
    pub users_table: String,
}

fn default_users_table() -> String {
    "users".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            credential_scheme: CredentialScheme::default(),
            users_table: default_users_table(),
        }
    }
}
