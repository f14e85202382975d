//! Credential validation and the manager-only user listing.

use crate::credentials::{compared_in_backend, verify_argon2};
use crate::error::GatewayError;
use crate::pool::{ConnectionPool, PoolError};
use querygate_core::{
    AuthConfig, CredentialScheme, Principal, Record, RoleId, Scalar, UserListing, UserSummary,
};
use querygate_policy::{PolicyTable, require_role};
use std::sync::Arc;

/// Validates username/credential pairs against the users table.
pub struct Authenticator {
    pool: Arc<dyn ConnectionPool>,
    policy: Arc<PolicyTable>,
    scheme: CredentialScheme,
    users_table: String,
}

impl Authenticator {
    pub fn new(pool: Arc<dyn ConnectionPool>, policy: Arc<PolicyTable>, config: &AuthConfig) -> Self {
        Self {
            pool,
            policy,
            scheme: config.credential_scheme,
            users_table: config.users_table.clone(),
        }
    }

    /// Resolve `username`/`credential` to a principal.
    ///
    /// If several stored records match, the first one the backend returns wins.
    pub async fn authenticate(
        &self,
        username: &str,
        credential: &str,
    ) -> Result<Principal, GatewayError> {
        if username.is_empty() || credential.is_empty() {
            return Err(GatewayError::MissingCredentials);
        }

        let matched = if compared_in_backend(self.scheme) {
            self.find_plaintext_match(username, credential).await?
        } else {
            self.find_hashed_match(username, credential).await?
        };

        let Some(row) = matched else {
            tracing::info!(username, "login rejected");
            return Err(GatewayError::InvalidCredentials);
        };

        let stored_name = column_str(&row, "username")?;
        let stored_role = column_str(&row, "role")?;
        let role = self.known_role(stored_role)?;

        tracing::info!(username = stored_name, role = %role, "login succeeded");
        Ok(Principal {
            username: stored_name.to_string(),
            role,
        })
    }

    /// List every stored user ordered by role, then username. Managers only.
    pub async fn list_users(&self, role: Option<&str>) -> Result<UserListing, GatewayError> {
        require_role(RoleId::Manager, role, "view user data")?;

        let statement = format!(
            "SELECT username, role FROM {} ORDER BY role, username",
            self.users_table
        );
        let result = self
            .pool
            .run_one(&statement, &[])
            .await
            .map_err(backend_fault)?;

        let rows = result
            .rows
            .iter()
            .map(|row| {
                Ok(UserSummary {
                    username: column_str(row, "username")?.to_string(),
                    role: column_str(row, "role")?.to_string(),
                })
            })
            .collect::<Result<Vec<_>, GatewayError>>()?;

        tracing::debug!(row_count = result.row_count, "listed users");
        Ok(UserListing {
            row_count: result.row_count,
            rows,
        })
    }

    async fn find_plaintext_match(
        &self,
        username: &str,
        credential: &str,
    ) -> Result<Option<Record>, GatewayError> {
        let statement = format!(
            "SELECT username, role FROM {} WHERE username = $1 AND password = $2",
            self.users_table
        );
        let params = [
            Scalar::Text(username.to_string()),
            Scalar::Text(credential.to_string()),
        ];
        let result = self
            .pool
            .run_one(&statement, &params)
            .await
            .map_err(backend_fault)?;
        Ok(result.rows.into_iter().next())
    }

    async fn find_hashed_match(
        &self,
        username: &str,
        credential: &str,
    ) -> Result<Option<Record>, GatewayError> {
        let statement = format!(
            "SELECT username, password, role FROM {} WHERE username = $1",
            self.users_table
        );
        let params = [Scalar::Text(username.to_string())];
        let result = self
            .pool
            .run_one(&statement, &params)
            .await
            .map_err(backend_fault)?;

        // Argon2 is deliberately slow; keep it off the async workers.
        let submitted = credential.to_string();
        tokio::task::spawn_blocking(move || {
            result.rows.into_iter().find(|row| {
                row.get("password")
                    .and_then(|v| v.as_str())
                    .is_some_and(|stored| verify_argon2(&submitted, stored))
            })
        })
        .await
        .map_err(|e| GatewayError::internal(format!("credential check aborted: {}", e)))
    }

    /// A stored role must be a known role with a policy entry.
    fn known_role(&self, stored: &str) -> Result<RoleId, GatewayError> {
        match stored.parse::<RoleId>() {
            Ok(role) if self.policy.has_role(role) => Ok(role),
            _ => {
                tracing::warn!(role = stored, "stored user has a role without a policy entry");
                Err(GatewayError::InvalidRole {
                    role: stored.to_string(),
                })
            }
        }
    }
}

fn backend_fault(err: PoolError) -> GatewayError {
    tracing::error!(error = %err, "user lookup failed");
    match err {
        PoolError::Unavailable(message) => GatewayError::BackendUnavailable { message },
        PoolError::Execution(message) => GatewayError::Internal { message },
    }
}

fn column_str<'a>(row: &'a Record, column: &str) -> Result<&'a str, GatewayError> {
    row.get(column)
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::internal(format!("users row has no text column '{}'", column)))
}
