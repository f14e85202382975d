//! Permission-gated statement execution.

use crate::error::GatewayError;
use crate::pool::{ConnectionPool, ScopedConnection};
use querygate_core::{QueryRequest, QueryResult, RoleId};
use querygate_policy::{PolicyTable, classify};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Classifies, authorizes and executes submitted statements.
///
/// Holds no per-call state; one dispatcher is shared by all concurrent
/// requests and all synchronization is left to the pool.
pub struct QueryDispatcher {
    pool: Arc<dyn ConnectionPool>,
    policy: Arc<PolicyTable>,
}

impl QueryDispatcher {
    pub fn new(pool: Arc<dyn ConnectionPool>, policy: Arc<PolicyTable>) -> Self {
        Self { pool, policy }
    }

    pub fn policy(&self) -> &PolicyTable {
        &self.policy
    }

    /// Validate, authorize and run one statement.
    ///
    /// Checks run in order and the first failure wins: empty statement,
    /// missing role, unknown role, empty verb, policy. Only a permitted
    /// statement reaches the pool, and it gets exactly one checkout.
    pub async fn dispatch(&self, request: &QueryRequest) -> Result<QueryResult, GatewayError> {
        let span = tracing::info_span!(
            "dispatch",
            request_id = %Uuid::new_v4(),
            role = request.role.as_deref().unwrap_or(""),
        );
        self.dispatch_inner(request).instrument(span).await
    }

    async fn dispatch_inner(&self, request: &QueryRequest) -> Result<QueryResult, GatewayError> {
        if request.statement.is_empty() {
            return Err(GatewayError::EmptyStatement);
        }

        let role = match request.role.as_deref() {
            None | Some("") => return Err(GatewayError::MissingRole),
            Some(raw) => raw.parse::<RoleId>().map_err(|_| GatewayError::InvalidRole {
                role: raw.to_string(),
            })?,
        };
        if !self.policy.has_role(role) {
            return Err(GatewayError::InvalidRole {
                role: role.to_string(),
            });
        }

        let verb = classify(&request.statement)?;

        if let Err(denial) = self.policy.check(role, &verb) {
            tracing::warn!(verb = %verb, "statement denied by policy");
            return Err(denial.into());
        }

        let mut conn = ScopedConnection::acquire(self.pool.as_ref())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "could not acquire connection");
                GatewayError::BackendUnavailable {
                    message: e.message().to_string(),
                }
            })?;

        let outcome = conn.execute(&request.statement, &request.parameters).await;
        conn.release();

        match outcome {
            Ok(raw) => {
                tracing::info!(
                    verb = %verb,
                    command = %raw.command,
                    row_count = raw.row_count,
                    "statement executed"
                );
                Ok(QueryResult {
                    command_verb: raw.command,
                    row_count: raw.row_count,
                    rows: raw.rows,
                })
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    statement = %request.statement,
                    "error executing statement"
                );
                Err(GatewayError::ExecutionFailed {
                    message: e.message().to_string(),
                    statement: request.statement.clone(),
                })
            }
        }
    }
}
