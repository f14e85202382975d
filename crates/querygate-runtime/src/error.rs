//! Error taxonomy for gateway operations.

use querygate_policy::{ClassifyError, PolicyDenial};
use thiserror::Error;

/// Every way an authenticate, list-users or dispatch call can fail.
///
/// Each variant maps to one status via [`status_code`](Self::status_code);
/// nothing is retried or recovered locally.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("username and password are required")]
    MissingCredentials,

    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("statement is empty")]
    EmptyStatement,

    #[error("role must be provided")]
    MissingRole,

    #[error("invalid role '{role}'")]
    InvalidRole { role: String },

    #[error("permission denied: {0}")]
    PermissionDenied(PolicyDenial),

    #[error("execution failed: {message}")]
    ExecutionFailed { message: String, statement: String },

    #[error("backend unavailable: {message}")]
    BackendUnavailable { message: String },

    /// Unexpected backend fault outside statement execution.
    #[error("internal fault: {message}")]
    Internal { message: String },
}

impl GatewayError {
    /// HTTP status the transport should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::MissingCredentials
            | GatewayError::EmptyStatement
            | GatewayError::MissingRole
            | GatewayError::InvalidRole { .. } => 400,
            GatewayError::InvalidCredentials => 401,
            GatewayError::PermissionDenied(_) => 403,
            GatewayError::ExecutionFailed { .. }
            | GatewayError::BackendUnavailable { .. }
            | GatewayError::Internal { .. } => 500,
        }
    }

    /// Stable category name for error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MissingCredentials => "missing_credentials",
            GatewayError::InvalidCredentials => "invalid_credentials",
            GatewayError::EmptyStatement => "empty_statement",
            GatewayError::MissingRole => "missing_role",
            GatewayError::InvalidRole { .. } => "invalid_role",
            GatewayError::PermissionDenied(_) => "permission_denied",
            GatewayError::ExecutionFailed { .. } => "execution_failed",
            GatewayError::BackendUnavailable { .. } => "backend_unavailable",
            GatewayError::Internal { .. } => "internal",
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        GatewayError::Internal {
            message: message.into(),
        }
    }
}

impl From<ClassifyError> for GatewayError {
    fn from(err: ClassifyError) -> Self {
        match err {
            ClassifyError::EmptyStatement => GatewayError::EmptyStatement,
        }
    }
}

impl From<PolicyDenial> for GatewayError {
    fn from(denial: PolicyDenial) -> Self {
        GatewayError::PermissionDenied(denial)
    }
}
