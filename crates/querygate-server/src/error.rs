//! JSON error envelopes.

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use querygate_runtime::GatewayError;
use serde_json::{Map, Value, json};

/// Anything a handler can fail with.
#[derive(Debug)]
pub enum ApiError {
    Gateway(GatewayError),
    BadRequest(String),
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::BadRequest(details) => (
                StatusCode::BAD_REQUEST,
                json!({
                    "error": "Malformed request body.",
                    "kind": "bad_request",
                    "details": details,
                }),
            ),
            ApiError::Gateway(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Value::Object(gateway_body(&err)))
            }
        };
        (status, Json(body)).into_response()
    }
}

fn gateway_body(err: &GatewayError) -> Map<String, Value> {
    let mut body = Map::new();
    body.insert("error".into(), public_message(err).into());
    body.insert("kind".into(), err.kind().into());

    match err {
        GatewayError::PermissionDenied(denial) => {
            body.insert("details".into(), denial.message.clone().into());
            if let Some(verb) = &denial.denied_verb {
                body.insert("deniedVerb".into(), verb.as_str().into());
                body.insert(
                    "allowedVerbs".into(),
                    denial
                        .allowed_verbs
                        .iter()
                        .map(|v| Value::from(v.as_str()))
                        .collect(),
                );
            }
        }
        GatewayError::ExecutionFailed { message, statement } => {
            body.insert("details".into(), message.clone().into());
            body.insert("backendMessage".into(), message.clone().into());
            body.insert("statement".into(), statement.clone().into());
        }
        GatewayError::BackendUnavailable { message } | GatewayError::Internal { message } => {
            body.insert("details".into(), message.clone().into());
            body.insert("backendMessage".into(), message.clone().into());
        }
        GatewayError::InvalidRole { role } => {
            body.insert("details".into(), format!("'{}' is not a known role.", role).into());
        }
        GatewayError::MissingCredentials
        | GatewayError::InvalidCredentials
        | GatewayError::EmptyStatement
        | GatewayError::MissingRole => {}
    }
    body
}

fn public_message(err: &GatewayError) -> &'static str {
    match err {
        GatewayError::MissingCredentials => "Username and password are required.",
        GatewayError::InvalidCredentials => "Invalid username or password.",
        GatewayError::EmptyStatement => "Query cannot be empty.",
        GatewayError::MissingRole => "User role must be provided.",
        GatewayError::InvalidRole { .. } => "Invalid role specified.",
        GatewayError::PermissionDenied(_) => "Permission Denied.",
        GatewayError::ExecutionFailed { .. } => "Failed to execute query.",
        GatewayError::BackendUnavailable { .. } => "Database unavailable.",
        GatewayError::Internal { .. } => "Internal server error.",
    }
}
