//! HTTP routes.

use crate::error::ApiError;
use crate::state::AppState;
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::{get, post},
};
use querygate_core::{QueryRequest, Scalar, ServerConfig};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub fn router(state: Arc<AppState>, server: &ServerConfig) -> Router {
    let router = Router::new()
        .route("/api/login", post(login))
        .route("/api/users", post(list_users))
        .route("/api/query", post(query))
        .route("/healthz", get(healthz))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    if server.cors_allow_any_origin {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn healthz() -> Json<Value> {
    Json(json!({ "ok": true, "service": "querygate" }))
}

#[derive(Debug, Deserialize)]
struct LoginRequest {
    #[serde(default)]
    username: Option<String>,
    #[serde(default, alias = "credential")]
    password: Option<String>,
}

async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let principal = state
        .authenticator
        .authenticate(
            req.username.as_deref().unwrap_or_default(),
            req.password.as_deref().unwrap_or_default(),
        )
        .await?;

    Ok(Json(json!({
        "message": "Login successful.",
        "user": principal,
        "principal": principal,
    })))
}

#[derive(Debug, Deserialize)]
struct UsersRequest {
    #[serde(default)]
    role: Option<String>,
}

async fn list_users(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<UsersRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(req) = payload?;
    let listing = state.authenticator.list_users(req.role.as_deref()).await?;

    Ok(Json(json!({
        "message": "User data fetched successfully.",
        "command": "SELECT",
        "rowCount": listing.row_count,
        "rows": listing.rows,
    })))
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default, alias = "statement")]
    query: Option<String>,
    #[serde(default, alias = "parameters")]
    params: Option<Vec<Scalar>>,
    #[serde(default)]
    role: Option<String>,
}

async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryBody>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(body) = payload?;
    let request = QueryRequest {
        statement: body.query.unwrap_or_default(),
        parameters: body.params.unwrap_or_default(),
        role: body.role,
    };
    let result = state.dispatcher.dispatch(&request).await?;

    Ok(Json(json!({
        "message": "Query executed successfully.",
        "command": result.command_verb,
        "commandVerb": result.command_verb,
        "rowCount": result.row_count,
        "rows": result.rows,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use querygate_core::GatewayConfig;
    use querygate_runtime::PoolError;
    use querygate_runtime::testing::{FakePool, StoredUser, record, select_result};
    use tower::ServiceExt;

    fn app_with(pool: Arc<FakePool>) -> Router {
        let config = GatewayConfig::default();
        router(Arc::new(AppState::new(pool, &config)), &config.server)
    }

    fn users_pool() -> Arc<FakePool> {
        Arc::new(FakePool::with_users(vec![
            StoredUser::new("alice", "correct-pw", "staff"),
            StoredUser::new("bob", "pw", "manager"),
        ]))
    }

    async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let response = app_with(users_pool())
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_success() {
        let (status, body) = post_json(
            app_with(users_pool()),
            "/api/login",
            json!({"username": "alice", "password": "correct-pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["principal"], json!({"username": "alice", "role": "staff"}));
        assert_eq!(body["user"], body["principal"]);
    }

    #[tokio::test]
    async fn test_login_accepts_credential_alias() {
        let (status, _) = post_json(
            app_with(users_pool()),
            "/api/login",
            json!({"username": "bob", "credential": "pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (status, body) = post_json(
            app_with(users_pool()),
            "/api/login",
            json!({"username": "alice", "password": "wrong-pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "invalid_credentials");
    }

    #[tokio::test]
    async fn test_login_missing_fields() {
        let (status, body) =
            post_json(app_with(users_pool()), "/api/login", json!({"username": "alice"})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "missing_credentials");
    }

    #[tokio::test]
    async fn test_login_backend_fault() {
        let pool = Arc::new(FakePool::empty().failing_acquire("connection refused"));
        let (status, body) = post_json(
            app_with(pool),
            "/api/login",
            json!({"username": "alice", "password": "pw"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "backend_unavailable");
    }

    #[tokio::test]
    async fn test_users_for_manager() {
        let (status, body) =
            post_json(app_with(users_pool()), "/api/users", json!({"role": "manager"})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rowCount"], 2);
        assert_eq!(body["rows"][0], json!({"username": "bob", "role": "manager"}));
    }

    #[tokio::test]
    async fn test_users_forbidden_for_staff() {
        let (status, body) =
            post_json(app_with(users_pool()), "/api/users", json!({"role": "staff"})).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["kind"], "permission_denied");
    }

    #[tokio::test]
    async fn test_query_denied_carries_verbs() {
        let (status, body) = post_json(
            app_with(users_pool()),
            "/api/query",
            json!({"query": "DROP TABLE t", "role": "staff"}),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["deniedVerb"], "DROP");
        assert_eq!(
            body["allowedVerbs"],
            json!(["SELECT", "INSERT", "UPDATE", "DELETE"])
        );
    }

    #[tokio::test]
    async fn test_query_validation_errors_are_400() {
        let app = app_with(users_pool());
        for body in [
            json!({"query": "", "role": "manager"}),
            json!({"query": "SELECT 1"}),
            json!({"query": "SELECT 1", "role": "intern"}),
            json!({"role": "staff"}),
        ] {
            let (status, _) = post_json(app.clone(), "/api/query", body.clone()).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
        }
    }

    #[tokio::test]
    async fn test_query_success_with_rows() {
        let rows = vec![
            record(&[("id", json!(1))]),
            record(&[("id", json!(2))]),
            record(&[("id", json!(3))]),
        ];
        let pool = Arc::new(FakePool::new(move |_, _| Ok(select_result(rows.clone()))));
        let (status, body) = post_json(
            app_with(pool.clone()),
            "/api/query",
            json!({"statement": "SELECT * FROM users", "parameters": [], "role": "staff"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["commandVerb"], "SELECT");
        assert_eq!(body["command"], "SELECT");
        assert_eq!(body["rowCount"], 3);
        assert_eq!(body["rows"].as_array().unwrap().len(), 3);
        assert_eq!(pool.stats().releases, 1);
    }

    #[tokio::test]
    async fn test_query_execution_failure_is_500_with_statement() {
        let pool = Arc::new(FakePool::new(|_, _| {
            Err(PoolError::Execution("syntax error at or near \"FROMM\"".to_string()))
        }));
        let (status, body) = post_json(
            app_with(pool),
            "/api/query",
            json!({"query": "SELECT * FROMM t", "params": [1, "a", null], "role": "staff"}),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["kind"], "execution_failed");
        assert_eq!(body["statement"], "SELECT * FROMM t");
        assert!(body["backendMessage"].as_str().unwrap().contains("FROMM"));
    }

    #[tokio::test]
    async fn test_malformed_body_is_400() {
        let (status, body) = post_json(
            app_with(users_pool()),
            "/api/query",
            json!({"query": "SELECT 1", "params": [[1]], "role": "staff"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["kind"], "bad_request");
    }
}
