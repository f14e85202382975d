//! Shared types for the querygate workspace.
//!
//! Everything in here is call-scoped data: principals, requests and results are
//! built per request and never cached by the gateway.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

// Configuration types shared across all querygate crates
pub mod config;

pub use config::{
    AuthConfig, ConfigError, ConnectionPoolConfig, CredentialScheme, GatewayConfig, ServerConfig,
    SslMode, UpstreamConfig,
};

/// A row returned by the backend: column name to JSON value.
pub type Record = serde_json::Map<String, serde_json::Value>;

// =============================================================================
// ROLES
// =============================================================================

/// Coarse authorization class of a principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleId {
    Manager,
    Staff,
}

impl RoleId {
    pub const ALL: [RoleId; 2] = [RoleId::Manager, RoleId::Staff];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoleId::Manager => "manager",
            RoleId::Staff => "staff",
        }
    }
}

impl fmt::Display for RoleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role string that does not name any known [`RoleId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}'")]
pub struct UnknownRole(pub String);

impl FromStr for RoleId {
    type Err = UnknownRole;

    /// Exact, case-sensitive match on the stored spelling.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manager" => Ok(RoleId::Manager),
            "staff" => Ok(RoleId::Staff),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

// =============================================================================
// COMMAND VERBS
// =============================================================================

/// Leading keyword of a statement, uppercased.
///
/// Known SQL verbs get their own variant so policy lookups can match on them;
/// anything else is carried verbatim in `Other` and is never permitted by the
/// standard policy table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandVerb {
    Select,
    Insert,
    Update,
    Delete,
    Create,
    Alter,
    Drop,
    Other(String),
}

impl CommandVerb {
    /// Build a verb from a raw token. The token is uppercased first.
    pub fn from_token(token: &str) -> Self {
        let upper = token.to_uppercase();
        match upper.as_str() {
            "SELECT" => CommandVerb::Select,
            "INSERT" => CommandVerb::Insert,
            "UPDATE" => CommandVerb::Update,
            "DELETE" => CommandVerb::Delete,
            "CREATE" => CommandVerb::Create,
            "ALTER" => CommandVerb::Alter,
            "DROP" => CommandVerb::Drop,
            _ => CommandVerb::Other(upper),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CommandVerb::Select => "SELECT",
            CommandVerb::Insert => "INSERT",
            CommandVerb::Update => "UPDATE",
            CommandVerb::Delete => "DELETE",
            CommandVerb::Create => "CREATE",
            CommandVerb::Alter => "ALTER",
            CommandVerb::Drop => "DROP",
            CommandVerb::Other(verb) => verb,
        }
    }
}

impl fmt::Display for CommandVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CommandVerb {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CommandVerb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(CommandVerb::from_token(&raw))
    }
}

// =============================================================================
// REQUESTS AND RESULTS
// =============================================================================

/// A single positional statement parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// An authenticated identity, valid for the request that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub username: String,
    pub role: RoleId,
}

/// One statement submitted for execution.
///
/// `role` is kept as the raw caller-supplied string: the dispatcher is the
/// one that decides between "missing" and "unknown".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryRequest {
    pub statement: String,
    pub parameters: Vec<Scalar>,
    pub role: Option<String>,
}

impl QueryRequest {
    pub fn new(statement: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            parameters: Vec::new(),
            role: Some(role.into()),
        }
    }

    pub fn with_parameters(mut self, parameters: Vec<Scalar>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// Outcome of a successfully executed statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub command_verb: String,
    pub row_count: u64,
    pub rows: Vec<Record>,
}

/// Public view of a stored user (credential omitted).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub username: String,
    pub role: String,
}

/// Manager-only listing of all stored users, ordered by role then username.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListing {
    pub row_count: u64,
    pub rows: Vec<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_role_parse_is_exact() {
        assert_eq!("manager".parse::<RoleId>(), Ok(RoleId::Manager));
        assert_eq!("staff".parse::<RoleId>(), Ok(RoleId::Staff));
        assert_eq!(
            "Manager".parse::<RoleId>(),
            Err(UnknownRole("Manager".to_string()))
        );
        assert!("admin".parse::<RoleId>().is_err());
        assert!("".parse::<RoleId>().is_err());
    }

    #[test]
    fn test_role_serializes_lowercase() {
        assert_eq!(serde_json::to_value(RoleId::Staff).unwrap(), json!("staff"));
    }

    #[test]
    fn test_verb_from_token_uppercases() {
        assert_eq!(CommandVerb::from_token("select"), CommandVerb::Select);
        assert_eq!(CommandVerb::from_token("DrOp"), CommandVerb::Drop);
        assert_eq!(
            CommandVerb::from_token("vacuum"),
            CommandVerb::Other("VACUUM".to_string())
        );
        assert_eq!(CommandVerb::from_token("vacuum").to_string(), "VACUUM");
    }

    #[test]
    fn test_verb_serializes_as_string() {
        let verbs = vec![CommandVerb::Select, CommandVerb::Other("GRANT".to_string())];
        assert_eq!(serde_json::to_value(&verbs).unwrap(), json!(["SELECT", "GRANT"]));
    }

    #[test]
    fn test_scalar_parameters_deserialize() {
        let params: Vec<Scalar> =
            serde_json::from_value(json!([null, true, 42, 1.5, "alice"])).unwrap();
        assert_eq!(
            params,
            vec![
                Scalar::Null,
                Scalar::Bool(true),
                Scalar::Int(42),
                Scalar::Float(1.5),
                Scalar::Text("alice".to_string()),
            ]
        );
    }

    #[test]
    fn test_scalar_rejects_nested_values() {
        assert!(serde_json::from_value::<Scalar>(json!([1, 2])).is_err());
        assert!(serde_json::from_value::<Scalar>(json!({"a": 1})).is_err());
    }

    #[test]
    fn test_query_result_uses_camel_case() {
        let result = QueryResult {
            command_verb: "SELECT".to_string(),
            row_count: 0,
            rows: vec![],
        };
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"commandVerb": "SELECT", "rowCount": 0, "rows": []})
        );
    }
}
