//! Policy refusal type.

use querygate_core::{CommandVerb, RoleId};
use serde::Serialize;
use std::fmt;

/// Why a request was refused.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDenial {
    pub kind: DenialKind,
    pub role: Option<RoleId>,
    /// Verb the caller attempted, when the refusal is verb-based.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub denied_verb: Option<CommandVerb>,
    /// Verbs the caller's role could have used instead.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub allowed_verbs: Vec<CommandVerb>,
    /// Human-readable explanation.
    pub message: String,
}

impl PolicyDenial {
    /// The role's verb set does not contain `verb`.
    pub fn verb_not_permitted(role: RoleId, verb: CommandVerb, allowed: &[CommandVerb]) -> Self {
        let message = if allowed.is_empty() {
            format!(
                "{} may not perform any operations. You attempted a {} operation.",
                role_subject(role),
                verb
            )
        } else {
            format!(
                "{} can only perform {} operations. You attempted a {} operation.",
                role_subject(role),
                join_verbs(allowed),
                verb
            )
        };

        Self {
            kind: DenialKind::VerbNotPermitted,
            role: Some(role),
            denied_verb: Some(verb),
            allowed_verbs: allowed.to_vec(),
            message,
        }
    }

    /// The operation is reserved for `required`.
    pub fn role_required(required: RoleId, action: &str) -> Self {
        Self {
            kind: DenialKind::RoleRequired,
            role: None,
            denied_verb: None,
            allowed_verbs: Vec::new(),
            message: format!(
                "Only {} can {}.",
                role_subject(required).to_lowercase(),
                action
            ),
        }
    }
}

impl fmt::Display for PolicyDenial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for PolicyDenial {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    /// Statement verb outside the role's verb set.
    VerbNotPermitted,
    /// Operation reserved for a specific role.
    RoleRequired,
}

fn role_subject(role: RoleId) -> &'static str {
    match role {
        RoleId::Manager => "Managers",
        RoleId::Staff => "Staff",
    }
}

/// "A", "A and B", "A, B, and C".
fn join_verbs(verbs: &[CommandVerb]) -> String {
    let names: Vec<&str> = verbs.iter().map(CommandVerb::as_str).collect();
    match names.as_slice() {
        [] => String::new(),
        [only] => only.to_string(),
        [first, second] => format!("{} and {}", first, second),
        [init @ .., last] => format!("{}, and {}", init.join(", "), last),
    }
}
