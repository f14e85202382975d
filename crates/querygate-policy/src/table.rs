//! Role to verb-set policy table.

use crate::error::PolicyDenial;
use querygate_core::{CommandVerb, RoleId};

/// Immutable mapping from role to the verbs it may execute.
///
/// Built once at startup and shared read-only; there is no mutation API.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    entries: Vec<(RoleId, Vec<CommandVerb>)>,
}

impl PolicyTable {
    /// The built-in policy: managers change structure, staff change data.
    pub fn standard() -> Self {
        Self::from_entries([
            (
                RoleId::Manager,
                vec![CommandVerb::Create, CommandVerb::Alter, CommandVerb::Drop],
            ),
            (
                RoleId::Staff,
                vec![
                    CommandVerb::Select,
                    CommandVerb::Insert,
                    CommandVerb::Update,
                    CommandVerb::Delete,
                ],
            ),
        ])
    }

    /// Build a table from explicit entries. A role listed twice keeps its
    /// last verb set; duplicate verbs within a set are dropped.
    pub fn from_entries(entries: impl IntoIterator<Item = (RoleId, Vec<CommandVerb>)>) -> Self {
        let mut table: Vec<(RoleId, Vec<CommandVerb>)> = Vec::new();
        for (role, verbs) in entries {
            let mut unique = Vec::with_capacity(verbs.len());
            for verb in verbs {
                if !unique.contains(&verb) {
                    unique.push(verb);
                }
            }
            table.retain(|(existing, _)| *existing != role);
            table.push((role, unique));
        }
        Self { entries: table }
    }

    /// Whether `role` has an entry at all.
    pub fn has_role(&self, role: RoleId) -> bool {
        self.entries.iter().any(|(r, _)| *r == role)
    }

    /// Verbs permitted for `role`, in declaration order. Empty when the role
    /// has no entry.
    pub fn allowed_verbs(&self, role: RoleId) -> &[CommandVerb] {
        self.entries
            .iter()
            .find(|(r, _)| *r == role)
            .map(|(_, verbs)| verbs.as_slice())
            .unwrap_or(&[])
    }

    /// Is `verb` permitted for `role`? Roles without an entry permit nothing.
    pub fn is_permitted(&self, role: RoleId, verb: &CommandVerb) -> bool {
        self.allowed_verbs(role).contains(verb)
    }

    /// Like [`is_permitted`](Self::is_permitted), but explains a refusal.
    pub fn check(&self, role: RoleId, verb: &CommandVerb) -> Result<(), PolicyDenial> {
        if self.is_permitted(role, verb) {
            return Ok(());
        }
        Err(PolicyDenial::verb_not_permitted(
            role,
            verb.clone(),
            self.allowed_verbs(role),
        ))
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::standard()
    }
}
