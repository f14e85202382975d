//! Querygate policy enforcement.
//!
//! Authorization is a single decision: the leading verb of a statement must be
//! in the verb set of the caller's role. This crate owns the two pieces that
//! decision needs:
//! - [`classify`]: lexical extraction of the command verb
//! - [`PolicyTable`]: the immutable role to verb-set mapping
//!
//! Refusals are described by [`PolicyDenial`] so callers can report the
//! denied verb and what would have been allowed.

pub mod classifier;
pub mod error;
pub mod table;

pub use classifier::{ClassifyError, classify};
pub use error::{DenialKind, PolicyDenial};
pub use table::PolicyTable;

use querygate_core::RoleId;

/// Gate an operation reserved for one role.
///
/// `role` is the raw caller-supplied value; anything other than the exact
/// spelling of `required` (including absent or unknown roles) is refused.
pub fn require_role(
    required: RoleId,
    role: Option<&str>,
    action: &str,
) -> Result<RoleId, PolicyDenial> {
    match role.map(str::parse::<RoleId>) {
        Some(Ok(actual)) if actual == required => Ok(actual),
        _ => {
            tracing::debug!(required = %required, action, "role requirement not met");
            Err(PolicyDenial::role_required(required, action))
        }
    }
}
