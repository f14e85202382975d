//! Stored credential comparison.

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString, rand_core::OsRng},
};
use querygate_core::CredentialScheme;

/// Hash `password` into an Argon2 PHC string for the users table.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
}

/// Check a submitted credential against a stored Argon2 PHC string.
///
/// A stored value that is not a valid PHC string never matches.
pub fn verify_argon2(submitted: &str, stored: &str) -> bool {
    match PasswordHash::new(stored) {
        Ok(hash) => Argon2::default()
            .verify_password(submitted.as_bytes(), &hash)
            .is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "stored credential is not a valid PHC string");
            false
        }
    }
}

/// Whether the backend can compare credentials itself (plaintext) or the
/// gateway must fetch candidates and verify them (hashed).
pub fn compared_in_backend(scheme: CredentialScheme) -> bool {
    matches!(scheme, CredentialScheme::Plaintext)
}
