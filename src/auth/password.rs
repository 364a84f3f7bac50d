//! Password hashing and verification for dentica.
//!
//! Uses Argon2id for hashing. Stored credentials come in two shapes:
//! modern PHC strings and legacy plaintext rows imported from the old
//! system. Legacy rows verify by direct comparison and are upgraded to
//! Argon2 by the login service on first successful use.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use rand_core::OsRng;
use thiserror::Error;

/// Format tag that every Argon2 PHC string starts with.
const MODERN_HASH_PREFIX: &str = "$argon2";

/// Password hashing errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),
}

/// Create the Argon2 hasher with the service parameters.
///
/// Parameters:
/// - Memory cost: 19 MiB (19456 KiB)
/// - Time cost: 2 iterations
/// - Parallelism: 1
fn create_argon2() -> Argon2<'static> {
    let m_cost = 19456;
    let t_cost = 2;
    let p_cost = 1;

    // Params::new only fails on out-of-range constants
    let params =
        Params::new(m_cost, t_cost, p_cost, None).unwrap_or_else(|_| Params::default());
    Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params)
}

/// Hash a password using Argon2id.
///
/// Returns a PHC-formatted hash string that includes the salt and
/// parameters.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let argon2 = create_argon2();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Check whether a stored credential is a modern Argon2 hash.
pub fn is_modern_hash(stored: &str) -> bool {
    stored.starts_with(MODERN_HASH_PREFIX)
}

/// Verify a password against a stored credential.
///
/// Modern hashes go through Argon2; legacy plaintext rows compare
/// directly. Malformed stored values verify false, never error.
pub fn verify_password(password: &str, stored: &str) -> bool {
    if is_modern_hash(stored) {
        match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    } else {
        // Legacy plaintext row
        password == stored
    }
}
