//! bcrypt helpers shared by signup and authentication.

use crate::error::CoreError;

/// The cost factor used when no explicit cost is configured.
pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

/// The prefix every hash produced by [`hash_password`] starts with.
pub const HASH_PREFIX: &str = "$2b$";

/// Hashes `password` with bcrypt at the given cost.
///
/// Rejects an empty password before any work is done.
pub fn hash_password(password: &str, cost: u32) -> Result<String, CoreError> {
    if password.is_empty() {
        return Err(CoreError::invalid("password", "must not be empty"));
    }
    Ok(bcrypt::hash(password, cost)?)
}

/// Checks `password` against a stored bcrypt hash.
///
/// A hash that cannot be parsed is treated as a mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    match bcrypt::verify(password, hash) {
        Ok(matches) => matches,
        Err(err) => {
            tracing::error!("failed to parse password hash: {}", err);
            false
        }
    }
}
