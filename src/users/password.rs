use rand::{rngs::OsRng, RngCore};
use tracing::error;

/// bcrypt work factor used when nothing else is configured.
pub const DEFAULT_COST: u32 = 12;

/// Work factors bcrypt accepts.
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// bcrypt only reads this many bytes of input; anything longer is truncated.
pub const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),

    #[error("invalid password hash: {0}")]
    InvalidHash(String),

    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
}

/// Hashes `plain` with bcrypt under a freshly generated 16-byte salt.
pub fn hash_password(plain: &str, cost: u32) -> Result<String, PasswordError> {
    if plain.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong);
    }
    let mut salt = [0u8; 16];
    OsRng.fill_bytes(&mut salt);

    let parts = bcrypt::hash_with_salt(plain, cost, salt).map_err(|e| {
        error!(error = %e, "bcrypt hash error");
        PasswordError::Hash(e.to_string())
    })?;
    Ok(parts.to_string())
}

/// Checks `candidate` against a stored bcrypt hash.
///
/// The comparison itself is constant-time inside `bcrypt::verify`. A hash that
/// cannot be parsed is reported as an error rather than a mismatch. Stored
/// hashes never come from more than 72 bytes, so a longer candidate cannot match.
pub fn compare_password(candidate: &str, hash: &str) -> Result<bool, PasswordError> {
    if candidate.len() > MAX_PASSWORD_BYTES {
        return Ok(false);
    }
    bcrypt::verify(candidate, hash).map_err(|e| {
        error!(error = %e, "bcrypt parse hash error");
        PasswordError::InvalidHash(e.to_string())
    })
}
