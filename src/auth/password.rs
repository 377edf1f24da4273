//! PBKDF2-HMAC-SHA256 password hashing.
//!
//! Encoded form: `pbkdf2-sha256$<rounds>$<salt hex>$<hash hex>`.

use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::AuthError;

const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Iteration count for new hashes.
pub const DEFAULT_ROUNDS: u32 = 100_000;

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str, rounds: u32) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let hash = derive(password, &salt, rounds);
    format!("{SCHEME}${rounds}${}${}", hex::encode(salt), hex::encode(hash))
}

/// Check `password` against an encoded hash.
///
/// Returns `Ok(false)` on mismatch and `Err` only when the stored hash is not
/// in the expected format.
pub fn verify_password(password: &str, encoded: &str) -> Result<bool, AuthError> {
    let mut parts = encoded.split('$');
    let (Some(scheme), Some(rounds), Some(salt), Some(hash), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return Err(AuthError::BadPasswordHash);
    };
    if scheme != SCHEME {
        return Err(AuthError::BadPasswordHash);
    }
    let rounds: u32 = rounds.parse().map_err(|_| AuthError::BadPasswordHash)?;
    if rounds == 0 {
        return Err(AuthError::BadPasswordHash);
    }
    let salt = hex::decode(salt).map_err(|_| AuthError::BadPasswordHash)?;
    let expected = hex::decode(hash).map_err(|_| AuthError::BadPasswordHash)?;
    if expected.len() != HASH_LEN {
        return Err(AuthError::BadPasswordHash);
    }

    let actual = derive(password, &salt, rounds);
    Ok(actual.as_slice().ct_eq(expected.as_slice()).into())
}

fn derive(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut out = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut out);
    out
}
