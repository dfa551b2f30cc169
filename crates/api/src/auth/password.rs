//! Password hashing and verification
//!
//! Argon2id with a fresh random 128-bit salt per hash. The stored digest is
//! `base64(salt).base64(derived_key)`; verification re-derives with the
//! stored salt and compares in constant time. Plaintext passwords are never
//! logged at any level.

use argon2::{Algorithm, Argon2, Params, Version};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use rand::rngs::OsRng;
use rand::TryRngCore;
use subtle::ConstantTimeEq;

const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;
// Memory-hard derivation: t=1, m=64 MiB, p=4.
const T_COST: u32 = 1;
const M_COST_KIB: u32 = 64 * 1024;
const P_COST: u32 = 4;

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PasswordError {
    #[error("randomness source unavailable")]
    Randomness,
    #[error("key derivation failed")]
    Derivation,
    #[error("stored digest has invalid format")]
    Format,
    #[error("password does not match")]
    Mismatch,
}

fn argon2() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(M_COST_KIB, T_COST, P_COST, Some(OUTPUT_LEN))
        .map_err(|_| PasswordError::Derivation)?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Hash a plaintext password into a `salt.hash` digest string.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|_| PasswordError::Randomness)?;

    let mut derived = [0u8; OUTPUT_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), &salt, &mut derived)
        .map_err(|_| PasswordError::Derivation)?;

    Ok(format!("{}.{}", BASE64.encode(salt), BASE64.encode(derived)))
}

/// Verify a plaintext password against a stored `salt.hash` digest.
///
/// The comparison never short-circuits on the first differing byte.
pub fn verify_password(password: &str, stored: &str) -> Result<(), PasswordError> {
    let (salt_b64, hash_b64) = match stored.split_once('.') {
        // A second separator means more than two parts.
        Some((s, h)) if !h.contains('.') => (s, h),
        _ => return Err(PasswordError::Format),
    };

    let salt = BASE64.decode(salt_b64).map_err(|_| PasswordError::Format)?;
    let expected = BASE64.decode(hash_b64).map_err(|_| PasswordError::Format)?;

    let mut derived = [0u8; OUTPUT_LEN];
    argon2()?
        .hash_password_into(password.as_bytes(), &salt, &mut derived)
        .map_err(|_| PasswordError::Derivation)?;

    // ct_eq handles the length check; unequal lengths compare unequal.
    if expected.len() == OUTPUT_LEN && bool::from(derived.ct_eq(&expected)) {
        Ok(())
    } else {
        Err(PasswordError::Mismatch)
    }
}
