//! Salted, iterated SHA-256 password hashing with constant-time verification.

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;

/// Generate a fresh random salt, hex-encoded.
pub fn generate_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    hex::encode(salt)
}

/// Hash `password` with the hex-encoded `salt`. Returns a hex digest.
pub fn hash_password(password: &str, salt_hex: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt_hex.as_bytes());
    hasher.update(password.as_bytes());
    let mut digest = hasher.finalize();
    for _ in 1..ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(salt_hex.as_bytes());
        hasher.update(digest);
        digest = hasher.finalize();
    }
    hex::encode(digest)
}

/// Constant-time comparison of a candidate password against a stored hash.
pub fn verify_password(password: &str, salt_hex: &str, expected_hash_hex: &str) -> bool {
    let candidate = hash_password(password, salt_hex);
    candidate.as_bytes().ct_eq(expected_hash_hex.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_accepts_correct_password() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(verify_password("hunter2", &salt, &hash));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let salt = generate_salt();
        let hash = hash_password("hunter2", &salt);
        assert!(!verify_password("hunter3", &salt, &hash));
    }

    #[test]
    fn same_password_different_salts_differ() {
        let s1 = generate_salt();
        let s2 = generate_salt();
        assert_ne!(s1, s2);
        assert_ne!(hash_password("pw", &s1), hash_password("pw", &s2));
    }
}
