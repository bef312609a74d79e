use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand_core::OsRng;
use sha2::{Digest, Sha256};

use crate::err::Error;

/// Recognized stored-hash formats, keyed by PHC-style prefix.
///
/// New hashes are always Argon2; bcrypt stays verifiable for accounts that
/// have not logged in since the migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashScheme {
    Argon2,
    Bcrypt,
}

impl HashScheme {
    pub fn detect(stored: &str) -> Option<HashScheme> {
        if stored.starts_with("$argon2") {
            Some(HashScheme::Argon2)
        } else if stored.starts_with("$2") {
            Some(HashScheme::Bcrypt)
        } else {
            None
        }
    }
}

/// Check a plaintext secret against a stored hash.
///
/// Every failure mode (unknown prefix, malformed hash, verifier error) is a
/// plain non-match; hash-format problems must never leak to callers.
pub fn verify_password(secret: &str, stored: &str) -> bool {
    match HashScheme::detect(stored) {
        Some(HashScheme::Argon2) => match PasswordHash::new(stored) {
            Ok(parsed) => Argon2::default()
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        },
        Some(HashScheme::Bcrypt) => {
            if bcrypt::verify(secret, stored).unwrap_or(false) {
                return true;
            }
            // Secrets beyond bcrypt's 72-byte limit were stored pre-hashed.
            bcrypt::verify(prehash(secret), stored).unwrap_or(false)
        }
        None => false,
    }
}

/// Hash a plaintext secret for storage.
///
/// An input that already carries a recognized prefix is returned unchanged,
/// so callers may re-hash unconditionally on profile updates. Fresh hashes
/// use Argon2; if that fails the secret is pre-hashed to fit bcrypt's length
/// limit and hashed with bcrypt instead.
pub fn hash_password(secret: &str) -> Result<String, Error> {
    if HashScheme::detect(secret).is_some() {
        return Ok(secret.to_string());
    }

    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(secret.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(_) => bcrypt::hash(prehash(secret), bcrypt::DEFAULT_COST).map_err(|err| {
            Error::InternalError {
                kind: "HashError",
                message: err.to_string(),
            }
        }),
    }
}

/// True when a successful login should upgrade the stored hash.
pub fn needs_rehash(stored: &str) -> bool {
    HashScheme::detect(stored) == Some(HashScheme::Bcrypt)
}

fn prehash(secret: &str) -> String {
    let mut hasher: Sha256 = Digest::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("battery staple", &hash));
    }

    #[test]
    fn rehash_is_idempotent_on_recognized_prefixes() {
        let argon = hash_password("secreto").unwrap();
        assert_eq!(hash_password(&argon).unwrap(), argon);

        let legacy = bcrypt::hash("secreto", 4).unwrap();
        assert_eq!(hash_password(&legacy).unwrap(), legacy);
    }

    #[test]
    fn legacy_bcrypt_hashes_still_verify() {
        let legacy = bcrypt::hash("clave123", 4).unwrap();
        assert!(verify_password("clave123", &legacy));
        assert!(!verify_password("clave124", &legacy));
        assert!(needs_rehash(&legacy));
        assert!(!needs_rehash(&hash_password("clave123").unwrap()));
    }

    #[test]
    fn over_length_secret_verifies_through_prehash() {
        let long = "x".repeat(100);
        let stored = bcrypt::hash(prehash(&long), 4).unwrap();
        assert!(verify_password(&long, &stored));
        assert!(!verify_password(&"y".repeat(100), &stored));
    }

    #[test]
    fn unknown_prefix_never_matches() {
        assert!(!verify_password("anything", "plaintext-left-over"));
        assert!(!verify_password("anything", "$pbkdf2-sha256$..."));
        assert!(!verify_password("anything", ""));
    }
}
