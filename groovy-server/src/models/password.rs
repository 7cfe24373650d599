//! Password hashing
//!
//! PBKDF2-HMAC-SHA256. Stored format:
//! `pbkdf2_sha256$<iterations>$<salt>$<digest>` with base64 salt and digest.
//! Accounts created without a password get a `!`-prefixed marker
//! that never verifies.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use rand::RngCore;
use sha2::Sha256;

use super::ValidationError;

const ALGORITHM: &str = "pbkdf2_sha256";
const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const DIGEST_LEN: usize = 32;
const UNUSABLE_PREFIX: char = '!';

/// Maximum raw password length accepted
const MAX_PASSWORD_LEN: usize = 128;

/// Encoded password hash as stored in `users.password`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a raw password with a fresh random salt.
    pub fn new(raw: &str) -> Result<Self, ValidationError> {
        if raw.is_empty() {
            return Err(ValidationError::Empty { field: "password" });
        }
        if raw.len() > MAX_PASSWORD_LEN {
            return Err(ValidationError::TooLong {
                field: "password",
                max: MAX_PASSWORD_LEN,
            });
        }

        let mut salt = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut salt);
        let digest = derive(raw.as_bytes(), &salt, ITERATIONS);

        Ok(Self(format!(
            "{}${}${}${}",
            ALGORITHM,
            ITERATIONS,
            STANDARD.encode(salt),
            STANDARD.encode(digest)
        )))
    }

    /// Marker for accounts that cannot log in with a password.
    pub fn unusable() -> Self {
        let mut noise = [0u8; SALT_LEN];
        rand::thread_rng().fill_bytes(&mut noise);
        Self(format!("{}{}", UNUSABLE_PREFIX, STANDARD.encode(noise)))
    }

    /// Wrap a value read back from the database.
    pub fn from_stored(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn is_usable(&self) -> bool {
        !self.0.starts_with(UNUSABLE_PREFIX)
    }

    /// Check a raw password against this hash.
    pub fn verify(&self, raw: &str) -> bool {
        if !self.is_usable() {
            return false;
        }

        let mut parts = self.0.split('$');
        let (Some(ALGORITHM), Some(iterations), Some(salt), Some(expected), None) = (
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
            parts.next(),
        ) else {
            return false;
        };

        let Ok(iterations @ 1..) = iterations.parse::<u32>() else {
            return false;
        };
        let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt), STANDARD.decode(expected)) else {
            return false;
        };

        let actual = derive(raw.as_bytes(), &salt, iterations);
        constant_time_eq(&actual, &expected)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn derive(raw: &[u8], salt: &[u8], iterations: u32) -> [u8; DIGEST_LEN] {
    let mut digest = [0u8; DIGEST_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(raw, salt, iterations, &mut digest);
    digest
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verifies_correct_password() {
        let hash = PasswordHash::new("correct horse").unwrap();
        assert!(hash.verify("correct horse"));
        assert!(!hash.verify("battery staple"));
    }

    #[test]
    fn salts_differ() {
        let a = PasswordHash::new("same").unwrap();
        let b = PasswordHash::new("same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn stored_roundtrip() {
        let hash = PasswordHash::new("pw1234").unwrap();
        let restored = PasswordHash::from_stored(hash.as_str().to_owned());
        assert!(restored.verify("pw1234"));
    }

    #[test]
    fn unusable_never_verifies() {
        let hash = PasswordHash::unusable();
        assert!(!hash.is_usable());
        assert!(!hash.verify(""));
        assert!(!hash.verify(hash.as_str()));
    }

    #[test]
    fn garbage_never_verifies() {
        assert!(!PasswordHash::from_stored("md5$1$abc$def".into()).verify("x"));
        assert!(!PasswordHash::from_stored("pbkdf2_sha256$nope$abc$def".into()).verify("x"));
        assert!(!PasswordHash::from_stored("pbkdf2_sha256$0$abc$def".into()).verify("x"));
        assert!(!PasswordHash::from_stored(String::new()).verify(""));
    }

    #[test]
    fn derive_matches_published_vector() {
        // PBKDF2-HMAC-SHA256("password", "salt", 1)
        let expected = [
            0x12, 0x0f, 0xb6, 0xcf, 0xfc, 0xf8, 0xb3, 0x2c, 0x43, 0xe7, 0x22, 0x52, 0x56, 0xc4,
            0xf8, 0x37, 0xa8, 0x65, 0x48, 0xc9, 0x2c, 0xcc, 0x35, 0x48, 0x08, 0x05, 0x98, 0x7c,
            0xb7, 0x0b, 0xe1, 0x7b,
        ];
        assert_eq!(derive(b"password", b"salt", 1), expected);
    }

    #[test]
    fn stored_format() {
        let hash = PasswordHash::new("pw").unwrap();
        let parts: Vec<&str> = hash.as_str().split('$').collect();
        assert_eq!(parts.len(), 4);
        assert_eq!(parts[0], "pbkdf2_sha256");
        assert_eq!(parts[1], ITERATIONS.to_string());
    }

    #[test]
    fn rejects_empty() {
        assert!(matches!(
            PasswordHash::new("").unwrap_err(),
            ValidationError::Empty { field: "password" }
        ));
    }
}
