//! Password reset tokens. The raw token goes to the user by email; only its
//! SHA-256 digest is stored.

use chrono::{DateTime, Duration, Utc};
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const RESET_TOKEN_BYTES: usize = 20;

#[derive(Debug, Clone)]
pub struct ResetToken {
    /// Hex token sent to the user
    pub raw: String,
    /// Hex SHA-256 of `raw`, stored on the user
    pub hashed: String,
    pub expires_at: DateTime<Utc>,
}

impl ResetToken {
    pub fn generate(ttl_minutes: i64) -> Self {
        let mut bytes = [0u8; RESET_TOKEN_BYTES];
        rand::rng().fill_bytes(&mut bytes);
        let raw = hex::encode(bytes);
        Self {
            hashed: hash_token(&raw),
            raw,
            expires_at: Utc::now() + Duration::minutes(ttl_minutes),
        }
    }
}

pub fn hash_token(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate() {
        let token = ResetToken::generate(10);
        assert_eq!(token.raw.len(), RESET_TOKEN_BYTES * 2);
        assert_eq!(token.hashed, hash_token(&token.raw));
        assert_eq!(token.hashed.len(), 64);
        assert!(token.expires_at > Utc::now() + Duration::minutes(9));
        assert_ne!(token.raw, ResetToken::generate(10).raw);
    }

    #[test]
    fn test_hash_token_known_value() {
        assert_eq!(
            hash_token("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
