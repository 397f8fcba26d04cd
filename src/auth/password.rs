//! Password digests stored in the users file.
//!
//! Format: `base64(salt)$base64(sha256(salt || password))`.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;

/// A parsed password entry.
#[derive(Debug, Clone)]
pub struct PasswordHash {
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl PasswordHash {
    /// Parse the `salt$digest` form. Returns `None` for anything malformed.
    pub fn parse(encoded: &str) -> Option<Self> {
        let (salt, digest) = encoded.split_once('$')?;
        let salt = BASE64.decode(salt).ok()?;
        let digest = BASE64.decode(digest).ok()?;
        if salt.is_empty() || digest.len() != 32 {
            return None;
        }
        Some(Self { salt, digest })
    }

    pub fn verify(&self, password: &str) -> bool {
        let candidate = digest(&self.salt, password);
        // Compare every byte so timing does not depend on the first mismatch.
        candidate
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

/// Hash `password` with a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    format!(
        "{}${}",
        BASE64.encode(salt),
        BASE64.encode(digest(&salt, password))
    )
}

fn digest(salt: &[u8], password: &str) -> Vec<u8> {
    Sha256::new()
        .chain_update(salt)
        .chain_update(password.as_bytes())
        .finalize()
        .to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashed_password_verifies() {
        let hash = PasswordHash::parse(&hash_password("admin")).unwrap();
        assert!(hash.verify("admin"));
        assert!(!hash.verify("Admin"));
        assert!(!hash.verify(""));
    }

    #[test]
    fn salts_differ() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_entries_are_rejected() {
        assert!(PasswordHash::parse("plaintext").is_none());
        assert!(PasswordHash::parse("$").is_none());
        assert!(PasswordHash::parse("c2FsdA==$c2hvcnQ=").is_none());
    }
}
