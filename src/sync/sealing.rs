//! Sealed-box encryption of secret values.
//!
//! The secret store only accepts values encrypted to the repository's
//! Curve25519 public key with an anonymous sealed box (X25519 +
//! XSalsa20-Poly1305, ephemeral sender key).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use crypto_box::PublicKey;
use rand::{CryptoRng, RngCore};

use crate::sync::types::{RepoPublicKey, SyncError, SyncResult};

pub struct SecretSealer {
    key_id: String,
    key: PublicKey,
}

impl SecretSealer {
    pub fn new(public_key: &RepoPublicKey) -> SyncResult<Self> {
        let bytes = STANDARD
            .decode(public_key.key.trim())
            .map_err(|e| SyncError::InvalidPublicKey(e.to_string()))?;
        let bytes: [u8; 32] = bytes
            .try_into()
            .map_err(|b: Vec<u8>| SyncError::InvalidPublicKey(format!("expected 32 bytes, got {}", b.len())))?;
        Ok(Self {
            key_id: public_key.key_id.clone(),
            key: PublicKey::from(bytes),
        })
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Base64 of the sealed box of `value`.
    ///
    /// The ephemeral key comes from `rng`; a seeded RNG gives a reproducible
    /// ciphertext.
    pub fn seal<R>(&self, rng: &mut R, name: &str, value: &str) -> SyncResult<String>
    where
        R: RngCore + CryptoRng,
    {
        let sealed = self
            .key
            .seal(rng, value.as_bytes())
            .map_err(|_| SyncError::Encryption { name: name.to_string() })?;
        Ok(STANDARD.encode(sealed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto_box::SecretKey;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn keypair() -> (SecretKey, RepoPublicKey) {
        let secret = SecretKey::generate(&mut StdRng::seed_from_u64(7));
        let public = RepoPublicKey {
            key_id: "568250167242549743".to_string(),
            key: STANDARD.encode(secret.public_key().as_bytes()),
        };
        (secret, public)
    }

    #[test]
    fn test_sealed_value_opens_with_secret_key() {
        let (secret, public) = keypair();
        let sealer = SecretSealer::new(&public).unwrap();
        let sealed = sealer.seal(&mut rand::rngs::OsRng, "FUGLE_PASSWORD", "hunter2").unwrap();

        let opened = secret.unseal(&STANDARD.decode(sealed).unwrap()).unwrap();
        assert_eq!(opened, b"hunter2");
        assert_eq!(sealer.key_id(), "568250167242549743");
    }

    #[test]
    fn test_seeded_rng_is_reproducible() {
        let (_, public) = keypair();
        let sealer = SecretSealer::new(&public).unwrap();
        let a = sealer.seal(&mut StdRng::seed_from_u64(42), "X", "value").unwrap();
        let b = sealer.seal(&mut StdRng::seed_from_u64(42), "X", "value").unwrap();
        let c = sealer.seal(&mut StdRng::seed_from_u64(43), "X", "value").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_rejects_malformed_key() {
        let short = RepoPublicKey {
            key_id: "1".to_string(),
            key: STANDARD.encode([1u8; 16]),
        };
        assert!(matches!(SecretSealer::new(&short), Err(SyncError::InvalidPublicKey(_))));

        let garbage = RepoPublicKey {
            key_id: "1".to_string(),
            key: "not base64!".to_string(),
        };
        assert!(matches!(SecretSealer::new(&garbage), Err(SyncError::InvalidPublicKey(_))));
    }
}
