//! Ed25519 key material.
//!
//! Keys and signatures cross the crate boundary only as lowercase hex text.
//! The secret half of a `KeyPair` never leaves this crate.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;

use warden_contracts::error::{GovernanceError, GovernanceResult};

pub struct KeyPair {
    signing: SigningKey,
}

impl KeyPair {
    /// A fresh key pair seeded from the operating system RNG.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        Self { signing: SigningKey::from_bytes(&seed) }
    }

    pub(crate) fn from_secret_hex(secret: &str) -> GovernanceResult<Self> {
        let seed: [u8; 32] = hex::decode(secret.trim())
            .map_err(|e| GovernanceError::CryptoError { reason: format!("secret key is not hex: {e}") })?
            .as_slice()
            .try_into()
            .map_err(|_| GovernanceError::CryptoError {
                reason: "secret key must be 32 bytes".to_string(),
            })?;
        Ok(Self { signing: SigningKey::from_bytes(&seed) })
    }

    pub(crate) fn secret_hex(&self) -> String {
        hex::encode(self.signing.to_bytes())
    }

    pub fn public_key_hex(&self) -> String {
        hex::encode(self.signing.verifying_key().to_bytes())
    }

    /// Hex-encoded signature over `message`.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing.sign(message).to_bytes())
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

/// Parse a hex-encoded verifying key.
pub fn parse_public_key(public_key: &str) -> GovernanceResult<VerifyingKey> {
    let bytes: [u8; 32] = hex::decode(public_key.trim())
        .map_err(|e| GovernanceError::CryptoError { reason: format!("public key is not hex: {e}") })?
        .as_slice()
        .try_into()
        .map_err(|_| GovernanceError::CryptoError {
            reason: "public key must be 32 bytes".to_string(),
        })?;
    VerifyingKey::from_bytes(&bytes).map_err(|e| GovernanceError::CryptoError {
        reason: format!("invalid ed25519 public key: {e}"),
    })
}

/// Check a hex signature against a hex public key.
///
/// A malformed signature is simply not valid (`Ok(false)`); a malformed
/// public key is a `CryptoError`, since keys only come from the registry.
pub fn verify(public_key: &str, message: &[u8], signature: &str) -> GovernanceResult<bool> {
    let key = parse_public_key(public_key)?;
    let Ok(bytes) = hex::decode(signature.trim()) else {
        return Ok(false);
    };
    let Ok(signature) = Signature::from_slice(&bytes) else {
        return Ok(false);
    };
    Ok(key.verify_strict(message, &signature).is_ok())
}
