//! Agent identity, trust, and verification types.
//!
//! The identity registry owns private key material and trust scores. Only
//! the public views defined here ever leave it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Upper bound of the trust score range.
pub const MAX_TRUST: u8 = 100;

/// Lifecycle state of an identity. The only transition is `Active → Revoked`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentityStatus {
    Active,
    Revoked,
}

impl std::fmt::Display for IdentityStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentityStatus::Active => f.write_str("active"),
            IdentityStatus::Revoked => f.write_str("revoked"),
        }
    }
}

/// Descriptive metadata attached to an identity at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMetadata {
    pub name: String,
    pub role: String,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl IdentityMetadata {
    /// Metadata stamped with the current time and no tags.
    pub fn new(name: impl Into<String>, role: impl Into<String>, owner: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: role.into(),
            owner: owner.into(),
            created_at: Utc::now(),
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }
}

/// What a caller may see of an identity. Never carries private key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIdentity {
    pub agent_id: String,
    /// Hex-encoded Ed25519 verifying key currently in use.
    pub public_key: String,
    pub metadata: IdentityMetadata,
    pub status: IdentityStatus,
    pub trust_score: u8,
}

/// Signature credentials presented with a verification request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub message: String,
    /// Hex-encoded Ed25519 signature over `message`.
    pub signature: String,
}

/// Why a verification request succeeded or failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationReason {
    Verified,
    NotFound,
    Revoked,
    InvalidSignature,
    TrustTooLow,
}

impl std::fmt::Display for VerificationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VerificationReason::Verified => "verified",
            VerificationReason::NotFound => "not found",
            VerificationReason::Revoked => "revoked",
            VerificationReason::InvalidSignature => "invalid signature",
            VerificationReason::TrustTooLow => "trust score too low",
        };
        f.write_str(s)
    }
}

/// Result of `verify_identity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityCheck {
    pub verified: bool,
    pub reason: VerificationReason,
    pub trust_score: u8,
}

impl IdentityCheck {
    pub fn rejected(reason: VerificationReason, trust_score: u8) -> Self {
        Self { verified: false, reason, trust_score }
    }

    pub fn verified(trust_score: u8) -> Self {
        Self { verified: true, reason: VerificationReason::Verified, trust_score }
    }
}

/// How a verification attempt was carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMethod {
    /// Registry lookup and trust gate only.
    Registry,
    /// Signature check against the stored public key, then the trust gate.
    Signature,
}

/// One entry in an identity's bounded verification history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub timestamp: DateTime<Utc>,
    pub method: VerificationMethod,
    pub success: bool,
}

/// A public key retired by key rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedKey {
    pub public_key: String,
    pub archived_at: DateTime<Utc>,
}
