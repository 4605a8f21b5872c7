//! The identity registry: key custody, trust ledger, and verification gate.
//!
//! All per-agent state sits behind one mutex so every trust adjustment is
//! an atomic read-modify-write. Audit entries produced while the lock is
//! held are written after it is released.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::json;
use tracing::{debug, info, warn};

use warden_contracts::{
    audit::{EntryType, PendingEntry},
    error::{GovernanceError, GovernanceResult},
    identity::{
        ArchivedKey, Credentials, IdentityCheck, IdentityMetadata, IdentityStatus, PublicIdentity,
        VerificationMethod, VerificationReason, VerificationRecord,
    },
};
use warden_core::{
    config::IdentityConfig,
    traits::{AuditSink, IdentityVerifier},
};

use crate::{identity::Identity, keys, keys::KeyPair};

/// Action recorded on verification entries.
pub const VERIFY_ACTION: &str = "identity:verify";
/// Action recorded on revocation entries.
pub const REVOKE_ACTION: &str = "identity:revoke";
/// Reason recorded when trust decay revokes an identity.
pub const REASON_TRUST_ZERO: &str = "trust score reached zero";

/// Owns every agent's keys and trust score.
pub struct IdentityRegistry {
    identities: Mutex<HashMap<String, Identity>>,
    audit: Arc<dyn AuditSink>,
    config: IdentityConfig,
}

impl IdentityRegistry {
    pub fn new(audit: Arc<dyn AuditSink>) -> Self {
        Self::with_config(audit, IdentityConfig::default())
    }

    pub fn with_config(audit: Arc<dyn AuditSink>, config: IdentityConfig) -> Self {
        Self { identities: Mutex::new(HashMap::new()), audit, config }
    }

    /// Build from config, restoring persisted identities when
    /// `store_directory` exists.
    pub fn from_config(config: &IdentityConfig, audit: Arc<dyn AuditSink>) -> GovernanceResult<Self> {
        match &config.store_directory {
            Some(dir) if dir.exists() => Self::load_from_dir(dir, audit, config.clone()),
            _ => Ok(Self::with_config(audit, config.clone())),
        }
    }

    pub(crate) fn from_identities(
        identities: HashMap<String, Identity>,
        audit: Arc<dyn AuditSink>,
        config: IdentityConfig,
    ) -> Self {
        Self { identities: Mutex::new(identities), audit, config }
    }

    pub fn config(&self) -> &IdentityConfig {
        &self.config
    }

    // ── Lifecycle ─────────────────────────────────────────────────────────────

    /// Register a new agent with fresh keys, full trust, and active status.
    ///
    /// Returns `GovernanceError::IdentityExists` if the agent already has one.
    pub fn create_identity(&self, agent_id: &str, metadata: IdentityMetadata) -> GovernanceResult<PublicIdentity> {
        let keys = KeyPair::generate();
        let mut identities = self.lock();
        if identities.contains_key(agent_id) {
            return Err(GovernanceError::IdentityExists { agent_id: agent_id.to_string() });
        }
        let identity = Identity::new(agent_id, metadata, keys);
        let view = identity.public_view();
        identities.insert(agent_id.to_string(), identity);

        info!(agent_id = %agent_id, "identity created");
        Ok(view)
    }

    /// Return the agent's identity, creating it on first use.
    pub fn ensure_identity(&self, agent_id: &str, metadata: IdentityMetadata) -> PublicIdentity {
        let mut identities = self.lock();
        if let Some(existing) = identities.get(agent_id) {
            return existing.public_view();
        }
        let identity = Identity::new(agent_id, metadata, KeyPair::generate());
        let view = identity.public_view();
        identities.insert(agent_id.to_string(), identity);

        info!(agent_id = %agent_id, "identity auto-created on first use");
        view
    }

    /// Explicitly revoke an identity. Revoking twice is a no-op.
    ///
    /// Returns `GovernanceError::IdentityNotFound` for an unknown agent.
    pub fn revoke_identity(&self, agent_id: &str, reason: &str) -> GovernanceResult<()> {
        let (revoked_now, trust) = {
            let mut identities = self.lock();
            let identity = identities
                .get_mut(agent_id)
                .ok_or_else(|| not_found(agent_id))?;
            (identity.revoke(), identity.trust_score)
        };

        if revoked_now {
            warn!(agent_id = %agent_id, reason = %reason, "identity revoked");
            self.audit.record(revocation_entry(agent_id, reason, trust))?;
        }
        Ok(())
    }

    /// Archive the current public key and install a fresh key pair.
    /// Trust and status are untouched.
    pub fn rotate_keypair(&self, agent_id: &str) -> GovernanceResult<PublicIdentity> {
        let fresh = KeyPair::generate();
        let mut identities = self.lock();
        let identity = identities.get_mut(agent_id).ok_or_else(|| not_found(agent_id))?;
        identity.rotate(fresh);

        info!(
            agent_id = %agent_id,
            archived = identity.archived_keys.len(),
            "key pair rotated"
        );
        Ok(identity.public_view())
    }

    // ── Signing ───────────────────────────────────────────────────────────────

    /// Sign `message` with the agent's current private key. Returns hex.
    pub fn sign_message(&self, agent_id: &str, message: &str) -> GovernanceResult<String> {
        let identities = self.lock();
        let identity = identities.get(agent_id).ok_or_else(|| not_found(agent_id))?;
        Ok(identity.keys.sign(message.as_bytes()))
    }

    /// Check a signature against the agent's current public key.
    /// No trust change, no audit entry.
    pub fn verify_signature(&self, agent_id: &str, message: &str, signature: &str) -> GovernanceResult<bool> {
        let public_key = {
            let identities = self.lock();
            identities
                .get(agent_id)
                .ok_or_else(|| not_found(agent_id))?
                .keys
                .public_key_hex()
        };
        keys::verify(&public_key, message.as_bytes(), signature)
    }

    // ── Verification ─────────────────────────────────────────────────────────

    /// Run the verification gate and record exactly one verification entry.
    ///
    /// Order of checks: unknown → revoked → signature (when credentials are
    /// given; a bad one costs `signature_failure_penalty`) → minimum trust.
    pub fn verify(&self, agent_id: &str, credentials: Option<&Credentials>) -> GovernanceResult<IdentityCheck> {
        let method = if credentials.is_some() {
            VerificationMethod::Signature
        } else {
            VerificationMethod::Registry
        };
        let mut revocation = None;

        let check = {
            let mut identities = self.lock();
            match identities.get_mut(agent_id) {
                None => IdentityCheck::rejected(VerificationReason::NotFound, 0),
                Some(identity) => {
                    let check = if identity.is_revoked() {
                        IdentityCheck::rejected(VerificationReason::Revoked, 0)
                    } else if !signature_ok(identity, credentials)? {
                        let (score, revoked_now) = identity.lower_trust(self.config.signature_failure_penalty);
                        if revoked_now {
                            revocation = Some(revocation_entry(agent_id, REASON_TRUST_ZERO, score));
                        }
                        IdentityCheck::rejected(VerificationReason::InvalidSignature, score)
                    } else if identity.trust_score < self.config.minimum_trust {
                        IdentityCheck::rejected(VerificationReason::TrustTooLow, identity.trust_score)
                    } else {
                        IdentityCheck::verified(identity.trust_score)
                    };
                    identity.record_attempt(method, check.verified, self.config.history_limit);
                    check
                }
            }
        };

        if check.verified {
            debug!(agent_id = %agent_id, trust_score = check.trust_score, "identity verified");
        } else {
            warn!(agent_id = %agent_id, reason = %check.reason, "identity verification failed");
        }

        self.audit.record(
            PendingEntry::new(EntryType::IdentityVerification, agent_id, VERIFY_ACTION).with_decision(json!({
                "verified": check.verified,
                "reason": check.reason.to_string(),
                "trustScore": check.trust_score,
                "method": method,
            })),
        )?;
        if let Some(entry) = revocation {
            warn!(agent_id = %agent_id, "identity revoked after signature failure");
            self.audit.record(entry)?;
        }

        Ok(check)
    }

    // ── Trust ─────────────────────────────────────────────────────────────────

    /// Raise trust, clamped to 100. Never un-revokes.
    pub fn increment_trust_score(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8> {
        let score = {
            let mut identities = self.lock();
            identities
                .get_mut(agent_id)
                .ok_or_else(|| not_found(agent_id))?
                .raise_trust(amount)
        };
        debug!(agent_id = %agent_id, amount, reason = %reason, trust_score = score, "trust increased");
        Ok(score)
    }

    /// Lower trust, clamped to 0. Landing on zero revokes the identity.
    pub fn decrement_trust_score(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8> {
        let (score, revoked_now) = {
            let mut identities = self.lock();
            identities
                .get_mut(agent_id)
                .ok_or_else(|| not_found(agent_id))?
                .lower_trust(amount)
        };
        debug!(agent_id = %agent_id, amount, reason = %reason, trust_score = score, "trust decreased");

        if revoked_now {
            warn!(agent_id = %agent_id, "identity revoked: trust score reached zero");
            self.audit.record(revocation_entry(agent_id, REASON_TRUST_ZERO, score))?;
        }
        Ok(score)
    }

    // ── Accessors ─────────────────────────────────────────────────────────────

    pub fn public_identity(&self, agent_id: &str) -> Option<PublicIdentity> {
        self.lock().get(agent_id).map(Identity::public_view)
    }

    /// Every identity, sorted by agent id.
    pub fn list_identities(&self) -> Vec<PublicIdentity> {
        let mut all: Vec<PublicIdentity> = self.lock().values().map(Identity::public_view).collect();
        all.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        all
    }

    pub fn trust_score(&self, agent_id: &str) -> Option<u8> {
        self.lock().get(agent_id).map(|i| i.trust_score)
    }

    pub fn status(&self, agent_id: &str) -> Option<IdentityStatus> {
        self.lock().get(agent_id).map(|i| i.status)
    }

    /// Oldest first.
    pub fn verification_history(&self, agent_id: &str) -> Option<Vec<VerificationRecord>> {
        self.lock().get(agent_id).map(|i| i.history.iter().cloned().collect())
    }

    pub fn archived_keys(&self, agent_id: &str) -> Option<Vec<ArchivedKey>> {
        self.lock().get(agent_id).map(|i| i.archived_keys.clone())
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, HashMap<String, Identity>> {
        self.identities.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl IdentityVerifier for IdentityRegistry {
    fn verify_identity(&self, agent_id: &str, credentials: Option<&Credentials>) -> GovernanceResult<IdentityCheck> {
        self.verify(agent_id, credentials)
    }

    fn increment_trust(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8> {
        self.increment_trust_score(agent_id, amount, reason)
    }

    fn decrement_trust(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8> {
        self.decrement_trust_score(agent_id, amount, reason)
    }

    fn trust_score(&self, agent_id: &str) -> Option<u8> {
        IdentityRegistry::trust_score(self, agent_id)
    }

    fn status(&self, agent_id: &str) -> Option<IdentityStatus> {
        IdentityRegistry::status(self, agent_id)
    }
}

/// True when no credentials were presented or they check out.
fn signature_ok(identity: &Identity, credentials: Option<&Credentials>) -> GovernanceResult<bool> {
    match credentials {
        None => Ok(true),
        Some(c) => keys::verify(&identity.keys.public_key_hex(), c.message.as_bytes(), &c.signature),
    }
}

fn not_found(agent_id: &str) -> GovernanceError {
    GovernanceError::IdentityNotFound { agent_id: agent_id.to_string() }
}

fn revocation_entry(agent_id: &str, reason: &str, trust_score: u8) -> PendingEntry {
    PendingEntry::new(EntryType::IdentityVerification, agent_id, REVOKE_ACTION).with_decision(json!({
        "verified": false,
        "status": IdentityStatus::Revoked,
        "reason": format!("revoked: {reason}"),
        "trustScore": trust_score,
    }))
}
