//! A single agent identity and its state transitions.

use std::collections::VecDeque;

use chrono::Utc;

use warden_contracts::identity::{
    ArchivedKey, IdentityMetadata, IdentityStatus, PublicIdentity, VerificationMethod,
    VerificationRecord, MAX_TRUST,
};

use crate::keys::KeyPair;

/// Registry-private identity state. Only `PublicIdentity` views leave the crate.
#[derive(Debug)]
pub(crate) struct Identity {
    pub(crate) agent_id: String,
    pub(crate) keys: KeyPair,
    pub(crate) metadata: IdentityMetadata,
    pub(crate) status: IdentityStatus,
    pub(crate) trust_score: u8,
    pub(crate) history: VecDeque<VerificationRecord>,
    pub(crate) archived_keys: Vec<ArchivedKey>,
}

impl Identity {
    /// Full trust, active, fresh keys.
    pub(crate) fn new(agent_id: &str, metadata: IdentityMetadata, keys: KeyPair) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            keys,
            metadata,
            status: IdentityStatus::Active,
            trust_score: MAX_TRUST,
            history: VecDeque::new(),
            archived_keys: Vec::new(),
        }
    }

    pub(crate) fn public_view(&self) -> PublicIdentity {
        PublicIdentity {
            agent_id: self.agent_id.clone(),
            public_key: self.keys.public_key_hex(),
            metadata: self.metadata.clone(),
            status: self.status,
            trust_score: self.trust_score,
        }
    }

    pub(crate) fn is_revoked(&self) -> bool {
        self.status == IdentityStatus::Revoked
    }

    /// Append to the bounded history, dropping the oldest records.
    pub(crate) fn record_attempt(&mut self, method: VerificationMethod, success: bool, limit: usize) {
        self.history.push_back(VerificationRecord { timestamp: Utc::now(), method, success });
        while self.history.len() > limit {
            self.history.pop_front();
        }
    }

    pub(crate) fn raise_trust(&mut self, amount: u8) -> u8 {
        self.trust_score = self.trust_score.saturating_add(amount).min(MAX_TRUST);
        self.trust_score
    }

    /// Lower trust, revoking when an active identity lands on zero.
    ///
    /// Returns the new score and whether this call revoked the identity.
    pub(crate) fn lower_trust(&mut self, amount: u8) -> (u8, bool) {
        self.trust_score = self.trust_score.saturating_sub(amount);
        let revoked_now = self.trust_score == 0 && self.revoke();
        (self.trust_score, revoked_now)
    }

    /// `Active → Revoked`. Returns false when already revoked.
    pub(crate) fn revoke(&mut self) -> bool {
        if self.is_revoked() {
            return false;
        }
        self.status = IdentityStatus::Revoked;
        true
    }

    /// Archive the current public key and install `fresh`.
    pub(crate) fn rotate(&mut self, fresh: KeyPair) {
        self.archived_keys.push(ArchivedKey {
            public_key: self.keys.public_key_hex(),
            archived_at: Utc::now(),
        });
        self.keys = fresh;
    }
}
