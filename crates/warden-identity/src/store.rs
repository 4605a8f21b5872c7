//! On-disk identity records: one JSON document per agent.
//!
//! Records carry the secret seed as hex, so the store directory must be
//! treated like a key store. On Unix each file is written `0600`.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use warden_contracts::{
    error::{GovernanceError, GovernanceResult},
    identity::{ArchivedKey, IdentityMetadata, IdentityStatus, VerificationRecord},
};
use warden_core::{config::IdentityConfig, traits::AuditSink};

use crate::{identity::Identity, keys::KeyPair, registry::IdentityRegistry};

const RECORD_SUFFIX: &str = ".identity.json";

/// The persisted shape of an identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct IdentityRecord {
    agent_id: String,
    public_key: String,
    private_key: String,
    metadata: IdentityMetadata,
    status: IdentityStatus,
    trust_score: u8,
    #[serde(default)]
    verification_history: Vec<VerificationRecord>,
    #[serde(default)]
    archived_keys: Vec<ArchivedKey>,
}

impl IdentityRecord {
    fn from_identity(identity: &Identity) -> Self {
        Self {
            agent_id: identity.agent_id.clone(),
            public_key: identity.keys.public_key_hex(),
            private_key: identity.keys.secret_hex(),
            metadata: identity.metadata.clone(),
            status: identity.status,
            trust_score: identity.trust_score,
            verification_history: identity.history.iter().cloned().collect(),
            archived_keys: identity.archived_keys.clone(),
        }
    }

    /// Rebuild the identity, checking the stored public key against the seed.
    /// Only the newest `history_limit` verification records are kept.
    fn into_identity(self, history_limit: usize) -> GovernanceResult<Identity> {
        let keys = KeyPair::from_secret_hex(&self.private_key)?;
        if keys.public_key_hex() != self.public_key.trim().to_ascii_lowercase() {
            return Err(GovernanceError::CryptoError {
                reason: format!("stored public key for '{}' does not match its private key", self.agent_id),
            });
        }
        Ok(Identity {
            agent_id: self.agent_id,
            keys,
            metadata: self.metadata,
            status: self.status,
            trust_score: self.trust_score.min(warden_contracts::identity::MAX_TRUST),
            history: {
                let excess = self.verification_history.len().saturating_sub(history_limit);
                self.verification_history.into_iter().skip(excess).collect::<VecDeque<_>>()
            },
            archived_keys: self.archived_keys,
        })
    }
}

/// File name for an agent. Characters outside `[A-Za-z0-9._-]` become `_`;
/// the record itself keeps the exact id.
fn file_name(agent_id: &str) -> String {
    let safe: String = agent_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    format!("{safe}{RECORD_SUFFIX}")
}

fn write_private(path: &Path, contents: &str) -> std::io::Result<()> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, contents)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp, fs::Permissions::from_mode(0o600))?;
    }
    fs::rename(&tmp, path)
}

impl IdentityRegistry {
    /// Write every identity to `dir`, one file per agent.
    pub fn save_to_dir(&self, dir: &Path) -> GovernanceResult<()> {
        let store_error = |e: std::io::Error| GovernanceError::ConfigError {
            reason: format!("failed to write identity store '{}': {}", dir.display(), e),
        };
        fs::create_dir_all(dir).map_err(store_error)?;

        let records: Vec<IdentityRecord> = self.lock().values().map(IdentityRecord::from_identity).collect();
        for record in &records {
            let json = serde_json::to_string_pretty(record).map_err(|e| GovernanceError::ConfigError {
                reason: format!("failed to encode identity '{}': {}", record.agent_id, e),
            })?;
            write_private(&dir.join(file_name(&record.agent_id)), &json).map_err(store_error)?;
        }

        info!(dir = %dir.display(), identities = records.len(), "identity store saved");
        Ok(())
    }

    /// Restore a registry from a directory written by [`IdentityRegistry::save_to_dir`].
    ///
    /// Fails with `ConfigError` on unreadable or duplicate records and with
    /// `CryptoError` when a record's keys are inconsistent.
    pub fn load_from_dir(dir: &Path, audit: Arc<dyn AuditSink>, config: IdentityConfig) -> GovernanceResult<Self> {
        let read_error = |e: std::io::Error| GovernanceError::ConfigError {
            reason: format!("failed to read identity store '{}': {}", dir.display(), e),
        };

        let mut paths: Vec<_> = fs::read_dir(dir)
            .map_err(read_error)?
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.to_str().is_some_and(|s| s.ends_with(RECORD_SUFFIX)))
            .collect();
        paths.sort();

        let mut identities = HashMap::new();
        for path in paths {
            let contents = fs::read_to_string(&path).map_err(read_error)?;
            let record: IdentityRecord = serde_json::from_str(&contents).map_err(|e| GovernanceError::ConfigError {
                reason: format!("malformed identity record '{}': {}", path.display(), e),
            })?;
            let identity = record.into_identity(config.history_limit)?;
            if identities.contains_key(&identity.agent_id) {
                return Err(GovernanceError::ConfigError {
                    reason: format!("duplicate identity record for agent '{}'", identity.agent_id),
                });
            }
            identities.insert(identity.agent_id.clone(), identity);
        }

        info!(dir = %dir.display(), identities = identities.len(), "identity store loaded");
        Ok(Self::from_identities(identities, audit, config))
    }

    /// Save to the configured `store_directory`, if any.
    pub fn persist(&self) -> GovernanceResult<()> {
        match self.config().store_directory.clone() {
            Some(dir) => self.save_to_dir(&dir),
            None => Ok(()),
        }
    }
}
