//! Runtime configuration.
//!
//! `GovernanceConfig` is read from a TOML document. Every field has a
//! default, so an empty document (or no document at all) yields the stock
//! thresholds: 100MB audit segments, a trust gate at 50, +1/−5 trust deltas
//! for governed actions, and −10 for a bad signature.
//!
//! ```toml
//! [audit]
//! directory = "/var/lib/warden/audit"
//! max_segment_bytes = 10485760
//!
//! [policy]
//! directory = "/etc/warden/policies"
//!
//! [identity]
//! store_directory = "/var/lib/warden/identities"
//! minimum_trust = 60
//!
//! [governor]
//! escalation_assignee = "compliance-team"
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use warden_contracts::error::{GovernanceError, GovernanceResult};

/// 100MB.
pub const DEFAULT_MAX_SEGMENT_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    pub audit: AuditConfig,
    pub policy: PolicyConfig,
    pub identity: IdentityConfig,
    pub governor: GovernorConfig,
}

impl GovernanceConfig {
    /// Parse `s` as TOML.
    ///
    /// Returns `GovernanceError::ConfigError` if the document is malformed or
    /// has fields of the wrong type.
    pub fn from_toml_str(s: &str) -> GovernanceResult<Self> {
        toml::from_str(s).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to parse governance config: {e}"),
        })
    }

    pub fn from_file(path: &Path) -> GovernanceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to read config file '{}': {}", path.display(), e),
        })?;
        Self::from_toml_str(&contents)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Directory holding the active segment and its archived predecessors.
    pub directory: PathBuf,
    /// The active segment is rotated once it grows past this size.
    pub max_segment_bytes: u64,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("audit-logs"),
            max_segment_bytes: DEFAULT_MAX_SEGMENT_BYTES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Directory of per-agent policy documents (`.yaml`, `.yml`, `.json`, `.toml`).
    pub directory: PathBuf,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self { directory: PathBuf::from("policies") }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Where identity records are persisted. `None` keeps identities in memory.
    pub store_directory: Option<PathBuf>,
    /// Verification fails for any identity whose trust is below this.
    pub minimum_trust: u8,
    /// Trust removed for each failed signature check.
    pub signature_failure_penalty: u8,
    /// Verification attempts kept per identity; the oldest are dropped.
    pub history_limit: usize,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            store_directory: None,
            minimum_trust: 50,
            signature_failure_penalty: 10,
            history_limit: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernorConfig {
    /// Trust added after a task succeeds.
    pub success_reward: u8,
    /// Trust removed after a task fails.
    pub failure_penalty: u8,
    /// `health_check` reports healthy only above this trust score.
    pub healthy_threshold: u8,
    /// Recorded as `assignedTo` on every escalation.
    pub escalation_assignee: String,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            success_reward: 1,
            failure_penalty: 5,
            healthy_threshold: 50,
            escalation_assignee: "human-reviewer".to_string(),
        }
    }
}
