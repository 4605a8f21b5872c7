//! Wiring: one audit log, one policy engine, one identity registry, and the
//! governor that composes them.
//!
//! Every component writes to the same audit log, so a single chain records
//! the whole story of each action.

use std::path::Path;
use std::sync::Arc;

use warden_audit::AuditLog;
use warden_contracts::error::GovernanceResult;
use warden_core::{
    config::{GovernanceConfig, GovernorConfig, IdentityConfig, DEFAULT_MAX_SEGMENT_BYTES},
    traits::{AuditSink, IdentityVerifier, PolicyEvaluator},
    Governor,
};
use warden_identity::IdentityRegistry;
use warden_policy::{PolicyDocument, PolicyEngine};

// ── Embedded policies ─────────────────────────────────────────────────────────

const SUPPORT_AGENT_POLICY: &str = include_str!("../policies/support-agent.yaml");
const REFUND_AGENT_POLICY: &str = include_str!("../policies/refund-agent.toml");
const SYNC_AGENT_POLICY: &str = include_str!("../policies/sync-agent.json");

/// The three reference policies: `support-agent` (YAML), `refund-agent`
/// (TOML), and `sync-agent` (JSON).
pub fn support_policies() -> GovernanceResult<Vec<PolicyDocument>> {
    Ok(vec![
        PolicyDocument::from_yaml_str(SUPPORT_AGENT_POLICY)?,
        PolicyDocument::from_toml_str(REFUND_AGENT_POLICY)?,
        PolicyDocument::from_json_str(SYNC_AGENT_POLICY)?,
    ])
}

// ── Stack ─────────────────────────────────────────────────────────────────────

/// A fully wired governance runtime.
///
/// Concrete handles are kept alongside the governor so callers can still
/// reach the registry (identity creation, signing) and the audit log
/// (query, verification, reports).
pub struct GovernanceStack {
    pub audit: Arc<AuditLog>,
    pub policy: Arc<PolicyEngine>,
    pub identity: Arc<IdentityRegistry>,
    pub governor: Arc<Governor>,
}

impl GovernanceStack {
    /// Reference policies, default thresholds, audit log in `audit_dir`.
    pub fn open(audit_dir: &Path) -> GovernanceResult<Self> {
        Self::with_documents(audit_dir, DEFAULT_MAX_SEGMENT_BYTES, support_policies()?)
    }

    /// Reference wiring with caller-chosen policies and segment size.
    pub fn with_documents(
        audit_dir: &Path,
        max_segment_bytes: u64,
        documents: Vec<PolicyDocument>,
    ) -> GovernanceResult<Self> {
        let audit = Arc::new(AuditLog::open(audit_dir, max_segment_bytes)?);
        let sink: Arc<dyn AuditSink> = audit.clone();
        let policy = Arc::new(PolicyEngine::from_documents(documents, Arc::clone(&sink))?);
        let identity = Arc::new(IdentityRegistry::with_config(Arc::clone(&sink), IdentityConfig::default()));
        Ok(Self::assemble(audit, policy, identity, GovernorConfig::default()))
    }

    /// Build every component from a [`GovernanceConfig`].
    ///
    /// Policies come from `[policy] directory`; identities are restored from
    /// `[identity] store_directory` when it exists.
    pub fn from_config(config: &GovernanceConfig) -> GovernanceResult<Self> {
        let audit = Arc::new(AuditLog::from_config(&config.audit)?);
        let sink: Arc<dyn AuditSink> = audit.clone();
        let policy = Arc::new(PolicyEngine::from_config(&config.policy, Arc::clone(&sink))?);
        let identity = Arc::new(IdentityRegistry::from_config(&config.identity, Arc::clone(&sink))?);
        Ok(Self::assemble(audit, policy, identity, config.governor.clone()))
    }

    fn assemble(
        audit: Arc<AuditLog>,
        policy: Arc<PolicyEngine>,
        identity: Arc<IdentityRegistry>,
        config: GovernorConfig,
    ) -> Self {
        let verifier: Arc<dyn IdentityVerifier> = identity.clone();
        let evaluator: Arc<dyn PolicyEvaluator> = policy.clone();
        let sink: Arc<dyn AuditSink> = audit.clone();
        let governor = Arc::new(Governor::with_config(verifier, evaluator, sink, config));
        Self { audit, policy, identity, governor }
    }
}
