//! The policy engine: per-agent rule sets with fixed-precedence evaluation.
//!
//! Evaluation algorithm:
//!
//! 1. No policy for the agent → deny, "no policy".
//! 2. Escalation rules in order. A pattern rule matches on the action; a
//!    conditional rule also needs its condition to hold against the context.
//!    First match → escalate. This stage outranks explicit denies.
//! 3. Deny patterns in order. First match → deny, "explicitly denied".
//! 4. Allow patterns in order. First match → allow, "allowed by rule".
//! 5. Nothing matched → deny, "default deny".
//!
//! Every evaluation records exactly one `policy_decision` audit entry.
//!
//! The loaded rules live behind one `Arc` that reload swaps wholesale; an
//! evaluation works from the snapshot it started with.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use warden_contracts::{
    audit::{EntryType, PendingEntry},
    error::{GovernanceError, GovernanceResult},
    policy::Decision,
};
use warden_core::{
    config::PolicyConfig,
    traits::{AuditSink, PolicyEvaluator},
};

use crate::{
    pattern,
    rule::{self, AgentPolicy, PolicyDocument},
};

// ── PolicySet ─────────────────────────────────────────────────────────────────

/// An immutable map of agent id → compiled policy.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    policies: HashMap<String, AgentPolicy>,
}

impl PolicySet {
    /// Compile a batch of documents.
    ///
    /// Returns `GovernanceError::ConfigError` if two documents name the same
    /// agent or any document fails to compile.
    pub fn from_documents(documents: impl IntoIterator<Item = PolicyDocument>) -> GovernanceResult<Self> {
        let mut policies = HashMap::new();
        for document in documents {
            let policy = AgentPolicy::compile(document)?;
            if policies.contains_key(&policy.agent) {
                return Err(GovernanceError::ConfigError {
                    reason: format!("duplicate policy for agent '{}'", policy.agent),
                });
            }
            policies.insert(policy.agent.clone(), policy);
        }
        Ok(Self { policies })
    }

    /// Load every `.yaml`, `.yml`, `.json`, and `.toml` file in `dir`.
    /// Other files are ignored. Files load in name order.
    pub fn from_dir(dir: &Path) -> GovernanceResult<Self> {
        let entries = std::fs::read_dir(dir).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to read policy directory '{}': {}", dir.display(), e),
        })?;

        let mut paths: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|e| e.path())
            .filter(|p| p.is_file() && rule::extension(p).is_some())
            .collect();
        paths.sort();

        let documents = paths
            .iter()
            .map(|p| PolicyDocument::from_file(p))
            .collect::<GovernanceResult<Vec<_>>>()?;

        Self::from_documents(documents)
    }

    pub fn get(&self, agent_id: &str) -> Option<&AgentPolicy> {
        self.policies.get(agent_id)
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    /// Sorted agent ids.
    pub fn agents(&self) -> Vec<String> {
        let mut agents: Vec<String> = self.policies.keys().cloned().collect();
        agents.sort();
        agents
    }

    /// Apply the precedence algorithm. Pure: no audit, no logging.
    pub fn decide(&self, agent_id: &str, action: &str, context: &Value) -> Decision {
        let Some(policy) = self.policies.get(agent_id) else {
            return Decision::no_policy();
        };

        for rule in &policy.escalate {
            if !pattern::matches(&rule.pattern, action) {
                continue;
            }
            if rule.condition.as_ref().map_or(true, |c| c.evaluate(context)) {
                return Decision::escalate(rule.rule.clone());
            }
        }

        if let Some(p) = policy.deny.iter().find(|p| pattern::matches(p, action)) {
            return Decision::explicitly_denied(p.as_str());
        }

        if let Some(p) = policy.allow.iter().find(|p| pattern::matches(p, action)) {
            return Decision::allowed_by(p.as_str());
        }

        Decision::default_deny()
    }
}

// ── PolicyEngine ──────────────────────────────────────────────────────────────

/// The audited, reloadable policy gate.
///
/// ```rust,ignore
/// use warden_policy::PolicyEngine;
///
/// let engine = PolicyEngine::from_dir(Path::new("policies"), audit.clone())?;
/// let decision = engine.evaluate("support-agent", "read:tickets", &json!({}))?;
/// ```
pub struct PolicyEngine {
    policies: RwLock<Arc<PolicySet>>,
    source_dir: Option<PathBuf>,
    audit: Arc<dyn AuditSink>,
}

impl PolicyEngine {
    pub fn new(policies: PolicySet, audit: Arc<dyn AuditSink>) -> Self {
        Self { policies: RwLock::new(Arc::new(policies)), source_dir: None, audit }
    }

    pub fn from_documents(
        documents: impl IntoIterator<Item = PolicyDocument>,
        audit: Arc<dyn AuditSink>,
    ) -> GovernanceResult<Self> {
        Ok(Self::new(PolicySet::from_documents(documents)?, audit))
    }

    /// Load `dir` and remember it for [`PolicyEngine::reload_policies`].
    pub fn from_dir(dir: &Path, audit: Arc<dyn AuditSink>) -> GovernanceResult<Self> {
        let set = PolicySet::from_dir(dir)?;
        info!(dir = %dir.display(), agents = set.len(), "policies loaded");
        Ok(Self {
            policies: RwLock::new(Arc::new(set)),
            source_dir: Some(dir.to_path_buf()),
            audit,
        })
    }

    pub fn from_config(config: &PolicyConfig, audit: Arc<dyn AuditSink>) -> GovernanceResult<Self> {
        Self::from_dir(&config.directory, audit)
    }

    /// The rule set evaluations currently start from.
    pub fn snapshot(&self) -> Arc<PolicySet> {
        Arc::clone(&self.policies.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Atomically replace every loaded policy.
    pub fn reload(&self, policies: PolicySet) {
        let agents = policies.len();
        *self.policies.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(policies);
        info!(agents, "policies reloaded");
    }

    /// Re-read `dir` and swap it in. On error the current rules stay live.
    pub fn reload_from_dir(&self, dir: &Path) -> GovernanceResult<()> {
        match PolicySet::from_dir(dir) {
            Ok(set) => {
                self.reload(set);
                Ok(())
            }
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "policy reload failed, keeping current rules");
                Err(e)
            }
        }
    }

    /// Re-read the directory this engine was loaded from.
    pub fn reload_policies(&self) -> GovernanceResult<()> {
        let dir = self.source_dir.as_deref().ok_or_else(|| GovernanceError::ConfigError {
            reason: "policy engine was not loaded from a directory".to_string(),
        })?;
        self.reload_from_dir(dir)
    }

    pub fn agents(&self) -> Vec<String> {
        self.snapshot().agents()
    }
}

impl PolicyEvaluator for PolicyEngine {
    /// Decide, then record the decision with its evaluation time.
    fn evaluate(&self, agent_id: &str, action: &str, context: &Value) -> GovernanceResult<Decision> {
        let started = Instant::now();
        let decision = self.snapshot().decide(agent_id, action, context);
        let evaluation_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);

        debug!(
            agent_id = %agent_id,
            action = %action,
            allowed = decision.allowed,
            requires_escalation = decision.requires_escalation,
            reason = %decision.reason,
            "policy evaluated"
        );

        let mut payload = serde_json::to_value(&decision).map_err(|e| GovernanceError::AuditWriteFailed {
            reason: format!("failed to encode decision: {e}"),
        })?;
        if let Some(map) = payload.as_object_mut() {
            map.insert("evaluationTimeUs".to_string(), json!(evaluation_time_us));
        }

        self.audit.record(
            PendingEntry::new(EntryType::PolicyDecision, agent_id, action)
                .with_context(context.clone())
                .with_decision(payload),
        )?;

        Ok(decision)
    }

    fn has_policy(&self, agent_id: &str) -> bool {
        self.snapshot().get(agent_id).is_some()
    }
}
