//! Audit entry shapes, query filters, and integrity/report results.
//!
//! Entries are persisted one JSON object per line. Field names are camelCase
//! so segments can be read by non-Rust tooling.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// The kind of event an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryType {
    PolicyDecision,
    AgentAction,
    Escalation,
    EscalationResolution,
    IdentityVerification,
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EntryType::PolicyDecision => "policy_decision",
            EntryType::AgentAction => "agent_action",
            EntryType::Escalation => "escalation",
            EntryType::EscalationResolution => "escalation_resolution",
            EntryType::IdentityVerification => "identity_verification",
        };
        f.write_str(s)
    }
}

impl std::str::FromStr for EntryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "policy_decision" => Ok(EntryType::PolicyDecision),
            "agent_action" => Ok(EntryType::AgentAction),
            "escalation" => Ok(EntryType::Escalation),
            "escalation_resolution" => Ok(EntryType::EscalationResolution),
            "identity_verification" => Ok(EntryType::IdentityVerification),
            other => Err(format!("unknown entry type '{other}'")),
        }
    }
}

/// Opaque, caller-stable identifier for a pending escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EscalationId(pub Uuid);

impl EscalationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EscalationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EscalationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for EscalationId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// An entry as submitted by a component, before the log stamps, sanitizes,
/// and chains it.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingEntry {
    pub entry_type: EntryType,
    pub agent_id: String,
    pub action: String,
    pub context: Value,
    pub decision: Value,
}

impl PendingEntry {
    pub fn new(entry_type: EntryType, agent_id: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            entry_type,
            agent_id: agent_id.into(),
            action: action.into(),
            context: Value::Null,
            decision: Value::Null,
        }
    }

    pub fn with_context(mut self, context: Value) -> Self {
        self.context = context;
        self
    }

    pub fn with_decision(mut self, decision: Value) -> Self {
        self.decision = decision;
        self
    }
}

/// A persisted, chained audit entry, one line in a segment file.
///
/// `hash` commits to `type`, `timestamp`, `agentId`, `action`, `decision`,
/// and `previousHash`. The first entry of every segment has no
/// `previousHash`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    pub timestamp: DateTime<Utc>,
    pub agent_id: String,
    pub action: String,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub decision: Value,
    pub previous_hash: Option<String>,
    pub hash: String,
}

impl AuditEntry {
    /// `decision.allowed`, when the payload carries one.
    pub fn allowed(&self) -> Option<bool> {
        self.decision.get("allowed").and_then(Value::as_bool)
    }

    /// `decision.requiresEscalation`, when the payload carries one.
    pub fn requires_escalation(&self) -> Option<bool> {
        self.decision.get("requiresEscalation").and_then(Value::as_bool)
    }

    /// The escalation this entry opened or resolved.
    pub fn escalation_id(&self) -> Option<EscalationId> {
        self.decision
            .get("escalationId")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    }
}

/// Conjunctive filter over audit entries. Unset fields match everything;
/// the time range is inclusive at both ends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    pub agent_id: Option<String>,
    pub entry_type: Option<EntryType>,
    pub action: Option<String>,
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
    pub allowed: Option<bool>,
}

impl QueryFilter {
    pub fn agent(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    pub fn of_type(mut self, entry_type: EntryType) -> Self {
        self.entry_type = Some(entry_type);
        self
    }

    pub fn action(mut self, action: impl Into<String>) -> Self {
        self.action = Some(action.into());
        self
    }

    pub fn between(mut self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn allowed(mut self, allowed: bool) -> Self {
        self.allowed = Some(allowed);
        self
    }

    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(agent_id) = &self.agent_id {
            if &entry.agent_id != agent_id {
                return false;
            }
        }
        if let Some(entry_type) = self.entry_type {
            if entry.entry_type != entry_type {
                return false;
            }
        }
        if let Some(action) = &self.action {
            if &entry.action != action {
                return false;
            }
        }
        if let Some(start) = self.start {
            if entry.timestamp < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if entry.timestamp > end {
                return false;
            }
        }
        if let Some(allowed) = self.allowed {
            if entry.allowed() != Some(allowed) {
                return false;
            }
        }
        true
    }
}

/// Outcome of replaying one segment's hash chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainVerification {
    pub segment: String,
    pub valid: bool,
    pub entries_checked: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Zero-based position of the first offending entry.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broken_at_index: Option<usize>,
}

impl ChainVerification {
    pub fn intact(segment: impl Into<String>, entries_checked: usize) -> Self {
        Self {
            segment: segment.into(),
            valid: true,
            entries_checked,
            error: None,
            broken_at_index: None,
        }
    }

    pub fn broken(segment: impl Into<String>, index: usize, error: impl Into<String>) -> Self {
        Self {
            segment: segment.into(),
            valid: false,
            entries_checked: index,
            error: Some(error.into()),
            broken_at_index: Some(index),
        }
    }
}

/// Per-agent decision counts within a compliance window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentSummary {
    pub total: u64,
    pub allowed: u64,
    pub denied: u64,
    pub escalations: u64,
}

/// Read-side aggregation over policy decisions and escalations in a window.
///
/// `allowed + denied + escalations == total_decisions` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_decisions: u64,
    pub allowed: u64,
    pub denied: u64,
    pub escalations: u64,
    pub by_agent: BTreeMap<String, AgentSummary>,
    pub by_action: BTreeMap<String, u64>,
    pub escalation_events: Vec<AuditEntry>,
}
