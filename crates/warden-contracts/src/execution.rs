//! Governed-execution results, escalation resolutions, and health reports.
//!
//! `ExecutionResult` is what the governor returns to the caller after each
//! `execute()` call. Every terminal state of the pipeline maps to exactly one
//! `ExecutionOutcome` variant.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    audit::EscalationId,
    identity::{IdentityStatus, VerificationReason},
};

/// The terminal state of one governed action.
///
/// Callers pattern-match on this to decide what to do next:
/// - `IdentityRejected` → the agent could not be verified; nothing else ran
/// - `Escalated` → persist `escalation_id`, wait for a human, then re-submit
/// - `PolicyDenied` → surface `reason`, stop
/// - `Completed` / `Failed` → the task ran; trust was adjusted accordingly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionOutcome {
    IdentityRejected { reason: VerificationReason },
    Escalated { escalation_id: EscalationId, reason: String },
    PolicyDenied { reason: String },
    Completed { output: Value },
    Failed { error: String },
}

/// What `Governor::execute` returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub agent_id: String,
    pub action: String,
    pub outcome: ExecutionOutcome,
    /// Wall-clock time spent in the pipeline, in microseconds.
    pub execution_time_us: u64,
    /// Trust score after any adjustment this call made.
    pub trust_score: u8,
}

impl ExecutionResult {
    /// True only when the task ran and succeeded.
    pub fn success(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Completed { .. })
    }

    pub fn requires_escalation(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::Escalated { .. })
    }

    pub fn policy_denied(&self) -> bool {
        matches!(self.outcome, ExecutionOutcome::PolicyDenied { .. })
    }

    pub fn escalation_id(&self) -> Option<EscalationId> {
        match &self.outcome {
            ExecutionOutcome::Escalated { escalation_id, .. } => Some(*escalation_id),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&Value> {
        match &self.outcome {
            ExecutionOutcome::Completed { output } => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            ExecutionOutcome::Failed { error } => Some(error),
            _ => None,
        }
    }

    /// Human-readable reason for any non-success outcome.
    pub fn reason(&self) -> Option<String> {
        match &self.outcome {
            ExecutionOutcome::IdentityRejected { reason } => {
                Some(format!("identity verification failed: {reason}"))
            }
            ExecutionOutcome::Escalated { reason, .. } => Some(reason.clone()),
            ExecutionOutcome::PolicyDenied { reason } => Some(reason.clone()),
            ExecutionOutcome::Failed { error } => Some(error.clone()),
            ExecutionOutcome::Completed { .. } => None,
        }
    }
}

/// A reviewer's verdict on a pending escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    Approved,
    Rejected,
}

/// Snapshot of an agent's operational readiness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthReport {
    pub agent_id: String,
    /// `None` when the agent has no identity.
    pub identity_status: Option<IdentityStatus>,
    pub has_policy: bool,
    pub trust_score: u8,
    pub healthy: bool,
}
