//! The Warden governor: the single governed-execution entry point.
//!
//! The governor enforces the Warden execution model:
//!
//!   Identity → Policy → [Task::run] → Audit → Trust adjustment
//!
//! The security invariant is absolute: `Task::run()` is NEVER called unless
//! the identity verifies AND the policy returns an explicit allow. This is
//! enforced structurally: the only call site of `run()` is reachable only
//! after both gates pass.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use warden_contracts::{
    audit::{EntryType, EscalationId, PendingEntry},
    error::GovernanceResult,
    execution::{ExecutionOutcome, ExecutionResult, HealthReport, Resolution},
    identity::{Credentials, IdentityStatus},
    policy::Decision,
};

use crate::config::GovernorConfig;
use crate::traits::{AuditSink, IdentityVerifier, PolicyEvaluator, Task, TaskResult};

/// Action recorded on `escalation_resolution` entries.
pub const RESOLVE_ACTION: &str = "escalation:resolve";

/// Composes identity, policy, and audit into governed execution.
///
/// The governor holds no per-call state; one instance may serve any number of
/// concurrent `execute()` calls for any mix of agents.
pub struct Governor {
    identity: Arc<dyn IdentityVerifier>,
    policy: Arc<dyn PolicyEvaluator>,
    audit: Arc<dyn AuditSink>,
    config: GovernorConfig,
}

impl Governor {
    /// Create a governor with the stock trust deltas and health threshold.
    pub fn new(
        identity: Arc<dyn IdentityVerifier>,
        policy: Arc<dyn PolicyEvaluator>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self::with_config(identity, policy, audit, GovernorConfig::default())
    }

    pub fn with_config(
        identity: Arc<dyn IdentityVerifier>,
        policy: Arc<dyn PolicyEvaluator>,
        audit: Arc<dyn AuditSink>,
        config: GovernorConfig,
    ) -> Self {
        Self { identity, policy, audit, config }
    }

    pub fn config(&self) -> &GovernorConfig {
        &self.config
    }

    /// Run `action` for `agent_id` under governance.
    ///
    /// Equivalent to [`Governor::execute_with_credentials`] with no signature
    /// credentials.
    pub fn execute(
        &self,
        agent_id: &str,
        action: &str,
        context: &Value,
        task: Option<&dyn Task>,
    ) -> GovernanceResult<ExecutionResult> {
        self.execute_with_credentials(agent_id, action, context, task, None)
    }

    /// Run `action` for `agent_id` under governance.
    ///
    /// # Pipeline
    ///
    /// 1. `identity.verify_identity()`; not verified → `IdentityRejected`
    ///    (the verification entry is already on record)
    /// 2. `policy.evaluate()`:
    ///    - escalation → record an `escalation` entry, return `Escalated`
    ///    - not allowed → return `PolicyDenied`
    /// 3. Run the task, **only reachable after steps 1 & 2 pass**. No task
    ///    means the caller only wanted the permission enacted: success.
    /// 4. Record an `agent_action` entry with the outcome
    /// 5. Adjust trust: `success_reward` on success, `failure_penalty` on failure
    ///
    /// # Errors
    ///
    /// Returns `Err` only when an audit write or a trust update fails. Every
    /// denial, escalation, and task failure is a normal `ExecutionOutcome`.
    pub fn execute_with_credentials(
        &self,
        agent_id: &str,
        action: &str,
        context: &Value,
        task: Option<&dyn Task>,
        credentials: Option<&Credentials>,
    ) -> GovernanceResult<ExecutionResult> {
        let started = Instant::now();

        debug!(agent_id = %agent_id, action = %action, "governed execution starting");

        // ── Step 1: Identity ─────────────────────────────────────────────────
        let check = self.identity.verify_identity(agent_id, credentials)?;
        if !check.verified {
            warn!(
                agent_id = %agent_id,
                action = %action,
                reason = %check.reason,
                "identity verification failed, action refused"
            );
            return Ok(self.finish(
                agent_id,
                action,
                ExecutionOutcome::IdentityRejected { reason: check.reason },
                started,
                check.trust_score,
            ));
        }

        // ── Step 2: Policy ───────────────────────────────────────────────────
        let decision = self.policy.evaluate(agent_id, action, context)?;

        if decision.requires_escalation {
            let escalation_id = self.open_escalation(agent_id, action, context, &decision)?;
            info!(
                agent_id = %agent_id,
                action = %action,
                escalation_id = %escalation_id,
                "action escalated for human review"
            );
            return Ok(self.finish(
                agent_id,
                action,
                ExecutionOutcome::Escalated { escalation_id, reason: decision.reason },
                started,
                check.trust_score,
            ));
        }

        if !decision.allowed {
            warn!(
                agent_id = %agent_id,
                action = %action,
                reason = %decision.reason,
                "policy denied action"
            );
            return Ok(self.finish(
                agent_id,
                action,
                ExecutionOutcome::PolicyDenied { reason: decision.reason },
                started,
                check.trust_score,
            ));
        }

        // ── Step 3: Task ─────────────────────────────────────────────────────
        //
        // The ONLY call site of Task::run() in the runtime.
        let task_started = Instant::now();
        let outcome = match task {
            Some(task) => run_captured(task, context),
            None => Ok(Value::Null),
        };
        let task_time_us = elapsed_us(task_started);

        // ── Step 4: Audit the outcome ────────────────────────────────────────
        let payload = match &outcome {
            Ok(output) => json!({ "success": true, "output": output, "executionTimeUs": task_time_us }),
            Err(error) => json!({ "success": false, "error": error, "executionTimeUs": task_time_us }),
        };
        self.audit.record(
            PendingEntry::new(EntryType::AgentAction, agent_id, action)
                .with_context(context.clone())
                .with_decision(payload),
        )?;

        // ── Step 5: Trust adjustment ─────────────────────────────────────────
        let (outcome, trust_score) = match outcome {
            Ok(output) => {
                let trust = self.identity.increment_trust(
                    agent_id,
                    self.config.success_reward,
                    "governed action succeeded",
                )?;
                (ExecutionOutcome::Completed { output }, trust)
            }
            Err(error) => {
                warn!(agent_id = %agent_id, action = %action, error = %error, "task failed");
                let trust = self.identity.decrement_trust(
                    agent_id,
                    self.config.failure_penalty,
                    "governed action failed",
                )?;
                (ExecutionOutcome::Failed { error }, trust)
            }
        };

        Ok(self.finish(agent_id, action, outcome, started, trust_score))
    }

    /// Evaluate policy only. The decision is still audited; nothing runs.
    pub fn check_permission(
        &self,
        agent_id: &str,
        action: &str,
        context: &Value,
    ) -> GovernanceResult<Decision> {
        self.policy.evaluate(agent_id, action, context)
    }

    /// Record a reviewer's verdict on a pending escalation.
    ///
    /// Only writes the linked `escalation_resolution` entry. Re-submitting the
    /// approved action is the caller's responsibility.
    pub fn resolve_escalation(
        &self,
        escalation_id: EscalationId,
        resolution: Resolution,
        notes: &str,
        resolved_by: &str,
    ) -> GovernanceResult<()> {
        info!(
            escalation_id = %escalation_id,
            resolution = ?resolution,
            resolved_by = %resolved_by,
            "escalation resolved"
        );
        self.audit.record(
            PendingEntry::new(EntryType::EscalationResolution, resolved_by, RESOLVE_ACTION)
                .with_decision(json!({
                    "escalationId": escalation_id.to_string(),
                    "decision": resolution,
                    "notes": notes,
                    "resolvedBy": resolved_by,
                })),
        )
    }

    /// Identity status, policy presence, and trust for one agent.
    ///
    /// Healthy means: active identity, a loaded policy, and trust strictly
    /// above `healthy_threshold`.
    pub fn health_check(&self, agent_id: &str) -> HealthReport {
        let identity_status = self.identity.status(agent_id);
        let trust_score = self.identity.trust_score(agent_id).unwrap_or(0);
        let has_policy = self.policy.has_policy(agent_id);
        let healthy = identity_status == Some(IdentityStatus::Active)
            && has_policy
            && trust_score > self.config.healthy_threshold;

        HealthReport {
            agent_id: agent_id.to_string(),
            identity_status,
            has_policy,
            trust_score,
            healthy,
        }
    }

    fn open_escalation(
        &self,
        agent_id: &str,
        action: &str,
        context: &Value,
        decision: &Decision,
    ) -> GovernanceResult<EscalationId> {
        let escalation_id = EscalationId::new();
        self.audit.record(
            PendingEntry::new(EntryType::Escalation, agent_id, action)
                .with_context(context.clone())
                .with_decision(json!({
                    "escalationId": escalation_id.to_string(),
                    "reason": decision.reason,
                    "escalationRule": decision.escalation_rule,
                    "assignedTo": self.config.escalation_assignee,
                    "status": "pending",
                })),
        )?;
        Ok(escalation_id)
    }

    fn finish(
        &self,
        agent_id: &str,
        action: &str,
        outcome: ExecutionOutcome,
        started: Instant,
        trust_score: u8,
    ) -> ExecutionResult {
        ExecutionResult {
            agent_id: agent_id.to_string(),
            action: action.to_string(),
            outcome,
            execution_time_us: elapsed_us(started),
            trust_score,
        }
    }
}

/// Run a task, turning a panic into an ordinary failure.
fn run_captured(task: &dyn Task, context: &Value) -> TaskResult {
    match panic::catch_unwind(AssertUnwindSafe(|| task.run(context))) {
        Ok(result) => result,
        Err(payload) => {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            Err(format!("task panicked: {message}"))
        }
    }
}

fn elapsed_us(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX)
}

// ── Tests ────────────────────────────────────────────────────────────────────
