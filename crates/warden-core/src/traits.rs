//! Core trait definitions for the Warden governance pipeline.
//!
//! These traits define the complete trust boundary:
//!
//! - `IdentityVerifier`: trusted gate (who is acting, and are they trusted)
//! - `PolicyEvaluator`: trusted gate (is this action permitted)
//! - `AuditSink`: trusted sink (records every decision immutably)
//! - `Task`: untrusted work supplied by the caller
//!
//! The governor wires them together in the correct order. A `Task` is never
//! run unless the identity is verified AND the policy explicitly allows the
//! action.

use serde_json::Value;

use warden_contracts::{
    audit::PendingEntry,
    error::GovernanceResult,
    identity::{Credentials, IdentityCheck, IdentityStatus},
    policy::Decision,
};

/// What a task returns: an output payload or a human-readable failure.
pub type TaskResult = Result<Value, String>;

/// Caller-supplied work executed only after every gate passes.
///
/// Implementations are **untrusted**. The governor captures both returned
/// errors and panics as a failed outcome; neither escapes `execute()`.
pub trait Task: Send + Sync {
    fn run(&self, context: &Value) -> TaskResult;
}

impl<F> Task for F
where
    F: Fn(&Value) -> TaskResult + Send + Sync,
{
    fn run(&self, context: &Value) -> TaskResult {
        self(context)
    }
}

/// The audit sink: the append-only, hash-chained record.
///
/// Implementations must serialize "compute hash, append, advance last hash"
/// so that no two entries ever claim the same predecessor.
pub trait AuditSink: Send + Sync {
    /// Stamp, sanitize, chain, and persist one entry.
    ///
    /// A failed write is fatal to the calling operation.
    fn record(&self, entry: PendingEntry) -> GovernanceResult<()>;
}

/// The policy gate.
///
/// Every call to `evaluate` MUST record exactly one `policy_decision` entry,
/// whatever the outcome.
pub trait PolicyEvaluator: Send + Sync {
    fn evaluate(&self, agent_id: &str, action: &str, context: &Value) -> GovernanceResult<Decision>;

    fn has_policy(&self, agent_id: &str) -> bool;
}

/// The identity gate and trust ledger.
///
/// Every call to `verify_identity` MUST record exactly one
/// `identity_verification` entry. Trust adjustments are atomic per agent and
/// clamp to `[0, 100]`; a decrement that lands on zero revokes the identity.
pub trait IdentityVerifier: Send + Sync {
    fn verify_identity(
        &self,
        agent_id: &str,
        credentials: Option<&Credentials>,
    ) -> GovernanceResult<IdentityCheck>;

    /// Returns the new trust score.
    fn increment_trust(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8>;

    /// Returns the new trust score.
    fn decrement_trust(&self, agent_id: &str, amount: u8, reason: &str) -> GovernanceResult<u8>;

    fn trust_score(&self, agent_id: &str) -> Option<u8>;

    fn status(&self, agent_id: &str) -> Option<IdentityStatus>;
}
