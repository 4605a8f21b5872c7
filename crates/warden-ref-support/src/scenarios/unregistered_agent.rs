//! Scenario C: Unregistered Agent
//!
//! A caller submits work under an agent id the registry has never seen.
//! The governor stops at identity verification: the policy engine is never
//! consulted and the task never runs. The only trace is a failed
//! `identity_verification` entry.

use std::path::Path;

use serde_json::json;

use warden_contracts::{
    audit::{EntryType, QueryFilter},
    error::GovernanceResult,
    execution::ExecutionResult,
};

use crate::{mock_data::read_ticket, stack::GovernanceStack};

pub const AGENT_ID: &str = "shadow-agent";

/// Submit `read:tickets` straight to the governor, bypassing `GovernedAgent`
/// (which would register the id first).
pub fn submit_unregistered(stack: &GovernanceStack) -> GovernanceResult<ExecutionResult> {
    stack
        .governor
        .execute(AGENT_ID, "read:tickets", &json!({ "ticketId": "TCK-1001" }), Some(&read_ticket))
}

/// Run Scenario C against a fresh audit log in `audit_dir`.
pub fn run_scenario(audit_dir: &Path) -> GovernanceResult<()> {
    println!("=== Scenario C: Unregistered Agent ===");
    println!();

    let stack = GovernanceStack::open(audit_dir)?;

    println!("  Agent: {AGENT_ID} (no identity in the registry)");
    println!("  Action: read:tickets");
    let result = submit_unregistered(&stack)?;
    println!(
        "  Result: {}  reason = {}",
        if result.success() { "UNEXPECTED SUCCESS" } else { "REFUSED" },
        result.reason().unwrap_or_default()
    );

    let by_agent = QueryFilter::default().agent(AGENT_ID);
    let verifications = stack
        .audit
        .query(&by_agent.clone().of_type(EntryType::IdentityVerification))?;
    let decisions = stack.audit.query(&by_agent.of_type(EntryType::PolicyDecision))?;
    println!("  identity_verification entries: {}", verifications.len());
    println!("  policy_decision entries:       {} (policy never consulted)", decisions.len());
    println!();
    println!("  Scenario C complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use warden_contracts::{execution::ExecutionOutcome, identity::VerificationReason};

    use super::*;

    #[test]
    fn test_unknown_agent_is_refused_before_policy() {
        let dir = tempdir().unwrap();
        let stack = GovernanceStack::open(dir.path()).unwrap();

        let result = submit_unregistered(&stack).unwrap();
        assert!(!result.success());
        assert_eq!(
            result.outcome,
            ExecutionOutcome::IdentityRejected { reason: VerificationReason::NotFound }
        );
        assert_eq!(result.trust_score, 0);
        assert!(result.reason().unwrap().contains("not found"));

        let entries = stack.audit.query(&QueryFilter::default()).unwrap();
        assert_eq!(entries.len(), 1, "only the verification attempt is recorded");
        assert_eq!(entries[0].entry_type, EntryType::IdentityVerification);
        assert_eq!(entries[0].decision["verified"], json!(false));
    }

    #[test]
    fn test_unknown_agent_is_not_auto_registered() {
        let dir = tempdir().unwrap();
        let stack = GovernanceStack::open(dir.path()).unwrap();
        submit_unregistered(&stack).unwrap();
        assert!(stack.identity.public_identity(AGENT_ID).is_none());

        let health = stack.governor.health_check(AGENT_ID);
        assert!(!health.healthy);
        assert_eq!(health.identity_status, None);
        assert!(!health.has_policy);
    }

    #[test]
    fn test_run_scenario_succeeds() {
        let dir = tempdir().unwrap();
        run_scenario(dir.path()).unwrap();
    }
}
