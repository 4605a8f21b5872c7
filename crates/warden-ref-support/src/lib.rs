//! # warden-ref-support
//!
//! Customer-support reference runtime for the Warden governance runtime.
//!
//! Demonstrates five scenarios using mock data:
//!
//! 1. **Support Desk**: allow, explicit deny, and escalation under one
//!    policy, with trust moving only when a task actually runs.
//! 2. **Refund Review**: conditional escalation on `amount > 500` and a
//!    human resolution linked back to the escalation.
//! 3. **Unregistered Agent**: an unknown id is refused at the identity gate
//!    before any policy is consulted.
//! 4. **Flaky Task**: repeated task failures decay trust 100 → 75.
//! 5. **Audit Integrity**: segment rotation, per-segment chain verification,
//!    a compliance report, and on-disk tamper detection.
//!
//! All data is hardcoded and fictional. No external systems are contacted.

pub mod agent;
pub mod mock_data;
pub mod scenarios;
pub mod stack;

pub use agent::GovernedAgent;
pub use stack::{support_policies, GovernanceStack};

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::tempdir;

    use warden_core::{traits::PolicyEvaluator, GovernanceConfig};

    use super::*;

    #[test]
    fn test_embedded_policies_parse() {
        let docs = support_policies().unwrap();
        let agents: Vec<&str> = docs.iter().map(|d| d.agent.as_str()).collect();
        assert_eq!(agents, vec!["support-agent", "refund-agent", "sync-agent"]);
    }

    /// A stack built from config reads policies from disk and restores
    /// identities saved by a previous run.
    #[test]
    fn test_stack_from_config() {
        let root = tempdir().unwrap();
        let policies = root.path().join("policies");
        fs::create_dir(&policies).unwrap();
        fs::write(
            policies.join("support-agent.yaml"),
            include_str!("../policies/support-agent.yaml"),
        )
        .unwrap();

        let config = GovernanceConfig::from_toml_str(&format!(
            "[audit]\ndirectory = {:?}\n\n[policy]\ndirectory = {:?}\n\n[identity]\nstore_directory = {:?}\n",
            root.path().join("audit"),
            policies,
            root.path().join("identities"),
        ))
        .unwrap();

        let stack = GovernanceStack::from_config(&config).unwrap();
        let agent = scenarios::support_desk::support_agent(&stack);
        let key = agent.identity().unwrap().public_key;
        assert!(stack.policy.has_policy("support-agent"));
        assert!(!stack.policy.has_policy("refund-agent"));
        stack.identity.persist().unwrap();
        drop(agent);
        drop(stack);

        let reopened = GovernanceStack::from_config(&config).unwrap();
        assert_eq!(reopened.identity.public_identity("support-agent").unwrap().public_key, key);
        let result = reopened
            .governor
            .execute("support-agent", "read:tickets", &json!({ "ticketId": "TCK-1001" }), None)
            .unwrap();
        assert!(result.success());
        assert!(reopened.audit.verify_current().unwrap().valid, "chain continues across restarts");
    }
}
