//! Scenario D: Flaky Task
//!
//! The CRM sync agent is allowed to run `sync:crm`, but the CRM is down.
//! Each failed run is audited and costs 5 trust points: five failures take
//! the agent from 100 to 75. The identity stays active, since revocation
//! happens only at zero.

use std::path::Path;

use serde_json::json;

use warden_contracts::{error::GovernanceResult, identity::IdentityMetadata};

use crate::{agent::GovernedAgent, mock_data::sync_crm_unreachable, stack::GovernanceStack};

pub const AGENT_ID: &str = "sync-agent";
pub const ATTEMPTS: usize = 5;

pub fn sync_agent(stack: &GovernanceStack) -> GovernedAgent {
    GovernedAgent::new(
        AGENT_ID,
        IdentityMetadata::new("CRM Sync", "integration", "platform-team"),
        stack,
    )
}

/// Run the failing sync `ATTEMPTS` times. Returns the trust score after each.
pub fn run_failing_syncs(agent: &GovernedAgent) -> GovernanceResult<Vec<u8>> {
    let context = json!({ "batch": "nightly", "records": 1200 });
    (0..ATTEMPTS)
        .map(|_| {
            agent
                .execute("sync:crm", &context, Some(&sync_crm_unreachable))
                .map(|result| result.trust_score)
        })
        .collect()
}

/// Run Scenario D against a fresh audit log in `audit_dir`.
pub fn run_scenario(audit_dir: &Path) -> GovernanceResult<()> {
    println!("=== Scenario D: Flaky Task ===");
    println!();

    let stack = GovernanceStack::open(audit_dir)?;
    let agent = sync_agent(&stack);

    println!("  Agent: {AGENT_ID}, starting trust {}", agent.trust_score().unwrap_or(0));
    for (attempt, trust) in run_failing_syncs(&agent)?.into_iter().enumerate() {
        println!("  [{}] sync:crm  FAILED  trust → {}", attempt + 1, trust);
    }

    let health = agent.health_check();
    println!();
    println!(
        "  Identity status: {}",
        health.identity_status.map(|s| s.to_string()).unwrap_or_else(|| "none".to_string())
    );
    println!("  Healthy:         {}", if health.healthy { "YES" } else { "NO" });
    println!();
    println!("  Scenario D complete.");
    println!();

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use warden_contracts::{
        audit::{EntryType, QueryFilter},
        identity::IdentityStatus,
    };

    use super::*;

    #[test]
    fn test_five_failures_cost_twenty_five_trust() {
        let dir = tempdir().unwrap();
        let stack = GovernanceStack::open(dir.path()).unwrap();
        let agent = sync_agent(&stack);

        let trail = run_failing_syncs(&agent).unwrap();
        assert_eq!(trail, vec![95, 90, 85, 80, 75]);
        assert_eq!(stack.identity.status(AGENT_ID), Some(IdentityStatus::Active));
        assert!(agent.health_check().healthy, "75 is still above the health threshold");
    }

    #[test]
    fn test_each_failure_is_audited_with_its_error() {
        let dir = tempdir().unwrap();
        let stack = GovernanceStack::open(dir.path()).unwrap();
        run_failing_syncs(&sync_agent(&stack)).unwrap();

        let actions = stack
            .audit
            .query(&QueryFilter::default().of_type(EntryType::AgentAction))
            .unwrap();
        assert_eq!(actions.len(), ATTEMPTS);
        for entry in &actions {
            assert_eq!(entry.decision["success"], json!(false));
            assert!(entry.decision["error"].as_str().unwrap().contains("timed out"));
        }
    }

    /// Below the verification gate (50) the agent is refused before its task
    /// runs, so trust stops falling at the first score under the gate.
    #[test]
    fn test_sustained_failure_stops_at_the_identity_gate() {
        let dir = tempdir().unwrap();
        let stack = GovernanceStack::open(dir.path()).unwrap();
        let agent = sync_agent(&stack);

        for _ in 0..4 {
            run_failing_syncs(&agent).unwrap();
        }
        assert_eq!(agent.trust_score(), Some(45));
        assert_eq!(stack.identity.status(AGENT_ID), Some(IdentityStatus::Active));

        let refused = agent.execute("sync:crm", &json!({}), Some(&sync_crm_unreachable)).unwrap();
        assert!(!refused.success());
        assert!(refused.reason().unwrap().contains("trust score too low"));
        assert_eq!(refused.trust_score, 45);
        assert!(!agent.health_check().healthy);
    }

    #[test]
    fn test_run_scenario_succeeds() {
        let dir = tempdir().unwrap();
        run_scenario(dir.path()).unwrap();
    }
}
