//! Scenario B: Refund Review
//!
//! The refund agent's policy escalates `refund` only when
//! `amount > 500`. Below the threshold the condition is false, evaluation
//! falls through to the allow rule, and the refund is processed. Above it
//! the request waits for a human, whose verdict is logged as an
//! `escalation_resolution` entry linked by escalation id.

use std::path::Path;

use chrono::{DateTime, Utc};

use warden_contracts::{
    audit::{EntryType, EscalationId, QueryFilter},
    error::GovernanceResult,
    execution::{ExecutionResult, Resolution},
    identity::IdentityMetadata,
};

use crate::{
    agent::GovernedAgent,
    mock_data::{process_refund, refund_request},
    stack::GovernanceStack,
};

pub const AGENT_ID: &str = "refund-agent";
pub const REVIEWER: &str = "supervisor-1";

pub fn refund_agent(stack: &GovernanceStack) -> GovernedAgent {
    GovernedAgent::new(
        AGENT_ID,
        IdentityMetadata::new("Refund Processor", "payments", "finance-ops"),
        stack,
    )
}

pub fn request_refund(agent: &GovernedAgent, order_id: &str, amount: f64) -> GovernanceResult<ExecutionResult> {
    agent.execute("refund", &refund_request(order_id, amount), Some(&process_refund))
}

/// Approve a pending refund on the reviewer's behalf.
pub fn approve(stack: &GovernanceStack, escalation_id: EscalationId) -> GovernanceResult<()> {
    stack.governor.resolve_escalation(
        escalation_id,
        Resolution::Approved,
        "purchase history verified, damage photos attached",
        REVIEWER,
    )
}

/// Run Scenario B against a fresh audit log in `audit_dir`.
pub fn run_scenario(audit_dir: &Path) -> GovernanceResult<()> {
    println!("=== Scenario B: Refund Review ===");
    println!();
    println!("  Policy: escalate `refund` when amount > 500, otherwise allow");
    println!();

    let stack = GovernanceStack::open(audit_dir)?;
    let agent = refund_agent(&stack);

    println!("  [1] refund $300 on ORD-5001");
    let small = request_refund(&agent, "ORD-5001", 300.0)?;
    match small.output() {
        Some(out) => println!("      PROCESSED  refund id = {}", out["refundId"]),
        None => println!("      unexpected: {}", small.reason().unwrap_or_default()),
    }
    println!();

    println!("  [2] refund $700 on ORD-5002");
    let large = request_refund(&agent, "ORD-5002", 700.0)?;
    let Some(escalation_id) = large.escalation_id() else {
        println!("      unexpected: {}", large.reason().unwrap_or_default());
        return Ok(());
    };
    println!("      ESCALATED  escalation id = {escalation_id}");
    println!("      refund processed: NO (awaiting review)");
    println!();

    println!("  [3] {REVIEWER} reviews the escalation");
    approve(&stack, escalation_id)?;
    let resolutions = stack
        .audit
        .query(&QueryFilter::default().of_type(EntryType::EscalationResolution))?;
    for entry in resolutions.iter().filter(|e| e.escalation_id() == Some(escalation_id)) {
        println!(
            "      RESOLVED  decision = {}, by = {}",
            entry.decision["decision"], entry.decision["resolvedBy"]
        );
    }
    println!();

    let report = stack.audit.generate_compliance_report(first_entry_time(&stack)?, Utc::now())?;
    println!(
        "  Decisions: {} total, {} allowed, {} denied, {} escalated",
        report.total_decisions, report.allowed, report.denied, report.escalations
    );
    println!();
    println!("  Scenario B complete.");
    println!();

    Ok(())
}

/// Timestamp of the first entry in the log, or now for an empty log.
fn first_entry_time(stack: &GovernanceStack) -> GovernanceResult<DateTime<Utc>> {
    Ok(stack
        .audit
        .query(&QueryFilter::default())?
        .first()
        .map(|e| e.timestamp)
        .unwrap_or_else(Utc::now))
}
