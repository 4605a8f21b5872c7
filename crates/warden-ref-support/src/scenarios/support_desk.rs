//! Scenario A: Support Desk
//!
//! A tier-1 support agent works through three requests under one policy:
//!
//!   1. `read:tickets` → allowed, the lookup runs, trust +1
//!   2. `delete:tickets` → explicitly denied, nothing runs, trust unchanged
//!   3. `refund_requests` ($600) → escalated to a human reviewer
//!
//! The card number in the refund context is redacted before it reaches disk.

use std::path::Path;

use serde_json::json;

use warden_contracts::{
    audit::{EntryType, QueryFilter},
    error::GovernanceResult,
    execution::ExecutionResult,
    identity::IdentityMetadata,
};

use crate::{
    agent::GovernedAgent,
    mock_data::{read_ticket, refund_request},
    stack::GovernanceStack,
};

pub const AGENT_ID: &str = "support-agent";

pub fn support_agent(stack: &GovernanceStack) -> GovernedAgent {
    GovernedAgent::new(
        AGENT_ID,
        IdentityMetadata::new("Support Desk Bot", "tier-1 support", "support-ops").with_tags(["tier-1", "email"]),
        stack,
    )
}

/// The three requests, in order.
pub fn run_requests(agent: &GovernedAgent) -> GovernanceResult<[ExecutionResult; 3]> {
    let read = agent.execute("read:tickets", &json!({ "ticketId": "TCK-1001" }), Some(&read_ticket))?;
    let delete = agent.execute("delete:tickets", &json!({ "ticketId": "TCK-1003" }), Some(&read_ticket))?;
    let refund = agent.execute("refund_requests", &refund_request("ORD-5002", 600.0), None)?;
    Ok([read, delete, refund])
}

/// Run Scenario A against a fresh audit log in `audit_dir`.
pub fn run_scenario(audit_dir: &Path) -> GovernanceResult<()> {
    println!("=== Scenario A: Support Desk ===");
    println!();

    let stack = GovernanceStack::open(audit_dir)?;
    let agent = support_agent(&stack);

    if let Some(identity) = agent.identity() {
        println!("  Agent:       {} ({})", identity.agent_id, identity.metadata.role);
        println!("  Public key:  {}", identity.public_key);
        println!("  Trust score: {}", identity.trust_score);
        println!();
    }

    let [read, delete, refund] = run_requests(&agent)?;

    println!("  [1] read:tickets (TCK-1001)");
    match read.output() {
        Some(ticket) => println!("      ALLOWED  subject = {}", ticket["subject"]),
        None => println!("      unexpected: {}", read.reason().unwrap_or_default()),
    }
    println!("      trust after: {}", read.trust_score);
    println!();

    println!("  [2] delete:tickets (TCK-1003)");
    println!(
        "      {}  reason = {}",
        if delete.policy_denied() { "DENIED " } else { "UNEXPECTED" },
        delete.reason().unwrap_or_default()
    );
    println!("      task ran: NO, trust after: {}", delete.trust_score);
    println!();

    println!("  [3] refund_requests ($600)");
    match refund.escalation_id() {
        Some(id) => println!("      ESCALATED  escalation id = {id}"),
        None => println!("      unexpected: {}", refund.reason().unwrap_or_default()),
    }
    let escalations = stack.audit.query(&QueryFilter::default().of_type(EntryType::Escalation))?;
    if let Some(entry) = escalations.last() {
        println!("      assigned to:  {}", entry.decision["assignedTo"]);
        println!("      card on disk: {}", entry.context["payment"]["creditCard"]);
    }
    println!();

    let chain = stack.audit.verify_current()?;
    println!(
        "  Audit chain integrity: {} ({} entries)",
        if chain.valid { "VERIFIED" } else { "BROKEN" },
        chain.entries_checked
    );
    println!();
    println!("  Scenario A complete.");
    println!();

    Ok(())
}
