//! Scenario E: Audit Integrity
//!
//! Drives enough traffic through a deliberately small segment limit to force
//! several rotations, then:
//!
//!   1. verifies every segment's chain (each restarts from a null link)
//!   2. summarizes the window as a compliance report
//!   3. edits one archived entry on disk and shows verification pinpointing it

use std::fs;
use std::path::Path;

use chrono::Utc;
use serde_json::{json, Value};

use warden_contracts::{
    audit::ComplianceReport,
    error::{GovernanceError, GovernanceResult},
    identity::IdentityMetadata,
};

use crate::{
    agent::GovernedAgent,
    mock_data::{read_order, read_ticket},
    stack::{support_policies, GovernanceStack},
};

/// Small enough that a dozen actions span several segments.
pub const SEGMENT_LIMIT_BYTES: u64 = 4 * 1024;

const AGENT_ID: &str = "support-agent";

/// A stack whose audit log rotates every few kilobytes.
pub fn rotating_stack(audit_dir: &Path) -> GovernanceResult<GovernanceStack> {
    GovernanceStack::with_documents(audit_dir, SEGMENT_LIMIT_BYTES, support_policies()?)
}

/// Twelve mixed requests: eight reads, three deletes, and one refund.
pub fn generate_traffic(stack: &GovernanceStack) -> GovernanceResult<()> {
    let agent = GovernedAgent::new(
        AGENT_ID,
        IdentityMetadata::new("Support Desk Bot", "tier-1 support", "support-ops"),
        stack,
    );
    for i in 0..4 {
        agent.execute("read:tickets", &json!({ "ticketId": format!("TCK-100{}", i % 3 + 1) }), Some(&read_ticket))?;
        agent.execute("read:orders", &json!({ "orderId": "ORD-5001" }), Some(&read_order))?;
        if i < 3 {
            agent.execute("delete:tickets", &json!({ "ticketId": "TCK-1003" }), None)?;
        }
    }
    agent.execute("refund_requests", &json!({ "orderId": "ORD-5002", "amount": 749.0 }), None)?;
    Ok(())
}

/// Rewrite the `action` of the entry at `index` in `segment`, leaving its
/// stored hash untouched.
pub fn tamper_with_entry(audit_dir: &Path, segment: &str, index: usize) -> GovernanceResult<()> {
    let unavailable = |reason: String| GovernanceError::AuditUnavailable {
        segment: segment.to_string(),
        reason,
    };
    let path = audit_dir.join(segment);
    let contents = fs::read_to_string(&path).map_err(|e| unavailable(e.to_string()))?;

    let mut lines: Vec<String> = contents.lines().map(str::to_string).collect();
    let line = lines
        .get_mut(index)
        .ok_or_else(|| unavailable(format!("no entry at index {index}")))?;
    let mut entry: Value = serde_json::from_str(line).map_err(|e| unavailable(e.to_string()))?;
    entry["action"] = json!("read:nothing-to-see-here");
    *line = entry.to_string();

    fs::write(&path, lines.join("\n") + "\n").map_err(|e| unavailable(e.to_string()))
}

fn print_report(report: &ComplianceReport) {
    println!(
        "  Compliance report: {} decisions ({} allowed, {} denied, {} escalated)",
        report.total_decisions, report.allowed, report.denied, report.escalations
    );
    for (action, count) in &report.by_action {
        println!("      {action:<18} {count}");
    }
}

/// Run Scenario E against a fresh audit log in `audit_dir`.
pub fn run_scenario(audit_dir: &Path) -> GovernanceResult<()> {
    println!("=== Scenario E: Audit Integrity ===");
    println!();

    let start = Utc::now();
    let stack = rotating_stack(audit_dir)?;
    generate_traffic(&stack)?;
    let end = Utc::now();

    let segments = stack.audit.segments()?;
    println!("  Segment limit {SEGMENT_LIMIT_BYTES} bytes → {} segment(s)", segments.len());
    for result in stack.audit.verify_all()? {
        println!(
            "      {:<44} {} ({} entries)",
            result.segment,
            if result.valid { "VERIFIED" } else { "BROKEN" },
            result.entries_checked
        );
    }
    println!();

    print_report(&stack.audit.generate_compliance_report(start, end)?);
    println!();

    let Some(target) = segments.first() else {
        return Ok(());
    };
    println!("  Tampering with entry #1 of {target} ...");
    tamper_with_entry(audit_dir, target, 1)?;
    let result = stack.audit.verify_chain(target)?;
    println!(
        "      {}  at index {} ({})",
        if result.valid { "UNDETECTED" } else { "DETECTED" },
        result.broken_at_index.map(|i| i.to_string()).unwrap_or_else(|| "-".to_string()),
        result.error.unwrap_or_default()
    );
    println!();
    println!("  Scenario E complete.");
    println!();

    Ok(())
}
