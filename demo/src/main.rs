//! Warden Customer-Support Reference Runtime: Demo CLI
//!
//! Runs the reference scenarios and a handful of operator commands against
//! an audit directory.
//!
//! Usage:
//!   cargo run -p demo -- run-all --audit-dir ./audit-logs
//!   cargo run -p demo -- refund-review
//!   cargo run -p demo -- verify-chain ./audit-logs/e-audit-integrity
//!   cargo run -p demo -- query ./audit-logs/a-support-desk --type escalation
//!   cargo run -p demo -- report ./audit-logs/b-refund-review --start 2026-01-01T00:00:00Z --end 2027-01-01T00:00:00Z
//!   cargo run -p demo -- health --config warden.toml support-agent

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tempfile::TempDir;
use tracing::info;
use tracing_subscriber::EnvFilter;

use warden_audit::AuditReader;
use warden_contracts::{
    audit::{EntryType, QueryFilter},
    error::{GovernanceError, GovernanceResult},
};
use warden_core::GovernanceConfig;
use warden_ref_support::{
    scenarios::{audit_integrity, flaky_task, refund_review, support_desk, unregistered_agent},
    GovernanceStack,
};

// ── CLI definition ────────────────────────────────────────────────────────────

/// Warden: identity, policy, and audit governance for agent actions.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "Warden customer-support reference runtime demo",
    long_about = "Runs Warden demo scenarios showing identity verification, policy\n\
                  enforcement, escalation, trust decay, and audit chain integrity,\n\
                  plus operator commands for inspecting an audit directory."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run all five scenarios in sequence.
    RunAll(ScenarioArgs),
    /// Scenario A: Support Desk (allow / deny / escalate).
    SupportDesk(ScenarioArgs),
    /// Scenario B: Refund Review (conditional escalation + human resolution).
    RefundReview(ScenarioArgs),
    /// Scenario C: Unregistered Agent (refused at the identity gate).
    UnregisteredAgent(ScenarioArgs),
    /// Scenario D: Flaky Task (trust decay on repeated failure).
    FlakyTask(ScenarioArgs),
    /// Scenario E: Audit Integrity (rotation, tamper detection, report).
    AuditIntegrity(ScenarioArgs),
    /// Verify the hash chain of every segment in an audit directory.
    VerifyChain {
        dir: PathBuf,
    },
    /// Print matching audit entries as JSON lines.
    Query {
        dir: PathBuf,
        #[arg(long)]
        agent: Option<String>,
        /// One of policy_decision, agent_action, escalation,
        /// escalation_resolution, identity_verification.
        #[arg(long = "type")]
        entry_type: Option<EntryType>,
        #[arg(long)]
        action: Option<String>,
    },
    /// Print a compliance report for an inclusive RFC 3339 time window.
    Report {
        dir: PathBuf,
        #[arg(long)]
        start: DateTime<Utc>,
        #[arg(long)]
        end: DateTime<Utc>,
    },
    /// Print an agent's health report using a governance config file.
    Health {
        #[arg(long)]
        config: PathBuf,
        agent: String,
    },
}

#[derive(clap::Args)]
struct ScenarioArgs {
    /// Keep the audit log here. Defaults to a temporary directory removed on exit.
    #[arg(long)]
    audit_dir: Option<PathBuf>,
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for the full decision trail.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::RunAll(args) => with_audit_dir(args, run_all),
        Command::SupportDesk(args) => with_banner(args, support_desk::run_scenario),
        Command::RefundReview(args) => with_banner(args, refund_review::run_scenario),
        Command::UnregisteredAgent(args) => with_banner(args, unregistered_agent::run_scenario),
        Command::FlakyTask(args) => with_banner(args, flaky_task::run_scenario),
        Command::AuditIntegrity(args) => with_banner(args, audit_integrity::run_scenario),
        Command::VerifyChain { dir } => verify_chain(&dir),
        Command::Query { dir, agent, entry_type, action } => query(&dir, agent, entry_type, action),
        Command::Report { dir, start, end } => report(&dir, start, end),
        Command::Health { config, agent } => health(&config, &agent),
    };

    if let Err(e) = result {
        eprintln!("Demo error: {}", e);
        std::process::exit(1);
    }
}

// ── Scenario dispatch ─────────────────────────────────────────────────────────

/// Resolve the audit directory, holding any temporary one until `run` returns.
fn with_audit_dir(
    args: ScenarioArgs,
    run: impl FnOnce(&Path) -> GovernanceResult<()>,
) -> GovernanceResult<()> {
    let (dir, _temp) = match args.audit_dir {
        Some(dir) => (dir, None),
        None => {
            let temp = TempDir::new().map_err(|e| GovernanceError::AuditWriteFailed {
                reason: format!("failed to create temporary audit directory: {e}"),
            })?;
            (temp.path().to_path_buf(), Some(temp))
        }
    };
    run(&dir)
}

fn with_banner(
    args: ScenarioArgs,
    scenario: impl FnOnce(&Path) -> GovernanceResult<()>,
) -> GovernanceResult<()> {
    print_banner();
    with_audit_dir(args, |dir| {
        scenario(dir)?;
        println!("Scenario completed successfully. Audit log: {}", dir.display());
        Ok(())
    })
}

fn run_all(dir: &Path) -> GovernanceResult<()> {
    info!(dir = %dir.display(), "running all scenarios");
    print_banner();
    support_desk::run_scenario(&dir.join("a-support-desk"))?;
    refund_review::run_scenario(&dir.join("b-refund-review"))?;
    unregistered_agent::run_scenario(&dir.join("c-unregistered-agent"))?;
    flaky_task::run_scenario(&dir.join("d-flaky-task"))?;
    audit_integrity::run_scenario(&dir.join("e-audit-integrity"))?;
    println!("All scenarios completed successfully. Audit logs: {}", dir.display());
    Ok(())
}

// ── Operator commands ─────────────────────────────────────────────────────────

/// Open an audit directory read-only. Nothing is created and a corrupt
/// chain head does not stop inspection.
fn open_log(dir: &Path) -> GovernanceResult<AuditReader> {
    AuditReader::open(dir)
}

fn verify_chain(dir: &Path) -> GovernanceResult<()> {
    let log = open_log(dir)?;
    let results = log.verify_all()?;
    let mut intact = true;
    for result in &results {
        intact &= result.valid;
        match (&result.error, result.broken_at_index) {
            (Some(error), Some(index)) => {
                println!("{:<44} BROKEN at index {index}: {error}", result.segment)
            }
            _ => println!("{:<44} VERIFIED ({} entries)", result.segment, result.entries_checked),
        }
    }
    println!();
    println!("{} segment(s), chain {}", results.len(), if intact { "intact" } else { "BROKEN" });
    if intact {
        Ok(())
    } else {
        Err(GovernanceError::AuditUnavailable {
            segment: dir.display().to_string(),
            reason: "hash chain verification failed".to_string(),
        })
    }
}

fn query(
    dir: &Path,
    agent: Option<String>,
    entry_type: Option<EntryType>,
    action: Option<String>,
) -> GovernanceResult<()> {
    let filter = QueryFilter { agent_id: agent, entry_type, action, ..QueryFilter::default() };
    for entry in open_log(dir)?.query(&filter)? {
        println!("{}", to_json(&entry, false)?);
    }
    Ok(())
}

fn report(dir: &Path, start: DateTime<Utc>, end: DateTime<Utc>) -> GovernanceResult<()> {
    let report = open_log(dir)?.generate_compliance_report(start, end)?;
    println!("{}", to_json(&report, true)?);
    Ok(())
}

fn health(config: &Path, agent: &str) -> GovernanceResult<()> {
    let config = GovernanceConfig::from_file(config)?;
    let stack = GovernanceStack::from_config(&config)?;
    println!("{}", to_json(&stack.governor.health_check(agent), true)?);
    Ok(())
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> GovernanceResult<String> {
    let encoded = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    };
    encoded.map_err(|e| GovernanceError::ConfigError { reason: format!("failed to encode output: {e}") })
}

// ── Banner ────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("Warden: Governance for Agent Actions");
    println!("Customer-Support Reference Demo");
    println!("====================================");
    println!();
    println!("Warden pipeline per action:");
    println!("  [1] Identity registry verifies the agent (known, not revoked, trust ≥ 50)");
    println!("  [2] Policy engine decides: escalate > deny > allow > default deny");
    println!("  [3] The task runs ONLY after steps 1 & 2 pass");
    println!("  [4] Outcome written to the SHA-256 hash-chained audit log");
    println!("  [5] Trust adjusted: +1 on success, -5 on failure");
    println!();
}
