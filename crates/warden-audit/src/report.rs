//! Compliance reporting: a pure aggregation over `query` results.

use chrono::{DateTime, Utc};

use warden_contracts::{
    audit::{AuditEntry, ComplianceReport, EntryType, QueryFilter},
    error::GovernanceResult,
};

use crate::{log::AuditLog, reader::AuditReader};

impl AuditLog {
    /// Summarize policy decisions and escalations in `[start, end]`.
    pub fn generate_compliance_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GovernanceResult<ComplianceReport> {
        let entries = self.query(&QueryFilter::default().between(start, end))?;
        Ok(summarize(start, end, &entries))
    }
}

impl AuditReader {
    /// Summarize policy decisions and escalations in `[start, end]`.
    pub fn generate_compliance_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> GovernanceResult<ComplianceReport> {
        let entries = self.query(&QueryFilter::default().between(start, end))?;
        Ok(summarize(start, end, &entries))
    }
}

/// Build a report from already-filtered entries.
///
/// A policy decision counts as an escalation when it required one, as
/// allowed when it allowed the action, and as denied otherwise.
pub fn summarize(start: DateTime<Utc>, end: DateTime<Utc>, entries: &[AuditEntry]) -> ComplianceReport {
    let mut report = ComplianceReport {
        start,
        end,
        total_decisions: 0,
        allowed: 0,
        denied: 0,
        escalations: 0,
        by_agent: Default::default(),
        by_action: Default::default(),
        escalation_events: Vec::new(),
    };

    for entry in entries {
        match entry.entry_type {
            EntryType::PolicyDecision => {
                report.total_decisions += 1;
                *report.by_action.entry(entry.action.clone()).or_default() += 1;
                let agent = report.by_agent.entry(entry.agent_id.clone()).or_default();
                agent.total += 1;

                if entry.requires_escalation() == Some(true) {
                    report.escalations += 1;
                    agent.escalations += 1;
                } else if entry.allowed() == Some(true) {
                    report.allowed += 1;
                    agent.allowed += 1;
                } else {
                    report.denied += 1;
                    agent.denied += 1;
                }
            }
            EntryType::Escalation => report.escalation_events.push(entry.clone()),
            _ => {}
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::{json, Value};

    use warden_contracts::audit::{AuditEntry, EntryType};

    use super::summarize;

    fn entry(entry_type: EntryType, agent: &str, action: &str, decision: Value) -> AuditEntry {
        AuditEntry {
            entry_type,
            timestamp: Utc::now(),
            agent_id: agent.into(),
            action: action.into(),
            context: Value::Null,
            decision,
            previous_hash: None,
            hash: String::new(),
        }
    }

    #[test]
    fn counts_partition_total_decisions() {
        let entries = vec![
            entry(EntryType::PolicyDecision, "a", "read", json!({ "allowed": true, "requiresEscalation": false })),
            entry(EntryType::PolicyDecision, "a", "delete", json!({ "allowed": false, "requiresEscalation": false })),
            entry(EntryType::PolicyDecision, "b", "refund", json!({ "allowed": false, "requiresEscalation": true })),
            entry(EntryType::Escalation, "b", "refund", json!({ "status": "pending" })),
            entry(EntryType::AgentAction, "a", "read", json!({ "success": true })),
        ];
        let now = Utc::now();

        let report = summarize(now, now, &entries);

        assert_eq!(report.total_decisions, 3);
        assert_eq!(report.allowed, 1);
        assert_eq!(report.denied, 1);
        assert_eq!(report.escalations, 1);
        assert_eq!(report.allowed + report.denied + report.escalations, report.total_decisions);

        assert_eq!(report.by_agent["a"].total, 2);
        assert_eq!(report.by_agent["a"].denied, 1);
        assert_eq!(report.by_agent["b"].escalations, 1);
        assert_eq!(report.by_action["refund"], 1);
        assert!(!report.by_action.contains_key("nothing"));

        assert_eq!(report.escalation_events.len(), 1);
        assert_eq!(report.escalation_events[0].agent_id, "b");
    }

    #[test]
    fn empty_window_is_all_zero() {
        let now = Utc::now();
        let report = summarize(now, now, &[]);
        assert_eq!(report.total_decisions, 0);
        assert!(report.by_agent.is_empty());
        assert!(report.escalation_events.is_empty());
    }
}
