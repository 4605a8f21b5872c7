//! Policy decision types.
//!
//! The policy engine consumes `(agent_id, action, context)` and produces a
//! `Decision`. Warden is deny-by-default: any decision other than an explicit
//! allow blocks the caller's task.

use serde::{Deserialize, Serialize};

/// Reason given when no policy is loaded for the agent.
pub const REASON_NO_POLICY: &str = "no policy";
/// Reason given when a deny rule matched.
pub const REASON_EXPLICIT_DENY: &str = "explicitly denied";
/// Reason given when an allow rule matched.
pub const REASON_ALLOWED: &str = "allowed by rule";
/// Reason given when no rule in any stage matched.
pub const REASON_DEFAULT_DENY: &str = "default deny";
/// Reason given when an escalation rule matched.
pub const REASON_ESCALATION: &str = "requires human approval";

/// The escalation rule that fired, as it was declared in the policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MatchedRule {
    /// A bare action pattern, e.g. `"refund_requests"` or `"payments:*"`.
    Pattern(String),
    /// An action pattern gated on a context comparison.
    Conditional { action: String, condition: String },
}

impl std::fmt::Display for MatchedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchedRule::Pattern(p) => write!(f, "{p}"),
            MatchedRule::Conditional { action, condition } => {
                write!(f, "{action} when {condition}")
            }
        }
    }
}

/// The outcome of evaluating one action against one agent's policy.
///
/// `allowed` and `requires_escalation` are never both true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    pub allowed: bool,
    pub requires_escalation: bool,
    /// Human-readable explanation, always present.
    pub reason: String,
    /// Set only when an escalation rule fired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_rule: Option<MatchedRule>,
    /// The allow/deny pattern that produced this decision, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matched_rule: Option<String>,
}

impl Decision {
    pub fn no_policy() -> Self {
        Self::denied(REASON_NO_POLICY, None)
    }

    pub fn default_deny() -> Self {
        Self::denied(REASON_DEFAULT_DENY, None)
    }

    pub fn explicitly_denied(pattern: impl Into<String>) -> Self {
        Self::denied(REASON_EXPLICIT_DENY, Some(pattern.into()))
    }

    pub fn allowed_by(pattern: impl Into<String>) -> Self {
        Self {
            allowed: true,
            requires_escalation: false,
            reason: REASON_ALLOWED.to_string(),
            escalation_rule: None,
            matched_rule: Some(pattern.into()),
        }
    }

    pub fn escalate(rule: MatchedRule) -> Self {
        Self {
            allowed: false,
            requires_escalation: true,
            reason: REASON_ESCALATION.to_string(),
            escalation_rule: Some(rule),
            matched_rule: None,
        }
    }

    fn denied(reason: &str, matched_rule: Option<String>) -> Self {
        Self {
            allowed: false,
            requires_escalation: false,
            reason: reason.to_string(),
            escalation_rule: None,
            matched_rule,
        }
    }
}
