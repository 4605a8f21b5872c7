//! Policy document schema and its compiled, evaluation-ready form.
//!
//! One document governs one agent. Documents may be YAML, JSON, or TOML;
//! the three encodings share one schema:
//!
//! ```yaml
//! agent: support-agent
//! description: Tier-1 customer support
//! permissions:
//!   allow: ["read:*", "respond:ticket"]
//!   deny: ["delete:*"]
//!   escalate:
//!     - "export:customer_data"
//!     - action: refund_requests
//!       condition: "amount > 500"
//! ```
//!
//! Within each list, rules are tested in declaration order.

use std::path::Path;

use serde::{Deserialize, Serialize};

use warden_contracts::{
    error::{GovernanceError, GovernanceResult},
    policy::MatchedRule,
};

use crate::condition::Condition;

/// An escalation rule as written in a document.
///
/// A bare string is a pattern. A mapping pairs a pattern with a condition
/// that must also hold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EscalateRule {
    Pattern(String),
    Conditional {
        #[serde(alias = "actionPattern")]
        action: String,
        condition: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    #[serde(default)]
    pub allow: Vec<String>,
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default)]
    pub escalate: Vec<EscalateRule>,
}

/// A policy document for a single agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub agent: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Permissions,
}

impl PolicyDocument {
    pub fn from_yaml_str(s: &str) -> GovernanceResult<Self> {
        serde_yaml::from_str(s).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to parse policy YAML: {e}"),
        })
    }

    pub fn from_json_str(s: &str) -> GovernanceResult<Self> {
        serde_json::from_str(s).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to parse policy JSON: {e}"),
        })
    }

    pub fn from_toml_str(s: &str) -> GovernanceResult<Self> {
        toml::from_str(s).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to parse policy TOML: {e}"),
        })
    }

    /// Read a document, choosing the format from the file extension
    /// (`.yaml`/`.yml`, `.json`, or `.toml`).
    pub fn from_file(path: &Path) -> GovernanceResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GovernanceError::ConfigError {
            reason: format!("failed to read policy file '{}': {}", path.display(), e),
        })?;
        let parsed = match extension(path) {
            Some("yaml" | "yml") => Self::from_yaml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            Some("toml") => Self::from_toml_str(&contents),
            _ => {
                return Err(GovernanceError::ConfigError {
                    reason: format!("unsupported policy file type '{}'", path.display()),
                })
            }
        };
        parsed.map_err(|e| match e {
            GovernanceError::ConfigError { reason } => GovernanceError::ConfigError {
                reason: format!("{}: {}", path.display(), reason),
            },
            other => other,
        })
    }
}

/// Lowercased extension when it is one of the supported document formats.
pub(crate) fn extension(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ["yaml", "yml", "json", "toml"].into_iter().find(|known| *known == ext)
}

// ── Compiled form ─────────────────────────────────────────────────────────────

/// An escalation rule with its condition already parsed.
#[derive(Debug, Clone)]
pub struct CompiledEscalation {
    pub pattern: String,
    pub condition: Option<Condition>,
    /// The rule as reported on escalation decisions.
    pub rule: MatchedRule,
}

/// Evaluation-ready rules for one agent.
#[derive(Debug, Clone)]
pub struct AgentPolicy {
    pub agent: String,
    pub description: Option<String>,
    pub allow: Vec<String>,
    pub deny: Vec<String>,
    pub escalate: Vec<CompiledEscalation>,
}

impl AgentPolicy {
    /// Compile a document, parsing every condition.
    ///
    /// Returns `GovernanceError::ConfigError` naming the agent when any
    /// condition is malformed or the agent id is blank.
    pub fn compile(document: PolicyDocument) -> GovernanceResult<Self> {
        if document.agent.trim().is_empty() {
            return Err(GovernanceError::ConfigError {
                reason: "policy document has an empty agent id".to_string(),
            });
        }

        let escalate = document
            .permissions
            .escalate
            .into_iter()
            .map(|rule| match rule {
                EscalateRule::Pattern(pattern) => Ok(CompiledEscalation {
                    rule: MatchedRule::Pattern(pattern.clone()),
                    pattern,
                    condition: None,
                }),
                EscalateRule::Conditional { action, condition } => {
                    let parsed = Condition::parse(&condition).map_err(|e| GovernanceError::ConfigError {
                        reason: format!("policy for agent '{}': {}", document.agent, e),
                    })?;
                    Ok(CompiledEscalation {
                        rule: MatchedRule::Conditional { action: action.clone(), condition },
                        pattern: action,
                        condition: Some(parsed),
                    })
                }
            })
            .collect::<GovernanceResult<Vec<_>>>()?;

        Ok(Self {
            agent: document.agent,
            description: document.description,
            allow: document.permissions.allow,
            deny: document.permissions.deny,
            escalate,
        })
    }
}
