//! # warden-policy
//!
//! Per-agent, deny-by-default policy engine for the Warden runtime.
//!
//! Each agent has one policy document listing `allow`, `deny`, and
//! `escalate` rules. Escalation outranks deny, deny outranks allow, and an
//! action no rule mentions is denied.
//!
//! ## Policy document (YAML)
//!
//! ```yaml
//! agent: support-agent
//! permissions:
//!   allow: ["read:*", "respond:ticket"]
//!   deny: ["delete:*"]
//!   escalate:
//!     - action: refund_requests
//!       condition: "amount > 500"
//! ```

pub mod condition;
pub mod engine;
pub mod pattern;
pub mod rule;

pub use engine::{PolicyEngine, PolicySet};
pub use rule::{EscalateRule, PolicyDocument};

// ── Tests ─────────────────────────────────────────────────────────────────────
