//! Runtime error types for the Warden governance pipeline.
//!
//! All fallible operations in the Warden crates return `GovernanceResult<T>`.
//! Fail-secure decisions (no policy, low trust, revoked identity, denied
//! action) are NOT errors: they are ordinary values returned by the
//! evaluators. Errors are reserved for configuration problems, contract
//! violations, and storage failures.

use thiserror::Error;

/// The unified error type for the Warden runtime.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// A policy document, condition, config file, or identity store is
    /// missing or malformed. Fatal at load time for the affected agent.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// `create_identity` was called for an agent that already has one.
    #[error("identity already exists for agent '{agent_id}'")]
    IdentityExists { agent_id: String },

    /// An explicit identity operation referenced an unknown agent.
    #[error("no identity registered for agent '{agent_id}'")]
    IdentityNotFound { agent_id: String },

    /// Key generation, encoding, decoding, or signing failed.
    #[error("cryptographic operation failed: {reason}")]
    CryptoError { reason: String },

    /// The audit log could not persist an entry.
    ///
    /// Treated as fatal: an action that cannot be audited cannot proceed.
    #[error("audit write failed: {reason}")]
    AuditWriteFailed { reason: String },

    /// A segment (or the log directory itself) is missing or unreadable at
    /// verify/query time.
    #[error("audit segment '{segment}' unavailable: {reason}")]
    AuditUnavailable { segment: String, reason: String },
}

/// Convenience alias used throughout the Warden crates.
pub type GovernanceResult<T> = Result<T, GovernanceError>;
