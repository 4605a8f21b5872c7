//! # warden-audit
//!
//! Append-only, SHA-256 hash-chained audit log for the Warden runtime.
//!
//! ## Overview
//!
//! Every governance event is written as one JSON line in the active segment
//! and linked to the previous entry via its hash. Modifying any hashed field
//! of any entry breaks the chain and is located by `verify_chain`.
//!
//! Segments rotate once they pass a size threshold; each segment carries its
//! own chain, starting from a `null` previous hash.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_audit::{AuditLog, AuditReader};
//! use warden_contracts::audit::{PendingEntry, EntryType, QueryFilter};
//!
//! let log = AuditLog::open("audit-logs", 100 * 1024 * 1024)?;
//! log.append(PendingEntry::new(EntryType::AgentAction, "agent-1", "read:orders"))?;
//!
//! assert!(log.verify_current()?.valid);
//! let mine = log.query(&QueryFilter::default().agent("agent-1"))?;
//!
//! // Inspection without a writer: nothing is created, the head is not needed.
//! let reader = AuditReader::open("audit-logs")?;
//! let results = reader.verify_all()?;
//! ```

pub mod chain;
pub mod log;
pub mod reader;
pub mod report;
pub mod sanitize;
pub mod segment;

pub use chain::{hash_entry, verify_lines};
pub use log::AuditLog;
pub use reader::AuditReader;
pub use sanitize::{sanitize, REDACTED};
pub use segment::CURRENT_SEGMENT;

// ── Tests ─────────────────────────────────────────────────────────────────────
