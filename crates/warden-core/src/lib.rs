//! # warden-core
//!
//! The governed execution runtime for Warden agents.
//!
//! This crate provides:
//! - The gate traits (`IdentityVerifier`, `PolicyEvaluator`, `AuditSink`)
//!   and the untrusted `Task` the caller supplies
//! - The `Governor` that wires them together in the correct trust order
//! - `GovernanceConfig`, the TOML-backed runtime configuration
//!
//! ## Usage
//!
//! ```rust,ignore
//! use warden_core::{Governor, traits::{IdentityVerifier, PolicyEvaluator, AuditSink}};
//! ```

pub mod config;
pub mod governor;
pub mod traits;

pub use config::GovernanceConfig;
pub use governor::Governor;
