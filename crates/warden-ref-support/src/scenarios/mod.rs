//! Customer-support demo scenarios.
//!
//! Each scenario wires a fresh governance stack over the audit directory it
//! is given, drives one enforcement pattern end to end, and prints what the
//! governor decided at every step.

pub mod audit_integrity;
pub mod flaky_task;
pub mod refund_review;
pub mod support_desk;
pub mod unregistered_agent;
