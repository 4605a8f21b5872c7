//! # warden-contracts
//!
//! Shared types, audit entry shapes, and error contracts for the Warden
//! governance runtime.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate, only data definitions, constructors, and error types.

pub mod audit;
pub mod error;
pub mod execution;
pub mod identity;
pub mod policy;
