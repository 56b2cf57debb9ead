//! Shared domain types for Relayguard.
//!
//! This crate contains the domain types used across the Relayguard system:
//! connection ownership records, inbound events, routing decisions, and their
//! associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod routing;
