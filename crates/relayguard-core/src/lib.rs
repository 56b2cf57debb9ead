//! Routing decision core for Relayguard.
//!
//! This crate defines the "ports" (repository and collaborator traits) that
//! the infrastructure layer implements, plus the decision logic itself: the
//! ownership service, the loop detector, and the message router that
//! composes them. It depends only on `relayguard-types` and pure crates --
//! never on `relayguard-infra` or any database/IO crate.

pub mod detector;
pub mod generator;
pub mod outbound;
pub mod repository;
pub mod router;
pub mod service;
pub mod signature;
