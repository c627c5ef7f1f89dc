//! Business logic and repository trait definitions for Sor.
//!
//! This crate defines the "ports" (repository and backend traits) that the
//! infrastructure layer implements. It depends only on `sor-types` -- never
//! on `sor-infra` or any database/network crate.

pub mod generation;
pub mod identity;
pub mod pipeline;
pub mod quota;
pub mod repository;
pub mod session;
