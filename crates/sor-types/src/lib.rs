//! Shared domain types for Sor.
//!
//! This crate contains the core domain types used across the Sor client:
//! User, ChatSession, ChatMessage, generation chunks, and their associated
//! error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod chat;
pub mod error;
pub mod generation;
pub mod identity;
