//! Infrastructure layer for Sor.
//!
//! Contains implementations of the repository traits defined in `sor-core`:
//! SQLite storage for users, sessions, and the app-state flags.

pub mod sqlite;
