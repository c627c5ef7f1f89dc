//! SQLite storage layer.
//!
//! Repository implementations backed by SQLite with WAL mode and split
//! read/write connection pools.

pub mod pool;
pub mod session;
pub mod user;

pub use pool::DatabasePool;
pub use session::SqliteSessionRepository;
pub use user::SqliteUserRepository;
