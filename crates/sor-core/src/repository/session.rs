//! SessionRepository trait definition.
//!
//! Durable storage for conversations. Writes are last-writer-wins per
//! session id: each save fully supersedes the stored copy.

use sor_types::chat::{ChatSession, SessionOwner};
use sor_types::error::RepositoryError;

/// Repository trait for session persistence.
///
/// Implementations live in sor-infra (e.g., `SqliteSessionRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait SessionRepository: Send + Sync {
    /// Sessions belonging to an owner, ordered by updated_at DESC.
    fn sessions_for(
        &self,
        owner: &SessionOwner,
    ) -> impl std::future::Future<Output = Result<Vec<ChatSession>, RepositoryError>> + Send;

    /// Persist a session, replacing any stored copy with the same id.
    fn save_session(
        &self,
        session: &ChatSession,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
