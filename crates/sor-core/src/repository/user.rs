//! UserRepository trait definition.
//!
//! Durable storage for registered users, the current-user marker, and the
//! one-time guest allowance flag (the only core-specific persisted state,
//! stored under a fixed key).

use sor_types::error::RepositoryError;
use sor_types::identity::User;

/// Repository trait for identity persistence.
///
/// Implementations live in sor-infra (e.g., `SqliteUserRepository`).
/// Uses native async fn in traits (RPITIT, Rust 2024 edition).
pub trait UserRepository: Send + Sync {
    /// The user recorded as currently signed in, if any.
    fn current_user(
        &self,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Re-validate a cached identity: look up a user by name and opaque
    /// credential, returning the fresh stored copy on a match.
    fn find_user(
        &self,
        username: &str,
        credential: Option<&str>,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Record (or clear) the current-user marker.
    fn set_current_user(
        &self,
        user: Option<&User>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Persist a user's latest state (balance, plan).
    fn save_user(
        &self,
        user: &User,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Whether the one-time guest allowance has been consumed on this
    /// device.
    fn guest_used(
        &self,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// Persist the guest-used flag. Idempotent.
    fn mark_guest_used(
        &self,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
