//! SQLite user repository.
//!
//! Implements `UserRepository` from `sor-core` using sqlx with split
//! read/write pools. The current-user marker and the guest-used flag are
//! single rows in `app_state`, keyed by fixed names.

use sor_core::repository::UserRepository;
use sor_types::error::RepositoryError;
use sor_types::identity::{Plan, User};
use sqlx::Row;
use uuid::Uuid;

use super::pool::DatabasePool;

/// `app_state` key holding the id of the signed-in user.
const CURRENT_USER_KEY: &str = "sor_current_user";

/// `app_state` key holding the one-time guest allowance flag.
const GUEST_USED_KEY: &str = "sor_guest_used";

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new user repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn get_state(&self, key: &str) -> Result<Option<String>, RepositoryError> {
        let row = sqlx::query("SELECT value FROM app_state WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let value: String = row
                    .try_get("value")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    async fn set_state(&self, key: &str, value: &str) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO app_state (key, value) VALUES (?, ?)
               ON CONFLICT (key) DO UPDATE SET value = excluded.value"#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn clear_state(&self, key: &str) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM app_state WHERE key = ?")
            .bind(key)
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let user_row =
                    UserRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(user_row.into_user()?))
            }
            None => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct UserRow {
    id: String,
    username: String,
    credential: Option<String>,
    points: i64,
    is_pro: i64,
    plan: String,
    avatar: Option<String>,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            credential: row.try_get("credential")?,
            points: row.try_get("points")?,
            is_pro: row.try_get("is_pro")?,
            plan: row.try_get("plan")?,
            avatar: row.try_get("avatar")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid user id: {e}")))?;
        let plan: Plan = self
            .plan
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid plan: {e}")))?;

        Ok(User {
            id,
            username: self.username,
            credential: self.credential,
            points: u32::try_from(self.points.max(0)).unwrap_or(u32::MAX),
            is_pro: self.is_pro != 0,
            plan,
            avatar: self.avatar,
        })
    }
}

// ---------------------------------------------------------------------------
// UserRepository implementation
// ---------------------------------------------------------------------------

impl UserRepository for SqliteUserRepository {
    async fn current_user(&self) -> Result<Option<User>, RepositoryError> {
        match self.get_state(CURRENT_USER_KEY).await? {
            Some(id) => self.get_user_by_id(&id).await,
            None => Ok(None),
        }
    }

    async fn find_user(
        &self,
        username: &str,
        credential: Option<&str>,
    ) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let user = UserRow::from_row(&row)
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .into_user()?;

        // The opaque credential must match the stored one exactly.
        if user.credential.as_deref() == credential {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }

    async fn set_current_user(&self, user: Option<&User>) -> Result<(), RepositoryError> {
        match user {
            Some(user) => {
                self.save_user(user).await?;
                self.set_state(CURRENT_USER_KEY, &user.id.to_string()).await
            }
            None => self.clear_state(CURRENT_USER_KEY).await,
        }
    }

    async fn save_user(&self, user: &User) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO users (id, username, credential, points, is_pro, plan, avatar)
               VALUES (?, ?, ?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   username = excluded.username,
                   credential = excluded.credential,
                   points = excluded.points,
                   is_pro = excluded.is_pro,
                   plan = excluded.plan,
                   avatar = excluded.avatar"#,
        )
        .bind(user.id.to_string())
        .bind(&user.username)
        .bind(&user.credential)
        .bind(i64::from(user.points))
        .bind(i64::from(user.is_pro))
        .bind(user.plan.to_string())
        .bind(&user.avatar)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn guest_used(&self) -> Result<bool, RepositoryError> {
        Ok(self.get_state(GUEST_USED_KEY).await?.as_deref() == Some("true"))
    }

    async fn mark_guest_used(&self) -> Result<(), RepositoryError> {
        self.set_state(GUEST_USED_KEY, "true").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite::pool::DatabasePool;

    async fn test_pool() -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    fn sample_user() -> User {
        let mut user = User::new("amira".to_string(), Some("secret".to_string()), 50);
        user.plan = Plan::Advanced;
        user
    }

    #[tokio::test]
    async fn test_save_and_find_user() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let user = sample_user();
        repo.save_user(&user).await.unwrap();

        let found = repo.find_user("amira", Some("secret")).await.unwrap().unwrap();
        assert_eq!(found.id, user.id);
        assert_eq!(found.points, 50);
        assert_eq!(found.plan, Plan::Advanced);
    }

    #[tokio::test]
    async fn test_find_user_wrong_credential_returns_none() {
        let repo = SqliteUserRepository::new(test_pool().await);
        repo.save_user(&sample_user()).await.unwrap();

        assert!(repo.find_user("amira", Some("wrong")).await.unwrap().is_none());
        assert!(repo.find_user("amira", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_find_unknown_user_returns_none() {
        let repo = SqliteUserRepository::new(test_pool().await);
        assert!(repo.find_user("nobody", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_user_upserts() {
        let repo = SqliteUserRepository::new(test_pool().await);
        let mut user = sample_user();
        repo.save_user(&user).await.unwrap();

        user.points = 40;
        user.plan = Plan::Unlimited;
        repo.save_user(&user).await.unwrap();

        let found = repo.find_user("amira", Some("secret")).await.unwrap().unwrap();
        assert_eq!(found.points, 40);
        assert_eq!(found.plan, Plan::Unlimited);
    }

    #[tokio::test]
    async fn test_current_user_marker_lifecycle() {
        let repo = SqliteUserRepository::new(test_pool().await);
        assert!(repo.current_user().await.unwrap().is_none());

        let user = sample_user();
        repo.set_current_user(Some(&user)).await.unwrap();
        let current = repo.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, user.id);

        repo.set_current_user(None).await.unwrap();
        assert!(repo.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_guest_flag_starts_unset() {
        let repo = SqliteUserRepository::new(test_pool().await);
        assert!(!repo.guest_used().await.unwrap());
    }

    #[tokio::test]
    async fn test_mark_guest_used_idempotent() {
        let repo = SqliteUserRepository::new(test_pool().await);

        repo.mark_guest_used().await.unwrap();
        assert!(repo.guest_used().await.unwrap());

        repo.mark_guest_used().await.unwrap();
        assert!(repo.guest_used().await.unwrap());
    }
}
