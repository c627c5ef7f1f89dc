//! SQLite session repository.
//!
//! Implements `SessionRepository` from `sor-core`. A session save is a
//! transactional full replace: the session row is upserted and its messages
//! are rewritten wholesale in positional order. This matches the core's
//! last-writer-wins reconciliation -- every commit fully supersedes the
//! stored copy.

use chrono::{DateTime, Utc};
use sor_core::repository::SessionRepository;
use sor_types::chat::{ChatMessage, ChatMode, ChatSession, MessageKind, MessageRole, SessionOwner};
use sor_types::error::RepositoryError;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `SessionRepository`.
pub struct SqliteSessionRepository {
    pool: DatabasePool,
}

impl SqliteSessionRepository {
    /// Create a new session repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    async fn messages_for(&self, session_id: &str) -> Result<Vec<ChatMessage>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT id, role, content, created_at, kind FROM messages
             WHERE session_id = ? ORDER BY idx",
        )
        .bind(session_id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut messages = Vec::with_capacity(rows.len());
        for row in &rows {
            let message_row =
                MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            messages.push(message_row.into_message()?);
        }

        Ok(messages)
    }
}

// ---------------------------------------------------------------------------
// Private Row types for SQLite-to-domain mapping
// ---------------------------------------------------------------------------

struct SessionRow {
    id: String,
    owner: String,
    title: String,
    mode: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            owner: row.try_get("owner")?,
            title: row.try_get("title")?,
            mode: row.try_get("mode")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_session(self, messages: Vec<ChatMessage>) -> Result<ChatSession, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid session id: {e}")))?;
        let owner: SessionOwner = self
            .owner
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid owner: {e}")))?;
        let mode: ChatMode = self
            .mode
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid mode: {e}")))?;
        let updated_at = parse_datetime(&self.updated_at)?;

        Ok(ChatSession {
            id,
            owner,
            title: self.title,
            messages,
            updated_at,
            mode,
        })
    }
}

struct MessageRow {
    id: String,
    role: String,
    content: String,
    created_at: String,
    kind: String,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            role: row.try_get("role")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            kind: row.try_get("kind")?,
        })
    }

    fn into_message(self) -> Result<ChatMessage, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let role: MessageRole = self
            .role
            .parse()
            .map_err(|e| RepositoryError::Query(format!("invalid role: {e}")))?;
        let kind: MessageKind = serde_json::from_str(&self.kind)
            .map_err(|e| RepositoryError::Query(format!("invalid message kind: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(ChatMessage {
            id,
            role,
            content: self.content,
            created_at,
            kind,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

// ---------------------------------------------------------------------------
// SessionRepository implementation
// ---------------------------------------------------------------------------

impl SessionRepository for SqliteSessionRepository {
    async fn sessions_for(
        &self,
        owner: &SessionOwner,
    ) -> Result<Vec<ChatSession>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT * FROM sessions WHERE owner = ? ORDER BY updated_at DESC",
        )
        .bind(owner.to_string())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut sessions = Vec::with_capacity(rows.len());
        for row in &rows {
            let session_row =
                SessionRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            let messages = self.messages_for(&session_row.id).await?;
            sessions.push(session_row.into_session(messages)?);
        }

        Ok(sessions)
    }

    async fn save_session(&self, session: &ChatSession) -> Result<(), RepositoryError> {
        let mut tx = self
            .pool
            .writer
            .begin()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query(
            r#"INSERT INTO sessions (id, owner, title, mode, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET
                   title = excluded.title,
                   updated_at = excluded.updated_at"#,
        )
        .bind(session.id.to_string())
        .bind(session.owner.to_string())
        .bind(&session.title)
        .bind(session.mode.to_string())
        .bind(format_datetime(&session.updated_at))
        .execute(&mut *tx)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        sqlx::query("DELETE FROM messages WHERE session_id = ?")
            .bind(session.id.to_string())
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for (idx, message) in session.messages.iter().enumerate() {
            let kind = serde_json::to_string(&message.kind)
                .map_err(|e| RepositoryError::Query(format!("failed to serialize kind: {e}")))?;

            sqlx::query(
                r#"INSERT INTO messages (id, session_id, idx, role, content, created_at, kind)
                   VALUES (?, ?, ?, ?, ?, ?, ?)"#,
            )
            .bind(message.id.to_string())
            .bind(session.id.to_string())
            .bind(idx as i64)
            .bind(message.role.to_string())
            .bind(&message.content)
            .bind(format_datetime(&message.created_at))
            .bind(&kind)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        debug!(session_id = %session.id, messages = session.messages.len(), "Session persisted");
        Ok(())
    }
}
