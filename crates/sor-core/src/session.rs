//! In-memory session store: the ordered conversation collection plus the
//! active-session pointer.
//!
//! The store is the reactive view the presentation layer renders from.
//! `upsert` is the in-memory half of the reconciler: replace-in-place by id
//! (preserving display order) or insert at the front, last-writer-wins.
//! The durable half lives on the pipeline, which decides when a commit also
//! hits the session repository.

use sor_types::chat::ChatSession;
use uuid::Uuid;

/// Ordered, newest-first collection of sessions with an active pointer.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Vec<ChatSession>,
    active: Option<Uuid>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// All sessions in canonical display order (newest first).
    pub fn sessions(&self) -> &[ChatSession] {
        &self.sessions
    }

    /// Look up a session by id.
    pub fn get(&self, id: &Uuid) -> Option<&ChatSession> {
        self.sessions.iter().find(|s| s.id == *id)
    }

    /// Id of the active session, if one is selected.
    pub fn active_id(&self) -> Option<Uuid> {
        self.active
    }

    /// The active session, if one is selected and present.
    pub fn active(&self) -> Option<&ChatSession> {
        self.active.and_then(|id| self.get(&id))
    }

    /// Select a session as active.
    pub fn set_active(&mut self, id: Uuid) {
        self.active = Some(id);
    }

    /// Deselect the active session (a fresh conversation starts lazily on
    /// the next send).
    pub fn clear_active(&mut self) {
        self.active = None;
    }

    /// Replace the whole collection (login/logout swap). Clears the active
    /// pointer.
    pub fn replace_all(&mut self, sessions: Vec<ChatSession>) {
        self.sessions = sessions;
        self.active = None;
    }

    /// Fold a session into the collection: replace in place when the id is
    /// already present (keeping its position), otherwise insert at the
    /// front. Each call fully supersedes the stored copy -- no merge.
    pub fn upsert(&mut self, session: ChatSession) {
        match self.sessions.iter_mut().find(|s| s.id == session.id) {
            Some(slot) => *slot = session,
            None => self.sessions.insert(0, session),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sor_types::chat::{ChatMessage, ChatMode, SessionOwner};

    fn session(title: &str) -> ChatSession {
        ChatSession::new(SessionOwner::Guest, title.to_string(), ChatMode::Chat)
    }

    #[test]
    fn test_upsert_inserts_at_front() {
        let mut store = SessionStore::new();
        let first = session("first");
        let second = session("second");

        store.upsert(first.clone());
        store.upsert(second.clone());

        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.sessions()[0].id, second.id);
        assert_eq!(store.sessions()[1].id, first.id);
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut store = SessionStore::new();
        let a = session("a");
        let b = session("b");
        store.upsert(a.clone());
        store.upsert(b.clone());

        let mut updated_a = a.clone();
        updated_a.messages.push(ChatMessage::user("hello"));
        store.upsert(updated_a);

        // Position preserved, content superseded.
        assert_eq!(store.sessions().len(), 2);
        assert_eq!(store.sessions()[1].id, a.id);
        assert_eq!(store.sessions()[1].messages.len(), 1);
    }

    #[test]
    fn test_upsert_idempotent() {
        let mut store = SessionStore::new();
        let mut s = session("s");
        s.messages.push(ChatMessage::user("one"));

        store.upsert(s.clone());
        store.upsert(s.clone());

        assert_eq!(store.sessions().len(), 1);
        assert_eq!(store.sessions()[0].messages.len(), 1);
    }

    #[test]
    fn test_active_pointer() {
        let mut store = SessionStore::new();
        let s = session("s");
        store.upsert(s.clone());

        assert!(store.active().is_none());
        store.set_active(s.id);
        assert_eq!(store.active().unwrap().id, s.id);

        store.clear_active();
        assert!(store.active().is_none());
    }

    #[test]
    fn test_replace_all_clears_active() {
        let mut store = SessionStore::new();
        let s = session("s");
        store.upsert(s.clone());
        store.set_active(s.id);

        store.replace_all(vec![session("x"), session("y")]);
        assert_eq!(store.sessions().len(), 2);
        assert!(store.active_id().is_none());
    }
}
