//! Chat session and message types for Sor.
//!
//! These types model a conversation between a user (or guest) and the
//! generation backend: sessions, messages, and grounding citations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use std::fmt;
use std::str::FromStr;

/// How a conversation was created and which generation path it uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatMode {
    Chat,
    Image,
    Search,
}

impl fmt::Display for ChatMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChatMode::Chat => write!(f, "chat"),
            ChatMode::Image => write!(f, "image"),
            ChatMode::Search => write!(f, "search"),
        }
    }
}

impl FromStr for ChatMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "chat" => Ok(ChatMode::Chat),
            "image" => Ok(ChatMode::Image),
            "search" => Ok(ChatMode::Search),
            other => Err(format!("invalid chat mode: '{other}'")),
        }
    }
}

impl Default for ChatMode {
    fn default() -> Self {
        ChatMode::Chat
    }
}

/// Owner of a chat session: a registered user or the anonymous guest.
///
/// Guest sessions live only in memory for the lifetime of the process;
/// they are never written to durable storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionOwner {
    Guest,
    User(Uuid),
}

impl fmt::Display for SessionOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOwner::Guest => write!(f, "guest"),
            SessionOwner::User(id) => write!(f, "{id}"),
        }
    }
}

impl FromStr for SessionOwner {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "guest" {
            return Ok(SessionOwner::Guest);
        }
        Uuid::parse_str(s)
            .map(SessionOwner::User)
            .map_err(|e| format!("invalid session owner '{s}': {e}"))
    }
}

/// Role of a message within a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
        }
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("invalid message role: '{other}'")),
        }
    }
}

/// A (uri, title) reference substantiating a grounded claim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub uri: String,
    pub title: String,
}

/// What a message carries besides its text content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary text.
    PlainText,

    /// A generated image, referenced by url.
    Image { url: String },

    /// Text backed by grounding citations (search mode, while streaming).
    Grounded { citations: Vec<Citation> },
}

/// A single message within a chat session.
///
/// User messages are immutable from creation. An assistant message being
/// streamed is superseded in place (same id) by successive fuller versions
/// until the stream ends, after which it is never mutated again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub kind: MessageKind,
}

impl ChatMessage {
    /// Create an immutable user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::now_v7(),
            role: MessageRole::User,
            content: content.into(),
            created_at: Utc::now(),
            kind: MessageKind::PlainText,
        }
    }

    /// Create an assistant message with an explicit id.
    ///
    /// Streaming turns reuse one id across partial versions, so the id is
    /// supplied by the caller rather than generated here.
    pub fn assistant(id: Uuid, content: impl Into<String>, kind: MessageKind) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            content: content.into(),
            created_at: Utc::now(),
            kind,
        }
    }
}

/// A conversation: an ordered list of messages with one owner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub owner: SessionOwner,
    pub title: String,
    pub messages: Vec<ChatMessage>,
    pub updated_at: DateTime<Utc>,
    pub mode: ChatMode,
}

impl ChatSession {
    /// Maximum length of a title derived from the first prompt.
    pub const TITLE_MAX_CHARS: usize = 30;

    /// Title used when the first submission has no usable text.
    pub const FALLBACK_TITLE: &'static str = "Guest conversation";

    /// Create an empty session.
    pub fn new(owner: SessionOwner, title: String, mode: ChatMode) -> Self {
        Self {
            id: Uuid::now_v7(),
            owner,
            title,
            messages: Vec::new(),
            updated_at: Utc::now(),
            mode,
        }
    }

    /// Derive a session title from the first prompt: the leading
    /// `TITLE_MAX_CHARS` characters, or the fallback title when empty.
    pub fn derive_title(prompt: &str) -> String {
        let title: String = prompt.chars().take(Self::TITLE_MAX_CHARS).collect();
        if title.is_empty() {
            Self::FALLBACK_TITLE.to_string()
        } else {
            title
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_mode_roundtrip() {
        for mode in [ChatMode::Chat, ChatMode::Image, ChatMode::Search] {
            let s = mode.to_string();
            let parsed: ChatMode = s.parse().unwrap();
            assert_eq!(mode, parsed);
        }
    }

    #[test]
    fn test_chat_mode_default() {
        assert_eq!(ChatMode::default(), ChatMode::Chat);
    }

    #[test]
    fn test_session_owner_roundtrip() {
        let guest: SessionOwner = "guest".parse().unwrap();
        assert_eq!(guest, SessionOwner::Guest);

        let id = Uuid::now_v7();
        let owner: SessionOwner = id.to_string().parse().unwrap();
        assert_eq!(owner, SessionOwner::User(id));
    }

    #[test]
    fn test_session_owner_rejects_garbage() {
        assert!("not-a-uuid".parse::<SessionOwner>().is_err());
    }

    #[test]
    fn test_message_role_roundtrip() {
        for role in [MessageRole::User, MessageRole::Assistant] {
            let s = role.to_string();
            let parsed: MessageRole = s.parse().unwrap();
            assert_eq!(role, parsed);
        }
    }

    #[test]
    fn test_message_kind_serde() {
        let kind = MessageKind::Grounded {
            citations: vec![Citation {
                uri: "https://example.com".to_string(),
                title: "Example".to_string(),
            }],
        };
        let json = serde_json::to_string(&kind).unwrap();
        assert!(json.contains("\"type\":\"grounded\""));
        let parsed: MessageKind = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, kind);
    }

    #[test]
    fn test_user_message_is_plain_text() {
        let msg = ChatMessage::user("hello");
        assert_eq!(msg.role, MessageRole::User);
        assert_eq!(msg.kind, MessageKind::PlainText);
        assert_eq!(msg.content, "hello");
    }

    #[test]
    fn test_assistant_message_keeps_supplied_id() {
        let id = Uuid::now_v7();
        let msg = ChatMessage::assistant(id, "partial", MessageKind::PlainText);
        assert_eq!(msg.id, id);
        assert_eq!(msg.role, MessageRole::Assistant);
    }

    #[test]
    fn test_derive_title_truncates() {
        let prompt = "a".repeat(100);
        let title = ChatSession::derive_title(&prompt);
        assert_eq!(title.chars().count(), ChatSession::TITLE_MAX_CHARS);
    }

    #[test]
    fn test_derive_title_char_boundary_safe() {
        // Multibyte characters must not be split.
        let prompt = "م".repeat(40);
        let title = ChatSession::derive_title(&prompt);
        assert_eq!(title.chars().count(), ChatSession::TITLE_MAX_CHARS);
    }

    #[test]
    fn test_derive_title_fallback() {
        assert_eq!(ChatSession::derive_title(""), ChatSession::FALLBACK_TITLE);
    }

    #[test]
    fn test_derive_title_short_prompt() {
        assert_eq!(ChatSession::derive_title("hello"), "hello");
    }

    #[test]
    fn test_session_serde_roundtrip() {
        let mut session = ChatSession::new(
            SessionOwner::Guest,
            "hello".to_string(),
            ChatMode::Search,
        );
        session.messages.push(ChatMessage::user("hello"));

        let json = serde_json::to_string(&session).unwrap();
        let parsed: ChatSession = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, session.id);
        assert_eq!(parsed.owner, SessionOwner::Guest);
        assert_eq!(parsed.mode, ChatMode::Search);
        assert_eq!(parsed.messages.len(), 1);
    }
}
