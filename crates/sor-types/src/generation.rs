//! Generation backend data shapes for Sor.
//!
//! These types model what crosses the boundary to the generation backend:
//! the attachment sent with a prompt, the incremental chunks of a text or
//! search stream, and backend errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::chat::Citation;

/// A file attached to a user submission (base64 payload + MIME type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub data: String,
    pub mime_type: String,
}

/// One increment of a streaming text or search response.
///
/// `delta` is appended to the accumulated content; `citations`, when
/// present, replace the previously-seen citation set for the in-flight
/// assistant message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextChunk {
    pub delta: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub citations: Option<Vec<Citation>>,
}

impl TextChunk {
    /// A plain text delta with no citations.
    pub fn text(delta: impl Into<String>) -> Self {
        Self {
            delta: delta.into(),
            citations: None,
        }
    }
}

/// Errors from generation backend operations.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("backend error: {message}")]
    Backend { message: String },

    #[error("stream error: {0}")]
    Stream(String),

    #[error("backend returned no usable result")]
    NoResult,
}
