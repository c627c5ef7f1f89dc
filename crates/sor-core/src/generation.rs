//! GenerationBackend trait definition.
//!
//! The boundary to the generative backend. `generate_image` uses RPITIT;
//! `stream_text` returns a boxed stream because the incremental producer
//! is consumed across suspension points by the pipeline.

use std::pin::Pin;

use futures_util::Stream;

use sor_types::chat::ChatMessage;
use sor_types::generation::{Attachment, GenerationError, TextChunk};

/// Trait for the generative response backend.
///
/// Both operations are opaque network calls with their own timeout
/// semantics; this core imposes none of its own.
pub trait GenerationBackend: Send + Sync {
    /// Open an incremental text/search response.
    ///
    /// The returned stream is finite and not restartable: it terminates
    /// when the backend completes or errors. `grounding` enables search
    /// citations on the increments.
    fn stream_text(
        &self,
        history: &[ChatMessage],
        prompt: &str,
        grounding: bool,
        attachment: Option<&Attachment>,
    ) -> Pin<Box<dyn Stream<Item = Result<TextChunk, GenerationError>> + Send + 'static>>;

    /// Generate an image for a prompt; resolves to the image reference
    /// (url) in a single request/response.
    fn generate_image(
        &self,
        prompt: &str,
    ) -> impl std::future::Future<Output = Result<String, GenerationError>> + Send;
}
