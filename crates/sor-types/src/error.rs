use thiserror::Error;

use crate::generation::GenerationError;

/// Errors from repository operations (used by trait definitions in sor-core).
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database connection error")]
    Connection,

    #[error("query error: {0}")]
    Query(String),

    #[error("entity not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Errors surfaced by a send turn.
///
/// The quota variants are distinct from generic failures on purpose: the
/// presentation layer prompts sign-in or an upgrade for those, and shows a
/// failure notice only for `Generation`/`Storage`.
#[derive(Debug, Error)]
pub enum TurnError {
    #[error("a generation turn is already in flight")]
    Busy,

    #[error("nothing to send")]
    EmptyInput,

    #[error("sign-in required")]
    RequiresAuth,

    #[error("plan upgrade required")]
    RequiresUpgrade,

    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("storage error: {0}")]
    Storage(#[from] RepositoryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_display() {
        let err = RepositoryError::Query("syntax error".to_string());
        assert_eq!(err.to_string(), "query error: syntax error");
    }

    #[test]
    fn test_turn_error_from_generation() {
        let err: TurnError = GenerationError::Stream("reset".to_string()).into();
        assert!(matches!(err, TurnError::Generation(_)));
    }

    #[test]
    fn test_turn_error_from_repository() {
        let err: TurnError = RepositoryError::Connection.into();
        assert!(matches!(err, TurnError::Storage(_)));
    }
}
