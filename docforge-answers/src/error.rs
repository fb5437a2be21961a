use crate::ValueKind;

/// Error type for value and answer operations.
///
/// Lookup misses are not errors; they surface as `Option`/`bool` results on
/// [`crate::AnswerCollection`].
#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    /// An operation required an answered value and got an unanswered one.
    #[error("operation requires an answered value")]
    Unanswered,

    /// A value was requested or supplied with the wrong kind.
    #[error("kind mismatch for answer '{name}': expected {expected}, got {actual}")]
    TypeMismatch {
        name: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// An answer name is already taken by an answer of a different kind.
    #[error("answer '{name}' already exists as {existing}, requested {requested}")]
    KindConflict {
        name: String,
        existing: ValueKind,
        requested: ValueKind,
    },
}
