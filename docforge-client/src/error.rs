use docforge_answers::ReadError;

/// Error type for assembly-service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// An answer-set payload could not be read.
    #[error("answer set rejected: {0}")]
    Answers(#[from] ReadError),

    /// The requested template or package was not usable.
    #[error("template error: {0}")]
    Template(String),

    /// The transport layer failed (connection, protocol, timeout).
    #[error("transport failure: {0}")]
    Transport(#[from] anyhow::Error),
}
