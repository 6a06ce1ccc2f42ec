//! Error types for one conversational turn.

/// Failure of the remote dialog call.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("backend transport error: {0}")]
    Transport(String),
    #[error("backend timed out after {0} seconds")]
    Timeout(u64),
    #[error("backend returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("backend reply could not be decoded: {0}")]
    Decode(String),
}

/// Reasons a turn falls back to the default error message.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("backend response empty")]
    EmptyResponse,
}
