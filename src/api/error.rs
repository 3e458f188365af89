use thiserror::Error;

/// Session-level failures of a completion request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompletionError {
    #[error("credential '{name}' not found; add it before asking a question")]
    MissingCredential { name: String },

    #[error("completion endpoint '{url}' rejected the request (HTTP {status}): {message}")]
    Rejected {
        url: String,
        status: u16,
        message: String,
    },

    #[error("cannot reach completion endpoint '{url}': {detail}")]
    Unreachable { url: String, detail: String },

    #[error("request to '{url}' timed out: {detail}")]
    TimedOut { url: String, detail: String },

    #[error("completion stream from '{url}' failed: {detail}")]
    Transport { url: String, detail: String },

    /// The owning session was cancelled; never surfaced as an error.
    #[error("completion request cancelled")]
    Cancelled,
}

impl CompletionError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
