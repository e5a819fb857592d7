use thiserror::Error;

/// Errors from the chat-completion backend.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("chat completion transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("chat completion endpoint returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("chat completion response contained no choices")]
    EmptyResponse,
}

/// Errors from the memory document store. Retries happen below this layer;
/// a `StoreError` means the bounded retry schedule was exhausted.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("store operation `{0}` timed out")]
    Timeout(&'static str),
}
