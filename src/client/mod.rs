//! Typed HTTP client for the API plus the session that owns the
//! signed-in identity on the consumer side.

mod api;
mod session;

pub use api::ApiClient;
pub use session::{Identity, Route, Session};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status and an error envelope.
    #[error("{status}: {message}")]
    Api { status: u16, message: String },

    #[error("not logged in")]
    NotLoggedIn,

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// HTTP status for API errors, `None` for everything else.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
