use thiserror::Error;

/// Errors surfaced by every client operation. Nothing is retried here.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Connection, timeout or protocol failure before a status was received
    #[error("HTTP transport failed: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The server answered with a non-success status
    #[error("Unexpected response code: {status} ({message})")]
    Request { status: u16, message: String },

    /// Misuse detectable before sending anything
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to encode or decode body: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },
}

impl ClientError {
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        ClientError::Transport(Box::new(err))
    }

    /// HTTP status when the server produced one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Request { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub fn is_forbidden(&self) -> bool {
        self.status() == Some(403)
    }

    /// Malformed definition or parameters rejected by the server
    pub fn is_bad_request(&self) -> bool {
        self.status() == Some(400)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::transport(err)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
