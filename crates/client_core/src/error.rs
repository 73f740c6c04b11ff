use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("backend rejected request ({status}): {message}")]
    Backend { status: u16, message: String },
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed backend response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid api url '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

impl ClientError {
    /// Message the backend attached to a rejection, if this is one.
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Backend { message, .. } => Some(message),
            _ => None,
        }
    }

    /// True when the call never produced a usable backend answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Decode(_))
    }
}
