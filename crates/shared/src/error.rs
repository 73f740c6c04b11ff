use serde::{Deserialize, Serialize};

/// Shown when the backend rejects a call without saying why.
pub const GENERIC_BACKEND_ERROR: &str = "Something went wrong";

/// Message the backend sends when a phone number is already registered.
pub const PHONE_EXISTS_MESSAGE: &str = "Phone number already exists";

/// Error body returned by the backend: `{ "error": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ApiError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
        }
    }

    pub fn message(&self) -> &str {
        self.error
            .as_deref()
            .filter(|message| !message.trim().is_empty())
            .unwrap_or(GENERIC_BACKEND_ERROR)
    }
}

/// Whether a backend message reports a phone uniqueness conflict.
pub fn is_phone_conflict(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    lower.contains("phone") && lower.contains("exist")
}
