// src/error.rs

use std::fmt;

/// Global client error enum.
/// Centralizes error handling and mapping to user-facing messages.
#[derive(Debug)]
pub enum ClientError {
    // No token in the session store; the caller must re-authenticate.
    AuthRequired,

    // Transport-level failure (connect refused, timeout, DNS).
    Network(String),

    // Non-2xx response from the backend, with the body's error message
    // when one was present.
    ApiStatus(u16, String),

    // Client-side validation failure; never sent to the backend.
    Validation(String),

    // Session-file read/write failure.
    Storage(String),

    // Quiz submission failed; collected answers are retained and the
    // caller may retry.
    Submission(String),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::AuthRequired => write!(f, "authentication required"),
            ClientError::Network(msg) => write!(f, "network error: {}", msg),
            ClientError::ApiStatus(status, msg) => write!(f, "API error ({}): {}", status, msg),
            ClientError::Validation(msg) => write!(f, "validation error: {}", msg),
            ClientError::Storage(msg) => write!(f, "storage error: {}", msg),
            ClientError::Submission(msg) => write!(f, "submission failed: {}", msg),
        }
    }
}

impl std::error::Error for ClientError {}

impl ClientError {
    /// Maps the error to the message shown to the user.
    /// Status codes get distinct wording; 422 asks for input correction,
    /// 500 invites a plain retry.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::AuthRequired => "You need to log in to do that.".to_string(),
            ClientError::Network(_) => {
                "Could not reach the server. Check that the backend is running and try again."
                    .to_string()
            }
            ClientError::ApiStatus(401, _) => {
                "Your session is no longer valid. Please log in again.".to_string()
            }
            ClientError::ApiStatus(403, _) => "You do not have access to this resource.".to_string(),
            ClientError::ApiStatus(404, _) => "The requested resource was not found.".to_string(),
            ClientError::ApiStatus(422, msg) => format!("The server rejected the input: {}", msg),
            ClientError::ApiStatus(500, _) => {
                "The server hit an internal error. Please try again.".to_string()
            }
            ClientError::ApiStatus(status, msg) => format!("Request failed ({}): {}", status, msg),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::Storage(_) => "Could not read or write the local session.".to_string(),
            ClientError::Submission(_) => {
                "Could not submit your results. Your answers are kept; try again.".to_string()
            }
        }
    }

    /// Whether resubmitting the same action can succeed without the user
    /// changing anything first.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Network(_) | ClientError::Submission(_) => true,
            ClientError::ApiStatus(status, _) => *status >= 500,
            _ => false,
        }
    }
}

/// Converts `reqwest::Error` into the client taxonomy.
/// Allows using the `?` operator on HTTP calls.
impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ClientError::ApiStatus(status.as_u16(), err.to_string()),
            None => ClientError::Network(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Validation(err.to_string())
    }
}
