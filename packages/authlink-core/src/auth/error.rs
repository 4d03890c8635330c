//! Authentication error taxonomy and the mapping from HTTP outcomes onto it.

use crate::api::{TransportError, VerifyBody};

/// Message used when the server rejected the request without explanation
pub const DEFAULT_FAILURE_MESSAGE: &str = "Auth request failed";

/// Message used for 401/403 without a server-supplied explanation
pub const DEFAULT_AUTH_FAILED_MESSAGE: &str =
    "Authentication failed. Please check the API token on your account page.";

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(
        "Browser login is not possible inside CI. \
         Pass your API token instead: authlink auth <API_TOKEN>"
    )]
    MisconfiguredAuthInCi,

    #[error("{message}")]
    AuthFailed { message: String, status: u16 },

    #[error(
        "Sorry, but your authentication token has now expired.\n\
         Please try to authenticate again."
    )]
    TokenExpired,

    #[error("{message}")]
    GenericAuthFailure { message: String, status: u16 },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(#[source] url::ParseError),

    #[error("Authentication cancelled")]
    Cancelled,

    #[error("Failed to save credential: {0:#}")]
    Storage(#[source] anyhow::Error),
}

impl AuthError {
    /// HTTP status behind the error, if one was received
    pub fn status(&self) -> Option<u16> {
        match self {
            AuthError::AuthFailed { status, .. }
            | AuthError::GenericAuthFailure { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Text to show the user.
    ///
    /// Gateway errors without a server message are almost always the
    /// server-side request timing out, so they get a more useful hint.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::GenericAuthFailure { message, status }
                if message == DEFAULT_FAILURE_MESSAGE && matches!(*status, 502 | 504) =>
            {
                "Your request has timed out on the server side. \
                 Please re-run this command, and if the problem persists \
                 contact support."
                    .to_string()
            }
            other => other.to_string(),
        }
    }
}

/// Map a non-success verification response onto an [`AuthError`].
pub fn classify(status: u16, body: &VerifyBody) -> AuthError {
    let server_message = body
        .user_message
        .as_deref()
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    match status {
        401 | 403 => AuthError::AuthFailed {
            message: server_message.unwrap_or_else(|| DEFAULT_AUTH_FAILED_MESSAGE.to_string()),
            status,
        },
        _ => AuthError::GenericAuthFailure {
            message: server_message.unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
            status,
        },
    }
}
