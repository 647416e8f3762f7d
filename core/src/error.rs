//! Error types for the Agenda API client.
//!
//! # Design
//! Three failure families reach callers: the request never got a response
//! (`Transport`), the server answered with a non-2xx status (`Http`), or the
//! server answered 2xx but flagged `success: false` (`Rejected`, produced
//! when an envelope is converted with `Envelope::into_result`). None of them
//! is retried.
//!
//! `Http` displays the server's message verbatim so it can be shown to the
//! user as-is.

use thiserror::Error;

/// Message used when a non-2xx response carries no `message` field.
pub const FALLBACK_HTTP_MESSAGE: &str = "Error en la petición";

#[derive(Debug, Error)]
pub enum ApiError {
    /// No response was received (connection refused, DNS, I/O).
    #[error("transport failed: {0}")]
    Transport(String),

    /// Non-2xx status. `message` is the server's `message` field or
    /// [`FALLBACK_HTTP_MESSAGE`].
    #[error("{message}")]
    Http { status: u16, message: String },

    /// 2xx envelope with `success: false`, or without the expected payload.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Reading or writing the session store failed.
    #[error("session storage failed: {0}")]
    Storage(String),

    /// The identity token handed to the login gate could not be decoded.
    #[error("invalid identity token: {0}")]
    InvalidIdToken(String),

    /// The identity token belongs to an email outside the allowed domain.
    #[error("email {0} is not part of the allowed domain")]
    DomainNotAllowed(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// HTTP status for `Http` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_error_displays_server_message_only() {
        let err = ApiError::Http {
            status: 409,
            message: "El código ya existe".to_string(),
        };
        assert_eq!(err.to_string(), "El código ya existe");
        assert_eq!(err.status(), Some(409));
        assert!(!err.is_not_found());
    }

    #[test]
    fn non_http_errors_have_no_status() {
        let err = ApiError::Transport("connection refused".to_string());
        assert_eq!(err.status(), None);
        assert_eq!(err.to_string(), "transport failed: connection refused");
    }
}
