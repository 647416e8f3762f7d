//! The `{success, message?, data?, pagination?}` wrapper every endpoint
//! returns, and the discriminated view callers should consume it through.
//!
//! `success` is the authoritative flag. A successful envelope may still lack
//! `data` (deletes, logout), so payload-carrying calls go through
//! [`Envelope::into_outcome`] / [`Envelope::into_result`], which only hand out
//! the payload when both conditions hold.

use serde::{Deserialize, Serialize};

use crate::error::{ApiError, FALLBACK_HTTP_MESSAGE};

/// Message used when a successful envelope has no payload but one was
/// expected.
pub const MISSING_DATA_MESSAGE: &str = "response carried no data";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
    pub total: u64,
    pub pages: u64,
}

/// Response envelope exactly as the server sent it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

/// Success with payload, or failure with a message. There is no way to reach
/// the payload of a failed response.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success {
        data: T,
        pagination: Option<Pagination>,
    },
    Failure {
        message: String,
    },
}

impl<T> Outcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn ok(self) -> Option<T> {
        match self {
            Outcome::Success { data, .. } => Some(data),
            Outcome::Failure { .. } => None,
        }
    }
}

impl<T> Envelope<T> {
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn into_outcome(self) -> Outcome<T> {
        match (self.success, self.data) {
            (true, Some(data)) => Outcome::Success {
                data,
                pagination: self.pagination,
            },
            (true, None) => Outcome::Failure {
                message: self
                    .message
                    .unwrap_or_else(|| MISSING_DATA_MESSAGE.to_string()),
            },
            (false, _) => Outcome::Failure {
                message: self
                    .message
                    .unwrap_or_else(|| FALLBACK_HTTP_MESSAGE.to_string()),
            },
        }
    }

    /// Payload of a successful envelope, or `ApiError::Rejected`.
    pub fn into_result(self) -> Result<T, ApiError> {
        match self.into_outcome() {
            Outcome::Success { data, .. } => Ok(data),
            Outcome::Failure { message } => Err(ApiError::Rejected(message)),
        }
    }

    /// For endpoints that carry no payload: `Ok` when `success` is set.
    pub fn acknowledged(&self) -> Result<(), ApiError> {
        if self.success {
            return Ok(());
        }
        let message = self
            .message
            .clone()
            .unwrap_or_else(|| FALLBACK_HTTP_MESSAGE.to_string());
        Err(ApiError::Rejected(message))
    }

    /// `pagination.total` of a successful envelope, 0 otherwise.
    pub fn total_or_zero(&self) -> u64 {
        match (self.success, self.pagination) {
            (true, Some(p)) => p.total,
            _ => 0,
        }
    }
}
