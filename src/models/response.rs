//! The uniform `{success, message, data}` response envelope.

use serde::Serialize;

/// JSON envelope returned by every endpoint except the binary download.
///
/// Failures that are not HTTP-status failures (validation, write errors)
/// come back as `success: false` with `data: null` and a 200 status.
#[derive(Serialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Successful envelope carrying a payload.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Successful envelope with no payload (e.g. after a delete).
    pub fn ok_empty(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
        }
    }

    /// Failure envelope; always `data: null`.
    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }
}
