/// response envelopes the http layer serializes
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};

/// success envelope: `{status, message, data}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub message: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 200,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: 201,
            message: message.into(),
            data: Some(data),
        }
    }

    pub fn to_json_pretty(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// failure envelope, storage details never leave the process
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub status: u16,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after_secs: Option<u64>,
}

impl From<&LedgerError> for ApiError {
    fn from(err: &LedgerError) -> Self {
        let retry_after_secs = match err {
            LedgerError::RateLimited { retry_after_secs } => Some(*retry_after_secs),
            _ => None,
        };
        Self {
            status: err.http_status(),
            code: err.code().to_string(),
            message: err.public_message(),
            retry_after_secs,
        }
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::from(&err)
    }
}

/// map a service result onto the envelopes
pub fn respond<T: Serialize>(result: Result<T>, message: &str) -> std::result::Result<ApiResponse<T>, ApiError> {
    match result {
        Ok(data) => Ok(ApiResponse::ok(message, data)),
        Err(err) => {
            if err.http_status() >= 500 {
                tracing::error!(error = %err, code = err.code(), "request failed");
            }
            Err(ApiError::from(&err))
        }
    }
}
