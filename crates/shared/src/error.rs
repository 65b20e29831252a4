use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred";

/// Normalized gateway failure. Every transport or HTTP error is mapped into
/// this shape before it reaches the client core.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{}", preferred_message(.error, .detail))]
pub struct ApiError {
    pub error: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ApiError {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
            code: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Server detail first, then the raw error text, then a generic message.
    pub fn user_message(&self) -> &str {
        preferred_message(&self.error, &self.detail)
    }
}

fn preferred_message<'a>(error: &'a str, detail: &'a Option<String>) -> &'a str {
    if let Some(detail) = detail.as_deref().filter(|d| !d.trim().is_empty()) {
        return detail;
    }
    if !error.trim().is_empty() {
        return error;
    }
    GENERIC_ERROR_MESSAGE
}
