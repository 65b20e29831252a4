use shared::error::ApiError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// A gateway call failed; already normalized by the gateway.
    #[error(transparent)]
    Api(#[from] ApiError),
    /// Rejected before any network call.
    #[error("{0}")]
    Validation(String),
    #[error("invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Text recorded in a section's `loading.error`.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api(err) => err.user_message().to_string(),
            other => other.to_string(),
        }
    }
}
