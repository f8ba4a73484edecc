use depot_core::{AppError, ErrorMetadata};
use thiserror::Error;

/// Errors surfaced by the client pipeline.
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// The API answered with a non-success status.
    #[error("API request failed with status {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Network failure or a rejected direct transfer.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Rejected locally before any request was made.
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Signed URL for '{key}' still failing after {attempts} refreshes")]
    RetriesExhausted { key: String, attempts: u32 },
}

impl ClientError {
    /// Message suitable for showing next to a failed task.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Api { message, .. } => message.clone(),
            ClientError::Validation(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Validation and authorization failures are never worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            ClientError::Api { status, .. } => *status >= 500,
            ClientError::Transport(_) => true,
            ClientError::Validation(_)
            | ClientError::Decode(_)
            | ClientError::RetriesExhausted { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ClientError::Decode(err.to_string())
        } else {
            ClientError::Transport(err.to_string())
        }
    }
}

impl From<AppError> for ClientError {
    fn from(err: AppError) -> Self {
        ClientError::Validation(err.client_message())
    }
}
