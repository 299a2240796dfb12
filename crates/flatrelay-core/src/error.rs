// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Flatrelay notification relay.

use thiserror::Error;

use crate::types::UserId;

/// The primary error type used across all Flatrelay adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration errors (missing token, bad vault key, invalid values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Backing store errors (database, snapshot file, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Chat platform errors (connection failure, send rejected, channel gone).
    #[error("chat error: {message}")]
    Chat {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Hard feed failure: transport error or a non-success status other than
    /// auth failure and not-found. Callers skip and retry on the next cycle.
    #[error("feed error: {message}")]
    Feed {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Credential sealing or unsealing failed.
    #[error("vault error: {0}")]
    Vault(String),

    /// A direct message to the user could not be delivered.
    #[error("user {user} is unreachable: {message}")]
    Unreachable { user: UserId, message: String },

    /// A user id was registered twice.
    #[error("user {0} is already registered")]
    DuplicateUser(UserId),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Builds a hard feed failure without an underlying source.
    pub fn feed(message: impl Into<String>) -> Self {
        RelayError::Feed {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a chat error without an underlying source.
    pub fn chat(message: impl Into<String>) -> Self {
        RelayError::Chat {
            message: message.into(),
            source: None,
        }
    }

    /// Whether this error means the user cannot be messaged at all.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, RelayError::Unreachable { .. })
    }
}
