use thiserror::Error;

/// Message used when a failing response carries a body that is not a JSON error object.
pub const UNEXPECTED_RESPONSE_FORMAT: &str = "Unexpected response format from server";
pub const LIST_FAILED: &str = "Failed to fetch users";
pub const CREATE_FAILED: &str = "Failed to create user";
pub const UPDATE_FAILED: &str = "Failed to update user";
pub const DELETE_FAILED: &str = "Failed to delete user";

/// Every failure the directory client can report.
///
/// Decode problems never escape as their own variant; they are folded into
/// [`UserDirectoryError::Server`] with a generic message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UserDirectoryError {
    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("User '{user_name}' already exists")]
    Conflict { user_name: String },
}

/// Discriminant of [`UserDirectoryError`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    Server,
    Conflict,
}

impl UserDirectoryError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    pub fn conflict(user_name: impl Into<String>) -> Self {
        Self::Conflict {
            user_name: user_name.into(),
        }
    }

    /// Server failure for a body that could not be decoded.
    pub fn unexpected_format(status: u16) -> Self {
        Self::server(status, UNEXPECTED_RESPONSE_FORMAT)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Server { .. } => ErrorKind::Server,
            Self::Conflict { .. } => ErrorKind::Conflict,
        }
    }

    /// HTTP status of the failing response, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport { .. } => None,
            Self::Server { status, .. } => Some(*status),
            Self::Conflict { .. } => Some(409),
        }
    }
}
