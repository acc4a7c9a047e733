// Copyright (c) 2025 sbksba
//
// This software is licensed under the terms of the MIT License.
// See the LICENSE file in the project root for the full license text.
use thiserror::Error;

/// Input rejected locally, before any collaborator is called.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Task description cannot be empty.")]
    EmptyDescription,

    #[error("Email address must contain '@'.")]
    InvalidEmail,

    #[error("Password must have at least 6 characters.")]
    PasswordTooShort,

    #[error("Name must have at least 3 characters.")]
    NameTooShort,

    #[error("Password confirmation does not match.")]
    PasswordMismatch,

    #[error("No date exists {0} days from now.")]
    HorizonOutOfRange(u64),
}

/// Failure reported by the remote task service.
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Server rejected the request with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Could not decode the server response: {0}")]
    Decode(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),
}

impl From<reqwest::Error> for ServiceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// Failure of the local preference store. Only ever logged by the task list.
#[derive(Error, Debug)]
#[error(transparent)]
pub struct PersistenceError(#[from] anyhow::Error);

/// Errors surfaced to the caller of a task list or authentication operation.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ClientError {
    /// Text meant to be shown to the user.
    /// When the server answered with a body, that body is the message.
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(err) => format!("Invalid data: {err}"),
            Self::Service(ServiceError::Rejected { message, .. }) if !message.trim().is_empty() => {
                format!("Something went wrong! Message: {message}")
            }
            Self::Service(err) => format!("Something went wrong! Message: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_prefers_server_body() {
        let err = ClientError::from(ServiceError::Rejected {
            status: 400,
            message: "Email already registered".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Something went wrong! Message: Email already registered"
        );
    }

    #[test]
    fn test_user_message_for_validation() {
        let err = ClientError::from(ValidationError::EmptyDescription);
        assert_eq!(
            err.user_message(),
            "Invalid data: Task description cannot be empty."
        );
    }

    #[test]
    fn test_user_message_with_empty_body_falls_back_to_status() {
        let err = ClientError::from(ServiceError::Rejected {
            status: 500,
            message: String::new(),
        });
        assert!(err.user_message().contains("status 500"));
    }
}
