//! Error types for SuperNotes.

use thiserror::Error;

/// Result type alias using SuperNotes' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for SuperNotes operations.
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found
    #[error("Note not found: {0}")]
    NoteNotFound(String),

    /// Profile record missing for an authenticated identity
    #[error("User profile not found: {0}")]
    ProfileNotFound(String),

    /// Authentication failed at the identity gateway
    #[error("Authentication failed: {0}")]
    Auth(AuthFailure),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (rejected before dispatch)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Not signed in, or the session token was rejected
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Permission denied by the backend
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A data-access operation failed. `message` is the short text shown to
    /// the user, `source` keeps the underlying cause.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Wrap an error as an operation failure with a user-facing message.
    pub fn failed(message: impl Into<String>, source: Error) -> Self {
        Error::Failed {
            message: message.into(),
            source: Box::new(source),
        }
    }

    /// The innermost error, following `Failed` wrappers.
    pub fn root_cause(&self) -> &Error {
        match self {
            Error::Failed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Short human-readable message for the UI error slot.
    pub fn user_message(&self) -> String {
        match self {
            Error::Failed { message, .. } => message.clone(),
            Error::Auth(failure) => failure.user_message().to_string(),
            Error::ProfileNotFound(_) => "User profile not found.".to_string(),
            Error::NoteNotFound(_) | Error::NotFound(_) => {
                "The requested resource was not found.".to_string()
            }
            Error::Forbidden(_) => "You don't have permission to perform this action.".to_string(),
            Error::Unauthorized(msg) => msg.clone(),
            Error::InvalidInput(msg) => msg.clone(),
            Error::Request(_) => {
                "Unable to connect to our servers. Please check your internet connection."
                    .to_string()
            }
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }

    /// Whether the root cause is a missing record.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            Error::NotFound(_) | Error::NoteNotFound(_) | Error::ProfileNotFound(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

impl From<AuthFailure> for Error {
    fn from(f: AuthFailure) -> Self {
        Error::Auth(f)
    }
}

/// Authentication failure reasons reported by the identity gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    EmailAlreadyInUse,
    WeakPassword,
    InvalidEmail,
    UserNotFound,
    WrongPassword,
    /// Bad email/password pair where the gateway does not say which half is wrong.
    InvalidCredentials,
    /// Federated token rejected.
    InvalidFederatedCredential,
    AccountExistsWithDifferentCredential,
    UserDisabled,
    TooManyAttempts,
    RequiresRecentLogin,
    /// Token expired or revoked.
    SessionExpired,
    NetworkRequestFailed,
    Other(String),
}

impl AuthFailure {
    /// Message shown to the user for this failure.
    pub fn user_message(&self) -> &str {
        match self {
            AuthFailure::EmailAlreadyInUse => "An account with this email already exists.",
            AuthFailure::WeakPassword => "Password should be at least 6 characters long.",
            AuthFailure::InvalidEmail => "Please enter a valid email address.",
            AuthFailure::UserNotFound => "No account found with this email address.",
            AuthFailure::WrongPassword => "Incorrect password. Please try again.",
            AuthFailure::InvalidCredentials => {
                "Failed to sign in. Please check your credentials and try again."
            }
            AuthFailure::InvalidFederatedCredential => {
                "Invalid Google credentials. Please try again."
            }
            AuthFailure::AccountExistsWithDifferentCredential => {
                "An account already exists with this email using a different sign-in method."
            }
            AuthFailure::UserDisabled => "This account has been disabled.",
            AuthFailure::TooManyAttempts => "Too many attempts. Please try again later.",
            AuthFailure::RequiresRecentLogin => "Please sign in again to complete this action.",
            AuthFailure::SessionExpired => "Your session has expired. Please sign in again.",
            AuthFailure::NetworkRequestFailed => {
                "Network error. Please check your connection and try again."
            }
            AuthFailure::Other(_) => "Authentication failed. Please try signing in again.",
        }
    }
}

impl std::fmt::Display for AuthFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthFailure::Other(code) => write!(f, "{}", code),
            other => write!(f, "{:?}", other),
        }
    }
}
