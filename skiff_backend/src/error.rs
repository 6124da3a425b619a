use thiserror::Error as ThisError;

/// Domain-level failure taxonomy produced by the service layer. The api layer
/// maps each variant onto a status code and a page or JSON body.
#[derive(Debug, ThisError)]
pub enum ForumError {
    /// A required field is missing or malformed (400).
    #[error("{0}")]
    Validation(String),

    /// The caller has no authenticated user, or presented bad credentials (401).
    #[error("{0}")]
    Unauthorized(String),

    /// The caller is authenticated but does not own the target (403).
    #[error("{0}")]
    Forbidden(String),

    /// The addressed resource does not exist (404).
    #[error("{0}")]
    NotFound(String),

    /// Storage faults and programming errors (500). Detail stays server-side.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ForumError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ForumError::Validation(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ForumError::Unauthorized(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ForumError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        ForumError::NotFound(msg.into())
    }
}
