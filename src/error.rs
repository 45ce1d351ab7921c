use thiserror::Error;

/// Unified error type for git-lineage operations
#[derive(Error, Debug)]
pub enum LineageError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Version error: {0}")]
    Version(String),

    #[error("Commit error: {0}")]
    Commit(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Branch error: {0}")]
    Branch(String),

    #[error("History error: {0}")]
    History(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in git-lineage
pub type Result<T> = std::result::Result<T, LineageError>;

impl LineageError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        LineageError::Config(msg.into())
    }

    /// Create a version error with context
    pub fn version(msg: impl Into<String>) -> Self {
        LineageError::Version(msg.into())
    }

    /// Create a commit error with context
    pub fn commit(msg: impl Into<String>) -> Self {
        LineageError::Commit(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        LineageError::Tag(msg.into())
    }

    /// Create a branch error with context
    pub fn branch(msg: impl Into<String>) -> Self {
        LineageError::Branch(msg.into())
    }

    /// Create a history error with context
    pub fn history(msg: impl Into<String>) -> Self {
        LineageError::History(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        LineageError::Remote(msg.into())
    }
}
