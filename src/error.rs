use thiserror::Error;

/// Error type for the constraint engine.
#[derive(Error, Debug)]
pub enum TddaError {
    #[error("parse error: {message}")]
    Parse { message: String },

    #[error("schema error: {message}")]
    Schema { message: String },

    #[error("invalid constraint document: {message}")]
    InvalidDocument { message: String },

    #[error("operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl TddaError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse { message: message.into() }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema { message: message.into() }
    }

    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument { message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, TddaError>;
