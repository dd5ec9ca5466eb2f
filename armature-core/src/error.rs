// Error types for the Armature framework

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Error::BadRequest(_) => 400,
            Error::Forbidden(_) => 403,
            Error::Serialization(_) | Error::Internal(_) => 500,
        }
    }

    /// Whether this error was caused by the client
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}
