use armature_core::Error as ArmatureError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CsrfError {
    /// Invalid guard setup, raised before any token is issued
    #[error("CSRF configuration error: {0}")]
    Configuration(String),

    /// The OS random source could not supply entropy
    #[error("Secure random source unavailable: {0}")]
    EntropyUnavailable(String),

    #[error("Invalid CSRF token")]
    InvalidToken,

    #[error("Missing CSRF token")]
    MissingToken,
}

impl CsrfError {
    /// Whether the error aborts guard construction or token issuance
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CsrfError::Configuration(_) | CsrfError::EntropyUnavailable(_)
        )
    }
}

impl From<rand::Error> for CsrfError {
    fn from(err: rand::Error) -> Self {
        CsrfError::EntropyUnavailable(err.to_string())
    }
}

impl From<CsrfError> for ArmatureError {
    fn from(err: CsrfError) -> Self {
        match err {
            CsrfError::InvalidToken | CsrfError::MissingToken => {
                ArmatureError::Forbidden(err.to_string())
            }
            other => ArmatureError::Internal(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, CsrfError>;
