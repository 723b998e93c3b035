//! Custom error types for ragchat

use thiserror::Error;

/// Main error type for ragchat operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rejected locally before any timer or remote call started
    #[error("{0}")]
    Validation(String),

    /// The backend could not be reached at all
    #[error("{0}")]
    Unreachable(String),

    /// The backend answered, but with a failure
    #[error("{message}")]
    Service {
        status: u16,
        code: Option<String>,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification used by callers deciding how to present a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Validation,
    Transport,
    Application,
    Internal,
}

impl Error {
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation(message.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            Error::Validation(_) => ErrorClass::Validation,
            Error::Unreachable(_) => ErrorClass::Transport,
            Error::Service { .. } => ErrorClass::Application,
            _ => ErrorClass::Internal,
        }
    }
}

/// Result type alias for ragchat
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_error_displays_backend_message() {
        let err = Error::Service {
            status: 422,
            code: Some("bad_pdf".to_string()),
            message: "PDF has no extractable text".to_string(),
        };
        assert_eq!(err.to_string(), "PDF has no extractable text");
        assert_eq!(err.class(), ErrorClass::Application);
    }

    #[test]
    fn test_classes() {
        assert_eq!(Error::validation("x").class(), ErrorClass::Validation);
        assert_eq!(
            Error::Unreachable("down".to_string()).class(),
            ErrorClass::Transport
        );
        assert_eq!(Error::Other("?".to_string()).class(), ErrorClass::Internal);
    }
}
