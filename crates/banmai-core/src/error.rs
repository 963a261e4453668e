use thiserror::Error;

/// Top-level error type for the banmai system.
///
/// Subsystem crates define their own error types (`KbError`,
/// `CompletionError`, `SinkError`) and convert into this one at the
/// boundaries where a caller needs a single error surface.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BanmaiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Knowledge base error: {0}")]
    Knowledge(String),

    #[error("Completion service error: {0}")]
    Completion(String),

    #[error("Delivery error: {0}")]
    Delivery(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<toml::de::Error> for BanmaiError {
    fn from(err: toml::de::Error) -> Self {
        BanmaiError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for BanmaiError {
    fn from(err: toml::ser::Error) -> Self {
        BanmaiError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for BanmaiError {
    fn from(err: serde_json::Error) -> Self {
        BanmaiError::Serialization(err.to_string())
    }
}

/// Convenience result type using [`BanmaiError`].
pub type Result<T> = std::result::Result<T, BanmaiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = BanmaiError::Config("missing api key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing api key");

        let err = BanmaiError::Knowledge("bad file".to_string());
        assert_eq!(err.to_string(), "Knowledge base error: bad file");

        let err = BanmaiError::Completion("quota exceeded".to_string());
        assert_eq!(err.to_string(), "Completion service error: quota exceeded");

        let err = BanmaiError::Delivery("recipient unknown".to_string());
        assert_eq!(err.to_string(), "Delivery error: recipient unknown");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: BanmaiError = io.into();
        assert!(matches!(err, BanmaiError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_toml_error() {
        let bad = toml::from_str::<toml::Value>("not = = toml").unwrap_err();
        let err: BanmaiError = bad.into();
        assert!(matches!(err, BanmaiError::Config(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: BanmaiError = bad.into();
        assert!(matches!(err, BanmaiError::Serialization(_)));
    }
}
