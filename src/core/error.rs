use serde::Serialize;
use std::fmt;

/// How a remote failure should be treated by the retry executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Network hiccup or server-side error worth another attempt
    Transient,
    /// Rate or volume quota hit; retried like a transient failure
    QuotaExceeded,
    /// Credentials or site permissions are wrong; never retried
    PermissionDenied,
    /// Anything else the remote rejected outright
    Fatal,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Transient | ErrorClass::QuotaExceeded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorClass::Transient => "transient",
            ErrorClass::QuotaExceeded => "quota_exceeded",
            ErrorClass::PermissionDenied => "permission_denied",
            ErrorClass::Fatal => "fatal",
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque failure value produced at the remote collaborator boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteError {
    pub class: ErrorClass,
    pub message: String,
    /// Source-specific code, e.g. an HTTP status or API reason
    pub code: Option<String>,
}

impl RemoteError {
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        Self {
            class,
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Transient, message)
    }

    pub fn quota_exceeded(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::QuotaExceeded, message)
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::PermissionDenied, message)
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Fatal, message)
    }

    pub fn is_retryable(&self) -> bool {
        self.class.is_retryable()
    }
}

impl fmt::Display for RemoteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{} ({}, {})", self.message, self.class, code),
            None => write!(f, "{} ({})", self.message, self.class),
        }
    }
}

impl std::error::Error for RemoteError {}

/// Comprehensive error types for serpwatch operations
#[derive(Debug)]
pub enum SerpwatchError {
    /// IO error (config file reads, etc.)
    Io(std::io::Error),

    /// Configuration error
    Config(String),

    /// Invalid argument error
    InvalidArgument(String),

    /// HTTP client construction error
    Http(reqwest::Error),

    /// TOML parsing error
    TomlParsing(toml::de::Error),

    /// JSON encoding error
    Json(serde_json::Error),

    /// Regex compilation error
    Regex(regex::Error),

    /// A remote operation failed after the retry budget was spent
    Remote {
        operation: String,
        source: RemoteError,
    },
}

impl SerpwatchError {
    pub fn remote(operation: impl Into<String>, source: RemoteError) -> Self {
        SerpwatchError::Remote {
            operation: operation.into(),
            source,
        }
    }
}

impl fmt::Display for SerpwatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SerpwatchError::Io(err) => write!(f, "IO error: {err}"),
            SerpwatchError::Config(msg) => write!(f, "Configuration error: {msg}"),
            SerpwatchError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            SerpwatchError::Http(err) => write!(f, "HTTP error: {err}"),
            SerpwatchError::TomlParsing(err) => write!(f, "TOML parsing error: {err}"),
            SerpwatchError::Json(err) => write!(f, "JSON error: {err}"),
            SerpwatchError::Regex(err) => write!(f, "Regex error: {err}"),
            SerpwatchError::Remote { operation, source } => {
                write!(f, "Remote error during {operation}: {source}")
            }
        }
    }
}

impl std::error::Error for SerpwatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SerpwatchError::Io(err) => Some(err),
            SerpwatchError::Http(err) => Some(err),
            SerpwatchError::TomlParsing(err) => Some(err),
            SerpwatchError::Json(err) => Some(err),
            SerpwatchError::Regex(err) => Some(err),
            SerpwatchError::Remote { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SerpwatchError {
    fn from(err: std::io::Error) -> Self {
        SerpwatchError::Io(err)
    }
}

impl From<reqwest::Error> for SerpwatchError {
    fn from(err: reqwest::Error) -> Self {
        SerpwatchError::Http(err)
    }
}

impl From<toml::de::Error> for SerpwatchError {
    fn from(err: toml::de::Error) -> Self {
        SerpwatchError::TomlParsing(err)
    }
}

impl From<serde_json::Error> for SerpwatchError {
    fn from(err: serde_json::Error) -> Self {
        SerpwatchError::Json(err)
    }
}

impl From<regex::Error> for SerpwatchError {
    fn from(err: regex::Error) -> Self {
        SerpwatchError::Regex(err)
    }
}

/// Type alias for Results using SerpwatchError
pub type Result<T> = std::result::Result<T, SerpwatchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_error_display() {
        let config_error = SerpwatchError::Config("Missing site".to_string());
        assert_eq!(format!("{config_error}"), "Configuration error: Missing site");

        let arg_error = SerpwatchError::InvalidArgument("days must be positive".to_string());
        assert_eq!(
            format!("{arg_error}"),
            "Invalid argument: days must be positive"
        );
    }

    #[test]
    fn test_remote_error_carries_operation_context() {
        let err = SerpwatchError::remote(
            "query rows for period A",
            RemoteError::permission_denied("User does not have access").with_code("403"),
        );

        let display = err.to_string();
        assert!(display.contains("query rows for period A"));
        assert!(display.contains("permission_denied"));
        assert!(display.contains("403"));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_class_retryable() {
        assert!(ErrorClass::Transient.is_retryable());
        assert!(ErrorClass::QuotaExceeded.is_retryable());
        assert!(!ErrorClass::PermissionDenied.is_retryable());
        assert!(!ErrorClass::Fatal.is_retryable());
    }

    #[test]
    fn test_remote_error_display_without_code() {
        let err = RemoteError::transient("connection reset");
        assert_eq!(err.to_string(), "connection reset (transient)");
        assert_eq!(err.code, None);
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err = SerpwatchError::from(io_error);

        assert!(matches!(err, SerpwatchError::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_error_from_toml() {
        let toml_error = toml::from_str::<toml::Value>("invalid toml [").unwrap_err();
        let err = SerpwatchError::from(toml_error);

        assert!(matches!(err, SerpwatchError::TomlParsing(_)));
        assert!(format!("{err}").contains("TOML parsing error:"));
    }

    #[test]
    #[allow(clippy::invalid_regex)]
    fn test_error_from_regex() {
        let regex_error = regex::Regex::new("[invalid").unwrap_err();
        let err = SerpwatchError::from(regex_error);

        assert!(matches!(err, SerpwatchError::Regex(_)));
    }

    #[test]
    fn test_error_no_source_variants() {
        let errors_without_source = vec![
            SerpwatchError::Config("test".to_string()),
            SerpwatchError::InvalidArgument("test".to_string()),
        ];

        for error in errors_without_source {
            assert!(error.source().is_none());
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SerpwatchError>();
        assert_send_sync::<RemoteError>();
    }
}
