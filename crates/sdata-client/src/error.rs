//! Error types for sdata-client.

use crate::diagnosis::Diagnosis;

/// Result type alias for sdata-client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for sdata-client operations.
#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    /// The kind of error that occurred.
    pub kind: ErrorKind,
    /// Optional source error.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Create a new error with the given kind.
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Create a new error with the given kind and source.
    pub fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Returns true if the server answered with a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self.kind, ErrorKind::Status { .. })
    }

    /// The HTTP status for [`ErrorKind::Status`] errors.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Diagnoses parsed from the error body, if any.
    pub fn diagnoses(&self) -> &[Diagnosis] {
        match &self.kind {
            ErrorKind::Status { diagnoses, .. } => diagnoses,
            _ => &[],
        }
    }

    /// Returns true for caller mistakes detected before any I/O.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::InProgress | ErrorKind::MissingParameter(_) | ErrorKind::InvalidUrl(_)
        )
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Every attempt, retries included, timed out.
    #[error("Request timed out after {attempts} attempts")]
    TimeoutRetriesExhausted { attempts: u32 },

    /// Connection, DNS or protocol failure below HTTP.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("HTTP error: {status} {message}")]
    Status {
        status: u16,
        message: String,
        diagnoses: Vec<Diagnosis>,
    },

    /// Content could not be mapped to or from the wire.
    #[error("Mapping error: {0}")]
    Mapping(String),

    /// The request is already executing.
    #[error("Existing request in progress")]
    InProgress,

    /// No codec handles the content.
    #[error("Content type '{0}' not supported")]
    UnsupportedContentType(String),

    /// The exchange was aborted.
    #[error("Request cancelled")]
    Cancelled,

    /// A multipart body could not be built or parsed.
    #[error("MIME error: {0}")]
    Mime(String),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// A required parameter was not supplied.
    #[error("Missing parameter: {0}")]
    MissingParameter(&'static str),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_builder() {
            ErrorKind::Config(err.to_string())
        } else {
            ErrorKind::Transport(err.to_string())
        };
        Error::with_source(kind, err)
    }
}

impl From<sdata_content::Error> for Error {
    fn from(err: sdata_content::Error) -> Self {
        let kind = match &err.kind {
            sdata_content::ErrorKind::UnsupportedContentType(media) => {
                ErrorKind::UnsupportedContentType(media.clone())
            }
            other => ErrorKind::Mapping(other.to_string()),
        };
        Error::with_source(kind, err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Mapping(err.to_string()), err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::with_source(ErrorKind::InvalidUrl(err.to_string()), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind_display_messages() {
        let cases: Vec<(ErrorKind, &str)> = vec![
            (
                ErrorKind::TimeoutRetriesExhausted { attempts: 3 },
                "Request timed out after 3 attempts",
            ),
            (
                ErrorKind::Transport("connection refused".into()),
                "Transport error: connection refused",
            ),
            (
                ErrorKind::Status {
                    status: 404,
                    message: "Not Found".into(),
                    diagnoses: Vec::new(),
                },
                "HTTP error: 404 Not Found",
            ),
            (
                ErrorKind::Mapping("expected a string".into()),
                "Mapping error: expected a string",
            ),
            (ErrorKind::InProgress, "Existing request in progress"),
            (
                ErrorKind::UnsupportedContentType("image/png".into()),
                "Content type 'image/png' not supported",
            ),
            (ErrorKind::Cancelled, "Request cancelled"),
            (ErrorKind::Mime("no boundary".into()), "MIME error: no boundary"),
            (
                ErrorKind::InvalidUrl("relative URL without a base".into()),
                "Invalid URL: relative URL without a base",
            ),
            (ErrorKind::MissingParameter("path"), "Missing parameter: path"),
            (
                ErrorKind::Config("bad proxy".into()),
                "Configuration error: bad proxy",
            ),
        ];

        for (kind, expected_substring) in cases {
            let display = kind.to_string();
            assert!(
                display.contains(expected_substring),
                "Expected '{display}' to contain '{expected_substring}'"
            );
        }
    }

    #[test]
    fn test_status_accessors() {
        let err = Error::new(ErrorKind::Status {
            status: 412,
            message: "Precondition Failed".into(),
            diagnoses: vec![Diagnosis {
                message: Some("stale".into()),
                ..Diagnosis::default()
            }],
        });
        assert!(err.is_status());
        assert_eq!(err.status(), Some(412));
        assert_eq!(err.diagnoses().len(), 1);

        let err = Error::new(ErrorKind::Cancelled);
        assert!(!err.is_status());
        assert_eq!(err.status(), None);
        assert!(err.diagnoses().is_empty());
    }

    #[test]
    fn test_usage_errors() {
        assert!(Error::new(ErrorKind::InProgress).is_usage_error());
        assert!(Error::new(ErrorKind::MissingParameter("key")).is_usage_error());
        assert!(!Error::new(ErrorKind::Transport("reset".into())).is_usage_error());
    }

    #[test]
    fn test_from_content_error() {
        let content_err = sdata_content::Error::new(sdata_content::ErrorKind::UnsupportedContentType(
            "image/gif".into(),
        ));
        let err: Error = content_err.into();
        assert!(matches!(err.kind, ErrorKind::UnsupportedContentType(ref m) if m == "image/gif"));
        assert!(err.source.is_some());

        let content_err =
            sdata_content::Error::new(sdata_content::ErrorKind::Deserialization("nope".into()));
        let err: Error = content_err.into();
        assert!(matches!(err.kind, ErrorKind::Mapping(_)));
    }

    #[test]
    fn test_from_url_parse_error() {
        let url_err = url::Url::parse("not a url").unwrap_err();
        let err: Error = url_err.into();
        assert!(matches!(err.kind, ErrorKind::InvalidUrl(_)));
        assert!(err.to_string().contains("Invalid URL"));
    }
}
