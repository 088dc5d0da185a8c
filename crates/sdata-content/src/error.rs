//! Error types for sdata-content.

use std::fmt::Display;

/// Result type alias for content mapping and codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for content mapping and codec operations.
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

    pub(crate) fn serialization(msg: impl Display) -> Self {
        Self::new(ErrorKind::Serialization(msg.to_string()))
    }

    pub(crate) fn deserialization(msg: impl Display) -> Self {
        Self::new(ErrorKind::Deserialization(msg.to_string()))
    }

    pub(crate) fn xml(msg: impl Display) -> Self {
        Self::new(ErrorKind::Xml(msg.to_string()))
    }

    /// Returns true if the error came from turning a value into content.
    pub fn is_serialization(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Serialization(_) | ErrorKind::UnknownProtocolProperty(_)
        )
    }

    /// Returns true if the error came from reading content into a value.
    pub fn is_deserialization(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Deserialization(_) | ErrorKind::Json(_) | ErrorKind::Xml(_)
        )
    }
}

/// The kind of error that occurred.
#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// A value could not be mapped to content.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Content could not be mapped to the requested type.
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// A `$` member does not name a protocol property.
    #[error("Unknown protocol property: {0}")]
    UnknownProtocolProperty(String),

    /// No codec can write or read this content.
    #[error("Content type '{0}' not supported")]
    UnsupportedContentType(String),

    /// JSON syntax or shape error.
    #[error("JSON error: {0}")]
    Json(String),

    /// XML syntax or shape error.
    #[error("XML error: {0}")]
    Xml(String),
}

impl serde::ser::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::serialization(msg)
    }
}

impl serde::de::Error for Error {
    fn custom<T: Display>(msg: T) -> Self {
        Error::deserialization(msg)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::with_source(ErrorKind::Json(err.to_string()), err)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::with_source(ErrorKind::Xml(err.to_string()), err)
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::with_source(ErrorKind::Xml(err.to_string()), err)
    }
}
