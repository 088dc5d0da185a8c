//! Responses and their eagerly parsed content.

use std::sync::LazyLock;

use bytes::Bytes;
use sdata_content::codec::handler;
use sdata_content::{ContentMapper, MediaType, Tracking, Value};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::diagnosis::{parse_diagnoses, Diagnosis};
use crate::error::{Error, ErrorKind, Result};
use crate::file::AttachedFile;
use crate::multipart::{boundary_of, parse_multipart};

/// Parsed response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseContent {
    /// JSON, Atom feed or Atom entry content.
    Value(Value),
    /// An XML tracking envelope for an operation still running.
    Tracking(Tracking),
    /// Textual content, including XML that is not a tracking envelope.
    Text(String),
    /// Anything else, unparsed.
    Binary(Bytes),
}

/// The outcome of an executed request. Content is parsed once, at
/// construction.
#[derive(Debug, Clone)]
pub struct SDataResponse {
    status: u16,
    content_type: Option<MediaType>,
    raw_content_type: Option<String>,
    etag: Option<String>,
    location: Option<String>,
    content: Option<ResponseContent>,
    files: Vec<AttachedFile>,
}

impl SDataResponse {
    /// Build a response from the final exchange.
    ///
    /// `location` is the exchange's own `Location` header; when absent the
    /// last redirect target is used instead.
    pub fn from_parts(
        status: u16,
        raw_content_type: Option<String>,
        etag: Option<String>,
        location: Option<String>,
        redirect_location: Option<String>,
        body: Bytes,
    ) -> Result<Self> {
        let content_type = raw_content_type.as_deref().and_then(MediaType::parse);
        let (content, files) = if status == 204 || body.is_empty() {
            (None, Vec::new())
        } else {
            parse_body(content_type, raw_content_type.as_deref(), body)?
        };

        Ok(Self {
            status,
            content_type,
            raw_content_type,
            etag,
            location: location.or(redirect_location),
            content,
            files,
        })
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Returns true if the response status is successful (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns true if this is a 304 Not Modified response.
    pub fn is_not_modified(&self) -> bool {
        self.status == 304
    }

    /// The recognized media type, if the `Content-Type` header named one.
    pub fn content_type(&self) -> Option<MediaType> {
        self.content_type
    }

    /// The `Content-Type` header as received.
    pub fn raw_content_type(&self) -> Option<&str> {
        self.raw_content_type.as_deref()
    }

    pub fn etag(&self) -> Option<&str> {
        self.etag.as_deref()
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn content(&self) -> Option<&ResponseContent> {
        self.content.as_ref()
    }

    pub fn into_content(self) -> Option<ResponseContent> {
        self.content
    }

    /// The generic value, for JSON and Atom content.
    pub fn value(&self) -> Option<&Value> {
        match &self.content {
            Some(ResponseContent::Value(value)) => Some(value),
            _ => None,
        }
    }

    pub fn tracking(&self) -> Option<&Tracking> {
        match &self.content {
            Some(ResponseContent::Tracking(tracking)) => Some(tracking),
            _ => None,
        }
    }

    pub fn text(&self) -> Option<&str> {
        match &self.content {
            Some(ResponseContent::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Attachments received in a multipart body.
    pub fn files(&self) -> &[AttachedFile] {
        &self.files
    }

    /// Map the content onto `T`. `None` when there is no content.
    pub fn content_as<T: DeserializeOwned + 'static>(
        &self,
        mapper: &ContentMapper,
    ) -> Result<Option<T>> {
        let value = match &self.content {
            None => return Ok(None),
            Some(ResponseContent::Value(value)) => value.clone(),
            Some(ResponseContent::Text(text)) => Value::from(text.as_str()),
            Some(ResponseContent::Tracking(tracking)) => mapper.serialize(tracking)?,
            Some(ResponseContent::Binary(_)) => {
                return Err(Error::new(ErrorKind::Mapping(format!(
                    "binary content ({}) cannot be mapped",
                    self.raw_content_type.as_deref().unwrap_or("unknown type")
                ))))
            }
        };
        Ok(Some(mapper.deserialize(value)?))
    }
}

fn parse_body(
    media: Option<MediaType>,
    raw_content_type: Option<&str>,
    body: Bytes,
) -> Result<(Option<ResponseContent>, Vec<AttachedFile>)> {
    if media != Some(MediaType::Multipart) {
        return Ok((Some(parse_single(media, body)?), Vec::new()));
    }

    let boundary = raw_content_type
        .and_then(boundary_of)
        .ok_or_else(|| Error::new(ErrorKind::Mime("multipart response without a boundary".into())))?;

    let mut content = None;
    let mut files = Vec::new();
    for part in parse_multipart(&body, &boundary)? {
        if part.is_attachment() {
            files.push(AttachedFile::from_part(&part));
        } else if content.is_none() {
            let media = part.content_type.as_deref().and_then(MediaType::parse);
            content = Some(parse_single(media, part.content)?);
        }
    }
    Ok((content, files))
}

fn parse_single(media: Option<MediaType>, body: Bytes) -> Result<ResponseContent> {
    match media {
        Some(media @ (MediaType::Atom | MediaType::AtomEntry | MediaType::Json)) => {
            let codec = handler(media).ok_or_else(|| {
                Error::new(ErrorKind::UnsupportedContentType(media.to_string()))
            })?;
            Ok(ResponseContent::Value(codec.read_from(&body)?))
        }
        Some(MediaType::Xml) => match Tracking::from_xml(&body) {
            Ok(tracking) => Ok(ResponseContent::Tracking(tracking)),
            Err(err) => {
                debug!(error = %err, "XML body is not a tracking envelope, reading as text");
                Ok(ResponseContent::Text(String::from_utf8_lossy(&body).into_owned()))
            }
        },
        Some(media) if media.is_textual() => {
            Ok(ResponseContent::Text(String::from_utf8_lossy(&body).into_owned()))
        }
        _ => Ok(ResponseContent::Binary(body)),
    }
}

/// Build the error for a non-success status from whatever the body holds.
pub(crate) fn status_error(
    status: u16,
    reason: Option<&str>,
    raw_content_type: Option<&str>,
    body: &[u8],
) -> Error {
    let media = raw_content_type.and_then(MediaType::parse);
    let diagnoses: Vec<Diagnosis> = parse_diagnoses(media, body)
        .into_iter()
        .map(|mut d| {
            d.message = d.message.as_deref().map(sanitize_error_message);
            d.stack_trace = None;
            d
        })
        .collect();

    let message = if !diagnoses.is_empty() {
        diagnoses
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    } else if media.is_some_and(|m| m.is_textual()) && !body.is_empty() {
        sanitize_error_message(String::from_utf8_lossy(body).trim())
    } else {
        reason.unwrap_or("Unknown status").to_string()
    };

    Error::new(ErrorKind::Status {
        status,
        message,
        diagnoses,
    })
}

static REDACTIONS: LazyLock<Vec<(regex_lite::Regex, &'static str)>> = LazyLock::new(|| {
    [
        // user:password@ in URLs
        (r"(?i)\b([a-z][a-z0-9+.-]*://)[^\s/@:]+:[^\s/@]+@", "${1}[REDACTED]@"),
        (r"(?i)\bbearer\s+[A-Za-z0-9._~+/=-]+", "Bearer [REDACTED]"),
        (r"(?i)\bbasic\s+[A-Za-z0-9+/=]{8,}", "Basic [REDACTED]"),
    ]
    .into_iter()
    .filter_map(|(pattern, replacement)| {
        regex_lite::Regex::new(pattern)
            .ok()
            .map(|regex| (regex, replacement))
    })
    .collect()
});

/// Sanitize an error message before it reaches callers or logs.
///
/// Credentials embedded in URLs and authorization tokens are redacted, and
/// messages longer than 500 characters are truncated.
pub(crate) fn sanitize_error_message(message: &str) -> String {
    const MAX_LENGTH: usize = 500;

    let mut sanitized = message.to_string();
    for (regex, replacement) in REDACTIONS.iter() {
        sanitized = regex.replace_all(&sanitized, *replacement).into_owned();
    }

    if let Some((cut, _)) = sanitized.char_indices().nth(MAX_LENGTH) {
        sanitized.truncate(cut);
        sanitized.push_str("...[truncated]");
    }

    sanitized
}
