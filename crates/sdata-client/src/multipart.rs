//! MIME multipart bodies.
//!
//! [`MultipartWriter`] assembles an outgoing body from ordered parts;
//! [`parse_multipart`] splits an incoming body back into parts. Part headers
//! are parsed with `httparse`.

use bytes::Bytes;
use tracing::trace;

use crate::error::{Error, ErrorKind, Result};

const MAX_PART_HEADERS: usize = 16;

/// One part of a multipart body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimePart {
    pub content_type: Option<String>,
    pub disposition: Option<String>,
    pub transfer_encoding: Option<String>,
    pub content: Bytes,
}

impl MimePart {
    /// A part carrying `content` with no headers.
    pub fn new(content: impl Into<Bytes>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_disposition(mut self, disposition: impl Into<String>) -> Self {
        self.disposition = Some(disposition.into());
        self
    }

    pub fn with_transfer_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.transfer_encoding = Some(encoding.into());
        self
    }

    /// True when the disposition marks this part as an attachment.
    pub fn is_attachment(&self) -> bool {
        self.disposition.as_deref().is_some_and(|d| {
            d.split(';')
                .next()
                .is_some_and(|kind| kind.trim().eq_ignore_ascii_case("attachment"))
        })
    }

    /// A parameter of the `Content-Disposition` header, unquoted.
    pub fn disposition_param(&self, name: &str) -> Option<String> {
        disposition_param(self.disposition.as_deref()?, name)
    }
}

/// Find a parameter in a `Content-Disposition` value. Quoted values are
/// unescaped.
pub(crate) fn disposition_param(disposition: &str, name: &str) -> Option<String> {
    let mut rest = disposition.split_once(';')?.1;
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let (key, after_key) = rest.split_once('=')?;
        let after_key = after_key.trim_start();
        let (value, remaining) = if let Some(quoted) = after_key.strip_prefix('"') {
            let mut value = String::new();
            let mut chars = quoted.char_indices();
            let mut end = quoted.len();
            while let Some((i, ch)) = chars.next() {
                match ch {
                    '\\' => {
                        if let Some((_, escaped)) = chars.next() {
                            value.push(escaped);
                        }
                    }
                    '"' => {
                        end = i + 1;
                        break;
                    }
                    _ => value.push(ch),
                }
            }
            let remaining = quoted[end..].split_once(';').map_or("", |(_, r)| r);
            (value, remaining)
        } else {
            match after_key.split_once(';') {
                Some((value, remaining)) => (value.trim().to_string(), remaining),
                None => (after_key.trim().to_string(), ""),
            }
        };
        if key.trim().eq_ignore_ascii_case(name) {
            return Some(value);
        }
        rest = remaining;
    }
}

/// Builds a multipart body with a generated boundary.
#[derive(Debug)]
pub struct MultipartWriter {
    boundary: String,
    parts: Vec<MimePart>,
}

impl Default for MultipartWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl MultipartWriter {
    pub fn new() -> Self {
        Self {
            boundary: format!("sdata-{}", uuid::Uuid::new_v4().simple()),
            parts: Vec::new(),
        }
    }

    /// The boundary token separating parts.
    pub fn boundary(&self) -> &str {
        &self.boundary
    }

    pub fn add(&mut self, part: MimePart) {
        self.parts.push(part);
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Serialize every part followed by the closing delimiter.
    pub fn finish(self) -> Vec<u8> {
        let mut out = Vec::new();
        for part in &self.parts {
            out.extend_from_slice(format!("--{}\r\n", self.boundary).as_bytes());
            let headers = [
                ("Content-Type", &part.content_type),
                ("Content-Disposition", &part.disposition),
                ("Content-Transfer-Encoding", &part.transfer_encoding),
            ];
            for (name, value) in headers {
                if let Some(value) = value {
                    out.extend_from_slice(format!("{name}: {value}\r\n").as_bytes());
                }
            }
            out.extend_from_slice(b"\r\n");
            out.extend_from_slice(&part.content);
            out.extend_from_slice(b"\r\n");
        }
        out.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        out
    }
}

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn mime_error(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::Mime(msg.into()))
}

/// Split a multipart body into its parts.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Vec<MimePart>> {
    if boundary.is_empty() {
        return Err(mime_error("empty boundary"));
    }
    let delimiter = format!("--{boundary}").into_bytes();
    let separator = format!("\r\n--{boundary}").into_bytes();

    let mut pos = find(body, &delimiter, 0)
        .ok_or_else(|| mime_error("boundary not found in body"))?
        + delimiter.len();
    let mut parts = Vec::new();

    loop {
        if body[pos..].starts_with(b"--") {
            break;
        }
        // Transport padding after the delimiter, then the line break.
        while matches!(body.get(pos), Some(b' ' | b'\t')) {
            pos += 1;
        }
        if body[pos..].starts_with(b"\r\n") {
            pos += 2;
        } else if body[pos..].starts_with(b"\n") {
            pos += 1;
        } else {
            return Err(mime_error("malformed boundary line"));
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_PART_HEADERS];
        let (consumed, parsed) = match httparse::parse_headers(&body[pos..], &mut headers) {
            Ok(httparse::Status::Complete(done)) => done,
            Ok(httparse::Status::Partial) => return Err(mime_error("truncated part headers")),
            Err(err) => return Err(Error::with_source(ErrorKind::Mime(err.to_string()), err)),
        };

        let mut part = MimePart::default();
        for header in parsed {
            let value = String::from_utf8_lossy(header.value).trim().to_string();
            if header.name.eq_ignore_ascii_case("content-type") {
                part.content_type = Some(value);
            } else if header.name.eq_ignore_ascii_case("content-disposition") {
                part.disposition = Some(value);
            } else if header.name.eq_ignore_ascii_case("content-transfer-encoding") {
                part.transfer_encoding = Some(value);
            }
        }
        pos += consumed;

        let end = find(body, &separator, pos).ok_or_else(|| mime_error("unterminated part"))?;
        part.content = Bytes::copy_from_slice(&body[pos..end]);
        trace!(
            content_type = part.content_type.as_deref(),
            len = part.content.len(),
            "Parsed multipart part"
        );
        parts.push(part);
        pos = end + separator.len();
    }

    Ok(parts)
}

/// The boundary parameter of a multipart `Content-Type` header.
pub fn boundary_of(content_type: &str) -> Option<String> {
    let parsed: mime::Mime = content_type.trim().parse().ok()?;
    if parsed.type_() != mime::MULTIPART {
        return None;
    }
    parsed.get_param(mime::BOUNDARY).map(|b| b.as_str().to_string())
}
