//! Wire codecs and the media types they serve.
//!
//! Each codec turns a [`Value`] into bytes and back. [`handler`] picks the
//! codec for a media type; types without one travel as raw bytes.

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};
use crate::value::Value;

pub mod atom;
pub mod json;
pub mod text;
pub mod xml;

/// Media types an SData exchange can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaType {
    Text,
    Html,
    Atom,
    AtomEntry,
    Rss,
    Xml,
    ImagePng,
    ImageJpeg,
    ImageGif,
    ImageTiff,
    ImageBmp,
    Xslt,
    Css,
    Json,
    Bson,
    Form,
    Multipart,
}

impl MediaType {
    /// The MIME string sent in `Content-Type` and `Accept` headers.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Text => "text/plain",
            MediaType::Html => "text/html",
            MediaType::Atom => "application/atom+xml",
            MediaType::AtomEntry => "application/atom+xml;type=entry",
            MediaType::Rss => "application/rss+xml",
            MediaType::Xml => "application/xml",
            MediaType::ImagePng => "image/png",
            MediaType::ImageJpeg => "image/jpeg",
            MediaType::ImageGif => "image/gif",
            MediaType::ImageTiff => "image/tiff",
            MediaType::ImageBmp => "image/bmp",
            MediaType::Xslt => "application/xslt+xml",
            MediaType::Css => "text/css",
            MediaType::Json => "application/json",
            MediaType::Bson => "application/bson",
            MediaType::Form => "application/x-www-form-urlencoded",
            MediaType::Multipart => "multipart/related",
        }
    }

    /// Resolve a `Content-Type` header value, parameters included.
    pub fn parse(content_type: &str) -> Option<Self> {
        let parsed: mime::Mime = content_type.trim().parse().ok()?;
        if parsed.type_() == mime::MULTIPART {
            return Some(MediaType::Multipart);
        }
        let media = match parsed.essence_str() {
            "text/plain" => MediaType::Text,
            "text/html" => MediaType::Html,
            "application/atom+xml" => {
                let entry = parsed
                    .get_param("type")
                    .is_some_and(|t| t.as_str().eq_ignore_ascii_case("entry"));
                if entry {
                    MediaType::AtomEntry
                } else {
                    MediaType::Atom
                }
            }
            "application/rss+xml" => MediaType::Rss,
            "application/xml" | "text/xml" => MediaType::Xml,
            "image/png" => MediaType::ImagePng,
            "image/jpeg" | "image/jpg" => MediaType::ImageJpeg,
            "image/gif" => MediaType::ImageGif,
            "image/tiff" => MediaType::ImageTiff,
            "image/bmp" => MediaType::ImageBmp,
            "application/xslt+xml" | "text/xsl" => MediaType::Xslt,
            "text/css" => MediaType::Css,
            "application/json" | "text/json" => MediaType::Json,
            "application/bson" => MediaType::Bson,
            "application/x-www-form-urlencoded" => MediaType::Form,
            _ => return None,
        };
        Some(media)
    }

    /// Types whose body is read as plain text.
    pub fn is_textual(&self) -> bool {
        matches!(
            self,
            MediaType::Text | MediaType::Html | MediaType::Css | MediaType::Xslt
        )
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MediaType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::new(ErrorKind::UnsupportedContentType(s.to_string())))
    }
}

/// Reads and writes one wire format.
pub trait ContentHandler: Send + Sync {
    /// Append the encoding of `value` to `out`; returns the content type
    /// written.
    fn write_to(&self, value: &Value, out: &mut Vec<u8>) -> Result<&'static str>;

    fn read_from(&self, bytes: &[u8]) -> Result<Value>;
}

/// The codec serving `media`, if any.
pub fn handler(media: MediaType) -> Option<&'static dyn ContentHandler> {
    match media {
        MediaType::Json => Some(&json::JsonHandler),
        MediaType::Atom | MediaType::AtomEntry => Some(&atom::AtomHandler),
        MediaType::Xml => Some(&xml::XmlHandler),
        MediaType::Text | MediaType::Html => Some(&text::TextHandler),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_content_types() {
        assert_eq!(MediaType::parse("application/json; charset=utf-8"), Some(MediaType::Json));
        assert_eq!(MediaType::parse("application/atom+xml"), Some(MediaType::Atom));
        assert_eq!(
            MediaType::parse("application/atom+xml; type=entry"),
            Some(MediaType::AtomEntry)
        );
        assert_eq!(
            MediaType::parse("multipart/form-data; boundary=abc"),
            Some(MediaType::Multipart)
        );
        assert_eq!(MediaType::parse("text/xml"), Some(MediaType::Xml));
        assert_eq!(MediaType::parse("application/pdf"), None);
        assert_eq!(MediaType::parse("not a type"), None);
    }

    #[test]
    fn test_mime_strings_parse_back() {
        let all = [
            MediaType::Text,
            MediaType::Html,
            MediaType::Atom,
            MediaType::AtomEntry,
            MediaType::Rss,
            MediaType::Xml,
            MediaType::ImagePng,
            MediaType::ImageJpeg,
            MediaType::ImageGif,
            MediaType::ImageTiff,
            MediaType::ImageBmp,
            MediaType::Xslt,
            MediaType::Css,
            MediaType::Json,
            MediaType::Bson,
            MediaType::Form,
            MediaType::Multipart,
        ];
        for media in all {
            assert_eq!(media.as_str().parse::<MediaType>().unwrap(), media);
        }
    }

    #[test]
    fn test_unsupported_type_error() {
        let err = "application/pdf".parse::<MediaType>().unwrap_err();
        assert_eq!(err.to_string(), "Content type 'application/pdf' not supported");
    }

    #[test]
    fn test_handlers() {
        assert!(handler(MediaType::Json).is_some());
        assert!(handler(MediaType::AtomEntry).is_some());
        assert!(handler(MediaType::ImagePng).is_none());
        assert!(handler(MediaType::Multipart).is_none());
    }
}
