//! Files attached to requests and responses.

use bytes::Bytes;

use crate::multipart::MimePart;

const OCTET_STREAM: &str = "application/octet-stream";

/// A binary file travelling in a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedFile {
    content_type: Option<String>,
    file_name: Option<String>,
    content: Bytes,
}

impl AttachedFile {
    pub fn new(
        content_type: Option<String>,
        file_name: Option<String>,
        content: impl Into<Bytes>,
    ) -> Self {
        Self {
            content_type,
            file_name,
            content: content.into(),
        }
    }

    /// Recover a file from a received attachment part.
    pub fn from_part(part: &MimePart) -> Self {
        let file_name = part.disposition.as_deref().and_then(file_name_from_disposition);
        Self {
            content_type: part.content_type.clone(),
            file_name,
            content: part.content.clone(),
        }
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn file_name(&self) -> Option<&str> {
        self.file_name.as_deref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    /// The outgoing part for this file.
    pub fn to_part(&self) -> MimePart {
        MimePart::new(self.content.clone())
            .with_content_type(self.content_type.as_deref().unwrap_or(OCTET_STREAM))
            .with_transfer_encoding("binary")
            .with_disposition(attachment_disposition(self.file_name.as_deref()))
    }
}

/// `attachment` disposition naming `file_name`.
///
/// ASCII names use `filename=`, quoted when they contain spaces. Other names
/// use the RFC 5987 form `filename*=utf-8''<percent-encoded>`.
pub(crate) fn attachment_disposition(file_name: Option<&str>) -> String {
    let Some(name) = file_name else {
        return "attachment".to_string();
    };
    if name.is_ascii() {
        if name.contains(' ') {
            format!("attachment; filename=\"{}\"", name.replace('"', "\\\""))
        } else {
            format!("attachment; filename={name}")
        }
    } else {
        format!("attachment; filename*=utf-8''{}", urlencoding::encode(name))
    }
}

fn file_name_from_disposition(disposition: &str) -> Option<String> {
    if let Some(name) = crate::multipart::disposition_param(disposition, "filename") {
        return Some(name);
    }
    let extended = crate::multipart::disposition_param(disposition, "filename*")?;
    let encoded = match extended.find("''") {
        Some(pos) => &extended[pos + 2..],
        None => extended.as_str(),
    };
    Some(
        urlencoding::decode(encoded)
            .map(|name| name.into_owned())
            .unwrap_or_else(|_| encoded.to_string()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispositions() {
        assert_eq!(attachment_disposition(None), "attachment");
        assert_eq!(
            attachment_disposition(Some("report.pdf")),
            "attachment; filename=report.pdf"
        );
        assert_eq!(
            attachment_disposition(Some("annual report.pdf")),
            "attachment; filename=\"annual report.pdf\""
        );
        assert_eq!(
            attachment_disposition(Some("résumé.txt")),
            "attachment; filename*=utf-8''r%C3%A9sum%C3%A9.txt"
        );
    }

    #[test]
    fn test_round_trip_through_part() {
        for name in ["plain.txt", "with space.txt", "naïve.txt"] {
            let file = AttachedFile::new(None, Some(name.to_string()), &b"data"[..]);
            let part = file.to_part();
            assert!(part.is_attachment());
            assert_eq!(part.content_type.as_deref(), Some("application/octet-stream"));

            let back = AttachedFile::from_part(&part);
            assert_eq!(back.file_name(), Some(name));
            assert_eq!(back.content().as_ref(), b"data");
        }
    }

    #[test]
    fn test_part_without_name() {
        let part = MimePart::new("x").with_disposition("attachment");
        assert_eq!(AttachedFile::from_part(&part).file_name(), None);
    }
}
