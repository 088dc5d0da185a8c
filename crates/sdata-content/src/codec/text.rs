//! Scalars as plain UTF-8 text.

use super::{ContentHandler, MediaType};
use crate::error::{Error, Result};
use crate::value::Value;

#[derive(Debug, Clone, Copy, Default)]
pub struct TextHandler;

impl ContentHandler for TextHandler {
    fn write_to(&self, value: &Value, out: &mut Vec<u8>) -> Result<&'static str> {
        match value {
            Value::Scalar(scalar) => {
                if let Some(text) = scalar.to_text() {
                    out.extend_from_slice(text.as_bytes());
                }
                Ok(MediaType::Text.as_str())
            }
            other => Err(Error::serialization(format!(
                "text content must be a scalar, found {:?}",
                other.shape()
            ))),
        }
    }

    fn read_from(&self, bytes: &[u8]) -> Result<Value> {
        Ok(Value::from(String::from_utf8_lossy(bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Resource;

    #[test]
    fn test_text_codec() {
        let mut out = Vec::new();
        assert_eq!(TextHandler.write_to(&Value::from(42i64), &mut out).unwrap(), "text/plain");
        assert_eq!(out, b"42");

        out.clear();
        TextHandler.write_to(&Value::null(), &mut out).unwrap();
        assert!(out.is_empty());

        assert!(TextHandler
            .write_to(&Value::from(Resource::new()), &mut out)
            .is_err());
        assert_eq!(TextHandler.read_from(b"hello").unwrap().as_str(), Some("hello"));
    }
}
