//! SData JSON.
//!
//! Protocol properties travel as `$` members. A collection with metadata is
//! written as `{"$...": .., "$resources": [...]}`, one without as a plain
//! array. XML hints never reach the wire, and simple arrays are always
//! plain arrays.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{ContentHandler, MediaType};
use crate::error::Result;
use crate::protocol::{ProtocolInfo, RESOURCES_KEY};
use crate::value::{Collection, Value};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonHandler;

impl ContentHandler for JsonHandler {
    fn write_to(&self, value: &Value, out: &mut Vec<u8>) -> Result<&'static str> {
        serde_json::to_writer(&mut *out, &Wire(value))?;
        Ok(MediaType::Json.as_str())
    }

    fn read_from(&self, bytes: &[u8]) -> Result<Value> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Value::null());
        }
        Ok(serde_json::from_slice(bytes)?)
    }
}

struct Wire<'a>(&'a Value);

struct Items<'a>(&'a Collection);

fn serialize_properties<M: SerializeMap>(
    map: &mut M,
    info: &ProtocolInfo,
) -> std::result::Result<(), M::Error> {
    for (property, value) in info.iter() {
        map.serialize_entry(property.wire_key(), value)?;
    }
    Ok(())
}

impl Serialize for Items<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter().map(Wire))
    }
}

impl Serialize for Wire<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.0 {
            Value::Scalar(scalar) => scalar.serialize(serializer),
            Value::Resource(resource) => {
                let mut map = serializer.serialize_map(None)?;
                if let Some(info) = resource.info() {
                    serialize_properties(&mut map, info)?;
                }
                for (key, value) in resource.iter() {
                    map.serialize_entry(key, &Wire(value))?;
                }
                map.end()
            }
            Value::Collection(collection) => match collection.info() {
                Some(info) if info.iter().next().is_some() && !info.xml().is_simple_array => {
                    let mut map = serializer.serialize_map(None)?;
                    serialize_properties(&mut map, info)?;
                    map.serialize_entry(RESOURCES_KEY, &Items(collection))?;
                    map.end()
                }
                _ => Items(collection).serialize(serializer),
            },
        }
    }
}
