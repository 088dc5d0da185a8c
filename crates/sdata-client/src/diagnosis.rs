//! Diagnoses reported in SData error bodies.
//!
//! Servers describe failures as `sdata:diagnosis` elements in XML, or as
//! `$`-prefixed objects in JSON (a bare array, a `$diagnoses` member, or a
//! single object).

use std::fmt;

use sdata_content::codec::{handler, MediaType};
use sdata_content::{ContentMapper, Value};
use serde::{Deserialize, Serialize};

/// One problem reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnosis {
    #[serde(alias = "$severity")]
    pub severity: Option<String>,
    #[serde(alias = "$sdataCode")]
    pub sdata_code: Option<String>,
    #[serde(alias = "$applicationCode")]
    pub application_code: Option<String>,
    #[serde(alias = "$message")]
    pub message: Option<String>,
    #[serde(alias = "$stackTrace")]
    pub stack_trace: Option<String>,
    #[serde(alias = "$payloadPath")]
    pub payload_path: Option<String>,
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(code) = self.sdata_code.as_deref().or(self.application_code.as_deref()) {
            write!(f, "[{code}] ")?;
        }
        f.write_str(self.message.as_deref().unwrap_or("no message"))
    }
}

impl Diagnosis {
    fn is_blank(&self) -> bool {
        self.message.is_none() && self.sdata_code.is_none() && self.application_code.is_none()
    }
}

/// Extract diagnoses from an error body. Bodies that carry none give an
/// empty list.
pub fn parse_diagnoses(media: Option<MediaType>, body: &[u8]) -> Vec<Diagnosis> {
    let found = match media {
        Some(MediaType::Json) => from_json(body),
        Some(MediaType::Xml) => from_xml(body),
        _ => Vec::new(),
    };
    found.into_iter().filter(|d| !d.is_blank()).collect()
}

fn from_json(body: &[u8]) -> Vec<Diagnosis> {
    let Ok(root) = serde_json::from_slice::<serde_json::Value>(body) else {
        return Vec::new();
    };
    let list = match root {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("$diagnoses") {
            Some(serde_json::Value::Array(items)) => items,
            _ => vec![serde_json::Value::Object(map)],
        },
        _ => return Vec::new(),
    };
    list.into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect()
}

fn from_xml(body: &[u8]) -> Vec<Diagnosis> {
    let Some(xml) = handler(MediaType::Xml) else {
        return Vec::new();
    };
    let Ok(root) = xml.read_from(body) else {
        return Vec::new();
    };

    let mapper = ContentMapper::default();
    let entries: Vec<Value> = match root {
        Value::Collection(items) => items.into_iter().collect(),
        Value::Resource(mut resource) => match resource.remove("diagnosis") {
            Some(Value::Collection(items)) => items.into_iter().collect(),
            Some(single) => vec![single],
            None => vec![Value::Resource(resource)],
        },
        Value::Scalar(_) => Vec::new(),
    };
    entries
        .into_iter()
        .filter_map(|entry| mapper.deserialize::<Diagnosis>(entry).ok())
        .collect()
}
