//! Protocol metadata attached to resources and collections.
//!
//! Every SData payload may carry protocol-level properties next to its
//! business fields: the resource key, its canonical URL, an ETag, feed paging
//! counters and so on. On the wire these travel as `$`-prefixed members
//! (`$key`, `$etag`, `$totalResults`); in memory they live in a
//! [`ProtocolInfo`] that is kept apart from the field map.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::de::{self, IgnoredAny, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::value::Scalar;

/// Prefix that marks a member name as reserved for protocol metadata.
pub const PROTOCOL_PREFIX: char = '$';

/// Map-form member holding the items of a collection.
pub const RESOURCES_KEY: &str = "$resources";

/// Map-form member holding [`XmlHints`].
pub const XML_HINTS_KEY: &str = "$xml";

/// Struct member that holds an object's own [`ProtocolInfo`].
pub const PROTOCOL_INFO_FIELD: &str = "$protocol";

/// Returns true if `key` is reserved for protocol metadata.
pub fn is_protocol_key(key: &str) -> bool {
    key.starts_with(PROTOCOL_PREFIX)
}

/// A protocol-level property that may be attached to a resource or collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ProtocolProperty {
    Id,
    Title,
    Updated,
    HttpMethod,
    HttpStatus,
    HttpMessage,
    Location,
    ETag,
    IfMatch,
    Key,
    Url,
    Uuid,
    Lookup,
    Descriptor,
    IsDeleted,
    SchemaName,
    TotalResults,
    StartIndex,
    ItemsPerPage,
}

impl ProtocolProperty {
    /// Every protocol property, in declaration order.
    pub const ALL: [ProtocolProperty; 19] = [
        ProtocolProperty::Id,
        ProtocolProperty::Title,
        ProtocolProperty::Updated,
        ProtocolProperty::HttpMethod,
        ProtocolProperty::HttpStatus,
        ProtocolProperty::HttpMessage,
        ProtocolProperty::Location,
        ProtocolProperty::ETag,
        ProtocolProperty::IfMatch,
        ProtocolProperty::Key,
        ProtocolProperty::Url,
        ProtocolProperty::Uuid,
        ProtocolProperty::Lookup,
        ProtocolProperty::Descriptor,
        ProtocolProperty::IsDeleted,
        ProtocolProperty::SchemaName,
        ProtocolProperty::TotalResults,
        ProtocolProperty::StartIndex,
        ProtocolProperty::ItemsPerPage,
    ];

    /// The property name, as used in member annotations (`ETag`, `Key`).
    pub fn name(&self) -> &'static str {
        match self {
            ProtocolProperty::Id => "Id",
            ProtocolProperty::Title => "Title",
            ProtocolProperty::Updated => "Updated",
            ProtocolProperty::HttpMethod => "HttpMethod",
            ProtocolProperty::HttpStatus => "HttpStatus",
            ProtocolProperty::HttpMessage => "HttpMessage",
            ProtocolProperty::Location => "Location",
            ProtocolProperty::ETag => "ETag",
            ProtocolProperty::IfMatch => "IfMatch",
            ProtocolProperty::Key => "Key",
            ProtocolProperty::Url => "Url",
            ProtocolProperty::Uuid => "Uuid",
            ProtocolProperty::Lookup => "Lookup",
            ProtocolProperty::Descriptor => "Descriptor",
            ProtocolProperty::IsDeleted => "IsDeleted",
            ProtocolProperty::SchemaName => "SchemaName",
            ProtocolProperty::TotalResults => "TotalResults",
            ProtocolProperty::StartIndex => "StartIndex",
            ProtocolProperty::ItemsPerPage => "ItemsPerPage",
        }
    }

    /// The `$`-prefixed lower-camel member name used on the wire.
    pub fn wire_key(&self) -> &'static str {
        match self {
            ProtocolProperty::Id => "$id",
            ProtocolProperty::Title => "$title",
            ProtocolProperty::Updated => "$updated",
            ProtocolProperty::HttpMethod => "$httpMethod",
            ProtocolProperty::HttpStatus => "$httpStatus",
            ProtocolProperty::HttpMessage => "$httpMessage",
            ProtocolProperty::Location => "$location",
            ProtocolProperty::ETag => "$etag",
            ProtocolProperty::IfMatch => "$ifMatch",
            ProtocolProperty::Key => "$key",
            ProtocolProperty::Url => "$url",
            ProtocolProperty::Uuid => "$uuid",
            ProtocolProperty::Lookup => "$lookup",
            ProtocolProperty::Descriptor => "$descriptor",
            ProtocolProperty::IsDeleted => "$isDeleted",
            ProtocolProperty::SchemaName => "$schemaName",
            ProtocolProperty::TotalResults => "$totalResults",
            ProtocolProperty::StartIndex => "$startIndex",
            ProtocolProperty::ItemsPerPage => "$itemsPerPage",
        }
    }

    /// Resolve a `$`-prefixed member name. Matching ignores ASCII case.
    pub fn from_wire_key(key: &str) -> Option<Self> {
        let name = key.strip_prefix(PROTOCOL_PREFIX)?;
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for ProtocolProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProtocolProperty {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.strip_prefix(PROTOCOL_PREFIX).unwrap_or(s);
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                crate::Error::new(crate::ErrorKind::UnknownProtocolProperty(s.to_string()))
            })
    }
}

/// Rendering hints for XML and JSON codecs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct XmlHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Render a collection without a wrapper element.
    #[serde(skip_serializing_if = "is_false")]
    pub is_flat: bool,
    /// Render a collection as a plain JSON array, dropping feed-level metadata.
    #[serde(skip_serializing_if = "is_false")]
    pub is_simple_array: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl XmlHints {
    /// Hints carrying only an element name.
    pub fn named(local_name: impl Into<String>) -> Self {
        Self {
            local_name: Some(local_name.into()),
            ..Default::default()
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn flat(mut self) -> Self {
        self.is_flat = true;
        self
    }

    pub fn simple_array(mut self) -> Self {
        self.is_simple_array = true;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.local_name.is_none() && self.namespace.is_none() && !self.is_flat && !self.is_simple_array
    }

    /// Overlay `other` onto `self`; set values in `other` win.
    pub fn merge(&mut self, other: &XmlHints) {
        if other.local_name.is_some() {
            self.local_name.clone_from(&other.local_name);
        }
        if other.namespace.is_some() {
            self.namespace.clone_from(&other.namespace);
        }
        self.is_flat |= other.is_flat;
        self.is_simple_array |= other.is_simple_array;
    }
}

/// Protocol metadata for a resource or collection.
///
/// A property that was never set reads as `None`, never as a zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProtocolInfo {
    values: BTreeMap<ProtocolProperty, Scalar>,
    xml: XmlHints,
}

impl ProtocolInfo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the value of `property`, if set.
    pub fn get(&self, property: ProtocolProperty) -> Option<&Scalar> {
        self.values.get(&property)
    }

    /// Returns the value of `property` when it is text.
    pub fn get_str(&self, property: ProtocolProperty) -> Option<&str> {
        self.get(property).and_then(Scalar::as_str)
    }

    /// Sets `property`. Setting [`Scalar::Null`] removes it.
    pub fn set(&mut self, property: ProtocolProperty, value: impl Into<Scalar>) {
        match value.into() {
            Scalar::Null => {
                self.values.remove(&property);
            }
            value => {
                self.values.insert(property, value);
            }
        }
    }

    /// Builder form of [`ProtocolInfo::set`].
    pub fn with(mut self, property: ProtocolProperty, value: impl Into<Scalar>) -> Self {
        self.set(property, value);
        self
    }

    pub fn remove(&mut self, property: ProtocolProperty) -> Option<Scalar> {
        self.values.remove(&property)
    }

    pub fn contains(&self, property: ProtocolProperty) -> bool {
        self.values.contains_key(&property)
    }

    /// Iterate over the set properties in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (ProtocolProperty, &Scalar)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    /// Number of set properties.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True when no property is set and no hint is present.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.xml.is_empty()
    }

    pub fn xml(&self) -> &XmlHints {
        &self.xml
    }

    pub fn xml_mut(&mut self) -> &mut XmlHints {
        &mut self.xml
    }

    pub fn key(&self) -> Option<&str> {
        self.get_str(ProtocolProperty::Key)
    }

    pub fn etag(&self) -> Option<&str> {
        self.get_str(ProtocolProperty::ETag)
    }

    pub fn url(&self) -> Option<&str> {
        self.get_str(ProtocolProperty::Url)
    }

    /// Apply the value of a `$`-prefixed member.
    ///
    /// `$xml` is read as [`XmlHints`]. Returns false when `key` does not name
    /// a protocol property.
    pub(crate) fn apply_wire_member(&mut self, key: &str, value: crate::Value) -> crate::Result<bool> {
        if key == XML_HINTS_KEY {
            let hints: XmlHints = crate::mapper::ContentMapper::default().deserialize(value)?;
            self.xml.merge(&hints);
            return Ok(true);
        }
        let Some(property) = ProtocolProperty::from_wire_key(key) else {
            return Ok(false);
        };
        match value {
            crate::Value::Scalar(scalar) => {
                self.set(property, scalar);
                Ok(true)
            }
            other => Err(crate::Error::deserialization(format!(
                "protocol property {key} must be a scalar, found {:?}",
                other.shape()
            ))),
        }
    }
}

impl Serialize for ProtocolInfo {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let hinted = !self.xml.is_empty();
        let mut map = serializer.serialize_map(Some(self.values.len() + usize::from(hinted)))?;
        for (property, value) in &self.values {
            map.serialize_entry(property.wire_key(), value)?;
        }
        if hinted {
            map.serialize_entry(XML_HINTS_KEY, &self.xml)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ProtocolInfo {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InfoVisitor;

        impl<'de> Visitor<'de> for InfoVisitor {
            type Value = ProtocolInfo;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of protocol properties")
            }

            fn visit_unit<E: de::Error>(self) -> Result<ProtocolInfo, E> {
                Ok(ProtocolInfo::default())
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<ProtocolInfo, A::Error> {
                let mut info = ProtocolInfo::default();
                while let Some(key) = map.next_key::<String>()? {
                    if key == XML_HINTS_KEY {
                        info.xml = map.next_value()?;
                    } else if let Some(property) = ProtocolProperty::from_wire_key(&key) {
                        let value: Scalar = map.next_value()?;
                        info.set(property, value);
                    } else {
                        map.next_value::<IgnoredAny>()?;
                    }
                }
                Ok(info)
            }
        }

        deserializer.deserialize_any(InfoVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_keys_resolve_case_insensitively() {
        assert_eq!(ProtocolProperty::from_wire_key("$key"), Some(ProtocolProperty::Key));
        assert_eq!(ProtocolProperty::from_wire_key("$ETag"), Some(ProtocolProperty::ETag));
        assert_eq!(ProtocolProperty::from_wire_key("$etag"), Some(ProtocolProperty::ETag));
        assert_eq!(
            ProtocolProperty::from_wire_key("$TOTALRESULTS"),
            Some(ProtocolProperty::TotalResults)
        );
        assert_eq!(ProtocolProperty::from_wire_key("key"), None);
        assert_eq!(ProtocolProperty::from_wire_key("$colour"), None);
    }

    #[test]
    fn test_every_wire_key_round_trips() {
        for property in ProtocolProperty::ALL {
            assert!(property.wire_key().starts_with('$'));
            assert_eq!(ProtocolProperty::from_wire_key(property.wire_key()), Some(property));
            assert_eq!(property.name().parse::<ProtocolProperty>().unwrap(), property);
        }
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let err = "Colour".parse::<ProtocolProperty>().unwrap_err();
        assert!(matches!(err.kind, crate::ErrorKind::UnknownProtocolProperty(_)));
    }

    #[test]
    fn test_unset_property_is_absent() {
        let info = ProtocolInfo::new();
        assert!(info.get(ProtocolProperty::HttpStatus).is_none());
        assert!(info.key().is_none());
        assert!(info.is_empty());
    }

    #[test]
    fn test_setting_null_removes() {
        let mut info = ProtocolInfo::new().with(ProtocolProperty::Key, "A1");
        assert_eq!(info.key(), Some("A1"));
        info.set(ProtocolProperty::Key, Scalar::Null);
        assert!(!info.contains(ProtocolProperty::Key));
    }

    #[test]
    fn test_serializes_as_wire_members() {
        let mut info = ProtocolInfo::new()
            .with(ProtocolProperty::Key, "A1")
            .with(ProtocolProperty::TotalResults, 42i64);
        info.xml_mut().local_name = Some("account".into());

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "$key": "A1",
                "$totalResults": 42,
                "$xml": {"localName": "account"}
            })
        );

        let back: ProtocolInfo = serde_json::from_value(json).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_hint_merge_prefers_set_values() {
        let mut hints = XmlHints::named("contact").with_namespace("urn:a");
        hints.merge(&XmlHints::named("person").flat());
        assert_eq!(hints.local_name.as_deref(), Some("person"));
        assert_eq!(hints.namespace.as_deref(), Some("urn:a"));
        assert!(hints.is_flat);
    }
}
