//! The generic content model: scalars, resources and collections.

use std::fmt;

use serde::de::{self, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{
    is_protocol_key, ProtocolInfo, PROTOCOL_INFO_FIELD, RESOURCES_KEY, XML_HINTS_KEY,
};

/// Newtype name a collection with metadata serializes under.
///
/// Formats that ignore newtype names see the plain map form; the shape sniffer
/// and the value serializer use it to keep such a collection a sequence.
pub(crate) const COLLECTION_TOKEN: &str = "$sdata::Collection";

/// A leaf value.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Scalar {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

/// The concrete type of a non-null [`Scalar`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    Int,
    UInt,
    Float,
    Text,
}

impl Scalar {
    pub fn kind(&self) -> Option<ScalarKind> {
        match self {
            Scalar::Null => None,
            Scalar::Bool(_) => Some(ScalarKind::Bool),
            Scalar::Int(_) => Some(ScalarKind::Int),
            Scalar::UInt(_) => Some(ScalarKind::UInt),
            Scalar::Float(_) => Some(ScalarKind::Float),
            Scalar::Text(_) => Some(ScalarKind::Text),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Scalar::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Scalar::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Int(n) => Some(*n),
            Scalar::UInt(n) => i64::try_from(*n).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(n) => Some(*n as f64),
            Scalar::UInt(n) => Some(*n as f64),
            Scalar::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Invariant text form; `None` for null.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Scalar::Null => None,
            Scalar::Text(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => Ok(()),
            Scalar::Bool(b) => write!(f, "{b}"),
            Scalar::Int(n) => write!(f, "{n}"),
            Scalar::UInt(n) => write!(f, "{n}"),
            Scalar::Float(n) => write!(f, "{n}"),
            Scalar::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! scalar_from {
    ($($ty:ty => $variant:ident as $target:ty),* $(,)?) => {
        $(
            impl From<$ty> for Scalar {
                fn from(value: $ty) -> Self {
                    Scalar::$variant(<$target>::from(value))
                }
            }
        )*
    };
}

scalar_from! {
    bool => Bool as bool,
    i8 => Int as i64,
    i16 => Int as i64,
    i32 => Int as i64,
    i64 => Int as i64,
    u8 => UInt as u64,
    u16 => UInt as u64,
    u32 => UInt as u64,
    u64 => UInt as u64,
    f32 => Float as f64,
    f64 => Float as f64,
    String => Text as String,
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

impl Serialize for Scalar {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Scalar::Null => serializer.serialize_unit(),
            Scalar::Bool(b) => serializer.serialize_bool(*b),
            Scalar::Int(n) => serializer.serialize_i64(*n),
            Scalar::UInt(n) => serializer.serialize_u64(*n),
            Scalar::Float(n) => serializer.serialize_f64(*n),
            Scalar::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl<'de> Deserialize<'de> for Scalar {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Scalar(scalar) => Ok(scalar),
            other => Err(de::Error::custom(format!(
                "expected a scalar, found {:?}",
                other.shape()
            ))),
        }
    }
}

/// The classification of a value, decided once at the mapping boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    /// A leaf: text, number, boolean, null.
    Scalar,
    /// An ordered sequence.
    Sequence,
    /// A dictionary-like mapping of string keys.
    Mapping,
    /// A plain object with named members.
    Object,
}

/// A generic SData payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(Scalar),
    Resource(Resource),
    Collection(Collection),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(Scalar::Null)
    }
}

impl Value {
    pub fn null() -> Self {
        Value::Scalar(Scalar::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Scalar(Scalar::Null))
    }

    /// Resources report [`Shape::Mapping`], collections [`Shape::Sequence`].
    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::Scalar,
            Value::Resource(_) => Shape::Mapping,
            Value::Collection(_) => Shape::Sequence,
        }
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().and_then(Scalar::as_str)
    }

    pub fn as_resource(&self) -> Option<&Resource> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_resource_mut(&mut self) -> Option<&mut Resource> {
        match self {
            Value::Resource(r) => Some(r),
            _ => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_collection_mut(&mut self) -> Option<&mut Collection> {
        match self {
            Value::Collection(c) => Some(c),
            _ => None,
        }
    }

    /// Field lookup on a resource; `None` for anything else.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_resource().and_then(|r| r.get(key))
    }

    /// Protocol metadata of a resource or collection.
    pub fn protocol_info(&self) -> Option<&ProtocolInfo> {
        match self {
            Value::Resource(r) => r.info(),
            Value::Collection(c) => c.info(),
            Value::Scalar(_) => None,
        }
    }

    /// Mutable metadata slot of a resource or collection.
    pub fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        match self {
            Value::Resource(r) => Some(&mut r.info),
            Value::Collection(c) => Some(&mut c.info),
            Value::Scalar(_) => None,
        }
    }
}

macro_rules! value_from_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(value: $ty) -> Self {
                    Value::Scalar(Scalar::from(value))
                }
            }
        )*
    };
}

value_from_scalar!(bool, i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, String, &str);

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        Value::Scalar(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::null(), Into::into)
    }
}

impl From<Resource> for Value {
    fn from(value: Resource) -> Self {
        Value::Resource(value)
    }
}

impl From<Collection> for Value {
    fn from(value: Collection) -> Self {
        Value::Collection(value)
    }
}

/// An insertion-ordered set of named fields plus optional protocol metadata.
///
/// After mapping, field names never start with `$`.
///
/// A resource mapped from a typed value remembers the type's name. It names
/// the XML element when no metadata does, and is ignored by equality.
#[derive(Debug, Clone, Default)]
pub struct Resource {
    fields: Vec<(String, Value)>,
    info: Option<ProtocolInfo>,
    type_name: Option<String>,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields && self.info == other.info
    }
}

impl Resource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_info(info: ProtocolInfo) -> Self {
        Self {
            info: Some(info),
            ..Self::default()
        }
    }

    /// The name of the type this resource was mapped from, if any.
    pub fn type_name(&self) -> Option<&str> {
        self.type_name.as_deref()
    }

    pub fn set_type_name(&mut self, type_name: Option<String>) {
        self.type_name = type_name;
    }

    /// Builder form of [`Resource::insert`].
    pub fn field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Inserts a field, replacing an existing one in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        let key = key.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((key, value));
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.fields.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self.fields.iter().position(|(k, _)| k == key)?;
        Some(self.fields.remove(index).1)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn info(&self) -> Option<&ProtocolInfo> {
        self.info.as_ref()
    }

    pub fn info_mut(&mut self) -> Option<&mut ProtocolInfo> {
        self.info.as_mut()
    }

    /// Metadata, created empty on first use.
    pub fn info_or_default(&mut self) -> &mut ProtocolInfo {
        self.info.get_or_insert_with(ProtocolInfo::default)
    }

    pub fn set_info(&mut self, info: Option<ProtocolInfo>) {
        self.info = info;
    }

    pub(crate) fn info_slot(&self) -> &Option<ProtocolInfo> {
        &self.info
    }

    pub(crate) fn info_slot_mut(&mut self) -> &mut Option<ProtocolInfo> {
        &mut self.info
    }

    pub fn into_parts(self) -> (Vec<(String, Value)>, Option<ProtocolInfo>) {
        (self.fields, self.info)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Resource {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut resource = Resource::new();
        for (k, v) in iter {
            resource.insert(k, v);
        }
        resource
    }
}

impl IntoIterator for Resource {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}

/// The element type shared by every item of a collection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ItemType {
    /// Empty, all-null, or mixed items.
    #[default]
    Any,
    Resource,
    Collection,
    Scalar(ScalarKind),
}

impl ItemType {
    fn of(value: &Value) -> Option<ItemType> {
        match value {
            Value::Scalar(s) => s.kind().map(ItemType::Scalar),
            Value::Resource(_) => Some(ItemType::Resource),
            Value::Collection(_) => Some(ItemType::Collection),
        }
    }

    /// Exactly one concrete item type gives that type; otherwise `Any`.
    /// Null items do not take part.
    pub fn infer<'a>(items: impl IntoIterator<Item = &'a Value>) -> ItemType {
        let mut found = None;
        for item in items {
            let Some(item_type) = ItemType::of(item) else {
                continue;
            };
            match found {
                None => found = Some(item_type),
                Some(existing) if existing == item_type => {}
                Some(_) => return ItemType::Any,
            }
        }
        found.unwrap_or(ItemType::Any)
    }
}

/// An ordered list of values plus optional metadata for the set as a whole.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collection {
    items: Vec<Value>,
    item_type: ItemType,
    info: Option<ProtocolInfo>,
}

impl Collection {
    /// A collection whose item type is inferred from `items`.
    pub fn new(items: Vec<Value>) -> Self {
        let item_type = ItemType::infer(&items);
        Self {
            items,
            item_type,
            info: None,
        }
    }

    /// An empty collection declared for `item_type`.
    pub fn empty(item_type: ItemType) -> Self {
        Self {
            items: Vec::new(),
            item_type,
            info: None,
        }
    }

    pub fn with_info(mut self, info: ProtocolInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn push(&mut self, item: impl Into<Value>) {
        let item = item.into();
        if let Some(incoming) = ItemType::of(&item) {
            self.item_type = match self.item_type {
                ItemType::Any if self.items.iter().all(Value::is_null) => incoming,
                current if current == incoming => current,
                _ => ItemType::Any,
            };
        }
        self.items.push(item);
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn items(&self) -> &[Value] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<Value> {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.items.iter()
    }

    pub fn info(&self) -> Option<&ProtocolInfo> {
        self.info.as_ref()
    }

    pub fn info_mut(&mut self) -> Option<&mut ProtocolInfo> {
        self.info.as_mut()
    }

    pub fn info_or_default(&mut self) -> &mut ProtocolInfo {
        self.info.get_or_insert_with(ProtocolInfo::default)
    }

    pub fn set_info(&mut self, info: Option<ProtocolInfo>) {
        self.info = info;
    }

    pub(crate) fn info_slot(&self) -> &Option<ProtocolInfo> {
        &self.info
    }

    pub(crate) fn info_slot_mut(&mut self) -> &mut Option<ProtocolInfo> {
        &mut self.info
    }

    pub fn into_parts(self) -> (Vec<Value>, Option<ProtocolInfo>) {
        (self.items, self.info)
    }
}

impl FromIterator<Value> for Collection {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Collection::new(iter.into_iter().collect())
    }
}

impl IntoIterator for Collection {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

pub(crate) fn serialize_info_entries<M: SerializeMap>(
    map: &mut M,
    info: &ProtocolInfo,
) -> std::result::Result<(), M::Error> {
    for (property, value) in info.iter() {
        map.serialize_entry(property.wire_key(), value)?;
    }
    if !info.xml().is_empty() {
        map.serialize_entry(XML_HINTS_KEY, info.xml())?;
    }
    Ok(())
}

/// Map form of a collection carrying metadata: `$` members plus `$resources`.
pub(crate) struct CollectionMap<'a, T> {
    pub(crate) info: &'a ProtocolInfo,
    pub(crate) items: &'a [T],
}

impl<T: Serialize> Serialize for CollectionMap<'_, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        serialize_info_entries(&mut map, self.info)?;
        map.serialize_entry(RESOURCES_KEY, self.items)?;
        map.end()
    }
}

impl Serialize for Resource {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(info) = &self.info {
            serialize_info_entries(&mut map, info)?;
        }
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match &self.info {
            None => serializer.collect_seq(&self.items),
            Some(info) => serializer.serialize_newtype_struct(
                COLLECTION_TOKEN,
                &CollectionMap {
                    info,
                    items: &self.items,
                },
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Scalar(s) => s.serialize(serializer),
            Value::Resource(r) => r.serialize(serializer),
            Value::Collection(c) => c.serialize(serializer),
        }
    }
}

/// Build a resource or collection from map entries, moving `$` members
/// into protocol metadata.
///
/// A `$protocol` entry supplies the metadata outright and other `$` members
/// are dropped. Otherwise `$` members populate fresh metadata, which is only
/// attached when something was set. A `$resources` entry turns the mapping
/// into a collection.
pub(crate) fn assemble_mapping(entries: Vec<(String, Value)>, strict: bool) -> Result<Value> {
    let mut attached: Option<ProtocolInfo> = None;
    let mut reserved = Vec::new();
    let mut resources = None;
    let mut fields = Vec::with_capacity(entries.len());

    for (key, value) in entries {
        if key == PROTOCOL_INFO_FIELD {
            if !value.is_null() {
                attached = Some(crate::mapper::ContentMapper::default().deserialize(value)?);
            }
        } else if key == RESOURCES_KEY {
            resources = Some(value);
        } else if is_protocol_key(&key) {
            reserved.push((key, value));
        } else {
            fields.push((key, value));
        }
    }

    let info = match attached {
        Some(info) => Some(info),
        None => {
            let mut fresh = ProtocolInfo::default();
            for (key, value) in reserved {
                if !fresh.apply_wire_member(&key, value)? && strict {
                    return Err(Error::new(ErrorKind::UnknownProtocolProperty(key)));
                }
            }
            (!fresh.is_empty()).then_some(fresh)
        }
    };

    if resources.is_some() && !fields.is_empty() {
        let dropped: Vec<&str> = fields.iter().map(|(key, _)| key.as_str()).collect();
        debug!(?dropped, "ignoring plain members beside {RESOURCES_KEY}");
    }

    match resources {
        Some(Value::Collection(mut collection)) => {
            if info.is_some() {
                collection.info = info;
            }
            Ok(Value::Collection(collection))
        }
        Some(Value::Scalar(Scalar::Null)) => Ok(Value::Collection(Collection {
            info,
            ..Collection::default()
        })),
        Some(other) => Err(Error::deserialization(format!(
            "{RESOURCES_KEY} must be a sequence, found {:?}",
            other.shape()
        ))),
        None => Ok(Value::Resource(Resource {
            fields,
            info,
            type_name: None,
        })),
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any SData value")
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Value, E> {
        Ok(Value::from(v))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::null())
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::null())
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_newtype_struct<D: Deserializer<'de>>(
        self,
        d: D,
    ) -> std::result::Result<Value, D::Error> {
        Value::deserialize(d)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> std::result::Result<Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element::<Value>()? {
            items.push(item);
        }
        Ok(Value::Collection(Collection::new(items)))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Value, A::Error> {
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
        while let Some((key, value)) = map.next_entry::<String, Value>()? {
            entries.push((key, value));
        }
        assemble_mapping(entries, false).map_err(de::Error::custom)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        deserializer.deserialize_any(ValueVisitor)
    }
}

impl<'de> Deserialize<'de> for Resource {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Resource(r) => Ok(r),
            Value::Scalar(Scalar::Null) => Ok(Resource::default()),
            other => Err(de::Error::custom(format!(
                "expected a resource, found {:?}",
                other.shape()
            ))),
        }
    }
}

impl<'de> Deserialize<'de> for Collection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::Collection(c) => Ok(c),
            Value::Scalar(Scalar::Null) => Ok(Collection::default()),
            // A dictionary never becomes the items of a sequence.
            Value::Resource(r) => Ok(Collection {
                info: r.info,
                ..Collection::default()
            }),
            Value::Scalar(other) => Err(de::Error::custom(format!(
                "expected a collection, found {other:?}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ProtocolProperty;

    #[test]
    fn test_item_type_inference() {
        assert_eq!(ItemType::infer(std::iter::empty()), ItemType::Any);
        assert_eq!(
            ItemType::infer(&[Value::from("a"), Value::from("b")]),
            ItemType::Scalar(ScalarKind::Text)
        );
        assert_eq!(
            ItemType::infer(&[Value::from("a"), Value::from(1i64)]),
            ItemType::Any
        );
        assert_eq!(
            ItemType::infer(&[Value::null(), Value::from(Resource::new())]),
            ItemType::Resource
        );
    }

    #[test]
    fn test_push_tracks_item_type() {
        let mut c = Collection::default();
        assert_eq!(c.item_type(), ItemType::Any);
        c.push(Value::null());
        c.push("x");
        assert_eq!(c.item_type(), ItemType::Scalar(ScalarKind::Text));
        c.push(true);
        assert_eq!(c.item_type(), ItemType::Any);
    }

    #[test]
    fn test_resource_insert_replaces_in_place() {
        let mut r = Resource::new().field("a", 1i64).field("b", 2i64);
        let old = r.insert("a", 10i64);
        assert_eq!(old, Some(Value::from(1i64)));
        assert_eq!(r.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(r.get("a"), Some(&Value::from(10i64)));
    }

    #[test]
    fn test_json_mapping_extracts_protocol_members() {
        let value: Value = serde_json::from_value(serde_json::json!({
            "$key": "C1",
            "$etag": "abc",
            "Name": "Acme"
        }))
        .unwrap();

        let resource = value.as_resource().unwrap();
        assert_eq!(resource.keys().collect::<Vec<_>>(), vec!["Name"]);
        let info = resource.info().unwrap();
        assert_eq!(info.key(), Some("C1"));
        assert_eq!(info.etag(), Some("abc"));
    }

    #[test]
    fn test_json_mapping_without_members_has_no_info() {
        let value: Value = serde_json::from_value(serde_json::json!({"Name": "Acme"})).unwrap();
        assert!(value.protocol_info().is_none());
    }

    #[test]
    fn test_resources_member_becomes_collection() {
        let value: Value = serde_json::from_value(serde_json::json!({
            "$totalResults": 2,
            "$resources": [{"Name": "A"}, {"Name": "B"}]
        }))
        .unwrap();

        let collection = value.as_collection().unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.item_type(), ItemType::Resource);
        assert_eq!(
            collection.info().unwrap().get(ProtocolProperty::TotalResults),
            Some(&Scalar::UInt(2))
        );
    }

    #[test]
    fn test_plain_members_beside_resources_are_skipped() {
        let value: Value = serde_json::from_value(serde_json::json!({
            "$totalResults": 1,
            "extra": "x",
            "$resources": [{"a": 1}]
        }))
        .unwrap();

        let collection = value.as_collection().unwrap();
        assert_eq!(collection.len(), 1);
        assert_eq!(
            collection.info().unwrap().get(ProtocolProperty::TotalResults),
            Some(&Scalar::UInt(1))
        );
        assert!(collection.items()[0].get("extra").is_none());
    }

    #[test]
    fn test_collection_with_info_serializes_in_map_form() {
        let c = Collection::new(vec![Value::from(1i64)])
            .with_info(ProtocolInfo::new().with(ProtocolProperty::StartIndex, 1i64));
        let json = serde_json::to_value(Value::from(c)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"$startIndex": 1, "$resources": [1]})
        );
    }

    #[test]
    fn test_dictionary_never_fills_a_collection() {
        let c: Collection =
            serde_json::from_value(serde_json::json!({"$key": "K", "a": 1})).unwrap();
        assert!(c.is_empty());
        assert_eq!(c.info().and_then(|i| i.key()), Some("K"));
    }
}
