//! serde `Deserializer` reading from [`Value`]s.
//!
//! Conversions are lenient where the wire is: text parses into numbers and
//! booleans, numbers format into text, and `Null` reads as the zero value of
//! any target that is not an `Option`.

use serde::de::value::{StringDeserializer, U32Deserializer};
use serde::de::{
    self, DeserializeSeed, Deserializer as _, EnumAccess, IntoDeserializer, MapAccess, SeqAccess, VariantAccess,
    Visitor,
};

use crate::error::{Error, Result};
use crate::mapper::{ContentMapper, MissingMembers};
use crate::protocol::{
    is_protocol_key, ProtocolInfo, ProtocolProperty, PROTOCOL_INFO_FIELD, RESOURCES_KEY,
    XML_HINTS_KEY,
};
use crate::value::{Collection, Scalar, Value};

pub(crate) struct ValueDeserializer<'a> {
    pub(crate) value: Value,
    pub(crate) mapper: &'a ContentMapper,
}

impl<'a> ValueDeserializer<'a> {
    pub(crate) fn new(value: Value, mapper: &'a ContentMapper) -> Self {
        Self { value, mapper }
    }
}

fn parse_bool(text: &str) -> Option<bool> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("true") || text == "1" {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") || text == "0" {
        Some(false)
    } else {
        None
    }
}

fn invalid_text(text: &str, expected: &str) -> Error {
    Error::deserialization(format!("cannot convert {text:?} to {expected}"))
}

fn visit_scalar<'de, V: Visitor<'de>>(scalar: Scalar, visitor: V) -> Result<V::Value> {
    match scalar {
        Scalar::Null => visitor.visit_unit(),
        Scalar::Bool(b) => visitor.visit_bool(b),
        Scalar::Int(n) => visitor.visit_i64(n),
        Scalar::UInt(n) => visitor.visit_u64(n),
        Scalar::Float(n) => visitor.visit_f64(n),
        Scalar::Text(s) => visitor.visit_string(s),
    }
}

/// Protocol properties offered back as `$` members.
fn protocol_entries(
    info: &ProtocolInfo,
    with_hints: bool,
) -> Result<Vec<(String, Value)>> {
    let mut entries: Vec<(String, Value)> = info
        .iter()
        .map(|(property, value)| (property.wire_key().to_string(), Value::Scalar(value.clone())))
        .collect();
    if with_hints && !info.xml().is_empty() {
        entries.push((
            XML_HINTS_KEY.to_string(),
            ContentMapper::default().serialize(info.xml())?,
        ));
    }
    Ok(entries)
}

/// Split a mapping-like value into members and metadata. Collections yield
/// their items under `$resources`.
fn into_members(value: Value) -> Option<(Vec<(String, Value)>, Option<ProtocolInfo>)> {
    match value {
        Value::Resource(resource) => Some(resource.into_parts()),
        Value::Collection(collection) => {
            let (items, info) = collection.into_parts();
            Some((
                vec![(
                    RESOURCES_KEY.to_string(),
                    Value::Collection(Collection::new(items)),
                )],
                info,
            ))
        }
        Value::Scalar(_) => None,
    }
}

impl<'a> ValueDeserializer<'a> {
    fn deserialize_integer<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_i64(0),
            Value::Scalar(Scalar::Int(n)) => visitor.visit_i64(n),
            Value::Scalar(Scalar::UInt(n)) => visitor.visit_u64(n),
            Value::Scalar(Scalar::Bool(b)) => visitor.visit_u64(u64::from(b)),
            Value::Scalar(Scalar::Float(f))
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 =>
            {
                visitor.visit_i64(f as i64)
            }
            Value::Scalar(Scalar::Text(text)) => {
                let trimmed = text.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    visitor.visit_i64(n)
                } else if let Ok(n) = trimmed.parse::<u64>() {
                    visitor.visit_u64(n)
                } else {
                    Err(invalid_text(&text, "an integer"))
                }
            }
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_float<'de, V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_f64(0.0),
            Value::Scalar(Scalar::Text(text)) => match text.trim().parse::<f64>() {
                Ok(n) => visitor.visit_f64(n),
                Err(_) => Err(invalid_text(&text, "a number")),
            },
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_members<'de, V: Visitor<'de>>(
        self,
        with_hints: bool,
        visitor: V,
    ) -> Result<V::Value> {
        let mapper = self.mapper;
        match into_members(self.value) {
            Some((fields, info)) => {
                let mut entries = match &info {
                    Some(info) => protocol_entries(info, with_hints)?,
                    None => Vec::new(),
                };
                entries.extend(fields);
                visitor.visit_map(EntriesAccess::new(entries, mapper))
            }
            None => Err(not_a_mapping()),
        }
    }
}

fn not_a_mapping() -> Error {
    Error::deserialization("scalar value cannot be read as a mapping")
}

impl<'de> de::Deserializer<'de> for ValueDeserializer<'_> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(scalar) => visit_scalar(scalar, visitor),
            Value::Resource(_) => self.deserialize_members(true, visitor),
            Value::Collection(collection) => {
                if collection.info().is_some() {
                    ValueDeserializer::new(Value::Collection(collection), self.mapper)
                        .deserialize_members(true, visitor)
                } else {
                    let (items, _) = collection.into_parts();
                    visitor.visit_seq(ItemsAccess::new(items, self.mapper))
                }
            }
        }
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_bool(false),
            Value::Scalar(Scalar::Bool(b)) => visitor.visit_bool(b),
            Value::Scalar(Scalar::Int(n)) => visitor.visit_bool(n != 0),
            Value::Scalar(Scalar::UInt(n)) => visitor.visit_bool(n != 0),
            Value::Scalar(Scalar::Text(text)) => match parse_bool(&text) {
                Some(b) => visitor.visit_bool(b),
                None => Err(invalid_text(&text, "a boolean")),
            },
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_i8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_i128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u8<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u16<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_u128<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_integer(visitor)
    }

    fn deserialize_f32<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_float(visitor)
    }

    fn deserialize_f64<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_float(visitor)
    }

    fn deserialize_char<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Text(text)) => {
                let mut chars = text.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => visitor.visit_char(c),
                    _ => Err(invalid_text(&text, "a single character")),
                }
            }
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_str<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_string<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_str(""),
            Value::Scalar(Scalar::Text(text)) => visitor.visit_string(text),
            Value::Scalar(other) => visitor.visit_string(other.to_string()),
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_bytes<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_byte_buf(visitor)
    }

    fn deserialize_byte_buf<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_byte_buf(Vec::new()),
            Value::Scalar(Scalar::Text(text)) => visitor.visit_byte_buf(text.into_bytes()),
            other => ValueDeserializer::new(other, self.mapper).deserialize_seq(visitor),
        }
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        if self.value.is_null() {
            visitor.visit_none()
        } else {
            visitor.visit_some(self)
        }
    }

    fn deserialize_unit<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => visitor.visit_unit(),
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_unit_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_unit(visitor)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_seq<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Collection(collection) => {
                let (items, _) = collection.into_parts();
                visitor.visit_seq(ItemsAccess::new(items, self.mapper))
            }
            // A dictionary never becomes the items of a sequence.
            Value::Resource(_) | Value::Scalar(Scalar::Null) => {
                visitor.visit_seq(ItemsAccess::new(Vec::new(), self.mapper))
            }
            Value::Scalar(Scalar::Text(text)) if text.is_empty() => {
                visitor.visit_seq(ItemsAccess::new(Vec::new(), self.mapper))
            }
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_tuple<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_tuple_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        _len: usize,
        visitor: V,
    ) -> Result<V::Value> {
        self.deserialize_seq(visitor)
    }

    fn deserialize_map<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Null) => {
                visitor.visit_map(EntriesAccess::new(Vec::new(), self.mapper))
            }
            Value::Scalar(Scalar::Text(text)) if text.is_empty() => {
                visitor.visit_map(EntriesAccess::new(Vec::new(), self.mapper))
            }
            Value::Resource(_) => self.deserialize_members(false, visitor),
            Value::Collection(collection) if collection.info().is_some() => {
                ValueDeserializer::new(Value::Collection(collection), self.mapper)
                    .deserialize_members(false, visitor)
            }
            other => ValueDeserializer::new(other, self.mapper).deserialize_any(visitor),
        }
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        let mapper = self.mapper;
        let (members, info) = match self.value {
            Value::Scalar(Scalar::Null) => (Vec::new(), None),
            // Empty XML elements read as empty text.
            Value::Scalar(Scalar::Text(text)) if text.is_empty() => (Vec::new(), None),
            other @ Value::Scalar(_) => {
                return ValueDeserializer::new(other, mapper).deserialize_any(visitor)
            }
            other => match into_members(other) {
                Some(parts) => parts,
                None => return Err(not_a_mapping()),
            },
        };

        let mut entries: Vec<(String, Value)> = Vec::with_capacity(fields.len());
        let mut taken = vec![false; fields.len()];
        let mut take = |name: &str| {
            if let Some(i) = fields.iter().position(|f| *f == name) {
                taken[i] = true;
            }
        };

        if let Some(info) = &info {
            if fields.contains(&PROTOCOL_INFO_FIELD) {
                entries.push((
                    PROTOCOL_INFO_FIELD.to_string(),
                    ContentMapper::default().serialize(info)?,
                ));
                take(PROTOCOL_INFO_FIELD);
            }
            for (property, value) in info.iter() {
                let member = fields.iter().find(|f| {
                    is_protocol_key(f) && ProtocolProperty::from_wire_key(f) == Some(property)
                });
                if let Some(member) = member {
                    entries.push((member.to_string(), Value::Scalar(value.clone())));
                    take(member);
                }
            }
        }

        for (key, value) in members {
            let member = if fields.contains(&key.as_str()) {
                Some(key.as_str())
            } else {
                fields
                    .iter()
                    .copied()
                    .find(|f| !is_protocol_key(f) && mapper.naming().member_name(f) == key)
            };
            match member {
                Some(member) => {
                    take(member);
                    entries.push((member.to_string(), value));
                }
                None => entries.push((key, value)),
            }
        }

        if mapper.missing_members() == MissingMembers::Zero {
            for (field, taken) in fields.iter().zip(taken) {
                if !taken {
                    entries.push((field.to_string(), Value::null()));
                }
            }
        }

        visitor.visit_map(EntriesAccess::new(entries, mapper))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        match self.value {
            Value::Scalar(Scalar::Text(text)) => {
                let variant: StringDeserializer<Error> = text.into_deserializer();
                visitor.visit_enum(variant)
            }
            Value::Scalar(Scalar::Int(n)) if n >= 0 => visit_variant_index(n as u64, visitor),
            Value::Scalar(Scalar::UInt(n)) => visit_variant_index(n, visitor),
            Value::Resource(resource) if resource.len() == 1 => {
                let (mut fields, _) = resource.into_parts();
                let (variant, value) = fields.remove(0);
                visitor.visit_enum(VariantAccessor {
                    variant,
                    value,
                    mapper: self.mapper,
                })
            }
            Value::Scalar(Scalar::Null) => Err(Error::deserialization(format!(
                "cannot convert null to enum {name}"
            ))),
            other => Err(Error::deserialization(format!(
                "cannot convert {:?} to enum {name}",
                other.shape()
            ))),
        }
    }

    fn deserialize_identifier<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        self.deserialize_string(visitor)
    }

    fn deserialize_ignored_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value> {
        visitor.visit_unit()
    }
}

fn visit_variant_index<'de, V: Visitor<'de>>(index: u64, visitor: V) -> Result<V::Value> {
    let index = u32::try_from(index)
        .map_err(|_| Error::deserialization(format!("variant index {index} out of range")))?;
    let variant: U32Deserializer<Error> = index.into_deserializer();
    visitor.visit_enum(variant)
}

struct EntriesAccess<'a> {
    entries: std::vec::IntoIter<(String, Value)>,
    pending: Option<Value>,
    mapper: &'a ContentMapper,
}

impl<'a> EntriesAccess<'a> {
    fn new(entries: Vec<(String, Value)>, mapper: &'a ContentMapper) -> Self {
        Self {
            entries: entries.into_iter(),
            pending: None,
            mapper,
        }
    }
}

impl<'de> MapAccess<'de> for EntriesAccess<'_> {
    type Error = Error;

    fn next_key_seed<K: DeserializeSeed<'de>>(&mut self, seed: K) -> Result<Option<K::Value>> {
        match self.entries.next() {
            Some((key, value)) => {
                self.pending = Some(value);
                let key: StringDeserializer<Error> = key.into_deserializer();
                seed.deserialize(key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V: DeserializeSeed<'de>>(&mut self, seed: V) -> Result<V::Value> {
        let value = self
            .pending
            .take()
            .ok_or_else(|| Error::deserialization("map value requested before its key"))?;
        seed.deserialize(ValueDeserializer::new(value, self.mapper))
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

struct ItemsAccess<'a> {
    items: std::vec::IntoIter<Value>,
    mapper: &'a ContentMapper,
}

impl<'a> ItemsAccess<'a> {
    fn new(items: Vec<Value>, mapper: &'a ContentMapper) -> Self {
        Self {
            items: items.into_iter(),
            mapper,
        }
    }
}

impl<'de> SeqAccess<'de> for ItemsAccess<'_> {
    type Error = Error;

    fn next_element_seed<T: DeserializeSeed<'de>>(&mut self, seed: T) -> Result<Option<T::Value>> {
        match self.items.next() {
            Some(item) => seed
                .deserialize(ValueDeserializer::new(item, self.mapper))
                .map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Externally tagged enum variants: a resource with a single member.
struct VariantAccessor<'a> {
    variant: String,
    value: Value,
    mapper: &'a ContentMapper,
}

impl<'de, 'a> EnumAccess<'de> for VariantAccessor<'a> {
    type Error = Error;
    type Variant = ValueDeserializer<'a>;

    fn variant_seed<V: DeserializeSeed<'de>>(self, seed: V) -> Result<(V::Value, Self::Variant)> {
        let variant: StringDeserializer<Error> = self.variant.into_deserializer();
        let tag = seed.deserialize(variant)?;
        Ok((tag, ValueDeserializer::new(self.value, self.mapper)))
    }
}

impl<'de> VariantAccess<'de> for ValueDeserializer<'_> {
    type Error = Error;

    fn unit_variant(self) -> Result<()> {
        Ok(())
    }

    fn newtype_variant_seed<T: DeserializeSeed<'de>>(self, seed: T) -> Result<T::Value> {
        seed.deserialize(self)
    }

    fn tuple_variant<V: Visitor<'de>>(self, _len: usize, visitor: V) -> Result<V::Value> {
        de::Deserializer::deserialize_seq(self, visitor)
    }

    fn struct_variant<V: Visitor<'de>>(
        self,
        fields: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value> {
        de::Deserializer::deserialize_struct(self, "", fields, visitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::CamelCase;
    use crate::protocol::ProtocolProperty;
    use crate::value::Resource;
    use serde::Deserialize;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn from_value<T: serde::de::DeserializeOwned + 'static>(value: Value) -> Result<T> {
        ContentMapper::default().deserialize(value)
    }

    #[test]
    fn test_null_reads_as_zero_or_none() {
        assert_eq!(from_value::<i32>(Value::null()).unwrap(), 0);
        assert!(!from_value::<bool>(Value::null()).unwrap());
        assert_eq!(from_value::<Option<i32>>(Value::null()).unwrap(), None);
        assert_eq!(from_value::<String>(Value::null()).unwrap(), "");
        assert!(from_value::<Vec<String>>(Value::null()).unwrap().is_empty());
    }

    #[test]
    fn test_text_parses_into_leaf_types() {
        assert_eq!(from_value::<i64>(Value::from(" 42 ")).unwrap(), 42);
        assert_eq!(from_value::<u8>(Value::from("7")).unwrap(), 7);
        assert!(from_value::<bool>(Value::from("TRUE")).unwrap());
        assert!((from_value::<f64>(Value::from("2.5")).unwrap() - 2.5).abs() < f64::EPSILON);
        assert_eq!(from_value::<String>(Value::from(12i64)).unwrap(), "12");
        assert!(from_value::<i32>(Value::from("twelve")).is_err());
    }

    #[test]
    fn test_uuid_and_url_parse_from_text() {
        let id = uuid::Uuid::new_v4();
        let parsed: uuid::Uuid = from_value(Value::from(id.to_string())).unwrap();
        assert_eq!(parsed, id);

        let url: url::Url = from_value(Value::from("http://example.com/sdata")).unwrap();
        assert_eq!(url.host_str(), Some("example.com"));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    enum Colour {
        Red,
        Green,
    }

    #[test]
    fn test_enums_by_name_or_index() {
        assert_eq!(from_value::<Colour>(Value::from("Green")).unwrap(), Colour::Green);
        assert_eq!(from_value::<Colour>(Value::from(0u64)).unwrap(), Colour::Red);
        assert!(from_value::<Colour>(Value::from("Blue")).is_err());
        assert!(from_value::<Colour>(Value::null()).is_err());
    }

    #[test]
    fn test_dictionary_into_sequence_is_empty() {
        let value = Value::from(Resource::new().field("a", 1i64));
        let items: Vec<i64> = from_value(value).unwrap();
        assert!(items.is_empty());
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Account {
        #[serde(rename = "$key")]
        key: Option<String>,
        name: String,
        credit_limit: f64,
    }

    #[test]
    fn test_struct_receives_protocol_members_and_zero_fill() {
        let value = Value::from(
            Resource::with_info(ProtocolInfo::new().with(ProtocolProperty::Key, "A9"))
                .field("name", "Acme"),
        );

        let account: Account = from_value(value).unwrap();
        assert_eq!(
            account,
            Account {
                key: Some("A9".into()),
                name: "Acme".into(),
                credit_limit: 0.0,
            }
        );
    }

    #[test]
    fn test_strict_missing_members() {
        let mapper = ContentMapper::default().with_missing_members(MissingMembers::Strict);
        let value = Value::from(Resource::new().field("name", "Acme"));
        let err = mapper.deserialize::<Account>(value).unwrap_err();
        assert!(err.to_string().contains("credit_limit"));
    }

    #[test]
    fn test_naming_scheme_is_reversed() {
        let mapper = ContentMapper::new(Arc::new(CamelCase));
        let value = Value::from(
            Resource::new()
                .field("name", "Acme")
                .field("creditLimit", 10.5),
        );
        let account: Account = mapper.deserialize(value).unwrap();
        assert!((account.credit_limit - 10.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_dictionary_target_sees_protocol_keys() {
        let value = Value::from(
            Resource::with_info(ProtocolInfo::new().with(ProtocolProperty::Url, "http://x"))
                .field("a", "1"),
        );
        let map: HashMap<String, String> = from_value(value).unwrap();
        assert_eq!(map.get("$url").map(String::as_str), Some("http://x"));
        assert_eq!(map.get("a").map(String::as_str), Some("1"));
    }

    #[derive(Debug, Deserialize)]
    struct Page {
        #[serde(rename = "$totalResults")]
        total: u64,
        #[serde(rename = "$resources")]
        items: Vec<String>,
    }

    #[test]
    fn test_struct_from_collection_map_form() {
        let collection = Collection::new(vec![Value::from("a"), Value::from("b")])
            .with_info(ProtocolInfo::new().with(ProtocolProperty::TotalResults, 2u64));
        let page: Page = from_value(Value::from(collection)).unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items, vec!["a", "b"]);
    }
}
