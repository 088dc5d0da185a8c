//! Strongly typed collections that keep their protocol metadata.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, DeserializeOwned, Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use crate::access::ProtocolObject;
use crate::protocol::{ProtocolInfo, ProtocolProperty, RESOURCES_KEY, XML_HINTS_KEY};
use crate::value::{CollectionMap, Scalar, COLLECTION_TOKEN};

/// A `Vec<T>` with metadata for the set as a whole (paging, URL, ETag).
///
/// Serializes as a plain sequence when it has no metadata and in the
/// `{"$resources": [...]}` form otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedCollection<T> {
    items: Vec<T>,
    info: Option<ProtocolInfo>,
}

impl<T> Default for TypedCollection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            info: None,
        }
    }
}

impl<T> TypedCollection<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items, info: None }
    }

    pub fn with_info(mut self, info: ProtocolInfo) -> Self {
        self.info = Some(info);
        self
    }

    pub fn push(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn items_mut(&mut self) -> &mut Vec<T> {
        &mut self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn info(&self) -> Option<&ProtocolInfo> {
        self.info.as_ref()
    }

    pub fn info_mut(&mut self) -> Option<&mut ProtocolInfo> {
        self.info.as_mut()
    }

    pub fn set_info(&mut self, info: Option<ProtocolInfo>) {
        self.info = info;
    }

    /// `$totalResults`, when the server reported it.
    pub fn total_results(&self) -> Option<u64> {
        self.count(ProtocolProperty::TotalResults)
    }

    /// `$startIndex`, when the server reported it.
    pub fn start_index(&self) -> Option<u64> {
        self.count(ProtocolProperty::StartIndex)
    }

    /// `$itemsPerPage`, when the server reported it.
    pub fn items_per_page(&self) -> Option<u64> {
        self.count(ProtocolProperty::ItemsPerPage)
    }

    // Counts arrive as numbers from JSON and as text from some XML sources.
    fn count(&self, property: ProtocolProperty) -> Option<u64> {
        match self.info.as_ref()?.get(property)? {
            Scalar::UInt(n) => Some(*n),
            Scalar::Int(n) => u64::try_from(*n).ok(),
            Scalar::Text(text) => text.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn into_parts(self) -> (Vec<T>, Option<ProtocolInfo>) {
        (self.items, self.info)
    }
}

impl<T> From<Vec<T>> for TypedCollection<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

impl<T> FromIterator<T> for TypedCollection<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<T> IntoIterator for TypedCollection<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a, T> IntoIterator for &'a TypedCollection<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T: 'static> ProtocolObject for TypedCollection<T> {
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        Some(&self.info)
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        Some(&mut self.info)
    }
}

impl<T: Serialize> Serialize for TypedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
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

struct TypedVisitor<T>(PhantomData<T>);

impl<'de, T: DeserializeOwned> Visitor<'de> for TypedVisitor<T> {
    type Value = TypedCollection<T>;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a sequence or a map with $resources")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(TypedCollection::default())
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element()? {
            items.push(item);
        }
        Ok(TypedCollection::new(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut items = Vec::new();
        let mut info = ProtocolInfo::default();
        while let Some(key) = map.next_key::<String>()? {
            if key == RESOURCES_KEY {
                items = map.next_value::<Option<Vec<T>>>()?.unwrap_or_default();
            } else if key == XML_HINTS_KEY {
                let hints = map.next_value()?;
                info.xml_mut().merge(&hints);
            } else if let Some(property) = ProtocolProperty::from_wire_key(&key) {
                info.set(property, map.next_value::<Scalar>()?);
            } else {
                // Members of a dictionary are never items.
                map.next_value::<de::IgnoredAny>()?;
            }
        }
        Ok(TypedCollection {
            items,
            info: (!info.is_empty()).then_some(info),
        })
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for TypedCollection<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(TypedVisitor(PhantomData))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::get_protocol_value;
    use crate::mapper::ContentMapper;
    use crate::value::{Collection, Resource, Value};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Line {
        sku: String,
        qty: u32,
    }

    fn line(sku: &str, qty: u32) -> Line {
        Line {
            sku: sku.into(),
            qty,
        }
    }

    #[test]
    fn test_info_survives_mapping() {
        let mapper = ContentMapper::default();
        let typed = TypedCollection::new(vec![line("A", 1), line("B", 2)])
            .with_info(ProtocolInfo::new().with(ProtocolProperty::TotalResults, 40u64));

        let value = mapper.serialize(&typed).unwrap();
        let collection = value.as_collection().unwrap();
        assert_eq!(collection.len(), 2);
        assert_eq!(
            collection.info().unwrap().get(ProtocolProperty::TotalResults),
            Some(&Scalar::UInt(40))
        );

        let back: TypedCollection<Line> = mapper.deserialize(value).unwrap();
        assert_eq!(back, typed);
        assert_eq!(back.total_results(), Some(40));
    }

    #[test]
    fn test_plain_vec_drops_info() {
        let collection = Collection::new(vec![Value::from("x")])
            .with_info(ProtocolInfo::new().with(ProtocolProperty::Url, "http://x"));
        let items: Vec<String> = ContentMapper::default()
            .deserialize(Value::from(collection))
            .unwrap();
        assert_eq!(items, ["x"]);
    }

    #[test]
    fn test_dictionary_never_yields_items() {
        let resource = Resource::new().field("sku", "A").field("qty", 1u32);
        let typed: TypedCollection<Line> = ContentMapper::default()
            .deserialize(Value::from(resource))
            .unwrap();
        assert!(typed.is_empty());
        assert!(get_protocol_value(&typed, ProtocolProperty::Url).is_none());
    }

    #[test]
    fn test_json_map_form() {
        let json = r#"{"$totalResults": 1, "$resources": [{"sku": "A", "qty": 3}]}"#;
        let typed: TypedCollection<Line> = serde_json::from_str(json).unwrap();
        assert_eq!(typed.items(), &[line("A", 3)]);
        assert_eq!(typed.total_results(), Some(1));

        let plain: TypedCollection<Line> = serde_json::from_str("[]").unwrap();
        assert!(plain.info().is_none());
    }

    #[test]
    fn test_atom_feed_paging() {
        use crate::codec::{handler, MediaType};

        let mapper = ContentMapper::default();
        let typed = TypedCollection::new(vec![line("A", 1)]).with_info(
            ProtocolInfo::new()
                .with(ProtocolProperty::TotalResults, 40u64)
                .with(ProtocolProperty::StartIndex, 11u64)
                .with(ProtocolProperty::ItemsPerPage, 10u64),
        );

        let atom = handler(MediaType::Atom).unwrap();
        let mut bytes = Vec::new();
        atom.write_to(&mapper.serialize(&typed).unwrap(), &mut bytes)
            .unwrap();

        let back: TypedCollection<Line> = mapper
            .deserialize(atom.read_from(&bytes).unwrap())
            .unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.total_results(), Some(40));
        assert_eq!(back.start_index(), Some(11));
        assert_eq!(back.items_per_page(), Some(10));
    }

    #[test]
    fn test_counts_given_as_text() {
        let typed = TypedCollection::new(vec![line("A", 1)]).with_info(
            ProtocolInfo::new()
                .with(ProtocolProperty::TotalResults, " 7 ")
                .with(ProtocolProperty::StartIndex, "first"),
        );
        assert_eq!(typed.total_results(), Some(7));
        assert_eq!(typed.start_index(), None);
        assert_eq!(typed.items_per_page(), None);
    }
}
