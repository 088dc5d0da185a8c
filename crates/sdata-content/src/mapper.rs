//! Conversion between typed Rust values and the [`Value`] model.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::de::ValueDeserializer;
use crate::error::Result;
use crate::naming::{default_scheme, NamingScheme};
use crate::ser::{ShapeSniffer, ValueSerializer};
use crate::value::{Collection, Resource, Shape, Value};

/// What happens to struct members that the source value does not carry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingMembers {
    /// Absent members read as `Null`, which is the zero value of the member
    /// type (or `None`). A `#[serde(default = ..)]` value is not consulted.
    #[default]
    Zero,
    /// Absent members follow serde's own rules: `Option` and
    /// `#[serde(default)]` members are filled, anything else is an error.
    Strict,
}

/// Converts typed values to and from [`Value`].
///
/// The naming scheme is applied to struct member names on write and reversed
/// on read.
///
/// # Example
///
/// ```
/// use sdata_content::{ContentMapper, Value};
///
/// let mapper = ContentMapper::default();
/// let value = mapper.serialize(&vec!["a", "b"]).unwrap();
/// assert_eq!(value.as_collection().map(|c| c.len()), Some(2));
///
/// let back: Vec<String> = mapper.deserialize(value).unwrap();
/// assert_eq!(back, ["a", "b"]);
/// ```
#[derive(Clone)]
pub struct ContentMapper {
    naming: Arc<dyn NamingScheme>,
    missing_members: MissingMembers,
}

impl Default for ContentMapper {
    fn default() -> Self {
        Self::new(default_scheme())
    }
}

impl fmt::Debug for ContentMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContentMapper")
            .field("naming", &self.naming)
            .field("missing_members", &self.missing_members)
            .finish()
    }
}

impl ContentMapper {
    pub fn new(naming: Arc<dyn NamingScheme>) -> Self {
        Self {
            naming,
            missing_members: MissingMembers::default(),
        }
    }

    pub fn with_missing_members(mut self, missing_members: MissingMembers) -> Self {
        self.missing_members = missing_members;
        self
    }

    pub fn naming(&self) -> &dyn NamingScheme {
        self.naming.as_ref()
    }

    pub fn missing_members(&self) -> MissingMembers {
        self.missing_members
    }

    /// Convert a typed value into the generic model.
    pub fn serialize<T: Serialize + ?Sized>(&self, value: &T) -> Result<Value> {
        value.serialize(ValueSerializer { mapper: self })
    }

    /// Populate a typed value from the generic model.
    ///
    /// Asking for [`Value`], [`Resource`] or [`Collection`] hands the input
    /// back without conversion, metadata included.
    pub fn deserialize<T: DeserializeOwned + 'static>(&self, value: Value) -> Result<T> {
        let value = match passthrough::<T>(value) {
            Ok(done) => return Ok(done),
            Err(value) => value,
        };
        T::deserialize(ValueDeserializer::new(value, self))
    }

    /// The shape `value` takes in the generic model.
    pub fn classify<T: Serialize + ?Sized>(&self, value: &T) -> Shape {
        value.serialize(ShapeSniffer).unwrap_or(Shape::Scalar)
    }

    pub fn is_collection<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        self.classify(value) == Shape::Sequence
    }

    pub fn is_dictionary<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        self.classify(value) == Shape::Mapping
    }

    pub fn is_object<T: Serialize + ?Sized>(&self, value: &T) -> bool {
        self.classify(value) == Shape::Object
    }
}

fn take_as<T: 'static, U: 'static>(slot: &mut Option<U>) -> Option<T> {
    (slot as &mut dyn Any)
        .downcast_mut::<Option<T>>()
        .and_then(Option::take)
}

fn passthrough<T: 'static>(value: Value) -> std::result::Result<T, Value> {
    let mut slot = Some(value);
    if let Some(done) = take_as::<T, Value>(&mut slot) {
        return Ok(done);
    }
    match slot {
        Some(Value::Resource(resource)) => {
            let mut slot = Some(resource);
            match take_as::<T, Resource>(&mut slot) {
                Some(done) => Ok(done),
                None => Err(slot.map(Value::Resource).unwrap_or_default()),
            }
        }
        Some(Value::Collection(collection)) => {
            let mut slot = Some(collection);
            match take_as::<T, Collection>(&mut slot) {
                Some(done) => Ok(done),
                None => Err(slot.map(Value::Collection).unwrap_or_default()),
            }
        }
        other => Err(other.unwrap_or_default()),
    }
}

/// [`ContentMapper::serialize`] with the default mapper.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    ContentMapper::default().serialize(value)
}

/// [`ContentMapper::deserialize`] with the default mapper.
pub fn from_value<T: DeserializeOwned + 'static>(value: Value) -> Result<T> {
    ContentMapper::default().deserialize(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::PascalCase;
    use crate::protocol::{ProtocolInfo, ProtocolProperty};
    use serde::Deserialize;
    use std::collections::BTreeMap;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Contact {
        first_name: String,
        tags: Vec<String>,
    }

    #[test]
    fn test_classify() {
        let mapper = ContentMapper::default();
        assert_eq!(mapper.classify(&1), Shape::Scalar);
        assert_eq!(mapper.classify("text"), Shape::Scalar);
        assert!(mapper.is_collection(&vec![1, 2]));
        assert!(mapper.is_dictionary(&BTreeMap::from([("a", 1)])));
        assert!(mapper.is_object(&Contact {
            first_name: "Ann".into(),
            tags: vec![],
        }));
    }

    #[test]
    fn test_passthrough_keeps_metadata() {
        let info = ProtocolInfo::new().with(ProtocolProperty::ETag, "abc");
        let resource = Resource::with_info(info.clone()).field("a", 1i64);

        let back: Resource = from_value(Value::from(resource.clone())).unwrap();
        assert_eq!(back, resource);

        let value: Value = from_value(Value::from(resource.clone())).unwrap();
        assert_eq!(value.protocol_info(), Some(&info));

        let collection: Collection = from_value(Value::from(resource)).unwrap();
        assert!(collection.is_empty());
    }

    #[test]
    fn test_typed_round_trip_with_naming() {
        let mapper = ContentMapper::new(Arc::new(PascalCase));
        let contact = Contact {
            first_name: "Ann".into(),
            tags: vec!["a".into()],
        };

        let value = mapper.serialize(&contact).unwrap();
        let resource = value.as_resource().unwrap();
        assert!(resource.contains_key("FirstName"));
        assert!(resource.contains_key("Tags"));

        let back: Contact = mapper.deserialize(value).unwrap();
        assert_eq!(back, contact);
    }
}
