//! Content mapping scenarios through the facade crate.

use std::collections::HashMap;

use sdata::content::codec::handler;
use sdata::content::{
    from_value, get_protocol_value, set_protocol_value, ProtocolObject, ProtocolProperty,
};
use sdata::{Collection, ContentMapper, MediaType, ProtocolInfo, Resource, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize)]
struct Account {
    #[serde(rename = "$protocol", skip_serializing_if = "Option::is_none")]
    protocol: Option<ProtocolInfo>,
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Tags")]
    tags: Vec<String>,
}

impl ProtocolObject for Account {
    fn protocol_slot(&self) -> Option<&Option<ProtocolInfo>> {
        Some(&self.protocol)
    }

    fn protocol_slot_mut(&mut self) -> Option<&mut Option<ProtocolInfo>> {
        Some(&mut self.protocol)
    }
}

fn acme() -> Account {
    Account {
        protocol: None,
        name: "Acme".into(),
        tags: vec!["a".into(), "b".into()],
    }
}

#[test]
fn test_plain_object_has_no_metadata() {
    let value = ContentMapper::default().serialize(&acme()).unwrap();

    let resource = value.as_resource().expect("a plain object maps to a resource");
    assert_eq!(resource.len(), 2);
    assert!(resource.info().is_none());
    assert_eq!(resource.get("Name").and_then(Value::as_str), Some("Acme"));
    assert_eq!(
        resource
            .get("Tags")
            .and_then(Value::as_collection)
            .map(Collection::len),
        Some(2)
    );
}

#[test]
fn test_schema_name_attached_beforehand() {
    let mut account = acme();
    assert!(get_protocol_value(&account, ProtocolProperty::SchemaName).is_none());

    assert!(set_protocol_value(&mut account, ProtocolProperty::SchemaName, "Account").unwrap());
    let value = ContentMapper::default().serialize(&account).unwrap();

    let resource = value.as_resource().unwrap();
    assert_eq!(resource.len(), 2);
    assert_eq!(
        resource
            .info()
            .and_then(|info| info.get_str(ProtocolProperty::SchemaName)),
        Some("Account")
    );
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Scalars {
    code: String,
    count: i32,
    active: bool,
    ratio: f64,
    note: Option<String>,
}

#[test]
fn test_scalar_struct_round_trip() {
    let mapper = ContentMapper::default();
    let original = Scalars {
        code: "X-1".into(),
        count: -3,
        active: true,
        ratio: 0.25,
        note: None,
    };

    let back: Scalars = mapper
        .deserialize(mapper.serialize(&original).unwrap())
        .unwrap();
    assert_eq!(back, original);

    let json = handler(MediaType::Json).unwrap();
    let mut bytes = Vec::new();
    json.write_to(&mapper.serialize(&original).unwrap(), &mut bytes)
        .unwrap();
    let back: Scalars = mapper.deserialize(json.read_from(&bytes).unwrap()).unwrap();
    assert_eq!(back, original);
}

#[test]
fn test_collections_never_become_dictionaries() {
    let collection = Value::from(Collection::new(vec![Value::from("a"), Value::from("b")]));
    assert!(from_value::<HashMap<String, String>>(collection).is_err());

    let dictionary = Value::from(Resource::new().field("a", "1").field("b", "2"));
    let items: Vec<String> = from_value(dictionary).unwrap();
    assert!(items.is_empty());
}

#[test]
fn test_atom_entry_carries_key_and_etag() {
    let atom = handler(MediaType::AtomEntry).unwrap();
    let resource = Resource::with_info(
        ProtocolInfo::new()
            .with(ProtocolProperty::Key, "A1")
            .with(ProtocolProperty::ETag, "v3"),
    )
    .field("Name", "Acme");

    let mut bytes = Vec::new();
    let content_type = atom.write_to(&Value::from(resource), &mut bytes).unwrap();
    assert_eq!(content_type, "application/atom+xml;type=entry");

    let read = atom.read_from(&bytes).unwrap();
    let info = read.protocol_info().unwrap();
    assert_eq!(info.key(), Some("A1"));
    assert_eq!(info.etag(), Some("v3"));
    assert_eq!(read.get("Name").and_then(Value::as_str), Some("Acme"));
}
