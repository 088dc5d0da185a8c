//! Atom feeds and entries carrying SData payloads.
//!
//! A resource is an `<entry>` whose `<sdata:payload>` holds the resource
//! element. A collection is a `<feed>` of entries. `id`, `title` and
//! `updated` map to Atom elements; the HTTP properties of batch entries map
//! to `http:` elements; paging totals map to `opensearch:` elements.

use super::xml::{
    element_to_value, parse_document, write_value, Element, XmlWriter, ATOM_NS,
    HTTP_NS, OPENSEARCH_NS, SDATA_NS, XSI_NS,
};
use super::{ContentHandler, MediaType};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolInfo, ProtocolProperty};
use crate::value::{Collection, Resource, Value};

const ATOM_PROPERTIES: [ProtocolProperty; 3] = [
    ProtocolProperty::Id,
    ProtocolProperty::Title,
    ProtocolProperty::Updated,
];

const HTTP_PROPERTIES: [ProtocolProperty; 6] = [
    ProtocolProperty::HttpMethod,
    ProtocolProperty::HttpStatus,
    ProtocolProperty::HttpMessage,
    ProtocolProperty::Location,
    ProtocolProperty::ETag,
    ProtocolProperty::IfMatch,
];

const OPENSEARCH_PROPERTIES: [ProtocolProperty; 3] = [
    ProtocolProperty::TotalResults,
    ProtocolProperty::StartIndex,
    ProtocolProperty::ItemsPerPage,
];

#[derive(Debug, Clone, Copy, Default)]
pub struct AtomHandler;

impl ContentHandler for AtomHandler {
    fn write_to(&self, value: &Value, out: &mut Vec<u8>) -> Result<&'static str> {
        let mut writer = XmlWriter::new();
        let content_type = match value {
            Value::Resource(resource) => {
                write_entry(&mut writer, resource, root_namespaces(false))?;
                MediaType::AtomEntry.as_str()
            }
            Value::Collection(collection) => {
                write_feed(&mut writer, collection)?;
                MediaType::Atom.as_str()
            }
            Value::Scalar(_) => {
                return Err(Error::serialization(
                    "Atom content must be a resource or a collection",
                ))
            }
        };
        out.extend_from_slice(writer.finish().as_bytes());
        Ok(content_type)
    }

    fn read_from(&self, bytes: &[u8]) -> Result<Value> {
        let root = parse_document(bytes)?;
        if root.is(ATOM_NS, "feed") {
            Ok(Value::from(feed_to_collection(&root)))
        } else if root.is(ATOM_NS, "entry") {
            Ok(Value::from(entry_to_resource(&root)))
        } else {
            Err(Error::xml(format!(
                "expected an Atom feed or entry, found <{}>",
                root.name
            )))
        }
    }
}

fn root_namespaces(feed: bool) -> Vec<(String, String)> {
    let mut attrs = vec![
        ("xmlns".to_string(), ATOM_NS.to_string()),
        ("xmlns:sdata".to_string(), SDATA_NS.to_string()),
        ("xmlns:http".to_string(), HTTP_NS.to_string()),
        ("xmlns:xsi".to_string(), XSI_NS.to_string()),
    ];
    if feed {
        attrs.push(("xmlns:opensearch".to_string(), OPENSEARCH_NS.to_string()));
    }
    attrs
}

fn element_name(property: ProtocolProperty) -> &'static str {
    &property.wire_key()[1..]
}

fn write_properties(
    writer: &mut XmlWriter,
    info: &ProtocolInfo,
    prefix: &str,
    properties: &[ProtocolProperty],
) {
    for property in properties {
        if let Some(text) = info.get(*property).and_then(|v| v.to_text()) {
            let name = format!("{prefix}{}", element_name(*property));
            writer.text_element(&name, &[], &text);
        }
    }
}

/// The payload element name: declared XML name, then schema name, then the
/// name of the mapped type.
fn payload_name(resource: &Resource) -> String {
    resource
        .info()
        .and_then(|i| {
            i.xml()
                .local_name
                .clone()
                .or_else(|| i.get_str(ProtocolProperty::SchemaName).map(str::to_string))
        })
        .or_else(|| resource.type_name().map(str::to_string))
        .unwrap_or_else(|| "resource".to_string())
}

fn write_entry(
    writer: &mut XmlWriter,
    resource: &Resource,
    attrs: Vec<(String, String)>,
) -> Result<()> {
    writer.open("entry", &attrs);

    let mut payload = resource.clone();
    if let Some(info) = resource.info() {
        write_properties(writer, info, "", &ATOM_PROPERTIES);
        write_properties(writer, info, "http:", &HTTP_PROPERTIES);
        if let Some(payload_info) = payload.info_mut() {
            for property in ATOM_PROPERTIES.iter().chain(&HTTP_PROPERTIES) {
                payload_info.remove(*property);
            }
        }
    }

    writer.open("sdata:payload", &[]);
    let name = payload_name(resource);
    write_value(writer, &name, &Value::from(payload), Vec::new())?;
    writer.close("sdata:payload");

    writer.close("entry");
    Ok(())
}

fn write_feed(writer: &mut XmlWriter, collection: &Collection) -> Result<()> {
    writer.open("feed", &root_namespaces(true));
    if let Some(info) = collection.info() {
        write_properties(writer, info, "", &ATOM_PROPERTIES);
        write_properties(writer, info, "opensearch:", &OPENSEARCH_PROPERTIES);
    }
    for item in collection.iter() {
        match item {
            Value::Resource(resource) => write_entry(writer, resource, Vec::new())?,
            other => {
                return Err(Error::serialization(format!(
                    "Atom feed items must be resources, found {:?}",
                    other.shape()
                )))
            }
        }
    }
    writer.close("feed");
    Ok(())
}

fn read_properties(
    element: &Element,
    namespace: &str,
    properties: &[ProtocolProperty],
    info: &mut ProtocolInfo,
) {
    for property in properties {
        if let Some(child) = element.child(namespace, element_name(*property)) {
            match child.text.trim().parse::<u64>() {
                Ok(count) if OPENSEARCH_PROPERTIES.contains(property) => info.set(*property, count),
                _ => info.set(*property, child.text.as_str()),
            }
        }
    }
}

fn entry_to_resource(entry: &Element) -> Resource {
    let mut info = ProtocolInfo::new();
    read_properties(entry, ATOM_NS, &ATOM_PROPERTIES, &mut info);
    read_properties(entry, HTTP_NS, &HTTP_PROPERTIES, &mut info);

    let payload = entry
        .child(SDATA_NS, "payload")
        .and_then(|p| p.children.first());

    let mut resource = match payload.map(element_to_value) {
        Some(Value::Resource(resource)) => resource,
        _ => Resource::new(),
    };

    if !info.is_empty() {
        let merged = resource.info_or_default();
        for (property, value) in info.iter() {
            merged.set(property, value.clone());
        }
    }
    resource
}

fn feed_to_collection(feed: &Element) -> Collection {
    let mut info = ProtocolInfo::new();
    read_properties(feed, ATOM_NS, &ATOM_PROPERTIES, &mut info);
    read_properties(feed, OPENSEARCH_NS, &OPENSEARCH_PROPERTIES, &mut info);

    let items = feed
        .children
        .iter()
        .filter(|c| c.is(ATOM_NS, "entry"))
        .map(|entry| Value::from(entry_to_resource(entry)))
        .collect();

    let collection = Collection::new(items);
    if info.is_empty() {
        collection
    } else {
        collection.with_info(info)
    }
}
