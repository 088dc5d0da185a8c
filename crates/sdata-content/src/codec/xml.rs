//! Plain SData XML, plus the element tree and writer the Atom codec and the
//! tracking envelope share.
//!
//! Resources are elements whose children are their fields. Protocol
//! properties are `sdata:` attributes and nulls are `xsi:nil="true"`.
//! Collections are a wrapper element around their items unless their hints
//! ask for the flat form, where the items repeat in place of the wrapper.

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use super::{ContentHandler, MediaType};
use crate::error::{Error, Result};
use crate::protocol::{ProtocolInfo, ProtocolProperty, XmlHints};
use crate::value::{Collection, Resource, Scalar, Value};

pub const SDATA_NS: &str = "http://schemas.sage.com/sdata/2008/1";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const ATOM_NS: &str = "http://www.w3.org/2005/Atom";
pub const HTTP_NS: &str = "http://schemas.sage.com/sdata/http/2008/1";
pub const OPENSEARCH_NS: &str = "http://a9.com/-/spec/opensearch/1.1/";

const DEFAULT_ITEM_NAME: &str = "item";

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlHandler;

impl ContentHandler for XmlHandler {
    fn write_to(&self, value: &Value, out: &mut Vec<u8>) -> Result<&'static str> {
        let mut writer = XmlWriter::new();
        let name = root_name(value);
        let attrs = vec![
            ("xmlns:sdata".to_string(), SDATA_NS.to_string()),
            ("xmlns:xsi".to_string(), XSI_NS.to_string()),
        ];
        write_value(&mut writer, &name, value, attrs)?;
        out.extend_from_slice(writer.finish().as_bytes());
        Ok(MediaType::Xml.as_str())
    }

    fn read_from(&self, bytes: &[u8]) -> Result<Value> {
        let root = parse_document(bytes)?;
        Ok(element_to_value(&root))
    }
}

fn root_name(value: &Value) -> String {
    let declared = value
        .protocol_info()
        .and_then(|info| info.xml().local_name.clone())
        .or_else(|| match value {
            Value::Resource(resource) => resource.type_name().map(str::to_string),
            _ => None,
        });
    declared.unwrap_or_else(|| {
        match value {
            Value::Scalar(_) => "value",
            Value::Resource(_) => "resource",
            Value::Collection(_) => "resources",
        }
        .to_string()
    })
}

/// An attribute with its namespace resolved.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct XmlAttribute {
    pub(crate) namespace: Option<String>,
    pub(crate) name: String,
    pub(crate) value: String,
}

/// A parsed element with namespaces resolved. Whitespace-only text is dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Element {
    pub(crate) namespace: Option<String>,
    pub(crate) name: String,
    pub(crate) attributes: Vec<XmlAttribute>,
    pub(crate) children: Vec<Element>,
    pub(crate) text: String,
}

impl Element {
    pub(crate) fn is(&self, namespace: &str, name: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }

    pub(crate) fn child(&self, namespace: &str, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.is(namespace, name))
    }

    /// First child with this local name, in any namespace.
    pub(crate) fn child_named(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub(crate) fn attribute(&self, namespace: Option<&str>, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name && a.namespace.as_deref() == namespace)
            .map(|a| a.value.as_str())
    }

    pub(crate) fn is_nil(&self) -> bool {
        self.attribute(Some(XSI_NS), "nil")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    }
}

fn namespace_of(result: ResolveResult<'_>) -> Option<String> {
    match result {
        ResolveResult::Bound(ns) => Some(String::from_utf8_lossy(ns.as_ref()).into_owned()),
        _ => None,
    }
}

fn open_element(reader: &NsReader<&[u8]>, start: &BytesStart<'_>) -> Result<Element> {
    let (ns, local) = reader.resolve_element(start.name());
    let mut element = Element {
        namespace: namespace_of(ns),
        name: String::from_utf8_lossy(local.as_ref()).into_owned(),
        ..Element::default()
    };
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_namespace_binding().is_some() {
            continue;
        }
        let (ns, local) = reader.resolve_attribute(attr.key);
        element.attributes.push(XmlAttribute {
            namespace: namespace_of(ns),
            name: String::from_utf8_lossy(local.as_ref()).into_owned(),
            value: attr.unescape_value()?.into_owned(),
        });
    }
    Ok(element)
}

fn close_element(stack: &mut [Element], root: &mut Option<Element>, element: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_none() => *root = Some(element),
        None => return Err(Error::xml("document has more than one root element")),
    }
    Ok(())
}

/// Parse a whole document into its root element.
pub(crate) fn parse_document(bytes: &[u8]) -> Result<Element> {
    let mut reader = NsReader::from_reader(bytes);
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root = None;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(start) => {
                let element = open_element(&reader, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&reader, &start)?;
                close_element(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| Error::xml("unbalanced end tag"))?;
                close_element(&mut stack, &mut root, element)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text.unescape()?);
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&data.into_inner()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(Error::xml("unexpected end of document"));
    }
    root.ok_or_else(|| Error::xml("document has no root element"))
}

/// Protocol properties carried as `sdata:` attributes.
pub(crate) fn attribute_info(element: &Element) -> ProtocolInfo {
    let mut info = ProtocolInfo::new();
    for attr in &element.attributes {
        if attr.namespace.as_deref() != Some(SDATA_NS) {
            continue;
        }
        if let Some(property) = ProtocolProperty::from_wire_key(&format!("${}", attr.name)) {
            info.set(property, attr.value.as_str());
        }
    }
    info
}

fn element_hints(element: &Element) -> XmlHints {
    let mut hints = XmlHints::named(element.name.as_str());
    let namespace = element
        .namespace
        .as_deref()
        .filter(|ns| *ns != ATOM_NS && *ns != SDATA_NS);
    if let Some(namespace) = namespace {
        hints.namespace = Some(namespace.to_string());
    }
    hints
}

fn repeats_one_name(children: &[Element]) -> bool {
    children.len() > 1 && children.iter().all(|c| c.name == children[0].name)
}

/// Read an element back into the generic model.
///
/// Elements with neither children nor metadata are text. Two or more
/// children sharing a name make a collection; anything else is a resource
/// whose repeated children become flat collections.
pub(crate) fn element_to_value(element: &Element) -> Value {
    if element.is_nil() {
        return Value::null();
    }

    let mut info = attribute_info(element);
    if element.children.is_empty() {
        if info.is_empty() {
            return Value::from(element.text.as_str());
        }
        *info.xml_mut() = element_hints(element);
        return Value::from(Resource::with_info(info));
    }

    if repeats_one_name(&element.children) {
        let items = element.children.iter().map(element_to_value).collect();
        let mut hints = XmlHints::named(element.children[0].name.as_str());
        if element.children.iter().all(|c| c.children.is_empty()) {
            hints.is_simple_array = true;
        }
        *info.xml_mut() = hints;
        return Value::from(Collection::new(items).with_info(info));
    }

    *info.xml_mut() = element_hints(element);
    let mut resource = Resource::with_info(info);
    for child in &element.children {
        let value = element_to_value(child);
        match resource.get_mut(&child.name) {
            None => {
                resource.insert(child.name.as_str(), value);
            }
            Some(Value::Collection(flat))
                if flat.info().is_some_and(|i| i.xml().is_flat) =>
            {
                flat.push(value);
            }
            Some(existing) => {
                let first = std::mem::take(existing);
                let mut info = ProtocolInfo::new();
                *info.xml_mut() = XmlHints::named(child.name.as_str()).flat();
                *existing = Value::from(Collection::new(vec![first, value]).with_info(info));
            }
        }
    }
    Value::from(resource)
}

/// Minimal string-building XML writer.
pub(crate) struct XmlWriter {
    out: String,
}

impl XmlWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::from(r#"<?xml version="1.0" encoding="utf-8"?>"#),
        }
    }

    fn start_tag(&mut self, name: &str, attrs: &[(String, String)]) {
        self.out.push('<');
        self.out.push_str(name);
        for (key, value) in attrs {
            self.out.push(' ');
            self.out.push_str(key);
            self.out.push_str("=\"");
            self.out.push_str(&escape(value.as_str()));
            self.out.push('"');
        }
    }

    pub(crate) fn open(&mut self, name: &str, attrs: &[(String, String)]) {
        self.start_tag(name, attrs);
        self.out.push('>');
    }

    pub(crate) fn empty(&mut self, name: &str, attrs: &[(String, String)]) {
        self.start_tag(name, attrs);
        self.out.push_str("/>");
    }

    pub(crate) fn close(&mut self, name: &str) {
        self.out.push_str("</");
        self.out.push_str(name);
        self.out.push('>');
    }

    pub(crate) fn text(&mut self, text: &str) {
        self.out.push_str(&escape(text));
    }

    pub(crate) fn text_element(&mut self, name: &str, attrs: &[(String, String)], text: &str) {
        self.open(name, attrs);
        self.text(text);
        self.close(name);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// `sdata:` attributes for each protocol property in `info`.
pub(crate) fn property_attributes(info: &ProtocolInfo) -> Vec<(String, String)> {
    info.iter()
        .filter_map(|(property, value)| {
            let text = value.to_text()?;
            Some((format!("sdata:{}", &property.wire_key()[1..]), text))
        })
        .collect()
}

fn scalar_text(scalar: &Scalar) -> Option<String> {
    match scalar {
        Scalar::Bool(b) => Some(if *b { "true" } else { "false" }.to_string()),
        other => other.to_text(),
    }
}

/// True when `name` can be written as an element name.
pub(crate) fn is_valid_element_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Write `value` as an element called `name`.
///
/// Fails when `name`, or a member name inside `value`, is not a valid XML
/// element name.
pub(crate) fn write_value(
    writer: &mut XmlWriter,
    name: &str,
    value: &Value,
    mut attrs: Vec<(String, String)>,
) -> Result<()> {
    if !is_valid_element_name(name) {
        return Err(Error::serialization(format!(
            "{name:?} is not a valid XML element name"
        )));
    }
    match value {
        Value::Scalar(scalar) => match scalar_text(scalar) {
            Some(text) => writer.text_element(name, &attrs, &text),
            None => {
                attrs.push(("xsi:nil".to_string(), "true".to_string()));
                writer.empty(name, &attrs);
            }
        },
        Value::Resource(resource) => {
            if let Some(info) = resource.info() {
                if let Some(namespace) = &info.xml().namespace {
                    attrs.push(("xmlns".to_string(), namespace.clone()));
                }
                attrs.extend(property_attributes(info));
            }
            if resource.is_empty() {
                writer.empty(name, &attrs);
                return Ok(());
            }
            writer.open(name, &attrs);
            for (key, field) in resource.iter() {
                write_member(writer, key, field)?;
            }
            writer.close(name);
        }
        Value::Collection(collection) => {
            if let Some(info) = collection.info() {
                attrs.extend(property_attributes(info));
            }
            if collection.is_empty() {
                writer.empty(name, &attrs);
                return Ok(());
            }
            writer.open(name, &attrs);
            let declared = collection
                .info()
                .and_then(|info| info.xml().local_name.as_deref());
            for item in collection.iter() {
                let item_name = declared.or(own_name(item)).unwrap_or(DEFAULT_ITEM_NAME);
                write_value(writer, item_name, item, Vec::new())?;
            }
            writer.close(name);
        }
    }
    Ok(())
}

fn own_name(value: &Value) -> Option<&str> {
    value.protocol_info()?.xml().local_name.as_deref()
}

fn item_name(collection: &Collection, fallback: &str) -> String {
    collection
        .info()
        .and_then(|info| info.xml().local_name.clone())
        .unwrap_or_else(|| fallback.to_string())
}

/// Write a field of a resource. Flat collections repeat their items in
/// place of a wrapper element.
pub(crate) fn write_member(writer: &mut XmlWriter, key: &str, value: &Value) -> Result<()> {
    match value {
        Value::Collection(collection) if collection.info().is_some_and(|i| i.xml().is_flat) => {
            let name = item_name(collection, key);
            for item in collection.iter() {
                write_value(writer, &name, item, Vec::new())?;
            }
            Ok(())
        }
        other => write_value(writer, key, other, Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(value: &Value) -> String {
        let mut out = Vec::new();
        XmlHandler.write_to(value, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_parse_resolves_namespaces() {
        let doc = br#"<?xml version="1.0"?>
            <a:root xmlns:a="urn:a" xmlns:sdata="http://schemas.sage.com/sdata/2008/1" sdata:key="K1">
              <a:child>x &amp; y</a:child>
              <plain/>
            </a:root>"#;
        let root = parse_document(doc).unwrap();
        assert!(root.is("urn:a", "root"));
        assert_eq!(root.attribute(Some(SDATA_NS), "key"), Some("K1"));
        assert_eq!(root.child("urn:a", "child").unwrap().text, "x & y");
        assert!(root.child_named("plain").unwrap().namespace.is_none());
    }

    #[test]
    fn test_parse_rejects_broken_documents() {
        assert!(parse_document(b"").is_err());
        assert!(parse_document(b"<a><b></a>").is_err());
        assert!(parse_document(b"<a/><b/>").is_err());
    }

    #[test]
    fn test_write_resource() {
        let mut info = ProtocolInfo::new().with(ProtocolProperty::Key, "A1");
        *info.xml_mut() = XmlHints::named("account").with_namespace("urn:crm");
        let value = Value::from(
            Resource::with_info(info)
                .field("Name", "A & B")
                .field("Phone", Value::null())
                .field("Active", true),
        );

        let xml = write(&value);
        assert!(xml.contains(r#"<account xmlns:sdata="http://schemas.sage.com/sdata/2008/1""#));
        assert!(xml.contains(r#"xmlns="urn:crm" sdata:key="A1">"#));
        assert!(xml.contains("<Name>A &amp; B</Name>"));
        assert!(xml.contains(r#"<Phone xsi:nil="true"/>"#));
        assert!(xml.contains("<Active>true</Active>"));
    }

    #[test]
    fn test_flat_and_wrapped_collections() {
        let mut flat_info = ProtocolInfo::new();
        *flat_info.xml_mut() = XmlHints::named("tag").flat();
        let mut wrapped_info = ProtocolInfo::new();
        *wrapped_info.xml_mut() = XmlHints::named("line");

        let value = Value::from(
            Resource::new()
                .field(
                    "Tags",
                    Collection::new(vec![Value::from("a"), Value::from("b")]).with_info(flat_info),
                )
                .field(
                    "Lines",
                    Collection::new(vec![Value::from(1i64), Value::from(2i64)])
                        .with_info(wrapped_info),
                ),
        );

        let xml = write(&value);
        assert!(xml.contains("<tag>a</tag><tag>b</tag>"));
        assert!(xml.contains("<Lines><line>1</line><line>2</line></Lines>"));
    }

    #[test]
    fn test_rejects_invalid_element_names() {
        use crate::error::ErrorKind;

        for bad in ["bad name", "a<b", "1st", ""] {
            let value = Value::from(Resource::new().field(bad, 1i64));
            let err = XmlHandler.write_to(&value, &mut Vec::new()).unwrap_err();
            assert!(matches!(err.kind, ErrorKind::Serialization(_)), "{bad:?}");
        }

        let xml = write(&Value::from(Resource::new().field("good-name_1.x", 1i64)));
        assert!(xml.contains("<good-name_1.x>1</good-name_1.x>"), "{xml}");
    }

    #[test]
    fn test_read_back_to_values() {
        let doc = br#"<account xmlns:sdata="http://schemas.sage.com/sdata/2008/1"
                            xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
                            sdata:key="A1">
              <Name>Acme</Name>
              <Phone xsi:nil="true"/>
              <Tags><tag>a</tag><tag>b</tag></Tags>
              <Contact>Ann</Contact>
              <Contact>Bob</Contact>
            </account>"#;

        let value = XmlHandler.read_from(doc).unwrap();
        let resource = value.as_resource().unwrap();
        let info = resource.info().unwrap();
        assert_eq!(info.key(), Some("A1"));
        assert_eq!(info.xml().local_name.as_deref(), Some("account"));

        assert_eq!(resource.get("Name").and_then(Value::as_str), Some("Acme"));
        assert!(resource.get("Phone").unwrap().is_null());

        let tags = resource.get("Tags").unwrap().as_collection().unwrap();
        assert_eq!(tags.len(), 2);

        let contacts = resource.get("Contact").unwrap().as_collection().unwrap();
        assert_eq!(contacts.len(), 2);
        assert!(contacts.info().unwrap().xml().is_flat);
    }
}
