//! Registered type schemas: XML names and per-member rendering hints.
//!
//! serde gives the mapper a struct's name and its member names but nothing
//! else. Types that need an XML element name, a namespace, or per-member
//! array rendering register a [`TypeSchema`] under their serde name. A serde
//! rename written in Clark notation (`{urn:ns}Account`) declares the name and
//! namespace without registration.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};

use crate::protocol::XmlHints;

/// Schema information for one serde type name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TypeSchema {
    type_name: String,
    xml: XmlHints,
    members: Vec<(String, XmlHints)>,
}

impl TypeSchema {
    /// A schema for the type serde names `type_name`.
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    /// XML element name for instances of the type.
    pub fn xml_name(mut self, local_name: impl Into<String>) -> Self {
        self.xml.local_name = Some(local_name.into());
        self
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.xml.namespace = Some(namespace.into());
        self
    }

    /// Hints for the member serde names `member`.
    pub fn member(mut self, member: impl Into<String>, hints: XmlHints) -> Self {
        self.members.push((member.into(), hints));
        self
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn xml(&self) -> &XmlHints {
        &self.xml
    }

    pub fn member_hints(&self, member: &str) -> Option<&XmlHints> {
        self.members
            .iter()
            .find(|(name, _)| name == member)
            .map(|(_, hints)| hints)
    }
}

static REGISTRY: LazyLock<RwLock<HashMap<String, Arc<TypeSchema>>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Register `schema`, replacing any earlier schema for the same type name.
pub fn register_schema(schema: TypeSchema) {
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    registry.insert(schema.type_name.clone(), Arc::new(schema));
}

/// The schema registered for `type_name`, if any.
pub fn schema_for(type_name: &str) -> Option<Arc<TypeSchema>> {
    let registry = REGISTRY.read().unwrap_or_else(|e| e.into_inner());
    registry.get(type_name).cloned()
}

/// Split a Clark-notation name (`{namespace}local`).
pub fn parse_clark_name(name: &str) -> Option<(&str, &str)> {
    let rest = name.strip_prefix('{')?;
    let (namespace, local) = rest.split_once('}')?;
    (!local.is_empty()).then_some((namespace, local))
}

/// XML hints declared for a serde type name, by registration or Clark name.
pub(crate) fn declared_hints(type_name: &str) -> Option<XmlHints> {
    if let Some((namespace, local)) = parse_clark_name(type_name) {
        let mut hints = XmlHints::named(local);
        if !namespace.is_empty() {
            hints.namespace = Some(namespace.to_string());
        }
        return Some(hints);
    }
    schema_for(type_name)
        .map(|schema| schema.xml.clone())
        .filter(|hints| !hints.is_empty())
}
