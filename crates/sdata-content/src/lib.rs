//! # sdata-content
//!
//! The content model and mapping engine for SData payloads.
//!
//! This crate provides:
//! - A protocol-aware generic model: [`Value`], [`Resource`], [`Collection`]
//!   with [`ProtocolInfo`] metadata (keys, ETags, URLs, paging totals)
//! - [`ContentMapper`]: bidirectional mapping between any serde type and the
//!   generic model, with naming schemes and zero-value semantics for nulls
//! - A metadata facade ([`get_protocol_value`], [`set_protocol_value`]) that
//!   works across resources, collections and plain structs
//! - Wire codecs for SData JSON, XML, Atom and text
//!
//! ## Architecture
//!
//! ```text
//!   typed values  ──serialize──▶  Value  ──ContentHandler──▶  bytes
//!   (serde)       ◀─deserialize─  (Resource / Collection)  ◀──  (JSON, XML, Atom)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use sdata_content::codec::{handler, MediaType};
//! use sdata_content::ContentMapper;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Contact {
//!     #[serde(rename = "$key", skip_serializing_if = "Option::is_none")]
//!     key: Option<String>,
//!     name: String,
//! }
//!
//! let mapper = ContentMapper::default();
//! let json = handler(MediaType::Json).unwrap();
//!
//! let value = json.read_from(br#"{"$key": "C-1", "name": "Ann"}"#).unwrap();
//! assert_eq!(value.protocol_info().and_then(|i| i.key()), Some("C-1"));
//!
//! let contact: Contact = mapper.deserialize(value).unwrap();
//! assert_eq!(contact.key.as_deref(), Some("C-1"));
//!
//! let mut out = Vec::new();
//! json.write_to(&mapper.serialize(&contact).unwrap(), &mut out).unwrap();
//! assert_eq!(out, br#"{"$key":"C-1","name":"Ann"}"#);
//! ```

mod access;
pub mod codec;
mod de;
pub mod datetime;
mod error;
mod mapper;
pub mod naming;
mod protocol;
pub mod schema;
mod ser;
mod tracking;
mod typed;
mod value;

pub use access::{get_protocol_value, set_protocol_value, ProtocolMembers, ProtocolObject};
pub use codec::{ContentHandler, MediaType};
pub use error::{Error, ErrorKind, Result};
pub use mapper::{from_value, to_value, ContentMapper, MissingMembers};
pub use naming::NamingScheme;
pub use protocol::{
    is_protocol_key, ProtocolInfo, ProtocolProperty, XmlHints, PROTOCOL_INFO_FIELD,
    PROTOCOL_PREFIX, RESOURCES_KEY, XML_HINTS_KEY,
};
pub use schema::{register_schema, TypeSchema};
pub use tracking::Tracking;
pub use typed::TypedCollection;
pub use value::{Collection, ItemType, Resource, Scalar, ScalarKind, Shape, Value};
