//! # sdata
//!
//! A client library for the SData REST protocol.
//!
//! Remote business records are resources addressed by URI. Payloads travel
//! as SData JSON, Atom, plain XML or multipart bodies with attachments, and
//! map to and from ordinary serde types.
//!
//! ## Security
//!
//! - Credentials are redacted in Debug output
//! - Tracing spans skip request bodies and credentials
//! - Error messages built from server bodies are sanitized and capped
//!
//! ## Crates
//!
//! - **sdata-content** - Generic resource model, content mapper, wire codecs
//! - **sdata-client** - Requests, execution, responses, client helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sdata::{ClientConfig, SDataClient};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct Contact {
//!     #[serde(rename = "$key", skip_serializing_if = "Option::is_none")]
//!     key: Option<String>,
//!     #[serde(rename = "FirstName")]
//!     first_name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = SDataClient::new("http://localhost/sdata/app/test/-")
//!         .with_config(ClientConfig::builder().with_timeout_retry_attempts(2).build());
//!
//!     let contact: Option<Contact> = client.get("C-1", "contacts").await?;
//!     if let Some(contact) = contact {
//!         println!("{}", contact.first_name);
//!     }
//!
//!     Ok(())
//! }
//! ```

// Re-export all crates for convenient access
#[cfg(feature = "client")]
pub use sdata_client as client;
#[cfg(feature = "content")]
pub use sdata_content as content;

// Re-export commonly used types at the top level
#[cfg(feature = "client")]
pub use sdata_client::{
    ClientConfig, Credentials, HttpMethod, SDataClient, SDataParameters, SDataRequest,
    SDataResponse,
};
#[cfg(feature = "content")]
pub use sdata_content::{Collection, ContentMapper, MediaType, ProtocolInfo, Resource, Value};
