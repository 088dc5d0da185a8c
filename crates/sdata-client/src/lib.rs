//! # sdata-client
//!
//! HTTP client for SData services.
//!
//! This crate provides:
//! - One-shot requests with content negotiation (JSON, Atom, XML, text)
//! - Multipart bodies for form fields and attached files
//! - Redirect following and bounded retry on timeouts
//! - Cancellation of an in-flight request
//! - Async and blocking execution
//! - Diagnoses parsed from error bodies
//! - Request/response tracing
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDataClient                            │
//! │  - Base address, credentials, cookie jar                    │
//! │  - Typed helpers (get, post, put, delete)                   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDataRequest                           │
//! │  - Content mapping and encoding (sdata-content)             │
//! │  - Redirects, timeout retry, abort                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SDataResponse                          │
//! │  - Status, ETag, Location                                   │
//! │  - Parsed content and attached files                        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sdata_client::{SDataClient, Credentials};
//!
//! #[derive(serde::Deserialize)]
//! struct Account {
//!     #[serde(rename = "Name")]
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), sdata_client::Error> {
//!     let client = SDataClient::new("http://localhost/sdata/app/test/-")
//!         .with_credentials(Credentials::Basic {
//!             user_name: "admin".into(),
//!             password: None,
//!         });
//!
//!     let account: Option<Account> = client.get("A1", "accounts").await?;
//!     if let Some(account) = account {
//!         println!("{}", account.name);
//!     }
//!
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod diagnosis;
mod error;
mod executor;
mod file;
mod multipart;
mod request;
mod response;
mod retry;
pub mod security;
mod state;

pub use client::{SDataClient, SDataParameters};
pub use config::{ClientConfig, ClientConfigBuilder, ProxySetting};
pub use diagnosis::{parse_diagnoses, Diagnosis};
pub use error::{Error, ErrorKind, Result};
pub use file::AttachedFile;
pub use multipart::{boundary_of, parse_multipart, MimePart, MultipartWriter};
pub use request::{Credentials, HttpMethod, RequestContent, SDataRequest};
pub use response::{ResponseContent, SDataResponse};
pub use retry::TimeoutRetry;
pub use state::Phase;

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("sdata-client/", env!("CARGO_PKG_VERSION"));
