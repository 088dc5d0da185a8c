//! The tracking envelope returned while an asynchronous operation runs.

use serde::{Deserialize, Serialize};

use crate::codec::xml::{parse_document, Element, SDATA_NS};
use crate::error::{Error, Result};

/// Progress of a long-running server operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracking {
    pub phase: String,
    pub phase_detail: String,
    pub progress: f64,
    pub elapsed_seconds: u64,
    pub remaining_seconds: u64,
    pub polling_millis: u64,
}

fn number<T: std::str::FromStr + Default>(root: &Element, name: &str) -> Result<T> {
    match root.child(SDATA_NS, name) {
        None => Ok(T::default()),
        Some(child) if child.text.trim().is_empty() => Ok(T::default()),
        Some(child) => child
            .text
            .trim()
            .parse()
            .map_err(|_| Error::xml(format!("invalid tracking {name}: {:?}", child.text))),
    }
}

impl Tracking {
    /// Parse `<sdata:tracking>`. Any other document is an error.
    pub fn from_xml(bytes: &[u8]) -> Result<Self> {
        let root = parse_document(bytes)?;
        if !root.is(SDATA_NS, "tracking") {
            return Err(Error::xml(format!(
                "expected sdata:tracking, found <{}>",
                root.name
            )));
        }

        let text = |name: &str| {
            root.child(SDATA_NS, name)
                .map(|c| c.text.clone())
                .unwrap_or_default()
        };

        Ok(Self {
            phase: text("phase"),
            phase_detail: text("phaseDetail"),
            progress: number(&root, "progress")?,
            elapsed_seconds: number(&root, "elapsedSeconds")?,
            remaining_seconds: number(&root, "remainingSeconds")?,
            polling_millis: number(&root, "pollingMillis")?,
        })
    }

    /// True once the server reports the operation finished.
    pub fn is_complete(&self) -> bool {
        self.progress >= 100.0
    }
}
