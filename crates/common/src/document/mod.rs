//! Fragment types
//!
//! A fragment is a retrieved text passage with string metadata, the unit of
//! context fed to a generator. Fragments are immutable once retrieved.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata key carrying the citation identifier
pub const SOURCE_KEY: &str = "source";

/// A retrieved text fragment with associated metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fragment {
    /// Fragment content
    pub text: String,

    /// Arbitrary string metadata; `source` carries the citation id
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Fragment {
    /// Create a fragment with no metadata
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: HashMap::new(),
        }
    }

    /// Attach a source identifier used for citation
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.metadata.insert(SOURCE_KEY.to_string(), source.into());
        self
    }

    /// Attach an arbitrary metadata entry
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The fragment's source identifier, if any
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}
