//! Fragment store interface
//!
//! The engine consumes a finite ordered sequence of fragments from a store.
//! The retrieval algorithm behind it (embeddings, similarity search) lives
//! with the collaborator and is out of scope here.

use answerforge_common::errors::Result;
use answerforge_common::Fragment;
use async_trait::async_trait;

/// Trait for fragment retrieval
#[async_trait]
pub trait FragmentStore: Send + Sync {
    /// Retrieve fragments relevant to the query, most relevant first
    async fn retrieve(&self, query: &str) -> Result<Vec<Fragment>>;
}

/// In-memory store returning a fixed fragment list regardless of query
pub struct StaticStore {
    fragments: Vec<Fragment>,
}

impl StaticStore {
    /// Create a store over a fixed fragment list
    pub fn new(fragments: Vec<Fragment>) -> Self {
        Self { fragments }
    }
}

#[async_trait]
impl FragmentStore for StaticStore {
    async fn retrieve(&self, _query: &str) -> Result<Vec<Fragment>> {
        Ok(self.fragments.clone())
    }
}
