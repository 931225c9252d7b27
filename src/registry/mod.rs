// src/registry/mod.rs
//! Remote DID registry access.
//!
//! The resolver talks to the registry only through [`Registry`], so tests
//! and alternative deployments can supply their own implementation.

pub mod ebsi_client;

use crate::error::Result;
use crate::models::did::DidDocument;
use std::future::Future;

pub use ebsi_client::EbsiRegistryClient;

/// A directory that maps registry-backed DIDs to their documents.
pub trait Registry: Send + Sync {
    /// Looks up the document of a syntactically valid DID.
    ///
    /// # Errors
    /// - `NotFound` when the registry holds no such identifier
    /// - `InvalidDid` when the registry rejects the identifier
    /// - `ResolverError` on any transport or protocol failure
    fn fetch(&self, did: &str) -> impl Future<Output = Result<DidDocument>> + Send;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Registry;
    use crate::error::{Error, Result};
    use crate::models::did::DidDocument;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// In-memory registry that counts lookups.
    #[derive(Default)]
    pub(crate) struct StaticRegistry {
        documents: HashMap<String, DidDocument>,
        pub(crate) lookups: AtomicUsize,
    }

    impl StaticRegistry {
        pub(crate) fn with(mut self, document: DidDocument) -> Self {
            self.documents.insert(document.id.clone(), document);
            self
        }
    }

    impl Registry for StaticRegistry {
        async fn fetch(&self, did: &str) -> Result<DidDocument> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.documents
                .get(did)
                .cloned()
                .ok_or_else(|| Error::NotFound(did.to_string()))
        }
    }
}
