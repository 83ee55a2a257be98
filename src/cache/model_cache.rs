use std::sync::Arc;

use tracing::{debug, warn};

use super::{Cache, CacheDirector};
use crate::document::{Document, Query};

/// Read-through / invalidate protocol between a model and its cache.
///
/// `store` and `invalidate` must only be called once the corresponding store
/// write has been acknowledged.
#[derive(Clone)]
pub struct ModelCache {
    cache: Arc<dyn Cache>,
    director: Arc<dyn CacheDirector>,
}

impl ModelCache {
    pub fn new(cache: Arc<dyn Cache>, director: Arc<dyn CacheDirector>) -> Self {
        Self { cache, director }
    }

    pub fn cache(&self) -> &Arc<dyn Cache> {
        &self.cache
    }

    pub fn director(&self) -> &Arc<dyn CacheDirector> {
        &self.director
    }

    /// Returns the cached document answering `query`, or `None` to force a store read.
    pub fn fetch(&self, query: &Query) -> Option<Document> {
        if !self.director.valid_query(query) || !self.cache.valid(query) {
            return None;
        }
        let key = self.director.build_query_key(query)?;
        let Some(document) = self.cache.get(&key) else {
            debug!(key = %key, "cache miss");
            return None;
        };

        // An entry is only served for a query its own fields satisfy.
        let satisfied = query
            .conditions()
            .iter()
            .all(|(field, value)| document.get(field) == Some(value));
        if !satisfied {
            warn!(key = %key, "cached document does not match its key, discarding");
            self.cache.clear(&key);
            return None;
        }

        // Alias entries are served only while the identity entry agrees with them.
        let identity_key = self.director.build_key(&document);
        if identity_key.as_deref() != Some(key.as_str()) {
            let agrees = identity_key
                .and_then(|identity_key| self.cache.peek(&identity_key))
                .map_or(false, |current| current == document);
            if !agrees {
                warn!(key = %key, "alias entry is stale, discarding");
                self.cache.clear(&key);
                return None;
            }
        }

        debug!(key = %key, "cache hit");
        Some(document)
    }

    /// Caches a complete document under every key a lookup for it would use.
    pub fn store(&self, document: &Document) {
        if !self.director.valid(document) {
            return;
        }
        for lookup in self.director.lookups(document) {
            if !self.cache.valid(&lookup) {
                continue;
            }
            if let Some(key) = self.director.build_query_key(&lookup) {
                debug!(key = %key, "cache store");
                self.cache.set(&key, document);
            }
        }
    }

    /// Drops the entry a cacheable filter points at, and every key of the cached document.
    ///
    /// Filters the director refuses leave the cache untouched.
    pub fn invalidate(&self, conditions: &Document) {
        let query = Query::new(conditions.clone());
        let Some(key) = self.director.build_query_key(&query) else {
            debug!("conditions are not cacheable, nothing to invalidate");
            return;
        };
        if let Some(cached) = self.cache.peek(&key) {
            self.invalidate_document(&cached);
        }
        debug!(key = %key, "cache invalidate");
        self.cache.clear(&key);
    }

    /// Drops every key derived from a known document.
    pub fn invalidate_document(&self, document: &Document) {
        for key in self.director.build_keys(document) {
            debug!(key = %key, "cache invalidate");
            self.cache.clear(&key);
        }
    }
}
