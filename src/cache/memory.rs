use parking_lot::Mutex;

use super::lru::LruMap;
use super::{Cache, CacheStats};
use crate::document::{is_scalar, Document, Query, ID_FIELD};
use crate::error::{Error, Result};

/// Bounded in-process cache with least-recently-used eviction.
///
/// All access goes through one mutex, so interleaved get/set/clear calls from
/// concurrent operations keep the eviction order intact.
pub struct MemoryCache {
    entries: Mutex<LruMap<String, Document>>,
    stats: CacheStats,
    unique_lookups: bool,
}

impl MemoryCache {
    /// Creates a cache holding at most `capacity` documents (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(LruMap::new(capacity)),
            stats: CacheStats::new(),
            unique_lookups: false,
        }
    }

    /// Like [`MemoryCache::new`], but rejects a zero capacity.
    pub fn try_new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::Configuration(
                "memory cache capacity must be at least 1".into(),
            ));
        }
        Ok(Self::new(capacity))
    }

    /// Also answer single-field equality lookups on fields other than `_id`.
    ///
    /// The cache cannot tell whether a field is unique; the model's
    /// [`CacheDirector`](crate::CacheDirector) still has to agree before a
    /// lookup reaches it.
    pub fn accept_unique_lookups(mut self) -> Self {
        self.unique_lookups = true;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().capacity()
    }

    /// Whether `key` is cached, without refreshing its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().peek(key).is_some()
    }

    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Drops every entry and resets the statistics.
    pub fn clear_all(&self) {
        self.entries.lock().clear();
        self.stats.reset();
    }
}

impl Cache for MemoryCache {
    fn valid(&self, query: &Query) -> bool {
        if query.is_partial() || query.has_cursor_modifiers() {
            return false;
        }
        let conditions = query.conditions();
        if conditions.len() != 1 {
            return false;
        }
        conditions
            .iter()
            .next()
            .map(|(field, value)| {
                (field == ID_FIELD || (self.unique_lookups && !field.starts_with('$')))
                    && is_scalar(value)
            })
            .unwrap_or(false)
    }

    fn get(&self, key: &str) -> Option<Document> {
        let found = self.entries.lock().get(key).cloned();
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    fn peek(&self, key: &str) -> Option<Document> {
        self.entries.lock().peek(key).cloned()
    }

    fn set(&self, key: &str, document: &Document) {
        let evicted = self
            .entries
            .lock()
            .insert(key.to_string(), document.clone());
        self.stats.record_insert();
        if evicted.is_some() {
            self.stats.record_eviction();
        }
    }

    fn clear(&self, key: &str) {
        self.entries.lock().remove(key);
    }
}
