//! Caching - the cache contract, its bundled variants, and the policy that keys it.
//!
//! A [`Cache`] is a dumb keyed store of document snapshots. Deciding *whether*
//! a query may be answered from it, and under which key, belongs to the
//! [`CacheDirector`]. [`ModelCache`] ties the two together for a model.
//!
//! ## Example
//!
//! ```ignore
//! use docbind::{doc, Cache, MemoryCache, Query};
//!
//! let cache = MemoryCache::new(2);
//! assert!(cache.valid(&Query::by_id("a")));
//! cache.set("users:a", &doc! { "_id": "a" });
//! assert!(cache.get("users:a").is_some());
//! ```

mod director;
mod lru;
mod memory;
mod model_cache;
mod no_op;
mod stats;

use crate::document::{Document, Query};

/// Keyed storage for document snapshots.
///
/// Implementations are purely local: no I/O, no visibility across processes.
/// They are shared between concurrent operations and must serialize access
/// to their own state.
pub trait Cache: Send + Sync {
    /// Whether this cache is willing to answer the given query shape at all.
    fn valid(&self, query: &Query) -> bool;

    /// Returns a copy of the cached snapshot for `key`.
    fn get(&self, key: &str) -> Option<Document>;

    /// Like [`Cache::get`], for bookkeeping reads: recency is not refreshed and
    /// no statistics are recorded.
    fn peek(&self, key: &str) -> Option<Document> {
        self.get(key)
    }

    /// Stores a copy of `document` under `key`.
    fn set(&self, key: &str, document: &Document);

    /// Drops the entry for `key`, if any.
    fn clear(&self, key: &str);
}

pub use director::{CacheDirector, IdentityDirector};
pub use memory::MemoryCache;
pub use model_cache::ModelCache;
pub use no_op::NoOpCache;
pub use stats::CacheStats;
