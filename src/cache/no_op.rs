use super::Cache;
use crate::document::{Document, Query};

/// Cache that never holds anything. The default when no cache is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCache;

impl Cache for NoOpCache {
    fn valid(&self, _query: &Query) -> bool {
        false
    }

    fn get(&self, _key: &str) -> Option<Document> {
        None
    }

    fn set(&self, _key: &str, _document: &Document) {}

    fn clear(&self, _key: &str) {}
}
