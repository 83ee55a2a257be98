//! Integration tests for the cache layer (MemoryCache, IdentityDirector, ModelCache).

#[path = "../support/mod.rs"]
mod support;

mod concurrency;
mod director;
mod eviction;
