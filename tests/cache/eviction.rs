use docbind::{doc, Cache, MemoryCache};

#[test]
fn n_plus_one_insertions_evict_exactly_the_oldest() {
    let cache = MemoryCache::new(3);
    for key in ["a", "b", "c", "d"] {
        cache.set(key, &doc! { "_id": key });
    }

    assert_eq!(cache.len(), 3);
    assert!(!cache.contains("a"));
    for key in ["b", "c", "d"] {
        assert!(cache.contains(key), "{key} should be retained");
    }
    assert_eq!(cache.stats().evictions(), 1);
    assert_eq!(cache.stats().inserts(), 4);
}

#[test]
fn reads_refresh_recency() {
    let cache = MemoryCache::new(2);
    cache.set("a", &doc! { "_id": "a" });
    cache.set("b", &doc! { "_id": "b" });

    assert!(cache.get("a").is_some());
    cache.set("c", &doc! { "_id": "c" });

    assert!(cache.contains("a"));
    assert!(!cache.contains("b"));
    assert!(cache.contains("c"));
}

#[test]
fn overwriting_a_key_does_not_evict() {
    let cache = MemoryCache::new(2);
    cache.set("a", &doc! { "v": 1 });
    cache.set("b", &doc! { "v": 1 });
    cache.set("a", &doc! { "v": 2 });

    assert_eq!(cache.len(), 2);
    assert_eq!(cache.stats().evictions(), 0);
    assert_eq!(cache.get("a"), Some(doc! { "v": 2 }));
}

#[test]
fn cleared_keys_miss() {
    let cache = MemoryCache::new(2);
    cache.set("a", &doc! {});
    cache.clear("a");
    cache.clear("never-set");

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.stats().misses(), 1);
    assert!(cache.is_empty());
}

#[test]
fn zero_capacity_is_a_configuration_error() {
    assert!(matches!(
        MemoryCache::try_new(0),
        Err(docbind::Error::Configuration(_))
    ));
    assert_eq!(MemoryCache::new(0).capacity(), 1);
}
