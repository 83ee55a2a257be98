use std::sync::Arc;
use std::thread;

use docbind::{doc, Cache, MemoryCache};

#[test]
fn concurrent_access_respects_capacity_and_counts_every_read() {
    const THREADS: usize = 8;
    const OPS: usize = 500;

    let cache = Arc::new(MemoryCache::new(32));
    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..OPS {
                    let key = format!("k{}", (t * 7 + i) % 100);
                    if i % 3 == 0 {
                        cache.set(&key, &doc! { "_id": key.clone(), "t": t });
                    } else if i % 11 == 0 {
                        cache.clear(&key);
                    } else {
                        cache.get(&key);
                    }
                    assert!(cache.len() <= cache.capacity());
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked");
    }

    let reads = (0..OPS).filter(|i| i % 3 != 0 && i % 11 != 0).count() * THREADS;
    let writes = (0..OPS).filter(|i| i % 3 == 0).count() * THREADS;
    let stats = cache.stats();
    assert_eq!(stats.hits() + stats.misses(), reads as u64);
    assert_eq!(stats.inserts(), writes as u64);
    assert!(cache.len() <= 32);
}

#[test]
fn models_share_one_cache_across_threads() {
    let fixture = super::support::Fixture::new();
    let users = fixture.users();
    let ids: Vec<_> = (0..16)
        .map(|n| {
            users
                .create(doc! { "n": n, "email": format!("u{n}@example.com") })
                .expect("created")
                .id()
                .cloned()
                .expect("identity")
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let users = users.clone();
            let ids = ids.clone();
            thread::spawn(move || {
                for id in ids {
                    let found = users.find_by_id(id.clone()).expect("read").expect("exists");
                    assert_eq!(found.id(), Some(&id));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("reader panicked");
    }

    // every document was cached on create, so no reader reached the store
    assert_eq!(fixture.round_trips(), 16);
}
