// tests/cache_eviction.rs
use flashpoint_engine::cache::EventCache;
use flashpoint_engine::CanonicalEvent;

fn ev(n: usize) -> CanonicalEvent {
    CanonicalEvent {
        source: "Sim".into(),
        text: format!("event {n}"),
        url: format!("https://example.com/{n}"),
        timestamp: n as f64,
        bias: "Test".into(),
        lat: None,
        lon: None,
    }
}

#[test]
fn read_all_returns_the_c_most_recent_in_arrival_order() {
    let cache = EventCache::new(100);
    for n in 0..101 {
        cache.push(ev(n));
    }

    let all = cache.read_all();
    assert_eq!(all.len(), 100);
    // The oldest pushed event is gone; order is arrival order.
    assert!(all.iter().all(|e| e.text != "event 0"));
    assert_eq!(all[0].text, "event 1");
    assert_eq!(all[99].text, "event 100");
}

#[test]
fn concurrent_readers_and_writers_never_see_torn_events() {
    use std::sync::Arc;
    use std::thread;

    let cache = Arc::new(EventCache::new(50));
    let writer = {
        let cache = cache.clone();
        thread::spawn(move || {
            for n in 0..500 {
                cache.push(ev(n));
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    for e in cache.read_all() {
                        // Every observed event is fully formed.
                        assert!(e.text.starts_with("event "));
                        assert!(!e.url.is_empty());
                    }
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for r in readers {
        r.join().unwrap();
    }
    assert_eq!(cache.len(), 50);
}
