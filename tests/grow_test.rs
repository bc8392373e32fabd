use std::thread;
use std::time::Duration;

use growcache::{hash, CacheBuilder, Value};

/// Wait until background grows have settled: the bucket count stops moving.
fn settle(cache: &growcache::Cache) -> usize {
    let mut last = cache.bucket_stats().buckets;
    for _ in 0..40 {
        thread::sleep(Duration::from_millis(25));
        let now = cache.bucket_stats().buckets;
        if now == last {
            return now;
        }
        last = now;
    }
    last
}

#[test]
fn table_doubles_under_sequential_inserts() {
    let cache = CacheBuilder::new()
        .hash(hash::ly)
        .initial_buckets(1)
        .build();

    for i in 0..41u32 {
        let key = format!("k{i}");
        assert!(cache.set(key.as_bytes(), i));
    }

    let buckets = settle(&cache);
    assert!(buckets >= 2, "one bucket cannot hold 41 items quietly");
    assert!(
        buckets.is_power_of_two(),
        "grow only doubles, got {buckets} buckets"
    );

    assert_eq!(cache.len(), 41);
    for i in 0..41u32 {
        let key = format!("k{i}");
        assert_eq!(
            cache.get(key.as_bytes()),
            Some(Value::U32(i)),
            "lost {key} across growth"
        );
    }

    let stats = cache.bucket_stats();
    let total: usize = stats.histogram.iter().map(|(size, n)| size * n).sum();
    assert_eq!(total as u64, cache.len());
}

#[test]
fn concurrent_writers_and_readers_survive_growth() {
    const WRITERS: usize = 4;
    const PER_WRITER: u32 = 400;

    let cache = std::sync::Arc::new(
        CacheBuilder::new()
            .hash(hash::faq6)
            .initial_buckets(1)
            .build(),
    );

    let mut handles = Vec::new();
    for w in 0..WRITERS {
        let cache = cache.clone();
        handles.push(thread::spawn(move || {
            for i in 0..PER_WRITER {
                let key = format!("w{w}-k{i}");
                assert!(cache.set(key.as_bytes(), i));
            }
        }));
    }

    // Readers hammer random keys while the table doubles underneath them.
    // Any hit must carry the exact value the writer stored.
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let mut readers = Vec::new();
    for _ in 0..2 {
        let cache = cache.clone();
        let stop = stop.clone();
        readers.push(thread::spawn(move || {
            use rand::Rng;
            let mut rng = rand::thread_rng();
            while !stop.load(std::sync::atomic::Ordering::Relaxed) {
                let w = rng.gen_range(0..WRITERS);
                let i = rng.gen_range(0..PER_WRITER);
                let key = format!("w{w}-k{i}");
                if let Some(value) = cache.get(key.as_bytes()) {
                    assert_eq!(value, Value::U32(i), "corrupt read for {key}");
                }
            }
        }));
    }

    for handle in handles {
        handle.join().unwrap();
    }
    stop.store(true, std::sync::atomic::Ordering::Relaxed);
    for reader in readers {
        reader.join().unwrap();
    }

    settle(&cache);
    assert_eq!(cache.len(), (WRITERS as u64) * (PER_WRITER as u64));
    for w in 0..WRITERS {
        for i in 0..PER_WRITER {
            let key = format!("w{w}-k{i}");
            assert_eq!(cache.get(key.as_bytes()), Some(Value::U32(i)));
        }
    }
}

#[test]
fn deletes_interleaved_with_growth_keep_the_count_consistent() {
    let cache = CacheBuilder::new()
        .hash(hash::rot13)
        .initial_buckets(1)
        .build();

    for i in 0..200u32 {
        cache.set(format!("k{i}").as_bytes(), i);
    }
    for i in (0..200u32).step_by(2) {
        assert!(cache.del(format!("k{i}").as_bytes()).is_some());
    }

    settle(&cache);
    assert_eq!(cache.len(), 100);
    for i in 0..200u32 {
        let got = cache.get(format!("k{i}").as_bytes());
        if i % 2 == 0 {
            assert_eq!(got, None);
        } else {
            assert_eq!(got, Some(Value::U32(i)));
        }
    }
}
