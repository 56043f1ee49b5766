use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::anyhow;
use mempot_core::{Cache, CacheConfig, StopSignal};

const KEY: &str = "foo";
const DATA: &str = "bar";

fn scenario_cache(signal: &StopSignal) -> Cache<String, String> {
    let config = CacheConfig::default()
        .with_default_ttl(Duration::from_secs(30))
        .with_cleanup_interval(Duration::from_secs(4))
        .with_stop_signal(signal.clone());
    Cache::with_config(config)
}

#[tokio::test]
async fn test_cache_lifecycle() {
    let signal = StopSignal::new();
    let cache = scenario_cache(&signal);

    cache.set_with_ttl(KEY.to_string(), DATA.to_string(), Duration::from_secs(1));
    assert_eq!(cache.get(KEY).as_deref(), Some(DATA));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(cache.get(KEY), None, "item still visible after its TTL");

    cache.set(KEY.to_string(), DATA.to_string());
    cache.delete(KEY);
    assert_eq!(cache.get(KEY), None, "item still exists after delete");

    cache.set(KEY.to_string(), DATA.to_string());
    cache.reset();
    assert_eq!(cache.get(KEY), None, "item still exists after reset");

    let err = cache
        .remember(KEY.to_string(), |_| Err(anyhow!("data not available")))
        .unwrap_err();
    assert!(err.is_compute());
    assert_eq!(cache.get(KEY), None, "failed compute must not store anything");

    let calls = AtomicUsize::new(0);
    for _ in 0..2 {
        let value = cache
            .remember(KEY.to_string(), |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, anyhow::Error>(DATA.to_string())
            })
            .expect("failed to remember item");
        assert_eq!(value, DATA);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1, "second remember should hit the cache");

    // The task belongs to the external signal; stop() leaves it alone
    cache.stop();
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(cache.is_cleanup_running());

    signal.cancel();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!cache.is_cleanup_running());

    // Foreground operations outlive the background task
    assert_eq!(cache.get(KEY).as_deref(), Some(DATA));
}

#[tokio::test]
async fn test_background_sweep_reclaims_memory() {
    let config = CacheConfig::default()
        .with_default_ttl(Duration::from_millis(20))
        .with_cleanup_interval(Duration::from_millis(100));
    let cache: Cache<u64, Vec<u8>> = Cache::with_config(config);

    for id in 0..10 {
        cache.set(id, vec![0u8; 1024]);
    }
    cache.set_with_ttl(99, vec![1], Duration::ZERO);
    assert_eq!(cache.len(), 11);

    tokio::time::sleep(Duration::from_millis(250)).await;

    assert_eq!(cache.len(), 1);
    assert_eq!(cache.get(&99), Some(vec![1]));
}

#[tokio::test]
async fn test_independent_caches_do_not_share_state() {
    let first: Cache<String, u32> =
        Cache::with_config(CacheConfig::default().with_cleanup_interval(Duration::from_millis(50)));
    let second: Cache<String, u32> =
        Cache::with_config(CacheConfig::default().with_cleanup_interval(Duration::from_secs(60)));

    first.set_with_ttl("expire".to_string(), 1, Duration::from_millis(10));
    second.set("keep".to_string(), 2);
    first.stop();

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!first.is_cleanup_running());
    assert!(second.is_cleanup_running());
    assert_eq!(first.get("keep"), None);
    assert_eq!(second.get("keep"), Some(2));
}
