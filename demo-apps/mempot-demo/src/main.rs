use anyhow::{bail, Result};
use futures::future::join_all;
use mempot_core::{Cache, CacheConfig, StopSignal};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mempot_demo=info,mempot_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let signal = StopSignal::new();
    // MEMPOT_DEFAULT_TTL_SECS is honoured; the sweep runs every second for the demo
    let config = CacheConfig::from_env()
        .with_cleanup_interval(Duration::from_secs(1))
        .with_stop_signal(signal.clone());
    let cache: Cache<String, String> = Cache::with_config(config);

    tracing::info!("mempot demo");
    tracing::info!("   Default TTL: {:?}", cache.default_ttl());

    demo_basic_operations(&cache)?;
    demo_expiration(&cache).await?;
    demo_remember(&cache)?;
    demo_parallel_remember(&cache).await?;

    signal.cancel();
    tokio::time::sleep(Duration::from_millis(50)).await;
    if cache.is_cleanup_running() {
        bail!("cleanup task still running after cancellation");
    }

    tracing::info!("done, {} entries left in the cache", cache.len());
    Ok(())
}

/// SET/GET/DELETE/RESET
fn demo_basic_operations(cache: &Cache<String, String>) -> Result<()> {
    tracing::info!("Demo: Basic Operations");

    cache.set("greeting".to_string(), "hello world".to_string());
    if cache.get("greeting").as_deref() != Some("hello world") {
        bail!("value should be readable right after set");
    }

    cache.delete("greeting");
    if cache.get("greeting").is_some() {
        bail!("value should be gone after delete");
    }

    cache.set("a".to_string(), "1".to_string());
    cache.set("b".to_string(), "2".to_string());
    let dropped = cache.reset();
    tracing::info!("   reset dropped {} entries", dropped);

    tracing::info!("   ✓ Basic operations work correctly");
    Ok(())
}

/// Lazy expiry on read, then reclamation by the background task
async fn demo_expiration(cache: &Cache<String, String>) -> Result<()> {
    tracing::info!("Demo: TTL Expiration");

    cache.set_with_ttl(
        "temporary".to_string(),
        "soon gone".to_string(),
        Duration::from_millis(500),
    );
    if cache.get("temporary").is_none() {
        bail!("key should exist immediately");
    }

    tracing::info!("   Waiting 2 seconds for expiration and a sweep...");
    tokio::time::sleep(Duration::from_secs(2)).await;

    if cache.get("temporary").is_some() {
        bail!("key should be expired after its TTL");
    }
    tracing::info!("   entries after sweep: {}", cache.len());

    tracing::info!("   ✓ TTL expiration works correctly");
    Ok(())
}

/// Compute once, reuse until stale
fn demo_remember(cache: &Cache<String, String>) -> Result<()> {
    tracing::info!("Demo: Remember");

    let failed = cache.remember("report".to_string(), |_| {
        Err(anyhow::anyhow!("upstream unavailable"))
    });
    match failed {
        Err(err) => tracing::info!("   compute failed as expected: {:#}", anyhow::Error::new(err)),
        Ok(_) => bail!("remember should surface the compute failure"),
    }

    let start = Instant::now();
    let first = cache.remember("report".to_string(), |key| {
        std::thread::sleep(Duration::from_millis(200));
        Ok::<_, anyhow::Error>(format!("{} built at {:?}", key, start.elapsed()))
    })?;
    let second = cache.remember("report".to_string(), |_| {
        Err(anyhow::anyhow!("should have been a cache hit"))
    })?;
    if first != second {
        bail!("second remember should return the cached value");
    }
    tracing::info!("   remembered in {:?}: {}", start.elapsed(), first);

    tracing::info!("   ✓ Remember works correctly");
    Ok(())
}

/// Concurrent async misses on distinct keys
async fn demo_parallel_remember(cache: &Cache<String, String>) -> Result<()> {
    tracing::info!("Demo: Parallel Remember (50 lookups over 10 keys)");

    let computed = Arc::new(AtomicUsize::new(0));
    let start = Instant::now();

    let mut handles = Vec::new();
    for i in 0..50 {
        let cache = cache.clone();
        let computed = Arc::clone(&computed);
        handles.push(tokio::spawn(async move {
            cache
                .remember_async(format!("item:{}", i % 10), |key| async move {
                    computed.fetch_add(1, Ordering::Relaxed);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok::<_, anyhow::Error>(key.to_uppercase())
                })
                .await
        }));
    }

    for result in join_all(handles).await {
        result??;
    }

    tracing::info!(
        "   50 lookups in {:?}, {} computations (concurrent misses are not de-duplicated)",
        start.elapsed(),
        computed.load(Ordering::Relaxed)
    );
    tracing::info!("   ✓ Parallel remember works correctly");
    Ok(())
}
