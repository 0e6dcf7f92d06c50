/*!
 * Tests for cache keys and the two-tier cache
 */

use std::sync::Arc;
use std::time::Duration;

use chunkwise::cache::{CacheKey, CacheTtls, ManualClock, MemoryRemoteTier, RemoteTier, TwoTierCache};

fn manual_cache() -> (Arc<TwoTierCache>, Arc<MemoryRemoteTier>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let remote = Arc::new(MemoryRemoteTier::new(clock.clone()));
    let cache = Arc::new(TwoTierCache::new(remote.clone(), CacheTtls::default(), clock.clone()));
    (cache, remote, clock)
}

#[test]
fn test_translationKey_withAnyFieldChanged_shouldDiffer() {
    let corpus = [
        ("Hello.", "en", "de", "A1"),
        ("Hello. How are you?", "en", "de", "B2"),
        ("Bonjour tout le monde.", "fr", "es", ""),
        ("Grüße aus Köln!", "de", "en", ""),
        ("", "en", "fr", ""),
    ];

    for (text, src, tgt, lvl) in corpus {
        let key = CacheKey::translation(text, src, tgt, lvl);
        assert_eq!(key, CacheKey::translation(text, src, tgt, lvl));

        assert_ne!(key, CacheKey::translation(&format!("{} ", text), src, tgt, lvl));
        assert_ne!(key, CacheKey::translation(text, "it", tgt, lvl));
        assert_ne!(key, CacheKey::translation(text, src, "pl", lvl));
        assert_ne!(key, CacheKey::translation(text, src, tgt, "A2"));
        assert_ne!(key, CacheKey::chunk(text, src, tgt, lvl));
    }
}

#[test]
fn test_cacheKey_display_shouldParseBack() {
    let key = CacheKey::chunk("Hallo.", "en", "de", "A1");
    let parsed: CacheKey = key.to_string().parse().unwrap();
    assert_eq!(parsed, key);
    assert!("translation:xyz".parse::<CacheKey>().is_err());
    assert!("no-separator".parse::<CacheKey>().is_err());
}

#[tokio::test]
async fn test_set_thenGet_shouldReturnValueUntilExpiry() {
    let (cache, _, clock) = manual_cache();
    let key = CacheKey::translation("Hello.", "en", "fr", "");

    cache.set(&key, "Bonjour.", Some(Duration::from_secs(60))).await;
    assert_eq!(cache.get(&key).await.as_deref(), Some("Bonjour."));

    clock.advance(Duration::from_secs(59));
    assert_eq!(cache.get(&key).await.as_deref(), Some("Bonjour."));

    clock.advance(Duration::from_secs(2));
    assert_eq!(cache.get(&key).await, None);
}

#[tokio::test]
async fn test_localTtlAboveSharedTtl_shouldNotOutliveSharedEntry() {
    let clock = Arc::new(ManualClock::new());
    let remote = Arc::new(MemoryRemoteTier::new(clock.clone()));
    let ttls = CacheTtls {
        local: Duration::from_secs(900),
        chunk: Duration::from_secs(30),
        remote: Duration::from_secs(300),
    };
    let cache = TwoTierCache::new(remote.clone(), ttls, clock.clone());
    let full = CacheKey::translation("Hello.", "en", "de", "A2");
    let chunk = CacheKey::chunk("Hello.", "en", "de", "A2");

    cache.set(&full, "Hallo.", None).await;
    cache.set(&chunk, "Hallo.", None).await;

    clock.advance(Duration::from_secs(31));
    assert_eq!(cache.get(&chunk).await, None);
    assert_eq!(cache.get(&full).await.as_deref(), Some("Hallo."));

    clock.advance(Duration::from_secs(270));
    assert_eq!(cache.get(&full).await, None);
}

#[tokio::test]
async fn test_manyExpiredKeys_shouldBePurgedOnNextWrite() {
    let (cache, remote, clock) = manual_cache();
    for i in 0..1000 {
        let key = CacheKey::chunk(&format!("Sentence {}.", i), "en", "fr", "");
        cache.set(&key, "Phrase.", None).await;
    }
    assert_eq!(remote.len(), 1000);

    clock.advance(Duration::from_secs(100_000));
    cache
        .set(&CacheKey::chunk("Last one.", "en", "fr", ""), "Dernière.", None)
        .await;

    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn test_concurrentWriters_shouldLeaveExactlyOneValue() {
    let (cache, remote, _) = manual_cache();
    let key = CacheKey::translation("Hello.", "en", "es", "");

    let writers: Vec<_> = (0..8)
        .map(|i| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.set(&key, &format!("Hola {}", i), None).await })
        })
        .collect();
    for writer in writers {
        writer.await.unwrap();
    }

    let seen = cache.get(&key).await.unwrap();
    assert!(seen.starts_with("Hola "));

    let stored = remote.get(&key.to_string()).await.unwrap().unwrap();
    assert_eq!(chunkwise::cache::remote::decompress(&stored).unwrap(), seen);
}

#[tokio::test]
async fn test_sharedTier_shouldServeSecondProcess() {
    let clock = Arc::new(ManualClock::new());
    let remote = Arc::new(MemoryRemoteTier::new(clock.clone()));
    let first = TwoTierCache::new(remote.clone(), CacheTtls::default(), clock.clone());
    let second = TwoTierCache::new(remote.clone(), CacheTtls::default(), clock.clone());
    let key = CacheKey::translation("Hello.", "en", "it", "");

    first.set(&key, "Ciao.", None).await;
    assert_eq!(second.get(&key).await.as_deref(), Some("Ciao."));

    second.delete(&key).await;
    assert!(remote.is_empty());
}

#[tokio::test]
async fn test_unreachableSharedTier_shouldDegradeToLocal() {
    let (cache, remote, _) = manual_cache();
    let key = CacheKey::translation("Hello.", "en", "nl", "");
    remote.set_available(false);

    cache.set(&key, "Hallo.", None).await;
    assert_eq!(cache.get(&key).await.as_deref(), Some("Hallo."));
    cache.delete(&key).await;
    assert_eq!(cache.get(&key).await, None);
}

#[test]
fn test_inMemoryCache_fromSyncContext_shouldRoundTrip() {
    let cache = TwoTierCache::in_memory(CacheTtls::default());
    let key = CacheKey::chunk("Good night.", "en", "pl", "");

    let value = tokio_test::block_on(async {
        cache.set(&key, "Dobranoc.", None).await;
        cache.get(&key).await
    });

    assert_eq!(value.as_deref(), Some("Dobranoc."));
    assert_eq!(cache.stats().0, 1);
}
