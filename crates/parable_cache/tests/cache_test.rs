//! Tests for the artifact cache.

use parable_cache::{ArtifactCache, ArtifactCacheConfig, ArtifactCacheConfigBuilder, CacheKey};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

async fn open_cache() -> (TempDir, ArtifactCache) {
    let dir = tempfile::tempdir().unwrap();
    let cache = ArtifactCache::open(ArtifactCacheConfig::new(dir.path().join("cache")))
        .await
        .unwrap();
    (dir, cache)
}

fn entry_file(dir: &TempDir, key: &CacheKey) -> std::path::PathBuf {
    dir.path()
        .join("cache")
        .join(key.stage())
        .join(format!("{}.entry", key.digest()))
}

#[test]
fn test_key_is_deterministic_and_stage_scoped() {
    let a = CacheKey::new("story", "画蛇添足");
    let b = CacheKey::new("story", "画蛇添足");
    assert_eq!(a, b);
    assert_eq!(a.digest().len(), 64);
    assert!(a.digest().chars().all(|c| c.is_ascii_hexdigit()));

    assert_ne!(a, CacheKey::new("scenes", "画蛇添足"));
    assert_ne!(a, CacheKey::new("story", "守株待兔"));
    // The separator keeps "ab"+"c" distinct from "a"+"bc".
    assert_ne!(CacheKey::new("ab", "c").digest(), CacheKey::new("a", "bc").digest());
}

#[test]
fn test_stage_is_normalized_for_directories() {
    let key = CacheKey::new("images/v2", "x");
    assert_eq!(key.stage(), "images_v2");
}

#[tokio::test]
async fn test_put_then_get_returns_payload() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("audio", "农夫种田。");

    assert!(cache.get(&key).await.is_none());
    cache.put(&key, b"RIFF....WAVE").await.unwrap();

    assert_eq!(cache.get(&key).await.unwrap(), b"RIFF....WAVE");
    let entry = cache.entry(&key).await.unwrap();
    assert_eq!(entry.stage(), "audio");
    assert_eq!(entry.digest(), key.digest());
}

#[tokio::test]
async fn test_put_overwrites_idempotently() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("story", "守株待兔");

    cache.put(&key, b"first").await.unwrap();
    cache.put(&key, b"second").await.unwrap();
    cache.put(&key, b"second").await.unwrap();

    assert_eq!(cache.get(&key).await.unwrap(), b"second");
    assert_eq!(cache.len().await.unwrap(), 1);
}

#[tokio::test]
async fn test_entries_survive_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let key = CacheKey::new("story", "亡羊补牢");

    {
        let cache = ArtifactCache::open(ArtifactCacheConfig::new(dir.path())).await.unwrap();
        cache.put(&key, b"persisted").await.unwrap();
    }

    let cache = ArtifactCache::open(ArtifactCacheConfig::new(dir.path())).await.unwrap();
    assert_eq!(cache.get(&key).await.unwrap(), b"persisted");
}

#[tokio::test]
async fn test_corrupted_entry_is_a_miss() {
    let (dir, cache) = open_cache().await;
    let key = CacheKey::new("story", "守株待兔");
    cache.put(&key, b"good").await.unwrap();

    std::fs::write(entry_file(&dir, &key), b"{not json").unwrap();
    assert!(cache.get(&key).await.is_none());

    // A well-formed envelope whose payload was tampered with fails the checksum.
    cache.put(&key, b"good").await.unwrap();
    let raw = std::fs::read_to_string(entry_file(&dir, &key)).unwrap();
    let mut envelope: serde_json::Value = serde_json::from_str(&raw).unwrap();
    envelope["payload"] = serde_json::Value::String("YmFk".to_string());
    std::fs::write(entry_file(&dir, &key), envelope.to_string()).unwrap();
    assert!(cache.get(&key).await.is_none());
}

#[tokio::test]
async fn test_entry_under_wrong_key_is_a_miss() {
    let (dir, cache) = open_cache().await;
    let original = CacheKey::new("story", "a");
    let other = CacheKey::new("story", "b");
    cache.put(&original, b"payload").await.unwrap();

    std::fs::copy(entry_file(&dir, &original), entry_file(&dir, &other)).unwrap();
    assert!(cache.get(&other).await.is_none());
}

#[tokio::test]
async fn test_clear_by_prefix_and_all() {
    let (_dir, cache) = open_cache().await;
    let story = CacheKey::new("story", "守株待兔");
    let scenes = CacheKey::new("scenes", "守株待兔");
    let images = CacheKey::new("images", "守株待兔");
    for key in [&story, &scenes, &images] {
        cache.put(key, b"x").await.unwrap();
    }

    assert_eq!(cache.clear(Some("sto")).await.unwrap(), 1);
    assert!(cache.get(&story).await.is_none());
    assert!(cache.get(&scenes).await.is_some());

    assert_eq!(cache.clear(None).await.unwrap(), 2);
    assert!(cache.is_empty().await.unwrap());
}

#[tokio::test]
async fn test_remove_single_entry() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("story", "守株待兔");
    cache.put(&key, b"x").await.unwrap();

    assert!(cache.remove(&key).await.unwrap());
    assert!(!cache.remove(&key).await.unwrap());
    assert!(cache.get(&key).await.is_none());
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Scenes {
    idiom: String,
    scenes: Vec<String>,
}

#[tokio::test]
async fn test_json_helpers_round_trip() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("scenes", "守株待兔");
    let value = Scenes {
        idiom: "守株待兔".to_string(),
        scenes: vec!["农夫种田。".to_string(), "兔子撞树。".to_string()],
    };

    cache.put_json(&key, &value).await.unwrap();
    assert_eq!(cache.get_json::<Scenes>(&key).await, Some(value));

    // Wrong shape is a miss, not an error.
    assert!(cache.get_json::<Vec<u32>>(&key).await.is_none());
}

#[tokio::test]
async fn test_get_or_insert_with_runs_stage_once() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("story", "守株待兔");
    let calls = Arc::new(AtomicUsize::new(0));

    for _ in 0..3 {
        let calls = calls.clone();
        let text: String = cache
            .get_or_insert_with(&key, || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok("从前，宋国有个农夫。".to_string())
            })
            .await
            .unwrap();
        assert_eq!(text, "从前，宋国有个农夫。");
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_disabled_cache_always_misses() {
    let dir = tempfile::tempdir().unwrap();
    let config = ArtifactCacheConfigBuilder::default()
        .root(dir.path().join("cache"))
        .enabled(false)
        .build()
        .unwrap();
    let cache = ArtifactCache::open(config).await.unwrap();
    let key = CacheKey::new("story", "守株待兔");

    cache.put(&key, b"x").await.unwrap();
    assert!(cache.get(&key).await.is_none());
    assert!(!dir.path().join("cache").exists());
}

#[tokio::test]
async fn test_concurrent_puts_leave_an_intact_entry() {
    let (_dir, cache) = open_cache().await;
    let key = CacheKey::new("images", "守株待兔");

    let mut handles = Vec::new();
    for i in 0..16u8 {
        let cache = cache.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            cache.put(&key, &vec![i; 1024]).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let payload = cache.get(&key).await.unwrap();
    assert_eq!(payload.len(), 1024);
    assert!(payload.iter().all(|b| *b == payload[0]));
    assert_eq!(cache.len().await.unwrap(), 1);
}
