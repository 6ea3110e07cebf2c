//! Cache invariant tests
//!
//! Verify properties that must hold across instances, threads and restarts.

use diskcache::config::{DEFAULT_SIZE_LIMIT_BYTES, ENV_COUNT_LIMIT};
use diskcache::{CacheConfig, CacheConfigLoader, DiskCache, EvictionManager, KeyMapper, Quotas};
use serial_test::serial;
use std::sync::{Arc, Barrier};
use std::time::Duration;
use tempfile::TempDir;

fn config(dir: &TempDir, size_limit_bytes: u64, count_limit: u64) -> CacheConfig {
    CacheConfig::builder(dir.path())
        .size_limit_bytes(size_limit_bytes)
        .count_limit(count_limit)
        .build()
        .unwrap()
}

/// Invariant: concurrent opens of one directory share a single instance
#[test]
fn invariant_one_instance_per_directory() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().to_path_buf();
    let barrier = Arc::new(Barrier::new(8));

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let path = path.clone();
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                barrier.wait();
                DiskCache::open(CacheConfig::new(path)).unwrap()
            })
        })
        .collect();
    let caches: Vec<DiskCache> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for cache in &caches[1..] {
        assert!(caches[0].same_instance(cache));
    }
    caches[0].put("k", b"v");
    assert!(caches.iter().all(|c| c.get("k").as_deref() == Some(&b"v"[..])));
}

/// Invariant: pre-existing entries count against the quotas once scanned
#[test]
fn invariant_restart_enforces_quotas_on_scanned_entries() {
    let dir = TempDir::new().unwrap();
    {
        let cache = DiskCache::open_ready(CacheConfig::new(dir.path())).unwrap();
        for i in 0..10 {
            cache.put(&format!("key_{i}"), b"value");
            // Distinct mtimes so the scan can order entries
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    let cache = DiskCache::open_ready(config(&dir, u64::MAX, 4)).unwrap();
    assert_eq!(cache.entry_count(), 10);

    cache.put("fresh", b"value");

    assert_eq!(cache.entry_count(), 4);
    assert_eq!(cache.statistics().evictions, 7);
    assert!(cache.contains("fresh"));
    assert!(cache.contains("key_9"));
    assert!(!cache.contains("key_0"));
}

/// Invariant: the advisory API never panics or fails when storage breaks
#[test]
fn invariant_storage_failures_become_misses() {
    let dir = TempDir::new().unwrap();
    let cache_dir = dir.path().join("cache");
    let cache = DiskCache::open_ready(CacheConfig::new(&cache_dir)).unwrap();
    cache.put("before", b"value");

    std::fs::remove_dir_all(&cache_dir).unwrap();

    cache.put("after", b"value");
    assert_eq!(cache.get("after"), None);
    assert_eq!(cache.get("before"), None);
    assert!(!cache.remove("after"));
    cache.clear();

    let stats = cache.statistics();
    assert!(stats.errors >= 1);
    assert!(cache.try_put("after", b"value", None).is_err());
}

/// Invariant: the registry seeded by the scan matches the files on disk
#[test]
fn invariant_scan_ignores_foreign_files() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "not a cache entry").unwrap();
    std::fs::write(KeyMapper::entry_path(dir.path(), "k"), b"0123456789").unwrap();

    let quotas = Quotas {
        size_limit_bytes: 100,
        count_limit: 10,
    };
    let (manager, scan) = EvictionManager::start(dir.path().to_path_buf(), quotas).unwrap();
    let outcome = scan.wait().unwrap();

    assert_eq!(outcome.files, 1);
    assert_eq!(manager.total_size(), 10);
    assert!(dir.path().join("notes.txt").exists());
}

/// Invariant: configuration files feed straight into an open cache
#[test]
#[serial]
fn invariant_config_file_quotas_are_applied() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("cache.json");
    let cache_dir = dir.path().join("entries");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "cache_dir": cache_dir,
            "count_limit": 2,
        })
        .to_string(),
    )
    .unwrap();

    let config = CacheConfig::from_json_file(&config_path).unwrap();
    assert_eq!(config.size_limit_bytes, DEFAULT_SIZE_LIMIT_BYTES);
    let cache = DiskCache::open_ready(config).unwrap();

    for i in 0..3 {
        cache.put(&format!("key_{i}"), b"value");
    }
    assert_eq!(cache.entry_count(), 2);
    assert_eq!(cache.statistics().count_limit, 2);
}

/// Invariant: environment overrides win over the config file
#[test]
#[serial]
fn invariant_environment_overrides_config_file() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("cache.json");
    std::fs::write(
        &config_path,
        serde_json::json!({
            "cache_dir": dir.path().join("entries"),
            "count_limit": 2,
        })
        .to_string(),
    )
    .unwrap();

    std::env::set_var(ENV_COUNT_LIMIT, "3");
    let loaded = CacheConfigLoader::load(Some(&config_path));
    std::env::remove_var(ENV_COUNT_LIMIT);

    let cache = DiskCache::open_ready(loaded.unwrap()).unwrap();
    for i in 0..5 {
        cache.put(&format!("key_{i}"), b"value");
    }
    assert_eq!(cache.entry_count(), 3);
}

/// Invariant: a due entry reads as a miss and its file is deleted
#[test]
fn invariant_expired_entry_is_deleted_on_read() {
    let dir = TempDir::new().unwrap();
    let cache = DiskCache::open_ready(CacheConfig::new(dir.path())).unwrap();

    cache.put_with_ttl("k", b"v", Duration::from_secs(1));
    let path = cache.file("k").unwrap();
    std::thread::sleep(Duration::from_secs(2));

    assert_eq!(cache.get("k"), None);
    assert!(!path.exists());
    assert_eq!(cache.entry_count(), 0);
}
