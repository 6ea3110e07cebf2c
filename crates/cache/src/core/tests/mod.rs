use super::DiskCache;
use crate::config::CacheConfig;
use tempfile::TempDir;


fn open(dir: &TempDir) -> DiskCache {
    DiskCache::open_ready(CacheConfig::new(dir.path())).unwrap()
}

fn open_with(dir: &TempDir, size_limit_bytes: u64, count_limit: u64) -> DiskCache {
    let config = CacheConfig::builder(dir.path())
        .size_limit_bytes(size_limit_bytes)
        .count_limit(count_limit)
        .build()
        .unwrap();
    DiskCache::open_ready(config).unwrap()
}

fn files_in(dir: &TempDir) -> usize {
    std::fs::read_dir(dir.path()).unwrap().count()
}
