//! Read-through cache for fetched grids.
//!
//! Entries are JSON strings keyed by `SheetRequest::cache_key`. They are
//! never expired; clearing the store is the only way to refetch.

use crate::file::parse_grid;
use crate::{BackendError, TabularSource};
use carcupid_model::Grid;
use carcupid_query::SheetRequest;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// A key → JSON string store.
pub trait CacheStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), BackendError>;
}

/// In-memory store that lives as long as the process.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: Mutex<HashMap<String, String>>,
}

impl SessionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CacheStore for SessionCache {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|e| BackendError::QueryFailed(format!("cache lock poisoned: {e}")))?;
        entries.insert(key.to_string(), value);
        Ok(())
    }
}

/// One file per key inside a directory, so entries survive between runs.
///
/// File names are the hex-encoded key, so distinct keys never share a file.
#[derive(Debug, Clone)]
pub struct DirCache {
    dir: PathBuf,
}

impl DirCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", hex::encode(key)))
    }
}

impl CacheStore for DirCache {
    fn get(&self, key: &str) -> Option<String> {
        std::fs::read_to_string(self.path_for(key)).ok()
    }

    fn set(&self, key: &str, value: String) -> Result<(), BackendError> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(self.path_for(key), value)?;
        Ok(())
    }
}

/// Consults the cache before fetching and stores successful fetches.
pub struct CachedSource<S, C> {
    inner: S,
    cache: C,
}

impl<S, C> CachedSource<S, C> {
    pub fn new(inner: S, cache: C) -> Self {
        Self { inner, cache }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn cache(&self) -> &C {
        &self.cache
    }
}

impl<S, C> TabularSource for CachedSource<S, C>
where
    S: TabularSource + Sync,
    C: CacheStore + Sync,
{
    async fn fetch_grid(&self, request: &SheetRequest) -> Result<Grid, BackendError> {
        let key = request.cache_key();

        if let Some(cached) = self.cache.get(&key) {
            match parse_grid(&cached) {
                Ok(grid) => {
                    tracing::debug!(key = %key, rows = grid.len(), "Cache hit");
                    return Ok(grid);
                }
                Err(e) => tracing::warn!(key = %key, error = %e, "Ignoring corrupt cache entry"),
            }
        }

        let grid = self.inner.fetch_grid(request).await?;

        match serde_json::to_string(&grid) {
            Ok(json) => {
                if let Err(e) = self.cache.set(&key, json) {
                    tracing::warn!(key = %key, error = %e, "Failed to store grid in cache");
                }
            }
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to encode grid for cache"),
        }

        Ok(grid)
    }

    fn name(&self) -> &'static str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use carcupid_model::Cell;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
    }

    impl TabularSource for CountingSource {
        async fn fetch_grid(&self, _request: &SheetRequest) -> Result<Grid, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![vec![Cell::from("fresh")]])
        }

        fn name(&self) -> &'static str {
            "counting"
        }
    }

    fn counting() -> CountingSource {
        CountingSource {
            calls: AtomicUsize::new(0),
        }
    }

    fn request() -> SheetRequest {
        SheetRequest::new("sheet-1", Some("DATABASE".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_second_fetch_hits_cache() {
        let source = CachedSource::new(counting(), SessionCache::new());
        let first = source.fetch_grid(&request()).await.unwrap();
        let second = source.fetch_grid(&request()).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);
        assert!(source.cache().get("sheet:sheet-1:DATABASE").is_some());
    }

    #[tokio::test]
    async fn test_prefilled_cache_skips_source() {
        let cache = SessionCache::new();
        cache
            .set("sheet:sheet-1:DATABASE", r#"[["cached"]]"#.to_string())
            .unwrap();
        let source = CachedSource::new(counting(), cache);

        let grid = source.fetch_grid(&request()).await.unwrap();
        assert_eq!(grid, vec![vec![Cell::from("cached")]]);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_corrupt_entry_refetches() {
        let cache = SessionCache::new();
        cache.set("sheet:sheet-1:DATABASE", "not json".to_string()).unwrap();
        let source = CachedSource::new(counting(), cache);

        let grid = source.fetch_grid(&request()).await.unwrap();
        assert_eq!(grid, vec![vec![Cell::from("fresh")]]);
        assert_eq!(source.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dir_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path().join("nested"));
        assert_eq!(cache.get("sheet:a:DATABASE"), None);

        cache.set("sheet:a:DATABASE", "[]".to_string()).unwrap();
        assert_eq!(cache.get("sheet:a:DATABASE").as_deref(), Some("[]"));
        assert!(dir
            .path()
            .join(format!("nested/{}.json", hex::encode("sheet:a:DATABASE")))
            .exists());
    }

    #[test]
    fn test_dir_cache_keys_with_punctuation_stay_separate() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DirCache::new(dir.path());

        cache.set("sheet:a:b_c", r#"[["first"]]"#.to_string()).unwrap();
        assert_eq!(cache.get("sheet:a_b:c"), None);
        assert_eq!(cache.get("sheet:a:b c"), None);

        cache.set("sheet:a_b:c", r#"[["second"]]"#.to_string()).unwrap();
        assert_eq!(cache.get("sheet:a:b_c").as_deref(), Some(r#"[["first"]]"#));
        assert_eq!(cache.get("sheet:a_b:c").as_deref(), Some(r#"[["second"]]"#));
    }
}
