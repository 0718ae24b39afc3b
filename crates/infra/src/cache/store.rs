//! File-backed cost-center name-to-id cache
//!
//! A JSON file maps cost-center names to identifiers with a timestamp
//! per entry. Entries past the TTL stop answering lookups but stay on
//! disk until an explicit cleanup, so `cache stats` can show what
//! expired. A corrupt or version-mismatched file is discarded rather
//! than trusted. Writes land in a sibling temp file first and are moved
//! into place, so a crash never leaves a half-written cache.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, TimeDelta, Utc};
use costsync_core::ports::MappingCache;
use costsync_domain::{CacheConfig, CostsyncError, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};

const CACHE_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    id: String,
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheFile {
    version: String,
    last_updated: DateTime<Utc>,
    cost_centers: BTreeMap<String, CacheEntry>,
}

impl CacheFile {
    fn empty(now: DateTime<Utc>) -> Self {
        Self {
            version: CACHE_VERSION.to_string(),
            last_updated: now,
            cost_centers: BTreeMap::new(),
        }
    }
}

/// Persistent cost-center mapping cache with per-entry TTL.
pub struct CostCenterCache<C: Clock = SystemClock> {
    path: PathBuf,
    ttl: TimeDelta,
    enabled: bool,
    clock: C,
    state: Mutex<CacheFile>,
}

impl CostCenterCache<SystemClock> {
    /// Open the cache described by the configuration, reading any
    /// existing file. Never fails: unreadable state degrades to an
    /// empty cache.
    pub fn open(config: &CacheConfig) -> Self {
        Self::open_with_clock(config, SystemClock)
    }
}

impl<C: Clock> CostCenterCache<C> {
    pub fn open_with_clock(config: &CacheConfig, clock: C) -> Self {
        let now = clock.now();
        let state = if config.enabled {
            load_cache_file(&config.path, now)
        } else {
            CacheFile::empty(now)
        };
        let ttl = TimeDelta::try_hours(i64::try_from(config.ttl_hours).unwrap_or(i64::MAX))
            .unwrap_or(TimeDelta::MAX);
        Self {
            path: config.path.clone(),
            ttl,
            enabled: config.enabled,
            clock,
            state: Mutex::new(state),
        }
    }

    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now();
        let state = self.lock_state();
        let total = state.cost_centers.len();
        let fresh = state.cost_centers.values().filter(|entry| self.is_fresh(entry, now)).count();
        CacheStats {
            total,
            fresh,
            expired: total - fresh,
            ttl_hours: self.ttl.num_hours(),
            path: self.path.clone(),
            enabled: self.enabled,
        }
    }

    /// Drop expired entries and persist. Returns how many were evicted.
    pub fn cleanup(&self) -> Result<usize> {
        if !self.enabled {
            return Ok(0);
        }
        let now = self.clock.now();
        let ttl = self.ttl;
        let mut state = self.lock_state();
        let before = state.cost_centers.len();
        state
            .cost_centers
            .retain(|_, entry| now.signed_duration_since(entry.timestamp) <= ttl);
        let evicted = before - state.cost_centers.len();
        if evicted > 0 {
            state.last_updated = now;
            self.persist(&state)?;
            info!(evicted, "evicted expired cache entries");
        }
        Ok(evicted)
    }

    /// Drop every entry and persist the empty file. Returns how many
    /// entries were removed.
    pub fn clear(&self) -> Result<usize> {
        if !self.enabled {
            return Ok(0);
        }
        let now = self.clock.now();
        let mut state = self.lock_state();
        let removed = state.cost_centers.len();
        state.cost_centers.clear();
        state.last_updated = now;
        self.persist(&state)?;
        info!(removed, "cleared cost-center cache");
        Ok(removed)
    }

    fn is_fresh(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(entry.timestamp) <= self.ttl
    }

    fn lock_state(&self) -> MutexGuard<'_, CacheFile> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &CacheFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|err| {
                    CostsyncError::Cache(format!(
                        "failed to create cache directory {}: {err}",
                        parent.display()
                    ))
                })?;
            }
        }
        let contents = serde_json::to_string_pretty(state)
            .map_err(|err| CostsyncError::Cache(format!("failed to serialize cache: {err}")))?;
        let tmp = tmp_path(&self.path);
        fs::write(&tmp, contents).map_err(|err| {
            CostsyncError::Cache(format!("failed to write {}: {err}", tmp.display()))
        })?;
        fs::rename(&tmp, &self.path).map_err(|err| {
            CostsyncError::Cache(format!(
                "failed to move cache into place at {}: {err}",
                self.path.display()
            ))
        })?;
        Ok(())
    }
}

impl<C: Clock> MappingCache for CostCenterCache<C> {
    fn get(&self, name: &str) -> Option<String> {
        if !self.enabled {
            return None;
        }
        let now = self.clock.now();
        let state = self.lock_state();
        match state.cost_centers.get(name) {
            Some(entry) if self.is_fresh(entry, now) => {
                debug!(cost_center = %name, "cache hit");
                Some(entry.id.clone())
            }
            Some(_) => {
                debug!(cost_center = %name, "cache entry expired");
                None
            }
            None => None,
        }
    }

    fn set(&self, name: &str, id: &str) {
        if !self.enabled {
            return;
        }
        let now = self.clock.now();
        let mut state = self.lock_state();
        state
            .cost_centers
            .insert(name.to_string(), CacheEntry { id: id.to_string(), timestamp: now });
        state.last_updated = now;
        if let Err(err) = self.persist(&state) {
            warn!(error = %err, "failed to persist cost-center cache");
        }
    }
}

fn load_cache_file(path: &Path, now: DateTime<Utc>) -> CacheFile {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no cache file yet");
            return CacheFile::empty(now);
        }
        Err(err) => {
            warn!(
                path = %path.display(),
                error = %err,
                "failed to read cache file, starting empty"
            );
            return CacheFile::empty(now);
        }
    };
    match serde_json::from_str::<CacheFile>(&contents) {
        Ok(state) if state.version == CACHE_VERSION => state,
        Ok(state) => {
            warn!(
                found = %state.version,
                expected = CACHE_VERSION,
                "cache file version mismatch, starting empty"
            );
            CacheFile::empty(now)
        }
        Err(err) => {
            warn!(path = %path.display(), error = %err, "corrupt cache file, starting empty");
            CacheFile::empty(now)
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut os = path.as_os_str().to_os_string();
    os.push(".tmp");
    PathBuf::from(os)
}

/// Snapshot of cache contents for the `cache stats` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub total: usize,
    pub fresh: usize,
    pub expired: usize,
    pub ttl_hours: i64,
    pub path: PathBuf,
    pub enabled: bool,
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache: {}", if self.enabled { "enabled" } else { "disabled" })?;
        writeln!(f, "  path: {}", self.path.display())?;
        writeln!(f, "  entries: {} ({} fresh, {} expired)", self.total, self.fresh, self.expired)?;
        write!(f, "  ttl: {}h", self.ttl_hours)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::super::clock::MockClock;
    use super::*;

    fn cache_config(dir: &TempDir) -> CacheConfig {
        CacheConfig {
            enabled: true,
            path: dir.path().join("cost_centers.json"),
            ttl_hours: 24,
        }
    }

    #[test]
    fn set_then_get_roundtrips() {
        let dir = TempDir::new().expect("tempdir");
        let cache = CostCenterCache::open_with_clock(&cache_config(&dir), MockClock::new());

        cache.set("Engineering", "cc-1");

        assert_eq!(cache.get("Engineering"), Some("cc-1".to_string()));
        assert_eq!(cache.get("Unknown"), None);
    }

    #[test]
    fn entries_expire_after_the_ttl() {
        let dir = TempDir::new().expect("tempdir");
        let clock = MockClock::new();
        let cache = CostCenterCache::open_with_clock(&cache_config(&dir), clock.clone());

        cache.set("Engineering", "cc-1");
        clock.advance(TimeDelta::hours(25));

        assert_eq!(cache.get("Engineering"), None);
        let stats = cache.stats();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.expired, 1);
    }

    #[test]
    fn expired_entries_stay_on_disk_until_cleanup() {
        let dir = TempDir::new().expect("tempdir");
        let config = cache_config(&dir);
        let clock = MockClock::new();

        let cache = CostCenterCache::open_with_clock(&config, clock.clone());
        cache.set("Engineering", "cc-1");
        clock.advance(TimeDelta::hours(25));

        // The entry survives a reload even though it no longer hits.
        let reloaded = CostCenterCache::open_with_clock(&config, clock.clone());
        assert_eq!(reloaded.stats().total, 1);
        assert_eq!(reloaded.get("Engineering"), None);

        assert_eq!(reloaded.cleanup().expect("cleanup"), 1);
        let after = CostCenterCache::open_with_clock(&config, clock.clone());
        assert_eq!(after.stats().total, 0);
    }

    #[test]
    fn fresh_entries_survive_cleanup() {
        let dir = TempDir::new().expect("tempdir");
        let clock = MockClock::new();
        let cache = CostCenterCache::open_with_clock(&cache_config(&dir), clock.clone());

        cache.set("Engineering", "cc-1");
        clock.advance(TimeDelta::hours(1));

        assert_eq!(cache.cleanup().expect("cleanup"), 0);
        assert_eq!(cache.get("Engineering"), Some("cc-1".to_string()));
    }

    #[test]
    fn persisted_entries_reload_in_a_new_instance() {
        let dir = TempDir::new().expect("tempdir");
        let config = cache_config(&dir);
        let clock = MockClock::new();

        CostCenterCache::open_with_clock(&config, clock.clone()).set("Sales", "cc-9");

        let reloaded = CostCenterCache::open_with_clock(&config, clock);
        assert_eq!(reloaded.get("Sales"), Some("cc-9".to_string()));
    }

    #[test]
    fn corrupt_cache_file_starts_empty() {
        let dir = TempDir::new().expect("tempdir");
        let config = cache_config(&dir);
        fs::write(&config.path, "{ not json").expect("write garbage");

        let cache = CostCenterCache::open_with_clock(&config, MockClock::new());

        assert_eq!(cache.stats().total, 0);
        cache.set("Engineering", "cc-1");
        assert_eq!(cache.get("Engineering"), Some("cc-1".to_string()));
    }

    #[test]
    fn version_mismatch_discards_entries() {
        let dir = TempDir::new().expect("tempdir");
        let config = cache_config(&dir);
        fs::write(
            &config.path,
            r#"{
                "version": "0.9",
                "last_updated": "2025-01-01T00:00:00Z",
                "cost_centers": {
                    "Engineering": { "id": "cc-1", "timestamp": "2025-01-01T00:00:00Z" }
                }
            }"#,
        )
        .expect("write old cache");

        let cache = CostCenterCache::open_with_clock(&config, MockClock::new());

        assert_eq!(cache.stats().total, 0);
    }

    #[test]
    fn clear_removes_everything() {
        let dir = TempDir::new().expect("tempdir");
        let config = cache_config(&dir);
        let clock = MockClock::new();
        let cache = CostCenterCache::open_with_clock(&config, clock.clone());

        cache.set("Engineering", "cc-1");
        cache.set("Sales", "cc-2");

        assert_eq!(cache.clear().expect("clear"), 2);
        let reloaded = CostCenterCache::open_with_clock(&config, clock);
        assert_eq!(reloaded.stats().total, 0);
    }

    #[test]
    fn disabled_cache_is_inert() {
        let dir = TempDir::new().expect("tempdir");
        let mut config = cache_config(&dir);
        config.enabled = false;
        let cache = CostCenterCache::open_with_clock(&config, MockClock::new());

        cache.set("Engineering", "cc-1");

        assert_eq!(cache.get("Engineering"), None);
        assert!(!config.path.exists());
        assert_eq!(cache.cleanup().expect("cleanup"), 0);
    }
}
