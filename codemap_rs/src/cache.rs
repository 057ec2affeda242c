//! Content-addressed classification cache.
//!
//! Entries are keyed by the SHA-256 of a file's raw bytes, never by its path,
//! so any number of paths holding the same bytes share one entry. Layout on
//! disk is `<dir>/<first two hex chars>/<digest>.json`, one pretty-printed
//! record per digest. There is no index file; statistics come from walking
//! the directory.
//!
//! The cache degrades instead of failing: when its directory cannot be
//! created or an entry cannot be written it logs a warning and turns itself
//! off, after which every lookup is a plain miss.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::classifier::Classification;

pub const DEFAULT_CACHE_DIR: &str = ".classify-cache";

/// Hex SHA-256 of `bytes`.
pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// One persisted record. Timestamps are Unix milliseconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheEntry {
    pub digest: String,
    pub payload: Classification,
    pub cached_at: i64,
    pub accessed_at: i64,
    pub access_count: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub entry_count: usize,
    pub total_size_bytes: u64,
    pub hits: u64,
    pub misses: u64,
    /// hits / (hits + misses), 0 before any lookup.
    pub hit_rate: f64,
    /// Sum of the original cost of every payload served from the cache.
    pub cost_saved: f64,
}

/// Persistent digest -> [`Classification`] store with per-instance counters.
///
/// Safe to share by reference between the concurrent items of a window:
/// distinct digests touch distinct files, and writes to the same digest are
/// last-write-wins.
#[derive(Debug)]
pub struct ContentCache {
    dir: PathBuf,
    enabled: AtomicBool,
    hits: AtomicU64,
    misses: AtomicU64,
    cost_saved: Mutex<f64>,
}

impl ContentCache {
    pub fn new(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            dir: dir.into(),
            enabled: AtomicBool::new(enabled),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            cost_saved: Mutex::new(0.0),
        }
    }

    /// A cache that never stores anything and never counts.
    pub fn disabled() -> Self {
        Self::new(DEFAULT_CACHE_DIR, false)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    fn disable(&self, reason: &str, err: &io::Error) {
        if self.enabled.swap(false, Ordering::Relaxed) {
            warn!(dir = %self.dir.display(), error = %err, "{reason}; continuing without cache");
        }
    }

    /// Create the cache directory. Idempotent.
    pub async fn initialize(&self) {
        if !self.is_enabled() {
            return;
        }
        if let Err(err) = tokio::fs::create_dir_all(&self.dir).await {
            self.disable("cannot create cache directory", &err);
        }
    }

    /// Look up a digest. A hit refreshes the entry's access metadata and
    /// returns the payload flagged as cached. Disabled caches return `None`
    /// without touching the counters.
    pub async fn get(&self, digest: &str) -> Option<Classification> {
        if !self.is_enabled() {
            return None;
        }
        let Some(mut entry) = self.read_entry(digest).await else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            return None;
        };

        entry.accessed_at = Utc::now().timestamp_millis();
        entry.access_count += 1;
        if let Err(err) = self.write_entry(&entry).await {
            debug!(digest, error = %err, "could not refresh cache access metadata");
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        *self
            .cost_saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) += entry.payload.cost_usd;

        Some(entry.payload.into_cached())
    }

    /// Store `payload` under `digest`, replacing any previous record.
    pub async fn set(&self, digest: &str, payload: &Classification) {
        if !self.is_enabled() {
            return;
        }
        let now = Utc::now().timestamp_millis();
        let mut payload = payload.clone();
        payload.cached = false;
        let entry = CacheEntry {
            digest: digest.to_string(),
            payload,
            cached_at: now,
            accessed_at: now,
            access_count: 0,
        };
        if let Err(err) = self.write_entry(&entry).await {
            self.disable("cannot write cache entry", &err);
        }
    }

    pub async fn has(&self, digest: &str) -> bool {
        if !self.is_enabled() {
            return false;
        }
        match self.entry_path(digest) {
            Some(path) => tokio::fs::try_exists(&path).await.unwrap_or(false),
            None => false,
        }
    }

    /// Remove every record; returns how many were removed.
    pub async fn clear(&self) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let files = match self.entry_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "failed to list cache entries");
                return 0;
            }
        };
        let mut cleared = 0;
        for file in files {
            match tokio::fs::remove_file(&file).await {
                Ok(()) => cleared += 1,
                Err(err) => warn!(path = %file.display(), error = %err, "failed to remove cache entry"),
            }
        }
        cleared
    }

    /// Remove records created more than `days` days ago. Unreadable records
    /// are left in place.
    pub async fn clear_older_than(&self, days: u32) -> usize {
        if !self.is_enabled() {
            return 0;
        }
        let cutoff = (Utc::now() - Duration::days(i64::from(days))).timestamp_millis();
        let files = match self.entry_files().await {
            Ok(files) => files,
            Err(err) => {
                warn!(dir = %self.dir.display(), error = %err, "failed to list cache entries");
                return 0;
            }
        };

        let mut cleared = 0;
        for file in files {
            let Some(entry) = parse_entry_file(&file).await else {
                debug!(path = %file.display(), "skipping unreadable cache entry");
                continue;
            };
            if entry.cached_at < cutoff {
                match tokio::fs::remove_file(&file).await {
                    Ok(()) => cleared += 1,
                    Err(err) => {
                        warn!(path = %file.display(), error = %err, "failed to remove cache entry")
                    }
                }
            }
        }
        debug!(cleared, days, "evicted old cache entries");
        cleared
    }

    pub async fn get_stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let cost_saved = *self
            .cost_saved
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let lookups = hits + misses;
        let hit_rate = if lookups > 0 {
            hits as f64 / lookups as f64
        } else {
            0.0
        };

        let mut stats = CacheStats {
            hits,
            misses,
            hit_rate,
            cost_saved,
            ..Default::default()
        };
        if !self.is_enabled() {
            return stats;
        }

        if let Ok(files) = self.entry_files().await {
            for file in files {
                if let Ok(meta) = tokio::fs::metadata(&file).await {
                    stats.entry_count += 1;
                    stats.total_size_bytes += meta.len();
                }
            }
        }
        stats
    }

    /// `None` for anything that is not a plain hex digest, so a key can never
    /// address a path outside the cache directory.
    fn entry_path(&self, digest: &str) -> Option<PathBuf> {
        if digest.len() < 2 || !digest.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        Some(self.dir.join(&digest[..2]).join(format!("{digest}.json")))
    }

    async fn read_entry(&self, digest: &str) -> Option<CacheEntry> {
        let path = self.entry_path(digest)?;
        parse_entry_file(&path).await
    }

    async fn write_entry(&self, entry: &CacheEntry) -> io::Result<()> {
        let path = self
            .entry_path(&entry.digest)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "malformed digest"))?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_string_pretty(entry).map_err(io::Error::other)?;
        tokio::fs::write(&path, json).await
    }

    /// Every `*.json` record: one level of shard directories plus any
    /// records sitting directly in the cache root.
    async fn entry_files(&self) -> io::Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut root = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = root.next_entry().await? {
            let path = entry.path();
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                let Ok(mut shard) = tokio::fs::read_dir(&path).await else {
                    continue;
                };
                while let Ok(Some(record)) = shard.next_entry().await {
                    let record = record.path();
                    if is_json(&record) {
                        files.push(record);
                    }
                }
            } else if is_json(&path) {
                files.push(path);
            }
        }
        Ok(files)
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "json")
}

async fn parse_entry_file(path: &Path) -> Option<CacheEntry> {
    let raw = tokio::fs::read_to_string(path).await.ok()?;
    serde_json::from_str(&raw).ok()
}
