//! Durable storage for rate limit buckets.
//!
//! # Responsibilities
//! - Hold one `RateBucket` record per hashed key
//! - Provide an atomic compare-and-swap so the limiter never loses updates
//! - Drop buckets whose window has ended
//!
//! # Design Decisions
//! - The limiter only sees `get` + `compare_and_swap`; backends are swappable
//! - Mutual exclusion is per key, never across the whole store
//! - The file store excludes other processes too: swaps hold an OS file lock
//! - A corrupt record reads as absent and is overwritten by the next swap

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

/// Fixed window counter for one `(action, client)` key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateBucket {
    /// Unix second after which the window is over.
    #[serde(rename = "reset")]
    pub reset_at: u64,
    /// Requests evaluated in this window, rejected ones included.
    pub count: u32,
}

impl RateBucket {
    /// An empty window starting at `now`.
    pub fn fresh(now: u64, window_secs: u64) -> Self {
        Self {
            reset_at: now.saturating_add(window_secs),
            count: 0,
        }
    }

    /// Whether the window has ended. Strictly after `reset_at`.
    pub fn is_expired(&self, now: u64) -> bool {
        now > self.reset_at
    }
}

/// Errors raised by bucket storage backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("bucket store I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("bucket encode error: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("invalid bucket key {0:?}")]
    InvalidKey(String),

    #[error("bucket update lost the race {attempts} times")]
    Contention { attempts: usize },
}

/// Key-value storage for rate buckets with atomic conditional update.
pub trait BucketStore: Send + Sync {
    /// Current bucket for `key`, if any.
    fn get(&self, key: &str) -> Result<Option<RateBucket>, StoreError>;

    /// Replace the bucket for `key` with `new` only if it still equals
    /// `expected` (`None` meaning "no bucket yet").
    ///
    /// Returns `Ok(false)` when another writer got there first.
    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&RateBucket>,
        new: &RateBucket,
    ) -> Result<bool, StoreError>;

    /// Remove buckets whose window ended before `now`, returning how many
    /// were dropped.
    ///
    /// A removed bucket is indistinguishable from one that expired in place:
    /// the next evaluation starts a fresh window either way.
    fn prune_expired(&self, _now: u64) -> Result<usize, StoreError> {
        Ok(0)
    }
}

/// In-process bucket store backed by a sharded concurrent map.
#[derive(Debug, Default)]
pub struct MemoryBucketStore {
    buckets: DashMap<String, RateBucket>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl BucketStore for MemoryBucketStore {
    fn get(&self, key: &str) -> Result<Option<RateBucket>, StoreError> {
        Ok(self.buckets.get(key).map(|r| *r.value()))
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&RateBucket>,
        new: &RateBucket,
    ) -> Result<bool, StoreError> {
        // The entry holds the shard write lock until it is dropped.
        match (self.buckets.entry(key.to_string()), expected) {
            (Entry::Occupied(mut entry), Some(expected)) if entry.get() == expected => {
                entry.insert(*new);
                Ok(true)
            }
            (Entry::Vacant(entry), None) => {
                entry.insert(*new);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn prune_expired(&self, now: u64) -> Result<usize, StoreError> {
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| !bucket.is_expired(now));
        Ok(before.saturating_sub(self.buckets.len()))
    }
}

/// File-backed bucket store: one `rl_<key>.json` file per key.
///
/// Swaps take an exclusive OS lock on one of 256 stripe files
/// (`lock_<first two key digits>`), so writers in other threads and other
/// processes are serialized. Records are written to a uniquely named temp
/// file and renamed into place, so readers never observe a torn record.
#[derive(Debug)]
pub struct FileBucketStore {
    dir: PathBuf,
}

impl FileBucketStore {
    /// Open (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "Bucket store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the record for `key`.
    ///
    /// Keys are SHA-256 hex digests; anything else could escape the directory.
    pub fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let is_digest = key.len() == 64
            && key.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !is_digest {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("rl_{key}.json")))
    }

    /// Block until this handle holds the stripe lock covering `key`.
    ///
    /// The lock is released when the returned file is dropped.
    fn lock_stripe(&self, key: &str) -> Result<File, StoreError> {
        let stripe = self.dir.join(format!("lock_{}", &key[..2]));
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&stripe)?;
        file.lock_exclusive()?;
        Ok(file)
    }

    fn read(path: &Path) -> Result<Option<RateBucket>, StoreError> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(bucket) => Ok(Some(bucket)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Discarding corrupt bucket file");
                Ok(None)
            }
        }
    }

    fn write_atomic(&self, path: &Path, bucket: &RateBucket) -> Result<(), StoreError> {
        let data = serde_json::to_vec(bucket)?;
        let mut tmp = NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(&data)?;
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    /// Key of a `rl_<key>.json` file name.
    fn key_of(file_name: &str) -> Option<&str> {
        file_name.strip_prefix("rl_")?.strip_suffix(".json")
    }
}

impl BucketStore for FileBucketStore {
    fn get(&self, key: &str) -> Result<Option<RateBucket>, StoreError> {
        Self::read(&self.path_for(key)?)
    }

    fn compare_and_swap(
        &self,
        key: &str,
        expected: Option<&RateBucket>,
        new: &RateBucket,
    ) -> Result<bool, StoreError> {
        let path = self.path_for(key)?;
        let _lock = self.lock_stripe(key)?;

        if Self::read(&path)?.as_ref() != expected {
            return Ok(false);
        }
        self.write_atomic(&path, new)?;
        Ok(true)
    }

    fn prune_expired(&self, now: u64) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(key) = name.to_str().and_then(Self::key_of) else {
                continue;
            };
            let Ok(path) = self.path_for(key) else {
                continue;
            };

            let _lock = self.lock_stripe(key)?;
            if let Some(bucket) = Self::read(&path)? {
                if !bucket.is_expired(now) {
                    continue;
                }
            }
            match fs::remove_file(&path) {
                Ok(()) => removed += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        if removed > 0 {
            tracing::debug!(removed, dir = %self.dir.display(), "Expired bucket files removed");
        }
        Ok(removed)
    }
}
