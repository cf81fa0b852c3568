//! Cache backend trait: the unit of storage is a full fingerprint
//! keyed by path, and persistence is an explicit `load`/`save` pair
//! rather than a transaction per call.

use crate::core::fingerprint::ImageData;
use crate::core::scanner::FileInfo;
use crate::error::CacheError;
use std::path::Path;

pub trait CacheBackend: Send + Sync {
    /// A cached fingerprint for `info`, only if size and modification
    /// time still match what's on disk.
    fn get(&self, info: &FileInfo) -> Option<ImageData>;

    /// Insert or replace a fingerprint, marking the cache dirty.
    fn put(&mut self, data: ImageData);

    fn remove(&mut self, path: &Path);

    /// Load the on-disk index and every chunk it references into
    /// memory, merging with whatever is already held.
    fn load(&mut self, dir: &Path) -> Result<(), CacheError>;

    /// Rewrite the on-disk index and chunk files from the in-memory
    /// store. A no-op if nothing has changed since the last load/save.
    fn save(&mut self, dir: &Path) -> Result<(), CacheError>;

    /// Rebuild the persisted database: fold whatever is still readable
    /// on disk into memory, delete every chunk/index file, then write
    /// a fresh chunk set from the in-memory store.
    fn clear_database(&mut self, dir: &Path) -> Result<(), CacheError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
