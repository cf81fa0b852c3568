//! # Cache Module
//!
//! Persistent fingerprint database: an in-memory, path-keyed store of
//! `ImageData` backed by a chunked binary file layout, so rescans skip
//! decoding anything whose size and modification time are unchanged.
//!
//! `index.adi` holds the chunk table (`key`, `first`/`last` path,
//! record count); each chunk lives in its own `NNNN.adi` file (`key`
//! hex-formatted to four digits). A `backup.adi` copy of the index is
//! kept so a crash mid-save never loses the prior index. Every save
//! rewrites the full chunk set from the current in-memory store; the
//! whole database is loaded up front, so memory always holds the
//! authoritative superset and there is no partial-reload case to
//! preserve chunks for.

mod record;
mod traits;

pub use traits::CacheBackend;

use crate::core::fingerprint::ImageData;
use crate::core::io::{Reader, Writer, SIZE_CHECK_LIMIT};
use crate::core::scanner::FileInfo;
use crate::error::CacheError;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

const MAGIC_INDEX: &[u8; 4] = b"adii";
const MAGIC_DATA: &[u8; 4] = b"adid";
const FORMAT_VERSION: u32 = 1;

/// Floor of the `reduced_image_size` range; chunk capacity scales down
/// as the configured main-view size grows past this.
const REDUCED_IMAGE_SIZE_MIN: u32 = 4;
/// Records per chunk at `REDUCED_IMAGE_SIZE_MIN`.
const DEFAULT_CHUNK_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
struct IndexEntry {
    key: i16,
    first: PathBuf,
    last: PathBuf,
    count: u64,
}

/// Path-keyed fingerprint store with chunked binary persistence. The
/// in-memory map is a `BTreeMap`: chunking needs the store sorted by
/// path, and the map keeps that invariant without a separate sort
/// pass on save.
#[derive(Debug, Default)]
pub struct ChunkedFileCache {
    reduced_image_size: u32,
    images: BTreeMap<PathBuf, ImageData>,
    dirty: bool,
}

impl ChunkedFileCache {
    pub fn new(reduced_image_size: u32) -> Self {
        Self { reduced_image_size, images: BTreeMap::new(), dirty: false }
    }

    fn chunk_capacity(&self) -> usize {
        let scale = (self.reduced_image_size / REDUCED_IMAGE_SIZE_MIN).max(1) as usize;
        (DEFAULT_CHUNK_CAPACITY / (scale * scale)).max(1)
    }

    fn data_file_name(key: i16) -> String {
        format!("{:04x}.adi", key as u16)
    }

    fn read_index(path: &Path, reduced_image_size: u32) -> Result<Vec<IndexEntry>, CacheError> {
        let file = File::open(path)
            .map_err(|e| CacheError::OpenFailed { path: path.to_path_buf(), reason: e.to_string() })?;
        let mut r = Reader::new(BufReader::new(file), path);
        r.read_magic(MAGIC_INDEX)?;
        r.read_version(FORMAT_VERSION)?;
        let size = r.read_u32()?;
        if size != reduced_image_size {
            return Err(CacheError::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: format!("index reduced image size {size} does not match configured {reduced_image_size}"),
            });
        }
        let count = r.read_u64()?;
        if count > SIZE_CHECK_LIMIT {
            return Err(CacheError::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: format!("chunk count {count} exceeds limit"),
            });
        }
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let key = r.read_i16()?;
            let (first, _) = r.read_path()?;
            let (last, _) = r.read_path()?;
            let record_count = r.read_u64()?;
            entries.push(IndexEntry { key, first, last, count: record_count });
        }
        Ok(entries)
    }

    fn write_index(path: &Path, reduced_image_size: u32, entries: &[IndexEntry]) -> Result<(), CacheError> {
        let file =
            File::create(path).map_err(|e| CacheError::Io { path: path.to_path_buf(), source: e })?;
        let mut w = Writer::new(file, path);
        w.write_magic(MAGIC_INDEX)?;
        w.write_version(FORMAT_VERSION)?;
        w.write_u32(reduced_image_size)?;
        w.write_u64(entries.len() as u64)?;
        for entry in entries {
            w.write_i16(entry.key)?;
            w.write_path(&entry.first, false)?;
            w.write_path(&entry.last, false)?;
            w.write_u64(entry.count)?;
        }
        Ok(())
    }

    fn read_chunk(&mut self, path: &Path, key: i16) -> Result<(), CacheError> {
        let file = File::open(path)
            .map_err(|e| CacheError::OpenFailed { path: path.to_path_buf(), reason: e.to_string() })?;
        let mut r = Reader::new(BufReader::new(file), path);
        r.read_magic(MAGIC_DATA)?;
        r.read_version(FORMAT_VERSION)?;
        let size = r.read_u32()?;
        if size != self.reduced_image_size {
            return Err(CacheError::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: format!(
                    "chunk reduced image size {size} does not match configured {}",
                    self.reduced_image_size
                ),
            });
        }
        let found_key = r.read_i16()?;
        if found_key != key {
            return Err(CacheError::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: format!("chunk key {found_key} does not match index entry {key}"),
            });
        }
        let _first = r.read_path()?;
        let _last = r.read_path()?;
        let count = r.read_u64()?;
        if count > SIZE_CHECK_LIMIT {
            return Err(CacheError::InvalidFileFormat {
                path: path.to_path_buf(),
                reason: format!("record count {count} exceeds limit"),
            });
        }
        for _ in 0..count {
            let data = record::read_image_data(&mut r)?;
            self.images.entry(data.path.clone()).or_insert(data);
        }
        Ok(())
    }

    fn write_chunk(path: &Path, reduced_image_size: u32, key: i16, chunk: &[&ImageData]) -> Result<(), CacheError> {
        let file =
            File::create(path).map_err(|e| CacheError::Io { path: path.to_path_buf(), source: e })?;
        let mut w = Writer::new(file, path);
        w.write_magic(MAGIC_DATA)?;
        w.write_version(FORMAT_VERSION)?;
        w.write_u32(reduced_image_size)?;
        w.write_i16(key)?;
        w.write_path(&chunk.first().expect("chunk is non-empty").path, false)?;
        w.write_path(&chunk.last().expect("chunk is non-empty").path, false)?;
        w.write_u64(chunk.len() as u64)?;
        for data in chunk {
            record::write_image_data(&mut w, data)?;
        }
        Ok(())
    }

    fn delete_chunk_files(dir: &Path) -> Result<(), CacheError> {
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(_) => return Ok(()),
        };
        for entry in read_dir.flatten() {
            let path = entry.path();
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            if path.extension().map(|e| e == "adi").unwrap_or(false) && name != "index.adi" && name != "backup.adi" {
                fs::remove_file(&path).map_err(|e| CacheError::Io { path, source: e })?;
            }
        }
        Ok(())
    }
}

impl CacheBackend for ChunkedFileCache {
    fn get(&self, info: &FileInfo) -> Option<ImageData> {
        self.images.get(&info.path).filter(|d| d.matches(info)).cloned()
    }

    fn put(&mut self, data: ImageData) {
        self.images.insert(data.path.clone(), data);
        self.dirty = true;
    }

    fn remove(&mut self, path: &Path) {
        if self.images.remove(path).is_some() {
            self.dirty = true;
        }
    }

    fn load(&mut self, dir: &Path) -> Result<(), CacheError> {
        let index_path = dir.join("index.adi");
        let backup_path = dir.join("backup.adi");

        let entries = if index_path.exists() {
            match Self::read_index(&index_path, self.reduced_image_size) {
                Ok(entries) => entries,
                Err(_) if backup_path.exists() => Self::read_index(&backup_path, self.reduced_image_size)?,
                Err(e) => return Err(e),
            }
        } else if backup_path.exists() {
            Self::read_index(&backup_path, self.reduced_image_size)?
        } else {
            self.dirty = false;
            return Ok(());
        };

        for entry in &entries {
            let chunk_path = dir.join(Self::data_file_name(entry.key));
            if chunk_path.exists() {
                self.read_chunk(&chunk_path, entry.key)?;
            }
        }
        self.dirty = false;
        Ok(())
    }

    fn save(&mut self, dir: &Path) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|e| CacheError::Io { path: dir.to_path_buf(), source: e })?;
        Self::delete_chunk_files(dir)?;

        let capacity = self.chunk_capacity();
        let ordered: Vec<&ImageData> = self.images.values().collect();
        let mut entries = Vec::new();
        for (key, chunk) in (0i16..).zip(ordered.chunks(capacity)) {
            let chunk_path = dir.join(Self::data_file_name(key));
            Self::write_chunk(&chunk_path, self.reduced_image_size, key, chunk)?;
            entries.push(IndexEntry {
                key,
                first: chunk.first().expect("chunk is non-empty").path.clone(),
                last: chunk.last().expect("chunk is non-empty").path.clone(),
                count: chunk.len() as u64,
            });
        }

        let index_path = dir.join("index.adi");
        Self::write_index(&index_path, self.reduced_image_size, &entries)?;
        fs::copy(&index_path, dir.join("backup.adi"))
            .map_err(|e| CacheError::Io { path: index_path.clone(), source: e })?;
        self.dirty = false;
        Ok(())
    }

    fn clear_database(&mut self, dir: &Path) -> Result<(), CacheError> {
        // Best-effort load first, so the rebuilt database also covers
        // chunks not yet in memory; a corrupt database contributes
        // whatever parsed and is rebuilt from there.
        let _ = self.load(dir);

        Self::delete_chunk_files(dir)?;
        let index_path = dir.join("index.adi");
        let backup_path = dir.join("backup.adi");
        if index_path.exists() {
            fs::remove_file(&index_path).map_err(|e| CacheError::Io { path: index_path, source: e })?;
        }
        if backup_path.exists() {
            fs::remove_file(&backup_path).map_err(|e| CacheError::Io { path: backup_path, source: e })?;
        }

        // Reindex from the in-memory store: a fresh chunk set replaces
        // whatever file layout had accumulated.
        self.dirty = true;
        self.save(dir)
    }

    fn len(&self) -> usize {
        self.images.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::GrayView;
    use std::time::SystemTime;

    fn sample(path: &str, size: u64) -> ImageData {
        let info = FileInfo::new(PathBuf::from(path), size, SystemTime::UNIX_EPOCH, 0);
        let mut data = ImageData::from_file_info(&info, false);
        data.pixel_data = crate::core::fingerprint::Pyramid::build(GrayView::zeroed(256), 16);
        data
    }

    #[test]
    fn put_then_get_round_trips_in_memory() {
        let mut cache = ChunkedFileCache::new(16);
        let data = sample("/a.jpg", 10);
        let info = FileInfo::new(PathBuf::from("/a.jpg"), 10, SystemTime::UNIX_EPOCH, 0);
        cache.put(data);
        assert!(cache.get(&info).is_some());
    }

    #[test]
    fn stale_size_misses_the_cache() {
        let mut cache = ChunkedFileCache::new(16);
        cache.put(sample("/a.jpg", 10));
        let changed = FileInfo::new(PathBuf::from("/a.jpg"), 99, SystemTime::UNIX_EPOCH, 0);
        assert!(cache.get(&changed).is_none());
    }

    #[test]
    fn save_then_load_round_trips_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(16);
        cache.put(sample("/a.jpg", 10));
        cache.put(sample("/b.jpg", 20));
        cache.save(dir.path()).unwrap();
        assert!(dir.path().join("index.adi").exists());
        assert!(dir.path().join("backup.adi").exists());

        let mut reloaded = ChunkedFileCache::new(16);
        reloaded.load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
        let info = FileInfo::new(PathBuf::from("/a.jpg"), 10, SystemTime::UNIX_EPOCH, 0);
        assert!(reloaded.get(&info).is_some());
    }

    #[test]
    fn save_is_a_no_op_without_changes() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(16);
        cache.save(dir.path()).unwrap();
        assert!(!dir.path().join("index.adi").exists());
    }

    #[test]
    fn chunking_splits_a_large_store_across_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(64);
        for i in 0..40 {
            cache.put(sample(&format!("/img{i:03}.jpg"), 10));
        }
        cache.save(dir.path()).unwrap();

        let mut reloaded = ChunkedFileCache::new(64);
        reloaded.load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 40);
        assert!(dir.path().join("0001.adi").exists());
    }

    #[test]
    fn mismatched_reduced_image_size_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(16);
        cache.put(sample("/a.jpg", 10));
        cache.save(dir.path()).unwrap();

        let mut reloaded = ChunkedFileCache::new(32);
        let err = reloaded.load(dir.path()).unwrap_err();
        assert!(matches!(err, CacheError::InvalidFileFormat { .. }));
    }

    #[test]
    fn clear_database_reindexes_from_memory() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(16);
        cache.put(sample("/a.jpg", 10));
        cache.save(dir.path()).unwrap();
        cache.put(sample("/b.jpg", 20));

        cache.clear_database(dir.path()).unwrap();

        // The store survives and the on-disk chunk set is rebuilt
        // from it.
        assert_eq!(cache.len(), 2);
        assert!(dir.path().join("index.adi").exists());

        let mut reloaded = ChunkedFileCache::new(16);
        reloaded.load(dir.path()).unwrap();
        assert_eq!(reloaded.len(), 2);
    }

    #[test]
    fn clear_database_folds_on_disk_chunks_back_in() {
        let dir = tempfile::tempdir().unwrap();
        let mut cache = ChunkedFileCache::new(16);
        cache.put(sample("/a.jpg", 10));
        cache.save(dir.path()).unwrap();

        // A fresh store rebuilding the same directory picks the old
        // chunks up before rewriting them.
        let mut fresh = ChunkedFileCache::new(16);
        fresh.clear_database(dir.path()).unwrap();
        assert_eq!(fresh.len(), 1);
    }
}
