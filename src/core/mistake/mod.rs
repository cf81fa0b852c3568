//! # Mistake Module
//!
//! Permanent suppression list for false-positive results: once a user
//! tells the engine "these two are not duplicates" (or "this one isn't
//! really defective"), that judgment survives across runs. Persisted
//! as an `adm` file holding lightweight `ImageInfo` snapshots rather
//! than full fingerprints.
//!
//! Both sets are kept sorted (singles by path, pairs by
//! `(first.path, second.path)` with the pair itself canonicalized
//! smaller-path-first) so `save`/`load` round-trip byte-for-byte and
//! a `rename` can relabel an entry in place without breaking the sort.

mod record;

pub use record::MistakeRecord;

use crate::core::comparator::ImageInfo;
use crate::core::io::{Reader, Writer};
use crate::error::MistakeError;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

const MAGIC: &[u8; 4] = b"adm\0";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Default, Clone)]
pub struct MistakeStore {
    singles: Vec<MistakeRecord>,
    pairs: Vec<(MistakeRecord, MistakeRecord)>,
}

fn canonicalize(a: MistakeRecord, b: MistakeRecord) -> (MistakeRecord, MistakeRecord) {
    if a.path <= b.path {
        (a, b)
    } else {
        (b, a)
    }
}

impl MistakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single(&mut self, image: &ImageInfo) {
        let record = MistakeRecord::from_image_info(image);
        if !self.singles.iter().any(|r| r.path == record.path) {
            self.singles.push(record);
            self.singles.sort_by(|a, b| a.path.cmp(&b.path));
        }
    }

    pub fn add_pair(&mut self, a: &ImageInfo, b: &ImageInfo) {
        let (first, second) = canonicalize(MistakeRecord::from_image_info(a), MistakeRecord::from_image_info(b));
        let already = self.pairs.iter().any(|(f, s)| f.path == first.path && s.path == second.path);
        if !already {
            self.pairs.push((first, second));
            self.pairs.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));
        }
    }

    pub fn contains_single(&self, path: &Path) -> bool {
        self.singles.iter().any(|r| r.path == path)
    }

    pub fn contains_pair(&self, a: &Path, b: &Path) -> bool {
        let (first, second) = if a <= b { (a, b) } else { (b, a) };
        self.pairs.iter().any(|(f, s)| f.path == first && s.path == second)
    }

    /// Relabel every entry referencing `old_path`, re-sorting both sets
    /// to preserve the canonical order.
    pub fn rename(&mut self, old_path: &Path, new_path: &Path) {
        let mut touched = false;
        for record in &mut self.singles {
            if record.path == old_path {
                record.path = new_path.to_path_buf();
                touched = true;
            }
        }
        if touched {
            self.singles.sort_by(|a, b| a.path.cmp(&b.path));
        }

        let mut renamed_pairs = Vec::with_capacity(self.pairs.len());
        let mut pairs_touched = false;
        for (mut first, mut second) in self.pairs.drain(..) {
            if first.path == old_path {
                first.path = new_path.to_path_buf();
                pairs_touched = true;
            }
            if second.path == old_path {
                second.path = new_path.to_path_buf();
                pairs_touched = true;
            }
            renamed_pairs.push(canonicalize(first, second));
        }
        self.pairs = renamed_pairs;
        if pairs_touched {
            self.pairs.sort_by(|(a, _), (b, _)| a.path.cmp(&b.path));
        }
    }

    pub fn singles(&self) -> &[MistakeRecord] {
        &self.singles
    }

    pub fn pairs(&self) -> &[(MistakeRecord, MistakeRecord)] {
        &self.pairs
    }

    pub fn save(&self, path: &Path) -> Result<(), MistakeError> {
        let file = File::create(path)
            .map_err(|e| crate::error::CacheError::Io { path: path.to_path_buf(), source: e })?;
        let mut w = Writer::new(BufWriter::new(file), path);
        w.write_magic(MAGIC)?;
        w.write_version(FORMAT_VERSION)?;
        w.write_u64(self.singles.len() as u64)?;
        for record in &self.singles {
            record::write_image_info(&mut w, record)?;
        }
        w.write_u64(self.pairs.len() as u64)?;
        for (first, second) in &self.pairs {
            record::write_image_info(&mut w, first)?;
            record::write_image_info(&mut w, second)?;
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, MistakeError> {
        let file = File::open(path)
            .map_err(|e| crate::error::CacheError::OpenFailed { path: path.to_path_buf(), reason: e.to_string() })?;
        let mut r = Reader::new(BufReader::new(file), path);
        r.read_magic(MAGIC)?;
        r.read_version(FORMAT_VERSION)?;

        let singles_count = r.read_u64()?;
        let mut singles = Vec::with_capacity(singles_count as usize);
        for _ in 0..singles_count {
            singles.push(record::read_image_info(&mut r)?);
        }

        let pairs_count = r.read_u64()?;
        let mut pairs = Vec::with_capacity(pairs_count as usize);
        for _ in 0..pairs_count {
            let first = record::read_image_info(&mut r)?;
            let second = record::read_image_info(&mut r)?;
            pairs.push((first, second));
        }

        Ok(Self { singles, pairs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::ImageData;
    use crate::core::scanner::FileInfo;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::SystemTime;

    fn info(path: &str) -> Arc<ImageInfo> {
        let file = FileInfo::new(PathBuf::from(path), 10, SystemTime::UNIX_EPOCH, 0);
        ImageInfo::from_data(&ImageData::from_file_info(&file, false))
    }

    #[test]
    fn pairs_are_canonicalized_regardless_of_insertion_order() {
        let mut store = MistakeStore::new();
        store.add_pair(&info("/b.jpg"), &info("/a.jpg"));
        assert!(store.contains_pair(Path::new("/a.jpg"), Path::new("/b.jpg")));
        assert!(store.contains_pair(Path::new("/b.jpg"), Path::new("/a.jpg")));
    }

    #[test]
    fn duplicate_inserts_do_not_grow_the_store() {
        let mut store = MistakeStore::new();
        store.add_pair(&info("/a.jpg"), &info("/b.jpg"));
        store.add_pair(&info("/a.jpg"), &info("/b.jpg"));
        assert_eq!(store.pairs().len(), 1);
    }

    #[test]
    fn rename_relabels_and_resorts_entries() {
        let mut store = MistakeStore::new();
        store.add_single(&info("/z.jpg"));
        store.add_single(&info("/m.jpg"));
        store.add_pair(&info("/z.jpg"), &info("/n.jpg"));

        store.rename(Path::new("/z.jpg"), Path::new("/a.jpg"));

        assert!(store.contains_single(Path::new("/a.jpg")));
        assert!(!store.contains_single(Path::new("/z.jpg")));
        assert_eq!(store.singles()[0].path, PathBuf::from("/a.jpg"));
        assert!(store.contains_pair(Path::new("/a.jpg"), Path::new("/n.jpg")));
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mistakes.adm");

        let mut store = MistakeStore::new();
        store.add_single(&info("/solo.jpg"));
        store.add_pair(&info("/a.jpg"), &info("/b.jpg"));
        store.save(&path).unwrap();

        let loaded = MistakeStore::load(&path).unwrap();
        assert_eq!(loaded.singles().len(), 1);
        assert_eq!(loaded.pairs().len(), 1);
        assert!(loaded.contains_pair(Path::new("/a.jpg"), Path::new("/b.jpg")));
    }
}
