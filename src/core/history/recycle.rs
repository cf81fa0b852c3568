//! Recycle bin abstraction: a deleted file survives as a hidden sibling
//! next to its original location, named `~~adt{hex8}~~{original-name}`,
//! rather than moving into a shared staging directory, so an undo can
//! restore it even if the user's trash/recycle bin has been emptied in
//! the meantime.

use crate::error::HistoryError;
use std::fs;
use std::path::{Path, PathBuf};

pub trait RecycleBin: Send + Sync {
    /// Move `path` to a freshly chosen hidden sibling and return it.
    fn recycle(&self, path: &Path) -> Result<PathBuf, HistoryError>;

    /// Move `path` to a specific hidden sibling, used by `redo` to
    /// replay a delete whose hidden name was already chosen the first
    /// time around.
    fn recycle_to(&self, path: &Path, hidden_path: &Path) -> Result<(), HistoryError>;

    /// Move a previously recycled file back to `original_path`.
    fn restore(&self, hidden_path: &Path, original_path: &Path) -> Result<(), HistoryError>;

    /// Permanently delete a still-recycled file. Called when a stage
    /// ages out of the undo deque.
    fn commit(&self, hidden_path: &Path) -> Result<(), HistoryError>;
}

fn hidden_name(original_name: &str, tag: u32) -> String {
    format!("~~adt{tag:08x}~~{original_name}")
}

/// Default `RecycleBin`: hidden sibling files on the same filesystem as
/// the original, so restoring is always a same-volume rename.
#[derive(Debug, Default)]
pub struct HiddenSiblingRecycleBin;

impl RecycleBin for HiddenSiblingRecycleBin {
    fn recycle(&self, path: &Path) -> Result<PathBuf, HistoryError> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| HistoryError::NameCollision { path: path.to_path_buf() })?;

        let mut tag: u32 = 1;
        loop {
            let candidate = dir.join(hidden_name(name, tag));
            if !candidate.exists() {
                super::primitives::atomic_move(path, &candidate)?;
                return Ok(candidate);
            }
            tag += 1;
        }
    }

    fn recycle_to(&self, path: &Path, hidden_path: &Path) -> Result<(), HistoryError> {
        super::primitives::atomic_move(path, hidden_path)
    }

    fn restore(&self, hidden_path: &Path, original_path: &Path) -> Result<(), HistoryError> {
        super::primitives::atomic_move(hidden_path, original_path)
    }

    fn commit(&self, hidden_path: &Path) -> Result<(), HistoryError> {
        if hidden_path.exists() {
            fs::remove_file(hidden_path)
                .map_err(|e| HistoryError::Io { path: hidden_path.to_path_buf(), source: e })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recycle_then_restore_round_trips_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("photo.jpg");
        std::fs::write(&original, b"data").unwrap();

        let bin = HiddenSiblingRecycleBin;
        let hidden = bin.recycle(&original).unwrap();
        assert!(!original.exists());
        assert!(hidden.file_name().unwrap().to_str().unwrap().starts_with("~~adt"));

        bin.restore(&hidden, &original).unwrap();
        assert!(original.exists());
        assert!(!hidden.exists());
    }

    #[test]
    fn commit_permanently_removes_a_recycled_file() {
        let dir = tempfile::tempdir().unwrap();
        let original = dir.path().join("photo.jpg");
        std::fs::write(&original, b"data").unwrap();

        let bin = HiddenSiblingRecycleBin;
        let hidden = bin.recycle(&original).unwrap();
        bin.commit(&hidden).unwrap();
        assert!(!hidden.exists());
    }

    #[test]
    fn two_deletes_of_the_same_name_get_distinct_hidden_paths() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("photo.jpg");
        std::fs::write(&a, b"one").unwrap();
        let bin = HiddenSiblingRecycleBin;
        let hidden_a = bin.recycle(&a).unwrap();

        std::fs::write(&a, b"two").unwrap();
        let hidden_b = bin.recycle(&a).unwrap();

        assert_ne!(hidden_a, hidden_b);
    }
}
