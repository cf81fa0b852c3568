//! Filesystem mutation primitives for the undo/redo engine. Each
//! primitive performs one atomic move and returns the `Inverse` that
//! undoes it. Moves try `fs::rename` first and fall back to
//! copy-then-verify-then-delete for cross-filesystem targets.

use super::Inverse;
use crate::error::HistoryError;
use std::fs;
use std::path::{Path, PathBuf};

/// Move `src` to `dst`, falling back to copy+verify+delete when a
/// cross-filesystem rename fails. A missing source is treated as
/// already-done rather than an error, per the engine's rule that a
/// primitive is silently skipped once its target file is gone.
pub(super) fn atomic_move(src: &Path, dst: &Path) -> Result<(), HistoryError> {
    if !src.exists() {
        return Ok(());
    }
    if fs::rename(src, dst).is_ok() {
        return Ok(());
    }

    let source_size =
        fs::metadata(src).map_err(|e| HistoryError::Io { path: src.to_path_buf(), source: e })?.len();
    fs::copy(src, dst).map_err(|e| HistoryError::Io { path: dst.to_path_buf(), source: e })?;
    let dest_size =
        fs::metadata(dst).map_err(|e| HistoryError::Io { path: dst.to_path_buf(), source: e })?.len();
    if dest_size != source_size {
        let _ = fs::remove_file(dst);
        return Err(HistoryError::Io {
            path: dst.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("copy verification failed: source {source_size} bytes, dest {dest_size} bytes"),
            ),
        });
    }
    fs::remove_file(src).map_err(|e| HistoryError::Io { path: src.to_path_buf(), source: e })
}

/// Pick `dir/stem.ext`, or `dir/stem_N.ext` for the smallest `N` that
/// doesn't collide with an existing file.
pub(super) fn unique_path(dir: &Path, stem: &str, ext: Option<&str>) -> PathBuf {
    let name_for = |suffix: Option<u32>| match (suffix, ext) {
        (None, Some(e)) => format!("{stem}.{e}"),
        (None, None) => stem.to_string(),
        (Some(n), Some(e)) => format!("{stem}_{n}.{e}"),
        (Some(n), None) => format!("{stem}_{n}"),
    };
    let mut candidate = dir.join(name_for(None));
    let mut n = 1;
    while candidate.exists() {
        candidate = dir.join(name_for(Some(n)));
        n += 1;
    }
    candidate
}

/// `Rename(info, new_path)`: atomic move-with-replace to an exact
/// target path.
pub fn rename_to(path: &Path, new_path: &Path) -> Result<Inverse, HistoryError> {
    atomic_move(path, new_path)?;
    Ok(Inverse::Rename { current_path: new_path.to_path_buf(), previous_path: path.to_path_buf() })
}

/// `RenameLike(old_info, new_info)`: move `old_path` into its own
/// directory under `like_path`'s bare name, keeping `old_path`'s
/// extension, unique-ifying on collision.
pub fn rename_like(old_path: &Path, like_path: &Path) -> Result<Inverse, HistoryError> {
    let dir = old_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = like_path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = old_path.extension().and_then(|e| e.to_str());
    let target = unique_path(dir, stem, ext);
    atomic_move(old_path, &target)?;
    Ok(Inverse::Rename { current_path: target, previous_path: old_path.to_path_buf() })
}

/// `Move(old_info, new_info)`: move `old_path` into `target_dir`,
/// keeping its own stem and extension, unique-ifying on collision.
pub fn move_to(old_path: &Path, target_dir: &Path) -> Result<Inverse, HistoryError> {
    let stem = old_path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = old_path.extension().and_then(|e| e.to_str());
    let target = unique_path(target_dir, stem, ext);
    atomic_move(old_path, &target)?;
    Ok(Inverse::Rename { current_path: target, previous_path: old_path.to_path_buf() })
}

/// `MoveAndRenameLike`: move `old_path` into `new_path`'s directory
/// under `new_path`'s bare name, keeping `old_path`'s extension.
pub fn move_and_rename_like(old_path: &Path, new_path: &Path) -> Result<Inverse, HistoryError> {
    let dir = new_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = new_path.file_stem().and_then(|s| s.to_str()).unwrap_or("file");
    let ext = old_path.extension().and_then(|e| e.to_str());
    let target = unique_path(dir, stem, ext);
    atomic_move(old_path, &target)?;
    Ok(Inverse::Rename { current_path: target, previous_path: old_path.to_path_buf() })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rename_to_moves_the_file_and_records_the_inverse() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        fs::write(&src, b"x").unwrap();

        let inverse = rename_to(&src, &dst).unwrap();
        assert!(dst.exists());
        assert!(!src.exists());
        match inverse {
            Inverse::Rename { current_path, previous_path } => {
                assert_eq!(current_path, dst);
                assert_eq!(previous_path, src);
            }
            _ => panic!("expected a rename inverse"),
        }
    }

    #[test]
    fn unique_path_avoids_collisions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("photo.jpg"), b"x").unwrap();
        fs::write(dir.path().join("photo_1.jpg"), b"x").unwrap();

        let target = unique_path(dir.path(), "photo", Some("jpg"));
        assert_eq!(target, dir.path().join("photo_2.jpg"));
    }

    #[test]
    fn move_to_relocates_keeping_its_own_name() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("dest");
        fs::create_dir(&sub).unwrap();
        let src = dir.path().join("a.jpg");
        fs::write(&src, b"x").unwrap();

        move_to(&src, &sub).unwrap();
        assert!(sub.join("a.jpg").exists());
    }

    #[test]
    fn missing_source_is_a_silent_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("gone.jpg");
        let dst = dir.path().join("target.jpg");
        assert!(rename_to(&src, &dst).is_ok());
        assert!(!dst.exists());
    }
}
