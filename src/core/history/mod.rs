//! # History Module
//!
//! Undo/redo transaction log over filesystem mutations. A transaction
//! is a small batch of moves (deletes, renames, group reorganizations)
//! executed against the live engine state; each successful move
//! appends its inverse to a `Change`, and the `Change` plus a snapshot
//! of the prior state is pushed onto a bounded undo deque. `undo`
//! replays the inverses in reverse and restores the snapshot; `redo`
//! replays them forward again.

mod primitives;
mod recycle;

pub use primitives::{move_and_rename_like, move_to, rename_like, rename_to};
pub use recycle::{HiddenSiblingRecycleBin, RecycleBin};

use crate::error::HistoryError;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The inverse of one successful filesystem mutation.
#[derive(Debug, Clone)]
pub enum Inverse {
    /// Undoes a delete: move `hidden_path` back to `original_path`.
    /// Redoing re-recycles `original_path` to the same `hidden_path`.
    Restore { hidden_path: PathBuf, original_path: PathBuf },
    /// Undoes a rename: move `current_path` back to `previous_path`.
    /// Redoing moves it forward again.
    Rename { current_path: PathBuf, previous_path: PathBuf },
}

impl Inverse {
    fn undo(&self, bin: &dyn RecycleBin) -> Result<(), HistoryError> {
        match self {
            Inverse::Restore { hidden_path, original_path } => bin.restore(hidden_path, original_path),
            Inverse::Rename { current_path, previous_path } => primitives::atomic_move(current_path, previous_path),
        }
    }

    fn redo(&self, bin: &dyn RecycleBin) -> Result<(), HistoryError> {
        match self {
            Inverse::Restore { hidden_path, original_path } => bin.recycle_to(original_path, hidden_path),
            Inverse::Rename { current_path, previous_path } => primitives::atomic_move(previous_path, current_path),
        }
    }
}

/// The minimal inverse witness for one user transaction: every
/// primitive mutation that actually succeeded, in execution order.
#[derive(Debug, Clone, Default)]
pub struct Change {
    inverses: Vec<Inverse>,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, inverse: Inverse) {
        self.inverses.push(inverse);
    }

    pub fn is_empty(&self) -> bool {
        self.inverses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inverses.len()
    }
}

/// `Delete(info)`: recycle `path`, appending its inverse to `change`.
/// Unlike the other primitives this needs a `RecycleBin`, so it isn't
/// re-exported alongside the plain rename/move primitives.
pub fn delete(bin: &dyn RecycleBin, path: &Path, change: &mut Change) -> Result<(), HistoryError> {
    let hidden_path = bin.recycle(path)?;
    change.push(Inverse::Restore { hidden_path, original_path: path.to_path_buf() });
    Ok(())
}

/// `Rename(old_info, new_info)`: delete whatever currently occupies
/// `target_path`, then rename `path` onto it.
pub fn rename_onto(bin: &dyn RecycleBin, path: &Path, target_path: &Path, change: &mut Change) -> Result<(), HistoryError> {
    if target_path.exists() {
        delete(bin, target_path, change)?;
    }
    change.push(rename_to(path, target_path)?);
    Ok(())
}

/// `MoveGroup(directory)`: move every image in the group into
/// `directory`, keeping each image's own name. Per-image failures
/// (source already gone) are skipped, not propagated; `atomic_move`
/// already treats a missing source as a no-op, so this just collects
/// whatever inverses resulted.
pub fn move_group(images: &[PathBuf], directory: &Path) -> Result<Change, HistoryError> {
    let mut change = Change::new();
    for path in images {
        change.push(move_to(path, directory)?);
    }
    Ok(change)
}

/// `RenameGroupAs(name)`: rename every image in the group to `name`,
/// keeping each image's own extension and directory, unique-ifying on
/// collision (including collisions between the group's own members).
pub fn rename_group_as(images: &[PathBuf], name: &str) -> Result<Change, HistoryError> {
    let mut change = Change::new();
    for path in images {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let like_path = dir.join(name);
        change.push(rename_like(path, &like_path)?);
    }
    Ok(change)
}

/// One retired or pending entry in the undo/redo deque: an engine-level
/// state snapshot paired with the `Change` that produced it.
struct Stage<T> {
    previous_state: T,
    change: Change,
}

/// Bounded undo/redo log over an engine-level state snapshot `T`
/// (typically the result store plus grouping). Deliberately generic:
/// this module has no dependency on `core::comparator`, so it stays
/// testable without a real scan.
pub struct UndoRedoEngine<T> {
    current: T,
    undo: VecDeque<Stage<T>>,
    redo: VecDeque<Stage<T>>,
    undo_queue_size: usize,
    recycle_bin: Arc<dyn RecycleBin>,
}

impl<T> UndoRedoEngine<T> {
    pub fn new(initial: T, undo_queue_size: usize, recycle_bin: Arc<dyn RecycleBin>) -> Self {
        Self { current: initial, undo: VecDeque::new(), redo: VecDeque::new(), undo_queue_size, recycle_bin }
    }

    pub fn current(&self) -> &T {
        &self.current
    }

    /// Direct access for mutations that aren't themselves undoable
    /// filesystem transactions (e.g. re-sorting the live result list).
    pub fn current_mut(&mut self) -> &mut T {
        &mut self.current
    }

    /// The recycle bin backing this engine's deletes, so a caller can
    /// route its own `history::delete`/`rename_onto` calls through the
    /// same instance before calling `commit`.
    pub fn recycle_bin(&self) -> &Arc<dyn RecycleBin> {
        &self.recycle_bin
    }

    pub fn undo_depth(&self) -> usize {
        self.undo.len()
    }

    pub fn redo_depth(&self) -> usize {
        self.redo.len()
    }

    /// Commit a transaction: `new_state` replaces `current`, and
    /// `change` is pushed onto the undo deque. A transaction with no
    /// successful mutations is rejected outright; the caller should
    /// treat that as "nothing to act on" and record no history entry.
    /// If `undo_queue_size` is zero, the stage just pushed immediately
    /// overflows and is retired in the same call, which is exactly the
    /// "delete directly, don't queue" behavior a zero-sized undo queue
    /// is supposed to produce.
    pub fn commit(&mut self, new_state: T, change: Change) -> bool {
        if change.is_empty() {
            return false;
        }
        let previous_state = std::mem::replace(&mut self.current, new_state);
        self.undo.push_back(Stage { previous_state, change });
        self.redo.clear();
        while self.undo.len() > self.undo_queue_size {
            if let Some(retired) = self.undo.pop_front() {
                for inverse in &retired.change.inverses {
                    if let Inverse::Restore { hidden_path, .. } = inverse {
                        let _ = self.recycle_bin.commit(hidden_path);
                    }
                }
            }
        }
        true
    }

    /// Commit a transaction whose whole effect lives in the state
    /// snapshot (e.g. marking a pair as a mistake): undoable, but with
    /// no filesystem inverses to replay.
    pub fn commit_state(&mut self, new_state: T) {
        let previous_state = std::mem::replace(&mut self.current, new_state);
        self.undo.push_back(Stage { previous_state, change: Change::new() });
        self.redo.clear();
        while self.undo.len() > self.undo_queue_size {
            if let Some(retired) = self.undo.pop_front() {
                for inverse in &retired.change.inverses {
                    if let Inverse::Restore { hidden_path, .. } = inverse {
                        let _ = self.recycle_bin.commit(hidden_path);
                    }
                }
            }
        }
    }

    pub fn undo(&mut self) -> Result<(), HistoryError> {
        let stage = self.undo.pop_back().ok_or(HistoryError::NothingToUndo)?;
        for inverse in stage.change.inverses.iter().rev() {
            inverse.undo(self.recycle_bin.as_ref())?;
        }
        let redone_state = std::mem::replace(&mut self.current, stage.previous_state);
        self.redo.push_back(Stage { previous_state: redone_state, change: stage.change });
        Ok(())
    }

    pub fn redo(&mut self) -> Result<(), HistoryError> {
        let stage = self.redo.pop_back().ok_or(HistoryError::NothingToRedo)?;
        for inverse in &stage.change.inverses {
            inverse.redo(self.recycle_bin.as_ref())?;
        }
        let undone_state = std::mem::replace(&mut self.current, stage.previous_state);
        self.undo.push_back(Stage { previous_state: undone_state, change: stage.change });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn engine(initial: u32) -> UndoRedoEngine<u32> {
        UndoRedoEngine::new(initial, 3, Arc::new(HiddenSiblingRecycleBin))
    }

    #[test]
    fn empty_change_is_rejected_without_touching_history() {
        let mut e = engine(0);
        assert!(!e.commit(1, Change::new()));
        assert_eq!(*e.current(), 0);
        assert_eq!(e.undo_depth(), 0);
    }

    #[test]
    fn undo_then_redo_restores_state_and_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        fs::write(&path, b"x").unwrap();

        let bin = HiddenSiblingRecycleBin;
        let mut change = Change::new();
        delete(&bin, &path, &mut change).unwrap();
        assert!(!path.exists());

        let mut e = engine(0);
        assert!(e.commit(1, change));
        assert_eq!(*e.current(), 1);

        e.undo().unwrap();
        assert_eq!(*e.current(), 0);
        assert!(path.exists());

        e.redo().unwrap();
        assert_eq!(*e.current(), 1);
        assert!(!path.exists());
    }

    #[test]
    fn undo_past_the_bottom_of_the_deque_is_an_error() {
        let mut e = engine(0);
        assert!(matches!(e.undo().unwrap_err(), HistoryError::NothingToUndo));
    }

    #[test]
    fn redo_past_the_top_of_the_deque_is_an_error() {
        let mut e = engine(0);
        assert!(matches!(e.redo().unwrap_err(), HistoryError::NothingToRedo));
    }

    #[test]
    fn a_new_commit_clears_the_redo_deque() {
        let mut e = engine(0);
        let mut change_a = Change::new();
        change_a.push(Inverse::Rename { current_path: PathBuf::from("/a"), previous_path: PathBuf::from("/b") });
        e.commit(1, change_a);
        e.undo().unwrap();
        assert_eq!(e.redo_depth(), 1);

        let mut change_b = Change::new();
        change_b.push(Inverse::Rename { current_path: PathBuf::from("/c"), previous_path: PathBuf::from("/d") });
        e.commit(2, change_b);
        assert_eq!(e.redo_depth(), 0);
    }

    #[test]
    fn undo_queue_overflow_permanently_commits_the_oldest_recycled_file() {
        let dir = tempfile::tempdir().unwrap();
        let bin = HiddenSiblingRecycleBin;
        let mut e = UndoRedoEngine::new(0u32, 1, Arc::new(HiddenSiblingRecycleBin));

        let path_a = dir.path().join("a.jpg");
        fs::write(&path_a, b"a").unwrap();
        let mut change_a = Change::new();
        delete(&bin, &path_a, &mut change_a).unwrap();
        let hidden_a = match &change_a.inverses[0] {
            Inverse::Restore { hidden_path, .. } => hidden_path.clone(),
            _ => unreachable!(),
        };
        e.commit(1, change_a);

        let path_b = dir.path().join("b.jpg");
        fs::write(&path_b, b"b").unwrap();
        let mut change_b = Change::new();
        delete(&bin, &path_b, &mut change_b).unwrap();
        e.commit(2, change_b);

        assert_eq!(e.undo_depth(), 1);
        assert!(!hidden_a.exists());
    }

    #[test]
    fn zero_sized_undo_queue_commits_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let bin = HiddenSiblingRecycleBin;
        let mut e = UndoRedoEngine::new(0u32, 0, Arc::new(HiddenSiblingRecycleBin));

        let path = dir.path().join("a.jpg");
        fs::write(&path, b"a").unwrap();
        let mut change = Change::new();
        delete(&bin, &path, &mut change).unwrap();
        let hidden = match &change.inverses[0] {
            Inverse::Restore { hidden_path, .. } => hidden_path.clone(),
            _ => unreachable!(),
        };
        e.commit(1, change);

        assert_eq!(e.undo_depth(), 0);
        assert!(!hidden.exists());
    }
}
