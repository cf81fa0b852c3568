//! User transactions over the result stage: deletes, mistake marking,
//! hint execution, renames, and group moves. Every transaction follows
//! the same shape: execute the primitive mutations while appending
//! inverses to a `Change`, rebuild the stage from what survived, and
//! commit the pair to the undo deque. A transaction in which nothing
//! succeeded is reported as `ZeroTarget` and leaves no history entry.

use super::stage::EngineStage;
use super::Engine;
use crate::core::comparator::{ImageInfo, MatchOutcome};
use crate::core::fingerprint::Transform;
use crate::core::hint::Hint;
use crate::core::history::{self, move_and_rename_like, move_to, rename_like, rename_to, Change};
use crate::error::{EngineError, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// `result_apply_to` actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultAction {
    DeleteFirst,
    DeleteSecond,
    DeleteBoth,
    /// Suppress this result permanently through the mistake store.
    Mistake,
    /// Execute whatever the hint engine recommended; results without a
    /// hint are left alone.
    PerformHint,
}

/// Which results `result_apply_to` addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultTarget {
    Current,
    /// Every result referencing at least one selected image.
    Selected,
    All,
}

/// Side of a duplicate pair, for `rename_current`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameSide {
    First,
    Second,
}

/// `result_sort` orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKind {
    Path,
    Size,
    Time,
    Difference,
    Transform,
    Group,
}

/// `can_apply` queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanApply {
    Undo,
    Redo,
    Actions,
}

impl Engine {
    /// `can_apply(enable_kind)`.
    pub fn can_apply(&self, kind: CanApply) -> bool {
        match kind {
            CanApply::Undo => self.history.undo_depth() > 0,
            CanApply::Redo => self.history.redo_depth() > 0,
            CanApply::Actions => !self.results().is_empty(),
        }
    }

    /// `result_sort(kind, increasing)`: reorders the flat result list
    /// only; groups keep their own internal order.
    pub fn result_sort(&mut self, kind: SortKind, increasing: bool) {
        let current_path = self
            .current_result()
            .map(|r| primary_path(r).to_path_buf());

        let stage = self.history.current_mut();
        stage.results.sort_by(|a, b| {
            let ordering = match kind {
                SortKind::Path => primary_path(a).cmp(primary_path(b)),
                SortKind::Size => primary_size(a).cmp(&primary_size(b)),
                SortKind::Time => primary_time(a).cmp(&primary_time(b)),
                SortKind::Difference => difference_of(a).total_cmp(&difference_of(b)),
                SortKind::Transform => transform_rank(a).cmp(&transform_rank(b)),
                SortKind::Group => a.group().cmp(&b.group()),
            };
            ordering.then_with(|| primary_path(a).cmp(primary_path(b)))
        });
        if !increasing {
            stage.results.reverse();
        }

        // Keep the cursor on the result it pointed at before the sort.
        if let Some(path) = current_path {
            if let Some(index) = stage.results.iter().position(|r| primary_path(r) == path) {
                stage.current = index;
            }
        }
    }

    /// `result_apply_to(action, target)`. Returns the number of results
    /// the action touched.
    pub fn apply_to(&mut self, action: ResultAction, target: ResultTarget) -> Result<usize> {
        let stage = self.history.current().clone();
        if stage.results.is_empty() {
            return Err(EngineError::ZeroTarget);
        }
        let indices: Vec<usize> = match target {
            ResultTarget::Current => vec![stage.current],
            ResultTarget::All => (0..stage.results.len()).collect(),
            ResultTarget::Selected => stage
                .results
                .iter()
                .enumerate()
                .filter(|(_, r)| is_selected(r))
                .map(|(i, _)| i)
                .collect(),
        };

        let mut change = Change::new();
        let mut mistakes = stage.mistakes.clone();
        let mut mistakes_changed = false;
        let mut renames: HashMap<PathBuf, PathBuf> = HashMap::new();
        let mut touched = 0usize;

        for index in indices {
            let result = &stage.results[index];
            let before = change.len();
            match (action, result) {
                (ResultAction::DeleteFirst, MatchOutcome::Duplicate { first, .. }) => {
                    self.delete_image(first, &mut change)?;
                }
                (ResultAction::DeleteSecond, MatchOutcome::Duplicate { second, .. }) => {
                    self.delete_image(second, &mut change)?;
                }
                (ResultAction::DeleteBoth, MatchOutcome::Duplicate { first, second, .. }) => {
                    self.delete_image(first, &mut change)?;
                    self.delete_image(second, &mut change)?;
                }
                (
                    ResultAction::DeleteFirst | ResultAction::DeleteSecond | ResultAction::DeleteBoth,
                    MatchOutcome::Defect { image, .. },
                ) => {
                    self.delete_image(image, &mut change)?;
                }
                (ResultAction::Mistake, MatchOutcome::Duplicate { first, second, .. }) => {
                    mistakes.add_pair(first, second);
                    mistakes_changed = true;
                    touched += 1;
                }
                (ResultAction::Mistake, MatchOutcome::Defect { image, .. }) => {
                    mistakes.add_single(image);
                    mistakes_changed = true;
                    touched += 1;
                }
                (ResultAction::PerformHint, MatchOutcome::Duplicate { first, second, hint, .. }) => {
                    match hint {
                        Some(Hint::DeleteFirst) => self.delete_image(first, &mut change)?,
                        Some(Hint::DeleteSecond) => self.delete_image(second, &mut change)?,
                        Some(Hint::RenameFirstToSecond) => {
                            self.replace_with(first, second, &mut change, &mut renames)?;
                        }
                        Some(Hint::RenameSecondToFirst) => {
                            self.replace_with(second, first, &mut change, &mut renames)?;
                        }
                        None => {}
                    }
                }
                (ResultAction::PerformHint, MatchOutcome::Defect { image, .. }) => {
                    self.delete_image(image, &mut change)?;
                }
            }
            if change.len() > before {
                touched += 1;
            }
        }

        if change.is_empty() && !mistakes_changed {
            return Err(EngineError::ZeroTarget);
        }

        let mut results = stage.results;
        if !renames.is_empty() {
            for (old, new) in &renames {
                mistakes.rename(old, new);
            }
            results = relabel_results(results, &renames);
        }

        let new_stage = EngineStage::rebuild(
            results,
            mistakes,
            &self.hint_setter(),
            &self.delete_paths,
            stage.current,
        );
        if change.is_empty() {
            self.history.commit_state(new_stage);
        } else {
            self.history.commit(new_stage, change);
        }
        Ok(touched)
    }

    /// `result_apply(global_action)`: the whole-list convenience form.
    pub fn apply(&mut self, action: ResultAction) -> Result<usize> {
        self.apply_to(action, ResultTarget::All)
    }

    /// `rename_current(side, new_name)`: rename one side of the
    /// current result within its own directory. If the target name is
    /// occupied, the occupant is recycled first (move-with-replace).
    pub fn rename_current(&mut self, side: RenameSide, new_name: &str) -> Result<()> {
        let info = {
            let result = self.current_result().ok_or(EngineError::ZeroTarget)?;
            match (result, side) {
                (MatchOutcome::Duplicate { first, .. }, RenameSide::First) => first.clone(),
                (MatchOutcome::Duplicate { second, .. }, RenameSide::Second) => second.clone(),
                (MatchOutcome::Defect { image, .. }, _) => image.clone(),
            }
        };
        self.rename_image(&info, new_name)
    }

    /// `image_info_rename(group_id, index, new_name)`.
    pub fn image_info_rename(&mut self, group_id: u32, index: usize, new_name: &str) -> Result<()> {
        let info = {
            let group = self.group_get(group_id).ok_or(EngineError::InvalidGroupId(group_id))?;
            group.images.get(index).ok_or(EngineError::InvalidIndex(index))?.clone()
        };
        self.rename_image(&info, new_name)
    }

    /// `move_current_group(dir)`: move every image of the current
    /// result's group into `dir`, keeping each image's own name and
    /// unique-ifying collisions.
    pub fn move_current_group(&mut self, dir: &Path) -> Result<()> {
        self.transform_current_group(|path| move_to(path, dir))
    }

    /// `rename_current_group_as(name)`: rename every image of the
    /// current group to `name` in place, keeping each image's own
    /// extension and unique-ifying collisions (including against the
    /// group's own members).
    pub fn rename_current_group_as(&mut self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.transform_current_group(move |path| {
            let dir = path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
            rename_like(path, &dir.join(&name))
        })
    }

    /// `move_current_group` variant that also renames: every image
    /// lands in `target`'s directory under `target`'s bare name.
    pub fn move_and_rename_current_group(&mut self, target: &Path) -> Result<()> {
        let target = target.to_path_buf();
        self.transform_current_group(move |path| move_and_rename_like(path, &target))
    }

    fn transform_current_group(
        &mut self,
        op: impl Fn(&Path) -> std::result::Result<history::Inverse, crate::error::HistoryError>,
    ) -> Result<()> {
        let stage = self.history.current().clone();
        let group_id = stage
            .results
            .get(stage.current)
            .and_then(|r| r.group())
            .ok_or(EngineError::ZeroTarget)?;
        let images: Vec<Arc<ImageInfo>> = self
            .group_get(group_id)
            .ok_or(EngineError::InvalidGroupId(group_id))?
            .images
            .clone();

        let mut change = Change::new();
        let mut renames: HashMap<PathBuf, PathBuf> = HashMap::new();
        for image in &images {
            if !image.path.exists() {
                continue;
            }
            let inverse = op(&image.path)?;
            if let history::Inverse::Rename { current_path, previous_path } = &inverse {
                renames.insert(previous_path.clone(), current_path.clone());
            }
            change.push(inverse);
        }
        if change.is_empty() {
            return Err(EngineError::ZeroTarget);
        }

        let mut mistakes = stage.mistakes.clone();
        for (old, new) in &renames {
            mistakes.rename(old, new);
        }
        let results = relabel_results(stage.results, &renames);
        let new_stage = EngineStage::rebuild(
            results,
            mistakes,
            &self.hint_setter(),
            &self.delete_paths,
            stage.current,
        );
        self.history.commit(new_stage, change);
        Ok(())
    }

    fn rename_image(&mut self, info: &Arc<ImageInfo>, new_name: &str) -> Result<()> {
        let dir = info.path.parent().unwrap_or_else(|| Path::new(".")).to_path_buf();
        let target = dir.join(new_name);
        if target == info.path || !info.path.exists() {
            return Err(EngineError::ZeroTarget);
        }

        let stage = self.history.current().clone();
        let mut change = Change::new();
        history::rename_onto(self.recycle_bin.as_ref(), &info.path, &target, &mut change)?;

        let mut renames = HashMap::new();
        renames.insert(info.path.clone(), target);
        let mut mistakes = stage.mistakes.clone();
        for (old, new) in &renames {
            mistakes.rename(old, new);
        }
        let results = relabel_results(stage.results, &renames);
        let new_stage = EngineStage::rebuild(
            results,
            mistakes,
            &self.hint_setter(),
            &self.delete_paths,
            stage.current,
        );
        self.history.commit(new_stage, change);
        Ok(())
    }

    /// Execute a rename hint: recycle `discard`, then move `keep` onto
    /// the path it occupied, recording the relabel for the stage
    /// rebuild.
    fn replace_with(
        &self,
        keep: &Arc<ImageInfo>,
        discard: &Arc<ImageInfo>,
        change: &mut Change,
        renames: &mut HashMap<PathBuf, PathBuf>,
    ) -> Result<()> {
        if keep.is_removed() || !keep.path.exists() {
            return Ok(());
        }
        self.delete_image(discard, change)?;
        change.push(rename_to(&keep.path, &discard.path)?);
        renames.insert(keep.path.clone(), discard.path.clone());
        Ok(())
    }

    /// Recycle one image's file and mark the shared `ImageInfo`
    /// removed. Already-removed or already-missing images are skipped
    /// silently, per the rule that a primitive whose source is gone is
    /// a no-op.
    fn delete_image(&self, info: &Arc<ImageInfo>, change: &mut Change) -> Result<()> {
        if info.is_removed() || !info.path.exists() {
            return Ok(());
        }
        history::delete(self.recycle_bin.as_ref(), &info.path, change)?;
        info.set_removed(true);
        Ok(())
    }
}

/// Rebuild the result list with every image whose path was renamed
/// replaced by a fresh `ImageInfo` carrying the new path. One shared
/// instance per renamed path, so interning survives the relabel.
fn relabel_results(results: Vec<MatchOutcome>, renames: &HashMap<PathBuf, PathBuf>) -> Vec<MatchOutcome> {
    if renames.is_empty() {
        return results;
    }
    let mut replaced: HashMap<PathBuf, Arc<ImageInfo>> = HashMap::new();
    let mut relabel = |info: &Arc<ImageInfo>| -> Arc<ImageInfo> {
        let Some(new_path) = renames.get(&info.path) else {
            return info.clone();
        };
        replaced
            .entry(info.path.clone())
            .or_insert_with(|| {
                let fresh = ImageInfo::from_fields(
                    new_path.clone(),
                    info.size,
                    info.time,
                    info.image_type,
                    info.width,
                    info.height,
                    info.blockiness,
                    info.blurring,
                );
                fresh.set_selected(info.is_selected());
                fresh.set_removed(info.is_removed());
                fresh
            })
            .clone()
    };

    results
        .into_iter()
        .map(|result| match result {
            MatchOutcome::Duplicate { first, second, difference, transform, group, hint } => {
                MatchOutcome::Duplicate {
                    first: relabel(&first),
                    second: relabel(&second),
                    difference,
                    transform,
                    group,
                    hint,
                }
            }
            MatchOutcome::Defect { image, defect } => {
                MatchOutcome::Defect { image: relabel(&image), defect }
            }
        })
        .collect()
}

fn is_selected(result: &MatchOutcome) -> bool {
    match result {
        MatchOutcome::Duplicate { first, second, .. } => first.is_selected() || second.is_selected(),
        MatchOutcome::Defect { image, .. } => image.is_selected(),
    }
}

fn primary_path(result: &MatchOutcome) -> &Path {
    match result {
        MatchOutcome::Duplicate { first, .. } => &first.path,
        MatchOutcome::Defect { image, .. } => &image.path,
    }
}

fn primary_size(result: &MatchOutcome) -> u64 {
    match result {
        MatchOutcome::Duplicate { first, .. } => first.size,
        MatchOutcome::Defect { image, .. } => image.size,
    }
}

fn primary_time(result: &MatchOutcome) -> std::time::SystemTime {
    match result {
        MatchOutcome::Duplicate { first, .. } => first.time,
        MatchOutcome::Defect { image, .. } => image.time,
    }
}

/// Defects sort ahead of every duplicate under the difference order.
fn difference_of(result: &MatchOutcome) -> f64 {
    match result {
        MatchOutcome::Duplicate { difference, .. } => *difference,
        MatchOutcome::Defect { .. } => -1.0,
    }
}

fn transform_rank(result: &MatchOutcome) -> u8 {
    match result {
        MatchOutcome::Duplicate { transform, .. } => match transform {
            Transform::Turn0 => 0,
            Transform::Turn90 => 1,
            Transform::Turn180 => 2,
            Transform::Turn270 => 3,
            Transform::MirrorTurn0 => 4,
            Transform::MirrorTurn90 => 5,
            Transform::MirrorTurn180 => 6,
            Transform::MirrorTurn270 => 7,
        },
        MatchOutcome::Defect { .. } => u8::MAX,
    }
}
