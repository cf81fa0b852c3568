//! # Hint Module
//!
//! Recommends what to do with a duplicate pair (or a defective
//! single) without ever acting on it. Exact matches keep the larger
//! file and point the delete at the other side; when the side that
//! ought to survive is itself under a configured *delete* path, the
//! recommendation flips to renaming the survivor onto the doomed
//! side's path instead, and to no hint at all when renaming is not
//! allowed for that result. Near matches (difference below the
//! auto-delete threshold) only recommend anything when one side
//! dominates the other in size, resolution, and blockiness. Defects
//! always point at the defective file. Anything found only under a
//! rotation or mirror gets no hint, since a transformed duplicate is
//! rarely a true waste-of-space candidate.
//!
//! Rename hints are gated per result: they are only offered when the
//! result is alone in its group, because replacing a file that other
//! results still reference would cascade through the group.

use crate::core::comparator::MatchOutcome;
use crate::core::fingerprint::{Defect, Transform};
use crate::core::options::{PathSet, DENOMINATOR};
use std::cmp::Ordering;
use std::path::Path;
use std::time::SystemTime;

/// No matter how loose the comparator threshold is, auto-delete hints
/// never fire above 5% difference.
const AUTO_DELETE_MAX: u32 = (DENOMINATOR as f64 * 0.05) as u32;
const AUTO_DELETE_FACTOR: u32 = 2;

/// A recommended action for a duplicate pair or a defective single.
/// `First`/`Second` identify which side of the pair, matching the
/// `(first, second)` order of `MatchOutcome::Duplicate`. The rename
/// variants mean "the named side survives, moved onto the other
/// side's path" (the other side is recycled first).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hint {
    DeleteFirst,
    DeleteSecond,
    RenameFirstToSecond,
    RenameSecondToFirst,
}

/// The subset of `ImageInfo` the hint engine needs. Kept separate from
/// `core::comparator::ImageInfo` so this module has no dependency on
/// the comparator's interning/locking machinery.
#[derive(Debug, Clone, Copy)]
pub struct HintSubject<'a> {
    pub path: &'a Path,
    pub size: u64,
    pub time: SystemTime,
    pub width: u32,
    pub height: u32,
    pub blockiness: f64,
    pub image_type: crate::core::fingerprint::ImageType,
}

fn area(subject: &HintSubject) -> u64 {
    subject.width as u64 * subject.height as u64
}

/// Prefer deleting a side that sits under a delete path; with no such
/// preference, delete the newer file.
fn delete_tie_break(
    first: &HintSubject,
    second: &HintSubject,
    first_in_delete: bool,
    second_in_delete: bool,
) -> Hint {
    if second_in_delete && !first_in_delete {
        Hint::DeleteSecond
    } else if !second_in_delete && first_in_delete {
        Hint::DeleteFirst
    } else if first.time > second.time {
        Hint::DeleteFirst
    } else {
        Hint::DeleteSecond
    }
}

/// The hint decision tree, configured once per rebuild from the
/// compare threshold and the blockiness defect threshold.
#[derive(Debug, Clone, Copy)]
pub struct HintSetter {
    auto_delete_threshold: f64,
    blockiness_threshold: f64,
}

impl HintSetter {
    pub fn new(threshold: u32, blockiness_threshold: f64) -> Self {
        Self {
            auto_delete_threshold: (AUTO_DELETE_MAX as f64)
                .min(threshold as f64 / AUTO_DELETE_FACTOR as f64),
            blockiness_threshold,
        }
    }

    /// Hint for a duplicate pair at `Transform::Turn0`. Callers must
    /// not call this for a rotated/mirrored match; those never get a
    /// hint.
    pub fn duplicate_hint(
        &self,
        first: &HintSubject,
        second: &HintSubject,
        difference: f64,
        can_rename: bool,
        delete_paths: &PathSet,
    ) -> Option<Hint> {
        let first_in_delete = delete_paths.contains(first.path);
        let second_in_delete = delete_paths.contains(second.path);

        if difference == 0.0 {
            return match first.size.cmp(&second.size) {
                Ordering::Greater => {
                    if second_in_delete || !first_in_delete {
                        Some(Hint::DeleteSecond)
                    } else if can_rename {
                        Some(Hint::RenameFirstToSecond)
                    } else {
                        None
                    }
                }
                Ordering::Less => {
                    if !second_in_delete || first_in_delete {
                        Some(Hint::DeleteFirst)
                    } else if can_rename {
                        Some(Hint::RenameSecondToFirst)
                    } else {
                        None
                    }
                }
                Ordering::Equal => {
                    Some(delete_tie_break(first, second, first_in_delete, second_in_delete))
                }
            };
        }

        if difference < self.auto_delete_threshold && first.image_type == second.image_type {
            if first.size == second.size
                && area(first) == area(second)
                && first.blockiness < self.blockiness_threshold
                && second.blockiness < self.blockiness_threshold
            {
                return Some(delete_tie_break(first, second, first_in_delete, second_in_delete));
            }

            if first.size >= second.size
                && area(first) >= area(second)
                && first.blockiness <= second.blockiness
            {
                return if second_in_delete || !first_in_delete {
                    Some(Hint::DeleteSecond)
                } else if can_rename {
                    Some(Hint::RenameFirstToSecond)
                } else {
                    None
                };
            }

            if first.size <= second.size
                && area(first) <= area(second)
                && first.blockiness >= second.blockiness
            {
                return if !second_in_delete || first_in_delete {
                    Some(Hint::DeleteFirst)
                } else if can_rename {
                    Some(Hint::RenameSecondToFirst)
                } else {
                    None
                };
            }
        }

        None
    }

    /// Run the decision tree over one group's results, writing
    /// `Some(hint)` onto duplicate pairs and leaving rotated/mirrored
    /// matches untouched (they never get a hint). Defect hints don't
    /// live on `MatchOutcome` itself; `defect_hint` is called directly
    /// where a defect result is surfaced, since it needs no pairwise
    /// context.
    pub fn apply(&self, results: &mut [MatchOutcome], can_rename: bool, delete_paths: &PathSet) {
        for result in results {
            if let MatchOutcome::Duplicate { first, second, difference, transform, hint, .. } = result {
                *hint = if *transform == Transform::Turn0 {
                    self.duplicate_hint(
                        &subject_of(first),
                        &subject_of(second),
                        *difference,
                        can_rename,
                        delete_paths,
                    )
                } else {
                    None
                };
            }
        }
    }
}

/// A defective single always recommends deleting itself; `Defect::None`
/// is not a defect and has no hint.
pub fn defect_hint(defect: Defect) -> Option<Hint> {
    match defect {
        Defect::None => None,
        _ => Some(Hint::DeleteFirst),
    }
}

fn subject_of(image: &crate::core::comparator::ImageInfo) -> HintSubject<'_> {
    HintSubject {
        path: &image.path,
        size: image.size,
        time: image.time,
        width: image.width,
        height: image.height,
        blockiness: image.blockiness,
        image_type: image.image_type,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::ImageType;
    use std::path::PathBuf;
    use std::time::Duration;

    fn subject<'a>(path: &'a Path, size: u64, w: u32, h: u32, blockiness: f64) -> HintSubject<'a> {
        HintSubject {
            path,
            size,
            time: SystemTime::UNIX_EPOCH,
            width: w,
            height: h,
            blockiness,
            image_type: ImageType::Jpeg,
        }
    }

    fn setter() -> HintSetter {
        HintSetter::new(5, 0.5)
    }

    #[test]
    fn exact_match_keeps_the_larger_file() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        let hint = setter().duplicate_hint(
            &subject(&a, 200, 10, 10, 0.0),
            &subject(&b, 100, 10, 10, 0.0),
            0.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, Some(Hint::DeleteSecond));
    }

    #[test]
    fn exact_match_on_size_tie_deletes_the_side_in_a_delete_path() {
        let a = PathBuf::from("/trash/a.jpg");
        let b = PathBuf::from("/keep/b.jpg");
        let mut delete_paths = PathSet::new();
        delete_paths.add("/trash");
        let hint = setter().duplicate_hint(
            &subject(&a, 100, 10, 10, 0.0),
            &subject(&b, 100, 10, 10, 0.0),
            0.0,
            true,
            &delete_paths,
        );
        assert_eq!(hint, Some(Hint::DeleteFirst));
    }

    #[test]
    fn exact_match_on_full_tie_deletes_the_newer_file() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        let mut newer = subject(&b, 100, 10, 10, 0.0);
        newer.time = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
        let hint = setter().duplicate_hint(
            &subject(&a, 100, 10, 10, 0.0),
            &newer,
            0.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, Some(Hint::DeleteSecond));
    }

    #[test]
    fn doomed_survivor_suggests_a_rename_when_allowed() {
        // The larger file ought to survive, but it is the one under a
        // delete path: recommend moving it onto the smaller file's
        // path.
        let a = PathBuf::from("/trash/a.jpg");
        let b = PathBuf::from("/keep/b.jpg");
        let mut delete_paths = PathSet::new();
        delete_paths.add("/trash");

        let larger_in_trash = subject(&a, 200, 10, 10, 0.0);
        let smaller_kept = subject(&b, 100, 10, 10, 0.0);

        let hint =
            setter().duplicate_hint(&larger_in_trash, &smaller_kept, 0.0, true, &delete_paths);
        assert_eq!(hint, Some(Hint::RenameFirstToSecond));

        let hint =
            setter().duplicate_hint(&larger_in_trash, &smaller_kept, 0.0, false, &delete_paths);
        assert_eq!(hint, None);
    }

    #[test]
    fn near_match_requires_dominance() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        // a is bigger and sharper: recommend deleting b.
        let hint = setter().duplicate_hint(
            &subject(&a, 200, 20, 20, 1.0),
            &subject(&b, 100, 10, 10, 2.0),
            1.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, Some(Hint::DeleteSecond));
    }

    #[test]
    fn near_match_with_mixed_tradeoffs_has_no_hint() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        // a is bigger but blockier: neither dominates.
        let hint = setter().duplicate_hint(
            &subject(&a, 200, 10, 10, 5.0),
            &subject(&b, 100, 10, 10, 1.0),
            1.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, None);
    }

    #[test]
    fn near_match_full_tie_below_blockiness_threshold_tie_breaks() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        let mut newer = subject(&b, 100, 10, 10, 0.1);
        newer.time = SystemTime::UNIX_EPOCH + Duration::from_secs(60);
        let hint = setter().duplicate_hint(
            &subject(&a, 100, 10, 10, 0.1),
            &newer,
            1.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, Some(Hint::DeleteSecond));
    }

    #[test]
    fn near_match_dominant_side_in_delete_path_suggests_rename() {
        let a = PathBuf::from("/trash/a.jpg");
        let b = PathBuf::from("/keep/b.jpg");
        let mut delete_paths = PathSet::new();
        delete_paths.add("/trash");
        let hint = setter().duplicate_hint(
            &subject(&a, 200, 20, 20, 1.0),
            &subject(&b, 100, 10, 10, 2.0),
            1.0,
            true,
            &delete_paths,
        );
        assert_eq!(hint, Some(Hint::RenameFirstToSecond));
    }

    #[test]
    fn far_apart_difference_has_no_hint() {
        let a = PathBuf::from("/a.jpg");
        let b = PathBuf::from("/b.jpg");
        let hint = setter().duplicate_hint(
            &subject(&a, 100, 10, 10, 0.0),
            &subject(&b, 100, 10, 10, 0.0),
            50.0,
            true,
            &PathSet::new(),
        );
        assert_eq!(hint, None);
    }

    #[test]
    fn defect_always_points_at_itself() {
        assert_eq!(defect_hint(Defect::Blurring), Some(Hint::DeleteFirst));
        assert_eq!(defect_hint(Defect::None), None);
    }
}
