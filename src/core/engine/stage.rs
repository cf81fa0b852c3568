//! The live result stage: the flat result list, its grouping, the
//! mistake store consulted by every rebuild, and the cursor the
//! `Current` action target addresses. Cloned wholesale into the undo
//! deque on every committed transaction.

use crate::core::comparator::{group, ImageGroup, MatchOutcome};
use crate::core::hint::HintSetter;
use crate::core::mistake::MistakeStore;
use crate::core::options::PathSet;

#[derive(Default, Clone)]
pub struct EngineStage {
    /// Flat result list in group order (until a sort reorders it).
    pub results: Vec<MatchOutcome>,
    pub groups: Vec<ImageGroup>,
    pub mistakes: MistakeStore,
    /// Index into `results` of the result user actions address.
    pub current: usize,
}

impl EngineStage {
    /// Build a stage from a raw result list: purge anything referencing
    /// a removed image or a known mistake, regroup, recompute hints,
    /// and clamp the cursor. Every path that changes the result set
    /// funnels through here so grouping and hints never go stale.
    /// Hints run after grouping because rename hints are only offered
    /// to results that are alone in their group.
    pub fn rebuild(
        mut results: Vec<MatchOutcome>,
        mistakes: MistakeStore,
        hints: &HintSetter,
        delete_paths: &PathSet,
        current: usize,
    ) -> Self {
        results.retain(|result| match result {
            MatchOutcome::Duplicate { first, second, .. } => {
                !first.is_removed()
                    && !second.is_removed()
                    && !mistakes.contains_pair(&first.path, &second.path)
            }
            MatchOutcome::Defect { image, .. } => {
                !image.is_removed() && !mistakes.contains_single(&image.path)
            }
        });

        // A rename can break the smaller-path-first pair order; restore
        // it before hints are computed so First/Second stay meaningful.
        for result in &mut results {
            if let MatchOutcome::Duplicate { first, second, .. } = result {
                if first.path > second.path {
                    std::mem::swap(first, second);
                }
            }
        }

        let mut groups = group(results);
        for g in &mut groups {
            let can_rename = g.results.len() == 1;
            hints.apply(&mut g.results, can_rename, delete_paths);
        }
        let results: Vec<MatchOutcome> =
            groups.iter().flat_map(|g| g.results.iter().cloned()).collect();

        Self {
            current: current.min(results.len().saturating_sub(1)),
            results,
            groups,
            mistakes,
        }
    }
}
