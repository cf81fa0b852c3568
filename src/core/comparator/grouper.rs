//! Transitive grouping over duplicate-pair results: every image
//! connected by a chain of duplicate pairs ends up in the same group.
//! Merges fold the lower-numbered group into the higher (rather than
//! keeping an arbitrary union-find root) so surviving group ids read
//! as discovery order. Defect results get a fresh group when their
//! image has none yet.

use super::{ImageGroup, ImageInfo, MatchOutcome};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Run the grouping rule over `results`, writing the resolved group id
/// back onto every result (and, for defects, onto the image itself),
/// and return the partition as `ImageGroup`s.
pub fn group(mut results: Vec<MatchOutcome>) -> Vec<ImageGroup> {
    let mut group_of: HashMap<PathBuf, u32> = HashMap::new();
    let mut next_id: u32 = 0;

    for result in &results {
        if let MatchOutcome::Duplicate { first, second, .. } = result {
            let ga = group_of.get(&first.path).copied();
            let gb = group_of.get(&second.path).copied();
            match (ga, gb) {
                (None, None) => {
                    let id = next_id;
                    next_id += 1;
                    group_of.insert(first.path.clone(), id);
                    group_of.insert(second.path.clone(), id);
                }
                (Some(g), None) => {
                    group_of.insert(second.path.clone(), g);
                }
                (None, Some(g)) => {
                    group_of.insert(first.path.clone(), g);
                }
                (Some(ga), Some(gb)) if ga != gb => {
                    let (lower, higher) = if ga < gb { (ga, gb) } else { (gb, ga) };
                    for v in group_of.values_mut() {
                        if *v == lower {
                            *v = higher;
                        }
                    }
                }
                _ => {}
            }
        }
    }

    for result in &results {
        if let MatchOutcome::Defect { image, .. } = result {
            group_of.entry(image.path.clone()).or_insert_with(|| {
                let id = next_id;
                next_id += 1;
                id
            });
        }
    }

    let mut images_by_group: HashMap<u32, Vec<Arc<ImageInfo>>> = HashMap::new();
    for result in &results {
        match result {
            MatchOutcome::Duplicate { first, second, .. } => {
                let g = group_of[&first.path];
                let bucket = images_by_group.entry(g).or_default();
                if !bucket.iter().any(|i| i.path == first.path) {
                    bucket.push(first.clone());
                }
                if !bucket.iter().any(|i| i.path == second.path) {
                    bucket.push(second.clone());
                }
            }
            MatchOutcome::Defect { image, .. } => {
                let g = group_of[&image.path];
                let bucket = images_by_group.entry(g).or_default();
                if !bucket.iter().any(|i| i.path == image.path) {
                    bucket.push(image.clone());
                }
            }
        }
    }

    for result in &mut results {
        let id = match result {
            MatchOutcome::Duplicate { first, .. } => group_of[&first.path],
            MatchOutcome::Defect { image, .. } => group_of[&image.path],
        };
        result.set_group(Some(id));
    }

    let mut results_by_group: HashMap<u32, Vec<MatchOutcome>> = HashMap::new();
    for result in results {
        let id = result.group().expect("group assigned above");
        results_by_group.entry(id).or_default().push(result);
    }

    let mut groups: Vec<ImageGroup> = images_by_group
        .into_iter()
        .map(|(id, images)| ImageGroup {
            id,
            images,
            results: results_by_group.remove(&id).unwrap_or_default(),
            invalid_hint: false,
        })
        .collect();
    groups.sort_by_key(|g| g.id);
    groups
}
