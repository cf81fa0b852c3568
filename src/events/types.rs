//! Event type definitions for progress reporting.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// All events emitted by the engine while a search runs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    /// Scanning phase events
    Scan(ScanEvent),
    /// Fingerprinting (collector) phase events
    Fingerprint(FingerprintEvent),
    /// Comparison phase events
    Compare(CompareEvent),
    /// Whole-search events
    Search(SearchEvent),
    /// Undo/redo engine events
    History(HistoryEvent),
}

/// Events during directory scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScanEvent {
    Started { paths: Vec<PathBuf> },
    Progress(ScanProgress),
    FileFound { path: PathBuf },
    Error { path: PathBuf, message: String },
    Completed { total_files: usize },
}

/// Progress information during scanning
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanProgress {
    pub directories_scanned: usize,
    pub files_found: usize,
    pub current_path: PathBuf,
}

/// Events during fingerprint collection (decode, pyramid, defect scoring)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FingerprintEvent {
    Started { total_files: usize },
    Progress(FingerprintProgress),
    FileFingerprinted { path: PathBuf },
    CacheHit { path: PathBuf },
    Error { path: PathBuf, message: String },
    Completed { total_filled: usize, cache_hits: usize },
}

/// Progress information during fingerprint collection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FingerprintProgress {
    pub completed: usize,
    pub total: usize,
    pub current_path: PathBuf,
    pub cache_hits: usize,
}

/// Events during comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CompareEvent {
    Started { total_files: usize },
    Progress(CompareProgress),
    PairFound { group_id: Option<u32> },
    Completed {
        total_groups: usize,
        total_duplicates: usize,
        total_defects: usize,
    },
}

/// Progress information during comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareProgress {
    pub items_inserted: usize,
    pub total_items: usize,
    pub results_found: usize,
}

/// Whole-search (top-level `search()`) events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SearchEvent {
    Started,
    PhaseChanged { phase: SearchPhase },
    Completed { summary: SearchSummary },
    Stopped,
    Error { message: String },
}

/// Phases of a full search run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SearchPhase {
    Scanning,
    Collecting,
    Comparing,
    Grouping,
}

impl std::fmt::Display for SearchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchPhase::Scanning => write!(f, "Scanning"),
            SearchPhase::Collecting => write!(f, "Collecting"),
            SearchPhase::Comparing => write!(f, "Comparing"),
            SearchPhase::Grouping => write!(f, "Grouping"),
        }
    }
}

/// Summary of a completed search
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSummary {
    pub total_files: usize,
    pub duplicate_groups: usize,
    pub duplicate_count: usize,
    pub defect_count: usize,
    pub duration_ms: u64,
}

/// Events from the undo/redo engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum HistoryEvent {
    Applied { results_affected: usize },
    Undone,
    Redone,
    StageRetired,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_are_serializable() {
        let event = Event::Scan(ScanEvent::Progress(ScanProgress {
            directories_scanned: 10,
            files_found: 50,
            current_path: PathBuf::from("/photos"),
        }));

        let json = serde_json::to_string(&event).unwrap();
        let deserialized: Event = serde_json::from_str(&json).unwrap();

        match deserialized {
            Event::Scan(ScanEvent::Progress(p)) => {
                assert_eq!(p.files_found, 50);
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test]
    fn search_summary_is_serializable() {
        let summary = SearchSummary {
            total_files: 1000,
            duplicate_groups: 50,
            duplicate_count: 150,
            defect_count: 5,
            duration_ms: 5000,
        };

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("5000"));
    }
}
