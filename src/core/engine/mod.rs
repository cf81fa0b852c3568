//! # Engine Module
//!
//! One `Engine` owns the options, the four path sets, the persistent
//! fingerprint cache, the live result stage, and the undo/redo log,
//! and drives a full scan, collect, compare, group pipeline per
//! `search` call. The session is stateful: results persist across
//! user actions, and every mutating action lands in the undo history.

mod actions;
mod stage;

pub use actions::{CanApply, RenameSide, ResultAction, ResultTarget, SortKind};
pub use stage::EngineStage;

use crate::core::cache::{CacheBackend, ChunkedFileCache};
use crate::core::comparator::{select_strategy, ImageGroup, ImageInfo, MatchOutcome};
use crate::core::fingerprint::{read_file_bytes, DataCollector, Decoder, ImageData, ImageDecoder, ImageType};
use crate::core::hint::HintSetter;
use crate::core::history::{HiddenSiblingRecycleBin, RecycleBin, UndoRedoEngine};
use crate::core::mistake::MistakeStore;
use crate::core::options::{Options, PathKind, PathSet};
use crate::core::scanner::{FileScanner, WalkDirScanner};
use crate::core::threading::{
    set_priority, CollectorPool, ComparatorPool, Priority, SharedFindings, Statistic, Status, ThreadKind,
    ThreadProgress,
};
use crate::error::{EngineError, FingerprintError, Result};
use crate::events::{
    CompareEvent, Event, EventSender, FingerprintEvent, SearchEvent, SearchPhase, SearchSummary,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// Which persisted engine state a `load`/`save` call addresses.
/// `Results` and `Mistakes` take a file path; `ImageData` takes the
/// directory holding `index.adi` and its chunk files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateKind {
    Results,
    Mistakes,
    ImageData,
}

pub struct Engine {
    options: Options,
    search_paths: PathSet,
    ignore_paths: PathSet,
    valid_paths: PathSet,
    delete_paths: PathSet,
    decoder: Arc<dyn Decoder>,
    cache: ChunkedFileCache,
    recycle_bin: Arc<dyn RecycleBin>,
    history: UndoRedoEngine<EngineStage>,
    status: Arc<Status>,
}

impl Engine {
    pub fn new(options: Options) -> Self {
        Self::with_decoder(options, Arc::new(ImageDecoder::new()))
    }

    /// Construct with a caller-supplied decoder; tests use this to
    /// substitute a fixture decoder for real codecs.
    pub fn with_decoder(options: Options, decoder: Arc<dyn Decoder>) -> Self {
        let cache = ChunkedFileCache::new(options.advanced.reduced_image_size);
        let recycle_bin: Arc<dyn RecycleBin> = Arc::new(HiddenSiblingRecycleBin);
        let history = UndoRedoEngine::new(
            EngineStage::default(),
            options.advanced.undo_queue_size,
            Arc::clone(&recycle_bin),
        );
        Self {
            options,
            search_paths: PathSet::new(),
            ignore_paths: PathSet::new(),
            valid_paths: PathSet::new(),
            delete_paths: PathSet::new(),
            decoder,
            cache,
            recycle_bin,
            history,
            status: Arc::new(Status::new(0, 0)),
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut Options {
        &mut self.options
    }

    /// `path_get(kind)`.
    pub fn paths(&self, kind: PathKind) -> &PathSet {
        match kind {
            PathKind::Search => &self.search_paths,
            PathKind::Ignore => &self.ignore_paths,
            PathKind::Valid => &self.valid_paths,
            PathKind::Delete => &self.delete_paths,
        }
    }

    /// `path_set(kind)`.
    pub fn paths_mut(&mut self, kind: PathKind) -> &mut PathSet {
        match kind {
            PathKind::Search => &mut self.search_paths,
            PathKind::Ignore => &mut self.ignore_paths,
            PathKind::Valid => &mut self.valid_paths,
            PathKind::Delete => &mut self.delete_paths,
        }
    }

    /// A handle another thread can use to observe or cancel a running
    /// search; the engine keeps the same `Status` across runs.
    pub fn status(&self) -> Arc<Status> {
        Arc::clone(&self.status)
    }

    /// `stop()` is cooperative: workers exit at their next queue poll
    /// and the search loop stops feeding.
    pub fn stop(&self) {
        self.status.stop();
    }

    pub fn statistic_get(&self) -> Statistic {
        self.status.statistic_get()
    }

    /// The hint decision tree under the current options, built fresh
    /// for every stage rebuild.
    fn hint_setter(&self) -> HintSetter {
        HintSetter::new(self.options.compare.threshold, self.options.defect.blockiness_threshold)
    }

    pub fn status_get(&self, kind: ThreadKind, id: usize) -> Option<ThreadProgress> {
        self.status.status_get(kind, id)
    }

    /// `search()` without progress reporting.
    pub fn search(&mut self) -> Result<SearchSummary> {
        self.search_with_events(&crate::events::null_sender())
    }

    /// Drive one full pipeline run: scan the search roots, fill
    /// missing fingerprints through the collector pool, broadcast each
    /// completed fingerprint through the comparator pool, then group
    /// the findings and recompute hints. Replaces the live result
    /// stage and resets the undo history.
    pub fn search_with_events(&mut self, events: &EventSender) -> Result<SearchSummary> {
        let started = Instant::now();
        events.send(Event::Search(SearchEvent::Started));
        info!(roots = self.search_paths.roots().len(), "starting search");

        events.send(Event::Search(SearchEvent::PhaseChanged { phase: SearchPhase::Scanning }));
        let scanner = WalkDirScanner::new(self.options.search.clone());
        let scan = scanner.scan_with_events(self.search_paths.roots(), self.ignore_paths.roots(), events)?;
        let image_count = scan.files.len();
        debug!(files = image_count, errors = scan.errors.len(), "scan finished");

        let collector_count = self.options.advanced.resolved_collector_threads();
        let comparator_count = self
            .options
            .advanced
            .resolved_comparator_threads(image_count, self.options.compare.transformed_image);
        self.status.begin_run(collector_count, comparator_count);

        let collector = Arc::new(DataCollector::new(
            Arc::clone(&self.decoder),
            self.options.defect.clone(),
            self.options.advanced.clone(),
        ));
        let collector_pool = CollectorPool::spawn(collector_count, collector, Arc::clone(&self.status));

        let findings = Arc::new(SharedFindings::new(self.history.current().mistakes.clone()));
        let compare_options = self.options.compare.clone();
        let shard_options = compare_options.clone();
        let comparator_pool = ComparatorPool::spawn(
            comparator_count,
            move || select_strategy(&shard_options, image_count),
            compare_options,
            self.options.search.compare_inside_one_folder,
            Arc::clone(&findings),
            Arc::clone(&self.status),
        );
        set_priority(ThreadKind::Collector, Priority::BelowNormal);
        set_priority(ThreadKind::Comparator, Priority::Low);

        events.send(Event::Search(SearchEvent::PhaseChanged { phase: SearchPhase::Collecting }));
        events.send(Event::Fingerprint(FingerprintEvent::Started { total_files: image_count }));
        events.send(Event::Compare(CompareEvent::Started { total_files: image_count }));

        let check_defects = self.options.defect.check_on_defect;
        let mut cache_hit_paths: HashSet<PathBuf> = HashSet::new();
        let mut dispatched = 0usize;
        for info in &scan.files {
            if self.status.is_stopped() {
                break;
            }
            let data = match self.cache.get(info) {
                Some(mut hit) => {
                    hit.index = info.index;
                    hit.valid = self.valid_paths.contains(&info.path);
                    cache_hit_paths.insert(info.path.clone());
                    events.send(Event::Fingerprint(FingerprintEvent::CacheHit { path: info.path.clone() }));
                    hit
                }
                None => ImageData::from_file_info(info, self.valid_paths.contains(&info.path)),
            };
            if data.needs_fill(true) {
                collector_pool.dispatch(data, true, check_defects);
            } else {
                collector_pool.forward_direct(data);
            }
            dispatched += 1;
        }

        events.send(Event::Search(SearchEvent::PhaseChanged { phase: SearchPhase::Comparing }));
        for _ in 0..dispatched {
            let data = loop {
                match collector_pool.completed().recv_timeout(Duration::from_millis(50)) {
                    Ok(data) => break Some(data),
                    Err(_) if self.status.is_stopped() => break None,
                    Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break None,
                    Err(_) => continue,
                }
            };
            let Some(data) = data else { break };
            if !cache_hit_paths.contains(&data.path) {
                self.cache.put(data.clone());
            }
            events.send(Event::Fingerprint(FingerprintEvent::FileFingerprinted { path: data.path.clone() }));
            comparator_pool.dispatch(data);
        }

        collector_pool.shutdown();
        set_priority(ThreadKind::Comparator, Priority::Normal);
        comparator_pool.shutdown();

        events.send(Event::Search(SearchEvent::PhaseChanged { phase: SearchPhase::Grouping }));
        let store = std::mem::take(&mut *findings.results.lock().unwrap());
        let mistakes = self.history.current().mistakes.clone();
        let stage = EngineStage::rebuild(
            store.into_results(),
            mistakes,
            &self.hint_setter(),
            &self.delete_paths,
            0,
        );

        let statistic = self.status.statistic_get();
        let summary = SearchSummary {
            total_files: image_count,
            duplicate_groups: stage.groups.iter().filter(|g| g.images.len() > 1).count(),
            duplicate_count: statistic.duplicates_found as usize,
            defect_count: statistic.defects_found as usize,
            duration_ms: started.elapsed().as_millis() as u64,
        };
        events.send(Event::Compare(CompareEvent::Completed {
            total_groups: stage.groups.len(),
            total_duplicates: summary.duplicate_count,
            total_defects: summary.defect_count,
        }));

        self.history = UndoRedoEngine::new(
            stage,
            self.options.advanced.undo_queue_size,
            Arc::clone(&self.recycle_bin),
        );

        if self.status.is_stopped() {
            events.send(Event::Search(SearchEvent::Stopped));
        } else {
            events.send(Event::Search(SearchEvent::Completed { summary: summary.clone() }));
        }
        info!(
            files = summary.total_files,
            duplicates = summary.duplicate_count,
            defects = summary.defect_count,
            ms = summary.duration_ms,
            "search finished"
        );
        Ok(summary)
    }

    pub fn results(&self) -> &[MatchOutcome] {
        &self.history.current().results
    }

    /// `result_get(start, n)`.
    pub fn result_get(&self, start: usize, n: usize) -> &[MatchOutcome] {
        let results = self.results();
        let start = start.min(results.len());
        let end = start.saturating_add(n).min(results.len());
        &results[start..end]
    }

    pub fn groups(&self) -> &[ImageGroup] {
        &self.history.current().groups
    }

    /// `group_get`.
    pub fn group_get(&self, id: u32) -> Option<&ImageGroup> {
        self.groups().iter().find(|g| g.id == id)
    }

    /// `image_info_get(group_id, start, n)`.
    pub fn image_info_get(&self, group_id: u32, start: usize, n: usize) -> Result<Vec<Arc<ImageInfo>>> {
        let group = self.group_get(group_id).ok_or(EngineError::InvalidGroupId(group_id))?;
        if start > group.images.len() {
            return Err(EngineError::InvalidIndex(start));
        }
        let end = start.saturating_add(n).min(group.images.len());
        Ok(group.images[start..end].to_vec())
    }

    /// `image_info_selection_set`.
    pub fn selection_set(&mut self, group_id: u32, index: usize, selected: bool) -> Result<()> {
        let group = self.group_get(group_id).ok_or(EngineError::InvalidGroupId(group_id))?;
        let image = group.images.get(index).ok_or(EngineError::InvalidIndex(index))?;
        image.set_selected(selected);
        Ok(())
    }

    /// `image_info_selection_get`.
    pub fn selection_get(&self, group_id: u32, index: usize) -> Result<bool> {
        let group = self.group_get(group_id).ok_or(EngineError::InvalidGroupId(group_id))?;
        let image = group.images.get(index).ok_or(EngineError::InvalidIndex(index))?;
        Ok(image.is_selected())
    }

    pub fn current_index(&self) -> usize {
        self.history.current().current
    }

    pub fn set_current(&mut self, index: usize) -> Result<()> {
        if index >= self.results().len() {
            return Err(EngineError::InvalidIndex(index));
        }
        self.history.current_mut().current = index;
        Ok(())
    }

    pub fn current_result(&self) -> Option<&MatchOutcome> {
        let stage = self.history.current();
        stage.results.get(stage.current)
    }

    pub fn undo(&mut self) -> Result<()> {
        self.history.undo().map_err(EngineError::from)?;
        self.refresh_removed_flags();
        Ok(())
    }

    pub fn redo(&mut self) -> Result<()> {
        self.history.redo().map_err(EngineError::from)?;
        self.refresh_removed_flags();
        Ok(())
    }

    /// After an undo/redo replays its filesystem inverses, the shared
    /// `removed` flags have to be re-derived from what is actually on
    /// disk, because the restored stage may reference images a later stage had
    /// marked removed.
    fn refresh_removed_flags(&self) {
        for result in &self.history.current().results {
            match result {
                MatchOutcome::Duplicate { first, second, .. } => {
                    first.set_removed(!first.path.exists());
                    second.set_removed(!second.path.exists());
                }
                MatchOutcome::Defect { image, .. } => {
                    image.set_removed(!image.path.exists());
                }
            }
        }
    }

    /// `load(kind, path)`. For `Results` the loaded list replaces the
    /// live stage (and clears undo history, exactly as a fresh search
    /// does); for `Mistakes` the loaded store replaces the current one;
    /// for `ImageData` the chunk set under the directory is merged into
    /// the in-memory cache.
    pub fn load(&mut self, kind: StateKind, path: &Path) -> Result<()> {
        match kind {
            StateKind::Results => {
                let results = crate::core::comparator::load_results(path)?;
                let stage = EngineStage::rebuild(
                    results,
                    self.history.current().mistakes.clone(),
                    &self.hint_setter(),
                    &self.delete_paths,
                    0,
                );
                self.history = UndoRedoEngine::new(
                    stage,
                    self.options.advanced.undo_queue_size,
                    Arc::clone(&self.recycle_bin),
                );
            }
            StateKind::Mistakes => {
                self.history.current_mut().mistakes = MistakeStore::load(path)?;
            }
            StateKind::ImageData => {
                self.cache.load(path)?;
            }
        }
        Ok(())
    }

    /// `save(kind, path)`.
    pub fn save(&mut self, kind: StateKind, path: &Path) -> Result<()> {
        match kind {
            StateKind::Results => {
                crate::core::comparator::save_results(path, &self.history.current().results)?;
            }
            StateKind::Mistakes => {
                self.history.current().mistakes.save(path)?;
            }
            StateKind::ImageData => {
                self.cache.save(path)?;
            }
        }
        Ok(())
    }

    /// `ClearDatabase(path)`: load whatever the directory still holds,
    /// delete every chunk file, and reindex from the in-memory store.
    pub fn clear_database(&mut self, dir: &Path) -> Result<()> {
        self.cache.clear_database(dir).map_err(EngineError::from)
    }

    pub fn cached_fingerprints(&self) -> usize {
        self.cache.len()
    }

    /// `load_bitmap(path, out_buffer)`: decode `path` to grayscale
    /// into a caller-owned buffer, returning the dimensions.
    pub fn load_bitmap(&self, path: &Path, out: &mut [u8]) -> Result<(u32, u32)> {
        let bytes = read_file_bytes(path)
            .map_err(|e| FingerprintError::Io { path: path.to_path_buf(), source: e })?;
        let image_type = path
            .extension()
            .and_then(|e| e.to_str())
            .map(ImageType::from_extension)
            .unwrap_or(ImageType::Undefined);
        let decoded = self
            .decoder
            .decode(&bytes, image_type)
            .ok_or_else(|| FingerprintError::DecodeFailed {
                path: path.to_path_buf(),
                reason: "unsupported or corrupt bitmap".to_string(),
            })?;
        let needed = (decoded.width as usize) * (decoded.height as usize);
        if out.len() < needed {
            return Err(FingerprintError::BufferTooSmall { needed, available: out.len() }.into());
        }
        out[..needed].copy_from_slice(decoded.gray.as_raw());
        Ok((decoded.width, decoded.height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::DecodedImage;
    use image::{GrayImage, Luma};

    pub(super) struct FixtureDecoder;

    impl Decoder for FixtureDecoder {
        fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage> {
            if bytes.is_empty() {
                return None;
            }
            // Brightness is the first byte, so fixtures control the
            // fingerprint by their file contents.
            let gray = GrayImage::from_pixel(32, 32, Luma([bytes[0]]));
            Some(DecodedImage { width: 32, height: 32, gray, image_type })
        }
    }

    pub(super) fn engine_for(dir: &Path) -> Engine {
        let mut options = Options::default();
        options.compare.transformed_image = false;
        options.defect.check_on_defect = false;
        options.advanced.collector_threads = Some(2);
        options.advanced.comparator_threads = Some(2);
        let mut engine = Engine::with_decoder(options, Arc::new(FixtureDecoder));
        engine.paths_mut(PathKind::Search).add(dir);
        engine
    }

    pub(super) fn write_fixture(dir: &Path, name: &str, fill: u8) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, [fill, 1, 2, 3]).unwrap();
        path
    }

    #[test]
    fn search_finds_a_duplicate_pair() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);
        write_fixture(dir.path(), "b.jpg", 100);
        write_fixture(dir.path(), "other.jpg", 220);

        let mut engine = engine_for(dir.path());
        // Same root, so pairs inside it are only found with the option on.
        engine.options_mut().search.compare_inside_one_folder = true;
        let summary = engine.search().unwrap();

        assert_eq!(summary.total_files, 3);
        assert_eq!(engine.results().len(), 1);
        assert_eq!(engine.groups().len(), 1);
        assert_eq!(engine.groups()[0].images.len(), 2);
    }

    #[test]
    fn same_root_pairs_are_skipped_unless_enabled() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);
        write_fixture(dir.path(), "b.jpg", 100);

        let mut engine = engine_for(dir.path());
        engine.search().unwrap();
        assert!(engine.results().is_empty());
    }

    #[test]
    fn rescan_hits_the_fingerprint_cache() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);
        write_fixture(dir.path(), "b.jpg", 100);

        let mut engine = engine_for(dir.path());
        engine.options_mut().search.compare_inside_one_folder = true;
        engine.search().unwrap();
        assert_eq!(engine.cached_fingerprints(), 2);

        // Second run resolves everything from the cache and still
        // produces the same result set.
        engine.search().unwrap();
        assert_eq!(engine.results().len(), 1);
    }

    #[test]
    fn image_db_round_trips_through_disk() {
        let photos = tempfile::tempdir().unwrap();
        let db = tempfile::tempdir().unwrap();
        write_fixture(photos.path(), "a.jpg", 10);

        let mut engine = engine_for(photos.path());
        engine.search().unwrap();
        engine.save(StateKind::ImageData, db.path()).unwrap();

        let mut fresh = engine_for(photos.path());
        fresh.load(StateKind::ImageData, db.path()).unwrap();
        assert_eq!(fresh.cached_fingerprints(), 1);
    }

    #[test]
    fn results_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);
        write_fixture(dir.path(), "b.jpg", 100);

        let mut engine = engine_for(dir.path());
        engine.options_mut().search.compare_inside_one_folder = true;
        engine.search().unwrap();

        let file = dir.path().join("results.adr");
        engine.save(StateKind::Results, &file).unwrap();

        let mut fresh = engine_for(dir.path());
        fresh.load(StateKind::Results, &file).unwrap();
        assert_eq!(fresh.results().len(), 1);
        assert_eq!(fresh.groups().len(), 1);
    }

    #[test]
    fn mistaken_pair_never_comes_back() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);
        write_fixture(dir.path(), "b.jpg", 100);

        let mut engine = engine_for(dir.path());
        engine.options_mut().search.compare_inside_one_folder = true;
        engine.search().unwrap();
        assert_eq!(engine.results().len(), 1);

        engine.apply_to(ResultAction::Mistake, ResultTarget::Current).unwrap();
        assert!(engine.results().is_empty());

        engine.search().unwrap();
        assert!(engine.results().is_empty());
    }

    #[test]
    fn stop_before_search_yields_an_empty_run() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "a.jpg", 100);

        let mut engine = engine_for(dir.path());
        // begin_run clears a stale stop flag, so stopping must happen
        // through the handle while the run is live; a pre-set flag is
        // expected NOT to survive.
        engine.stop();
        let summary = engine.search().unwrap();
        assert_eq!(summary.total_files, 1);
    }

    #[test]
    fn load_bitmap_reports_buffer_too_small() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_fixture(dir.path(), "a.jpg", 100);
        let engine = engine_for(dir.path());

        let mut tiny = [0u8; 4];
        let err = engine.load_bitmap(&path, &mut tiny).unwrap_err();
        assert!(matches!(err, EngineError::Fingerprint(FingerprintError::BufferTooSmall { .. })));

        let mut big = vec![0u8; 32 * 32];
        assert_eq!(engine.load_bitmap(&path, &mut big).unwrap(), (32, 32));
        assert_eq!(big[0], 100);
    }
}
