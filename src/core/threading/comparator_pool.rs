//! Comparator worker pool: each worker owns an independent strategy
//! shard (its own partition of the previously-seen fingerprints).
//! Every completed fingerprint is broadcast to all shards so none
//! miss a candidate; exactly one worker, chosen round robin, is the
//! designated owner and inserts it into its own shard afterward,
//! keeping shard sizes roughly balanced. Per-queue FIFO guarantees a
//! fingerprint's insert is processed after every compare job that was
//! broadcast before it, so no shard can miss a pair.

use super::status::Status;
use super::ThreadKind;
use crate::core::comparator::{ComparatorStrategy, ImageInfo, ResultStore};
use crate::core::fingerprint::{Defect, ImageData};
use crate::core::mistake::MistakeStore;
use crate::core::options::{CompareOptions, DEFAULT_THREAD_SLEEP_INTERVAL_MS};
use crossbeam_channel::{RecvTimeoutError, Sender};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct ComparatorJob {
    data: Arc<ImageData>,
    is_owner: bool,
}

/// Everything the comparator pool publishes to: the accumulated
/// duplicate/defect findings, the suppression set consulted before
/// accepting one, and the `path -> ImageInfo` registry that keeps
/// every worker's `MatchOutcome`s referencing the same bookkeeping
/// instance for a given path.
pub struct SharedFindings {
    pub results: Mutex<ResultStore>,
    pub mistakes: Mutex<MistakeStore>,
    image_infos: Mutex<HashMap<PathBuf, Arc<ImageInfo>>>,
}

impl SharedFindings {
    pub fn new(mistakes: MistakeStore) -> Self {
        Self { results: Mutex::new(ResultStore::new()), mistakes: Mutex::new(mistakes), image_infos: Mutex::new(HashMap::new()) }
    }

    fn image_info_for(&self, data: &ImageData) -> Arc<ImageInfo> {
        self.image_infos.lock().unwrap().entry(data.path.clone()).or_insert_with(|| ImageInfo::from_data(data)).clone()
    }
}

/// Producer-facing handle to a running comparator pool.
pub struct ComparatorPool {
    senders: Vec<Sender<ComparatorJob>>,
    handles: Vec<JoinHandle<()>>,
    next_owner: AtomicUsize,
}

impl ComparatorPool {
    pub fn spawn(
        worker_count: usize,
        make_shard: impl Fn() -> Box<dyn ComparatorStrategy + Send> + Send + Sync + 'static,
        options: CompareOptions,
        compare_inside_one_folder: bool,
        findings: Arc<SharedFindings>,
        status: Arc<Status>,
    ) -> Self {
        let worker_count = worker_count.max(1);
        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let (tx, rx) = crossbeam_channel::unbounded::<ComparatorJob>();
            let mut shard = make_shard();
            let findings = Arc::clone(&findings);
            let status = Arc::clone(&status);
            let options = options.clone();
            let handle = thread::spawn(move || loop {
                match rx.recv_timeout(Duration::from_millis(DEFAULT_THREAD_SLEEP_INTERVAL_MS)) {
                    Ok(job) => {
                        if status.is_stopped() {
                            break;
                        }
                        status.set_progress(ThreadKind::Comparator, id, &job.data.path);
                        process_job(shard.as_mut(), &job, &options, compare_inside_one_folder, &findings, &status);
                    }
                    Err(RecvTimeoutError::Timeout) => {
                        if status.is_stopped() {
                            break;
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            });
            senders.push(tx);
            handles.push(handle);
        }

        Self { senders, handles, next_owner: AtomicUsize::new(0) }
    }

    /// Broadcast one completed fingerprint to every shard.
    pub fn dispatch(&self, data: ImageData) {
        let data = Arc::new(data);
        let owner = self.next_owner.fetch_add(1, Ordering::Relaxed) % self.senders.len();
        for (id, sender) in self.senders.iter().enumerate() {
            let job = ComparatorJob { data: Arc::clone(&data), is_owner: id == owner };
            let _ = sender.send(job);
        }
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    pub fn shutdown(self) {
        drop(self.senders);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn process_job(
    shard: &mut dyn ComparatorStrategy,
    job: &ComparatorJob,
    options: &CompareOptions,
    compare_inside_one_folder: bool,
    findings: &SharedFindings,
    status: &Status,
) {
    let data = &job.data;
    let new_info = findings.image_info_for(data);

    for candidate in shard.candidates(data, options, compare_inside_one_folder) {
        let other_info = findings.image_info_for(candidate.other);
        let suppressed = findings.mistakes.lock().unwrap().contains_pair(&new_info.path, &other_info.path);
        if suppressed {
            continue;
        }
        let accepted = findings.results.lock().unwrap().add_duplicate(
            new_info.clone(),
            other_info,
            candidate.difference,
            candidate.transform,
            |_, _| false,
        );
        if accepted {
            status.record_duplicate();
        }
    }

    if !job.is_owner {
        return;
    }

    if data.defect != Defect::None && !data.valid {
        let suppressed = findings.mistakes.lock().unwrap().contains_single(&data.path);
        if !suppressed {
            let accepted = findings.results.lock().unwrap().add_defect(new_info.clone(), data.defect, |_| false);
            if accepted {
                status.record_defect();
            }
        }
    }

    shard.insert((**data).clone());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::comparator::Strategy0D;
    use crate::core::fingerprint::{GrayView, Pyramid};
    use crate::core::scanner::FileInfo;
    use std::time::SystemTime;

    fn image(path: &str, index: usize, fill: u8) -> ImageData {
        let info = FileInfo::new(PathBuf::from(path), 100, SystemTime::UNIX_EPOCH, index);
        let mut data = ImageData::from_file_info(&info, false);
        data.pixel_data = Pyramid::build(GrayView::new(256, vec![fill; 256 * 256]), 16);
        data.crc32 = fill as u32;
        data
    }

    fn spawn_pool(worker_count: usize) -> (ComparatorPool, Arc<SharedFindings>, Arc<Status>) {
        let findings = Arc::new(SharedFindings::new(MistakeStore::new()));
        let status = Arc::new(Status::new(0, worker_count));
        let pool = ComparatorPool::spawn(
            worker_count,
            || Box::new(Strategy0D::default()),
            CompareOptions::default(),
            true,
            Arc::clone(&findings),
            Arc::clone(&status),
        );
        (pool, findings, status)
    }

    fn drain_until(findings: &SharedFindings, count: usize) {
        for _ in 0..200 {
            if findings.results.lock().unwrap().len() >= count {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn near_identical_images_are_matched_across_a_broadcast() {
        let (pool, findings, _status) = spawn_pool(3);
        pool.dispatch(image("/a.jpg", 0, 50));
        pool.dispatch(image("/b.jpg", 1, 50));
        drain_until(&findings, 1);
        pool.shutdown();
        assert_eq!(findings.results.lock().unwrap().len(), 1);
    }

    #[test]
    fn matched_pair_shares_the_same_image_info_identity() {
        let (pool, findings, _status) = spawn_pool(2);
        pool.dispatch(image("/a.jpg", 0, 10));
        pool.dispatch(image("/b.jpg", 1, 10));
        drain_until(&findings, 1);
        pool.shutdown();

        let results = findings.results.lock().unwrap();
        match &results.results()[0] {
            crate::core::comparator::MatchOutcome::Duplicate { first, second, .. } => {
                assert_eq!(first.links(), 1);
                assert_eq!(second.links(), 1);
            }
            _ => panic!("expected a duplicate outcome"),
        }
    }

    #[test]
    fn defects_are_reported_exactly_once_per_image() {
        let (pool, findings, _status) = spawn_pool(4);
        let mut defective = image("/broken.jpg", 0, 7);
        defective.defect = Defect::Blurring;
        pool.dispatch(defective);
        drain_until(&findings, 1);
        pool.shutdown();
        assert_eq!(findings.results.lock().unwrap().len(), 1);
    }
}
