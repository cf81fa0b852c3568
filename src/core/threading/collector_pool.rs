//! Collector worker pool: each worker owns a bounded queue and runs
//! `DataCollector::fill` on whatever the main thread pushes to it.
//! Queues are per-worker rather than a single shared channel so the
//! dispatcher can steer work to the least-loaded worker and stall
//! when every queue is full.

use super::status::Status;
use super::ThreadKind;
use crate::core::fingerprint::{DataCollector, ImageData};
use crate::core::options::{COLLECT_THREAD_QUEUE_SIZE_MAX, DEFAULT_THREAD_SLEEP_INTERVAL_MS};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

struct CollectorJob {
    data: ImageData,
    need_pixels: bool,
    check_defects: bool,
}

/// Producer-facing handle to a running collector pool. The main
/// thread calls `dispatch` (or `forward_direct` when nothing needs
/// filling) for every scanned file, then drains `completed` to feed
/// the comparator pool.
pub struct CollectorPool {
    senders: Vec<Sender<CollectorJob>>,
    completed_tx: Sender<ImageData>,
    completed_rx: Receiver<ImageData>,
    handles: Vec<JoinHandle<()>>,
}

impl CollectorPool {
    pub fn spawn<D>(worker_count: usize, collector: Arc<DataCollector<D>>, status: Arc<Status>) -> Self
    where
        D: crate::core::fingerprint::Decoder + 'static,
    {
        let worker_count = worker_count.max(1);
        let (completed_tx, completed_rx) = crossbeam_channel::unbounded();
        let mut senders = Vec::with_capacity(worker_count);
        let mut handles = Vec::with_capacity(worker_count);

        for id in 0..worker_count {
            let (tx, rx) = crossbeam_channel::bounded::<CollectorJob>(COLLECT_THREAD_QUEUE_SIZE_MAX);
            let collector = Arc::clone(&collector);
            let status = Arc::clone(&status);
            let completed_tx = completed_tx.clone();
            let handle = thread::spawn(move || collector_loop(id, rx, collector, status, completed_tx));
            senders.push(tx);
            handles.push(handle);
        }

        Self { senders, completed_tx, completed_rx, handles }
    }

    /// Pick the shortest worker queue and push a fill job onto it,
    /// busy-waiting if every worker is at `COLLECT_THREAD_QUEUE_SIZE_MAX`.
    pub fn dispatch(&self, data: ImageData, need_pixels: bool, check_defects: bool) {
        let job = CollectorJob { data, need_pixels, check_defects };
        loop {
            let shortest = self
                .senders
                .iter()
                .enumerate()
                .map(|(i, s)| (i, s.len()))
                .filter(|&(_, len)| len < COLLECT_THREAD_QUEUE_SIZE_MAX)
                .min_by_key(|&(_, len)| len);

            if let Some((id, _)) = shortest {
                let _ = self.senders[id].send(job);
                return;
            }
            thread::sleep(Duration::from_millis(DEFAULT_THREAD_SLEEP_INTERVAL_MS));
        }
    }

    /// Skip the collector workers entirely: the fingerprint already
    /// has everything it needs (cache hit), so just forward it onto
    /// the completed queue the comparator pool reads from.
    pub fn forward_direct(&self, data: ImageData) {
        let _ = self.completed_tx.send(data);
    }

    pub fn completed(&self) -> &Receiver<ImageData> {
        &self.completed_rx
    }

    pub fn worker_count(&self) -> usize {
        self.senders.len()
    }

    /// Close every worker's queue and join all threads. Any jobs still
    /// in flight when this is called are simply dropped.
    pub fn shutdown(self) {
        drop(self.senders);
        drop(self.completed_tx);
        for handle in self.handles {
            let _ = handle.join();
        }
    }
}

fn collector_loop<D: crate::core::fingerprint::Decoder>(
    id: usize,
    rx: Receiver<CollectorJob>,
    collector: Arc<DataCollector<D>>,
    status: Arc<Status>,
    completed_tx: Sender<ImageData>,
) {
    loop {
        match rx.recv_timeout(Duration::from_millis(DEFAULT_THREAD_SLEEP_INTERVAL_MS)) {
            Ok(mut job) => {
                if status.is_stopped() {
                    break;
                }
                status.set_progress(ThreadKind::Collector, id, &job.data.path);
                let _ = collector.fill(&mut job.data, job.need_pixels, job.check_defects);
                status.record_fingerprinted();
                let _ = completed_tx.send(job.data);
            }
            Err(RecvTimeoutError::Timeout) => {
                if status.is_stopped() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::{Decoder, DecodedImage, ImageType};
    use crate::core::options::{AdvancedOptions, DefectOptions};
    use crate::core::scanner::FileInfo;

    struct FixtureDecoder;
    impl Decoder for FixtureDecoder {
        fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage> {
            if bytes.is_empty() {
                return None;
            }
            let gray = image::GrayImage::from_pixel(64, 64, image::Luma([10]));
            Some(DecodedImage { width: 64, height: 64, gray, image_type })
        }
    }

    fn fixture_data(dir: &tempfile::TempDir, name: &str, index: usize) -> ImageData {
        let path = dir.path().join(name);
        std::fs::write(&path, b"pixels").unwrap();
        let metadata = std::fs::metadata(&path).unwrap();
        let info = FileInfo::new(path, metadata.len(), metadata.modified().unwrap(), index);
        ImageData::from_file_info(&info, false)
    }

    #[test]
    fn dispatched_jobs_come_back_filled_on_the_completed_queue() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(DataCollector::new(FixtureDecoder, DefectOptions::default(), AdvancedOptions::default()));
        let status = Arc::new(Status::new(2, 0));
        let pool = CollectorPool::spawn(2, collector, status);

        for i in 0..5 {
            pool.dispatch(fixture_data(&dir, &format!("{i}.jpg"), i), true, false);
        }

        let mut seen = 0;
        for _ in 0..5 {
            let data = pool.completed().recv_timeout(Duration::from_secs(5)).unwrap();
            assert_ne!(data.crc32, 0);
            seen += 1;
        }
        assert_eq!(seen, 5);
        pool.shutdown();
    }

    #[test]
    fn forward_direct_bypasses_the_workers() {
        let dir = tempfile::tempdir().unwrap();
        let collector = Arc::new(DataCollector::new(FixtureDecoder, DefectOptions::default(), AdvancedOptions::default()));
        let status = Arc::new(Status::new(1, 0));
        let pool = CollectorPool::spawn(1, collector, status);

        let mut cached = fixture_data(&dir, "cached.jpg", 0);
        cached.crc32 = 42;
        pool.forward_direct(cached);

        let data = pool.completed().recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(data.crc32, 42);
        pool.shutdown();
    }

    #[test]
    fn stopping_lets_worker_threads_exit_cleanly() {
        let collector = Arc::new(DataCollector::new(FixtureDecoder, DefectOptions::default(), AdvancedOptions::default()));
        let status = Arc::new(Status::new(1, 0));
        let pool = CollectorPool::spawn(1, collector, Arc::clone(&status));
        status.stop();
        pool.shutdown();
    }
}
