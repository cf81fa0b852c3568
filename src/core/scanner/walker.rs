//! Directory walking implementation using walkdir.

use super::{filter::ImageFilter, FileInfo, FileScanner, ScanResult};
use crate::core::options::SearchOptions;
use crate::error::ScanError;
use crate::events::{Event, EventSender, ScanEvent, ScanProgress};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Scanner implementation built on the `walkdir` crate.
pub struct WalkDirScanner {
    options: SearchOptions,
    filter: ImageFilter,
}

impl WalkDirScanner {
    pub fn new(options: SearchOptions) -> Self {
        let filter = ImageFilter::from_options(&options);
        Self { options, filter }
    }

    fn is_ignored(path: &Path, ignore_roots: &[PathBuf]) -> bool {
        ignore_roots.iter().any(|root| path.starts_with(root))
    }

    fn scan_root(
        &self,
        root: &PathBuf,
        index: usize,
        ignore_roots: &[PathBuf],
        events: Option<&EventSender>,
        files_so_far: &mut usize,
    ) -> Result<(Vec<FileInfo>, Vec<ScanError>), ScanError> {
        if !root.exists() {
            return Err(ScanError::DirectoryNotFound { path: root.clone() });
        }
        if !root.is_dir() {
            return Err(ScanError::DirectoryNotFound { path: root.clone() });
        }

        let mut files = Vec::new();
        let mut errors = Vec::new();
        let mut directories_scanned = 0;

        let mut walker = WalkDir::new(root).follow_links(false);
        if !self.options.subfolders {
            walker = walker.max_depth(1);
        }

        for entry_result in walker {
            match entry_result {
                Ok(entry) => {
                    let path = entry.path();

                    if Self::is_ignored(path, ignore_roots) {
                        continue;
                    }

                    if path.is_dir() {
                        directories_scanned += 1;
                        if let Some(sender) = events {
                            sender.send(Event::Scan(ScanEvent::Progress(ScanProgress {
                                directories_scanned,
                                files_found: *files_so_far + files.len(),
                                current_path: path.to_path_buf(),
                            })));
                        }
                        continue;
                    }

                    if !self.filter.should_include(path) {
                        continue;
                    }

                    match fs::metadata(path) {
                        Ok(metadata) => {
                            let info = FileInfo::new(
                                path.to_path_buf(),
                                metadata.len(),
                                metadata.modified().unwrap_or(std::time::SystemTime::UNIX_EPOCH),
                                index,
                            );

                            if let Some(sender) = events {
                                sender.send(Event::Scan(ScanEvent::FileFound { path: info.path.clone() }));
                            }

                            files.push(info);
                        }
                        Err(e) => {
                            let error = ScanError::ReadDirectory { path: path.to_path_buf(), source: e };
                            if let Some(sender) = events {
                                sender.send(Event::Scan(ScanEvent::Error {
                                    path: path.to_path_buf(),
                                    message: error.to_string(),
                                }));
                            }
                            errors.push(error);
                        }
                    }
                }
                Err(e) => {
                    let path = e.path().map(|p| p.to_path_buf()).unwrap_or_default();
                    let error = if e.io_error().map(|e| e.kind()) == Some(std::io::ErrorKind::PermissionDenied) {
                        ScanError::PermissionDenied { path: path.clone() }
                    } else {
                        ScanError::ReadDirectory {
                            path: path.clone(),
                            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
                        }
                    };
                    if let Some(sender) = events {
                        sender.send(Event::Scan(ScanEvent::Error { path, message: error.to_string() }));
                    }
                    errors.push(error);
                }
            }
        }

        *files_so_far += files.len();
        Ok((files, errors))
    }
}

impl FileScanner for WalkDirScanner {
    fn scan(&self, search_roots: &[PathBuf], ignore_roots: &[PathBuf]) -> Result<ScanResult, ScanError> {
        self.scan_with_events(search_roots, ignore_roots, &crate::events::null_sender())
    }

    fn scan_with_events(
        &self,
        search_roots: &[PathBuf],
        ignore_roots: &[PathBuf],
        events: &EventSender,
    ) -> Result<ScanResult, ScanError> {
        events.send(Event::Scan(ScanEvent::Started { paths: search_roots.to_vec() }));

        let mut all_files = Vec::new();
        let mut all_errors = Vec::new();
        let mut files_so_far = 0usize;

        for (index, root) in search_roots.iter().enumerate() {
            match self.scan_root(root, index, ignore_roots, Some(events), &mut files_so_far) {
                Ok((files, errors)) => {
                    all_files.extend(files);
                    all_errors.extend(errors);
                }
                Err(e) => all_errors.push(e),
            }
        }

        events.send(Event::Scan(ScanEvent::Completed { total_files: all_files.len() }));

        Ok(ScanResult { files: all_files, errors: all_errors })
    }
}
