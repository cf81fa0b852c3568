//! File filtering logic for the scanner: extension and attribute gating.

use super::ImageFormat;
use crate::core::options::SearchOptions;
use std::path::Path;

/// Filters files to determine if they are supported images, per the
/// active `SearchOptions`.
pub struct ImageFilter {
    extensions: std::collections::HashSet<String>,
    include_hidden: bool,
    include_system: bool,
}

impl ImageFilter {
    pub fn new() -> Self {
        Self {
            extensions: SearchOptions::default().extensions.into_iter().collect(),
            include_hidden: false,
            include_system: false,
        }
    }

    pub fn from_options(options: &SearchOptions) -> Self {
        Self {
            extensions: options.extensions.iter().cloned().collect(),
            include_hidden: options.include_hidden,
            include_system: options.include_system,
        }
    }

    pub fn with_hidden(mut self, include: bool) -> Self {
        self.include_hidden = include;
        self
    }

    pub fn with_extensions(mut self, extensions: Vec<String>) -> Self {
        self.extensions = extensions.into_iter().collect();
        self
    }

    /// A path has the "hidden" attribute gated off by the scanner if its
    /// file name starts with `.` (the closest cross-platform proxy for
    /// Windows' `FILE_ATTRIBUTE_HIDDEN`).
    fn is_hidden(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with('.'))
            .unwrap_or(false)
    }

    /// System-attribute proxy: none exists on non-Windows filesystems, so
    /// this always reports false; kept as a seam for a platform adapter.
    fn is_system(_path: &Path) -> bool {
        false
    }

    pub fn should_include(&self, path: &Path) -> bool {
        if !self.include_hidden && Self::is_hidden(path) {
            return false;
        }
        if !self.include_system && Self::is_system(path) {
            return false;
        }
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) => self.extensions.contains(&ext.to_lowercase()),
            None => false,
        }
    }

    pub fn get_format(&self, path: &Path) -> ImageFormat {
        path.extension()
            .and_then(|e| e.to_str())
            .map(ImageFormat::from_extension)
            .unwrap_or(ImageFormat::Unknown)
    }
}

impl Default for ImageFilter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_includes_jpeg() {
        let filter = ImageFilter::new();
        assert!(filter.should_include(Path::new("/photos/image.jpg")));
        assert!(filter.should_include(Path::new("/photos/image.JPEG")));
    }

    #[test]
    fn filter_excludes_non_images() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/photos/document.pdf")));
        assert!(!filter.should_include(Path::new("/photos/video.mp4")));
    }

    #[test]
    fn filter_excludes_hidden_by_default() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/photos/.hidden.jpg")));
    }

    #[test]
    fn filter_can_include_hidden() {
        let filter = ImageFilter::new().with_hidden(true);
        assert!(filter.should_include(Path::new("/photos/.hidden.jpg")));
    }

    #[test]
    fn filter_handles_no_extension() {
        let filter = ImageFilter::new();
        assert!(!filter.should_include(Path::new("/photos/no_extension")));
    }
}
