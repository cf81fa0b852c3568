//! Scanning options: which roots to walk and which files qualify.

/// Options controlling directory traversal and file discovery.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchOptions {
    /// Recurse into subdirectories of each search root.
    pub subfolders: bool,
    /// Accept files with the `hidden` attribute set.
    pub include_hidden: bool,
    /// Accept files with the `system` attribute set.
    pub include_system: bool,
    /// File extensions (lowercase, no dot) accepted as images.
    pub extensions: Vec<String>,
    /// Compare results only within the same search root.
    pub compare_inside_one_folder: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            subfolders: true,
            include_hidden: false,
            include_system: false,
            extensions: vec![
                "jpg".into(),
                "jpeg".into(),
                "png".into(),
                "bmp".into(),
                "gif".into(),
                "tiff".into(),
                "tif".into(),
                "webp".into(),
            ],
            compare_inside_one_folder: false,
        }
    }
}
