//! Defect-detection options: which checks run and at what thresholds.

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DefectOptions {
    /// Scan JPEG/JP2 payloads for a missing end-of-image marker.
    pub check_on_defect: bool,
    /// Compute the blockiness score and raise a defect above this threshold.
    pub check_blockiness: bool,
    pub blockiness_threshold: f64,
    /// Compute the blurring radius and raise a defect above this threshold.
    pub check_blurring: bool,
    pub blurring_threshold: f64,
    /// Skip defect checks for images below/above these pixel counts.
    pub min_size: u64,
    pub max_size: u64,
}

impl Default for DefectOptions {
    fn default() -> Self {
        Self {
            check_on_defect: true,
            check_blockiness: true,
            blockiness_threshold: 0.5,
            check_blurring: true,
            blurring_threshold: 3.0,
            min_size: 16,
            max_size: u64::MAX,
        }
    }
}
