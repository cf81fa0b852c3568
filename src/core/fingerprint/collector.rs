//! `DataCollector::fill`: the per-file fingerprinting operation each
//! collector-pool worker runs (see `core::threading`).

use super::bytes::read_file_bytes;
use super::decode::Decoder;
use super::pyramid::{GrayView, Pyramid};
use super::{ratio_bucket, Defect, ImageData, ImageType, CRC32_UNREADABLE};
use crate::core::options::{AdvancedOptions, DefectOptions};
use crate::core::quality::{blockiness, blurring, jpeg_marker};
use crate::error::FingerprintError;
use std::path::Path;

const RENDER_SIDE: u32 = 256;

/// Computes CRC, decodes, downsamples to the pyramid, and classifies
/// defects for one `ImageData` at a time. Stateless aside from its
/// configuration; safe to share across collector workers.
pub struct DataCollector<D: Decoder> {
    decoder: D,
    defect: DefectOptions,
    advanced: AdvancedOptions,
}

impl<D: Decoder> DataCollector<D> {
    pub fn new(decoder: D, defect: DefectOptions, advanced: AdvancedOptions) -> Self {
        Self { decoder, defect, advanced }
    }

    /// CRC, decode, pyramid, defect classification, in that order.
    /// `need_pixels` gates decoding and pyramid construction (skipped
    /// when the file was already cached); `check_defects` gates defect
    /// classification.
    pub fn fill(
        &self,
        data: &mut ImageData,
        need_pixels: bool,
        check_defects: bool,
    ) -> Result<(), FingerprintError> {
        if !data.needs_fill(need_pixels) {
            return Ok(());
        }

        let bytes = match read_file_bytes(&data.path) {
            Ok(bytes) => bytes,
            Err(_) => {
                data.crc32 = CRC32_UNREADABLE;
                data.image_type = ImageType::None;
                data.defect = Defect::Unknown;
                return Ok(());
            }
        };

        if data.crc32 == 0 {
            data.crc32 = crc32fast::hash(&bytes);
        }

        if !need_pixels && !check_defects {
            return Ok(());
        }

        let image_type = extension_type(&data.path);

        if check_defects && image_type.is_marker_checked() && !jpeg_marker::has_end_marker(&bytes) {
            data.defect = Defect::JpegEndMarkerAbsent;
        }

        let Some(decoded) = self.decoder.decode(&bytes, image_type) else {
            data.image_type = ImageType::Undefined;
            if data.defect == Defect::None {
                data.defect = Defect::Unknown;
            }
            return Ok(());
        };

        data.image_type = decoded.image_type;
        data.width = decoded.width;
        data.height = decoded.height;
        data.ratio = ratio_bucket(decoded.width, decoded.height);

        if need_pixels {
            let render = render_to_256(&decoded.gray)?;
            data.pixel_data = Pyramid::build(render, self.advanced.reduced_image_size);
            if let Some(main) = data.pixel_data.main() {
                data.average = main.average();
                data.variance = main.variance();
            }
        }

        if check_defects && data.defect == Defect::None {
            self.classify_defects(data);
        }

        // The levels above the main view only exist for the defect
        // metrics; the comparator and the cache never touch them.
        data.pixel_data.trim_to_main();

        Ok(())
    }

    fn classify_defects(&self, data: &mut ImageData) {
        let pixel_count = data.width as u64 * data.height as u64;
        if pixel_count < self.defect.min_size || pixel_count > self.defect.max_size {
            return;
        }

        if self.defect.check_blockiness {
            data.blockiness = blockiness::score(&data.pixel_data);
            if data.blockiness > self.defect.blockiness_threshold {
                data.defect = Defect::Blockiness;
                return;
            }
        }

        if self.defect.check_blurring && data.pixel_data.filled() {
            data.blurring = blurring::radius(&data.pixel_data);
            if data.blurring > self.defect.blurring_threshold {
                data.defect = Defect::Blurring;
            }
        }
    }
}

fn extension_type(path: &Path) -> ImageType {
    path.extension()
        .and_then(|e| e.to_str())
        .map(ImageType::from_extension)
        .unwrap_or(ImageType::Undefined)
}

/// Render a decoded grayscale image down to the 256x256 buffer the
/// pyramid is built from, SIMD-accelerated via `fast_image_resize`.
fn render_to_256(gray: &image::GrayImage) -> Result<GrayView, FingerprintError> {
    use fast_image_resize::images::Image;
    use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};

    let (width, height) = gray.dimensions();
    if width == 0 || height == 0 {
        return Err(FingerprintError::EmptyImage { path: std::path::PathBuf::new() });
    }

    let src = Image::from_vec_u8(width, height, gray.clone().into_raw(), PixelType::U8)
        .map_err(|e| FingerprintError::DecodeFailed {
            path: std::path::PathBuf::new(),
            reason: format!("failed to wrap source buffer: {e}"),
        })?;

    let mut dst = Image::new(RENDER_SIDE, RENDER_SIDE, PixelType::U8);
    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    let mut resizer = Resizer::new();
    resizer
        .resize(&src, &mut dst, &options)
        .map_err(|e| FingerprintError::DecodeFailed {
            path: std::path::PathBuf::new(),
            reason: format!("resize to 256x256 failed: {e}"),
        })?;

    Ok(GrayView::new(RENDER_SIDE, dst.into_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::decode::DecodedImage;
    use crate::core::scanner::FileInfo;
    use std::path::PathBuf;

    struct FixtureDecoder {
        side: u32,
    }

    impl Decoder for FixtureDecoder {
        fn decode(&self, bytes: &[u8], image_type: ImageType) -> Option<DecodedImage> {
            if bytes.is_empty() {
                return None;
            }
            let gray = image::GrayImage::from_pixel(self.side, self.side, image::Luma([120]));
            Some(DecodedImage { width: self.side, height: self.side, gray, image_type })
        }
    }

    fn file(path: &str, bytes: &[u8], dir: &tempfile::TempDir) -> (ImageData, FileInfo) {
        let full = dir.path().join(path);
        std::fs::write(&full, bytes).unwrap();
        let metadata = std::fs::metadata(&full).unwrap();
        let info = FileInfo::new(full, metadata.len(), metadata.modified().unwrap(), 0);
        (ImageData::from_file_info(&info, false), info)
    }

    #[test]
    fn fill_computes_crc_and_pyramid() {
        let dir = tempfile::tempdir().unwrap();
        let (mut data, _info) = file("a.png", &[1, 2, 3, 4], &dir);
        let collector = DataCollector::new(
            FixtureDecoder { side: 64 },
            DefectOptions::default(),
            AdvancedOptions::default(),
        );

        collector.fill(&mut data, true, false).unwrap();

        assert_ne!(data.crc32, 0);
        assert_ne!(data.crc32, CRC32_UNREADABLE);
        assert!(data.pixel_data.filled());
        assert_eq!(data.pixel_data.main().unwrap().side, 16);
        assert_eq!(data.pixel_data.fast().unwrap().side, 4);
    }

    #[test]
    fn fill_marks_missing_file_unreadable() {
        let mut data = ImageData::from_file_info(
            &FileInfo::new(PathBuf::from("/nonexistent/x.jpg"), 0, std::time::SystemTime::UNIX_EPOCH, 0),
            false,
        );
        let collector = DataCollector::new(
            FixtureDecoder { side: 64 },
            DefectOptions::default(),
            AdvancedOptions::default(),
        );

        collector.fill(&mut data, true, true).unwrap();

        assert_eq!(data.crc32, CRC32_UNREADABLE);
        assert_eq!(data.image_type, ImageType::None);
        assert_eq!(data.defect, Defect::Unknown);
    }

    #[test]
    fn fill_is_idempotent_once_crc_is_set() {
        let dir = tempfile::tempdir().unwrap();
        let (mut data, _info) = file("a.png", &[1, 2, 3, 4], &dir);
        let collector = DataCollector::new(
            FixtureDecoder { side: 64 },
            DefectOptions::default(),
            AdvancedOptions::default(),
        );

        collector.fill(&mut data, true, false).unwrap();
        let crc = data.crc32;
        collector.fill(&mut data, true, false).unwrap();
        assert_eq!(data.crc32, crc);
    }
}
