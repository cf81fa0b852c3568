//! Single-bucket strategy: every fingerprint is compared against every
//! other one. Simplest and slowest; useful for small collections or as
//! a correctness baseline against the indexed strategies.

use crate::core::fingerprint::ImageData;
use crate::core::options::CompareOptions;

use super::traits::{compare_with_transforms, Candidate, ComparatorStrategy};

#[derive(Default)]
pub struct Strategy0D {
    bucket: Vec<ImageData>,
}

impl ComparatorStrategy for Strategy0D {
    fn candidates(
        &self,
        data: &ImageData,
        options: &CompareOptions,
        compare_inside_one_folder: bool,
    ) -> Vec<Candidate<'_>> {
        self.bucket
            .iter()
            .flat_map(|other| compare_with_transforms(data, other, options, compare_inside_one_folder))
            .collect()
    }

    fn insert(&mut self, data: ImageData) {
        self.bucket.push(data);
    }

    fn len(&self) -> usize {
        self.bucket.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::{GrayView, Pyramid};
    use crate::core::scanner::FileInfo;
    use std::path::PathBuf;
    use std::time::SystemTime;

    fn image(path: &str, index: usize, fill: u8) -> ImageData {
        let info = FileInfo::new(PathBuf::from(path), 100, SystemTime::UNIX_EPOCH, index);
        let mut data = ImageData::from_file_info(&info, false);
        data.pixel_data = Pyramid::build(GrayView::new(256, vec![fill; 256 * 256]), 16);
        data.crc32 = fill as u32;
        data
    }

    #[test]
    fn finds_identical_image_against_everything_indexed() {
        let mut strategy = Strategy0D::default();
        strategy.insert(image("/a.jpg", 0, 50));
        strategy.insert(image("/b.jpg", 1, 200));
        let hits = strategy.candidates(&image("/c.jpg", 2, 50), &CompareOptions::default(), false);
        assert_eq!(hits.len(), 1);
    }
}
