//! `ImageInfo` snapshot <-> typed-binary-stream encoding. A snapshot
//! carries only the fields `core::comparator::ImageInfo` exposes as
//! identity/metadata, and none of its mutable bookkeeping (group, links,
//! removed, selected), which is meaningless outside a live run.

use crate::core::fingerprint::ImageType;
use crate::core::io::{Reader, Writer};
use crate::error::CacheError;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// An immutable snapshot of the fields a mistake entry needs to
/// survive a save/load round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct MistakeRecord {
    pub path: PathBuf,
    pub size: u64,
    pub time: SystemTime,
    pub image_type: ImageType,
    pub width: u32,
    pub height: u32,
    pub blockiness: f64,
    pub blurring: f64,
}

impl MistakeRecord {
    pub fn from_image_info(info: &crate::core::comparator::ImageInfo) -> Self {
        Self {
            path: info.path.clone(),
            size: info.size,
            time: info.time,
            image_type: info.image_type,
            width: info.width,
            height: info.height,
            blockiness: info.blockiness,
            blurring: info.blurring,
        }
    }
}

fn image_type_tag(t: ImageType) -> u8 {
    match t {
        ImageType::None => 0,
        ImageType::Undefined => 1,
        ImageType::Jpeg => 2,
        ImageType::Png => 3,
        ImageType::Bmp => 4,
        ImageType::Gif => 5,
        ImageType::Tiff => 6,
        ImageType::WebP => 7,
    }
}

fn image_type_from_tag(tag: u8) -> ImageType {
    match tag {
        2 => ImageType::Jpeg,
        3 => ImageType::Png,
        4 => ImageType::Bmp,
        5 => ImageType::Gif,
        6 => ImageType::Tiff,
        7 => ImageType::WebP,
        1 => ImageType::Undefined,
        _ => ImageType::None,
    }
}

fn time_to_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn secs_to_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn write_image_info<W: Write>(w: &mut Writer<W>, record: &MistakeRecord) -> Result<(), CacheError> {
    w.write_path(&record.path, false)?;
    w.write_u64(record.size)?;
    w.write_u64(time_to_secs(record.time))?;
    w.write_u8(image_type_tag(record.image_type))?;
    w.write_u32(record.width)?;
    w.write_u32(record.height)?;
    w.write_f64(record.blockiness)?;
    w.write_f64(record.blurring)?;
    Ok(())
}

pub fn read_image_info<R: Read>(r: &mut Reader<R>) -> Result<MistakeRecord, CacheError> {
    let (path, _) = r.read_path()?;
    let size = r.read_u64()?;
    let time = secs_to_time(r.read_u64()?);
    let image_type = image_type_from_tag(r.read_u8()?);
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let blockiness = r.read_f64()?;
    let blurring = r.read_f64()?;
    Ok(MistakeRecord { path, size, time, image_type, width, height, blockiness, blurring })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(path: &str) -> MistakeRecord {
        MistakeRecord {
            path: PathBuf::from(path),
            size: 10,
            time: SystemTime::UNIX_EPOCH,
            image_type: ImageType::Jpeg,
            width: 4,
            height: 4,
            blockiness: 1.0,
            blurring: 2.0,
        }
    }

    #[test]
    fn round_trips_a_record() {
        let record = sample("/a.jpg");
        let mut buf = Vec::new();
        write_image_info(&mut Writer::new(&mut buf, "test"), &record).unwrap();
        let restored = read_image_info(&mut Reader::new(buf.as_slice(), "test")).unwrap();
        assert_eq!(restored, record);
    }
}
