//! `ImageData` <-> typed-binary-stream encoding, shared by the index
//! and chunk file formats. One record per fingerprint, written in
//! field order; deserialization rebuilds the grayscale pyramid from
//! its stored levels rather than special-casing main/fast.

use crate::core::fingerprint::{Defect, GrayView, ImageData, ImageType, Pyramid};
use crate::core::io::{Reader, Writer};
use crate::error::CacheError;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

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

fn defect_tag(d: Defect) -> u8 {
    match d {
        Defect::None => 0,
        Defect::Unknown => 1,
        Defect::JpegEndMarkerAbsent => 2,
        Defect::Blockiness => 3,
        Defect::Blurring => 4,
    }
}

fn defect_from_tag(tag: u8) -> Defect {
    match tag {
        1 => Defect::Unknown,
        2 => Defect::JpegEndMarkerAbsent,
        3 => Defect::Blockiness,
        4 => Defect::Blurring,
        _ => Defect::None,
    }
}

fn time_to_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn secs_to_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

pub fn write_image_data<W: Write>(w: &mut Writer<W>, data: &ImageData) -> Result<(), CacheError> {
    w.write_path(&data.path, false)?;
    w.write_u64(data.size)?;
    w.write_u64(time_to_secs(data.time))?;
    w.write_u64(data.hash)?;
    w.write_u32(data.crc32)?;
    w.write_u8(image_type_tag(data.image_type))?;
    w.write_u32(data.width)?;
    w.write_u32(data.height)?;
    w.write_u32(data.ratio)?;
    w.write_u8(defect_tag(data.defect))?;
    w.write_f64(data.blockiness)?;
    w.write_f64(data.blurring)?;
    w.write_f64(data.average)?;
    w.write_f64(data.variance)?;
    w.write_bool(data.valid)?;
    w.write_u64(data.index as u64)?;

    w.write_u32(data.pixel_data.main_side())?;
    w.write_u8(data.pixel_data.levels.len() as u8)?;
    for level in &data.pixel_data.levels {
        w.write_u32(level.side)?;
        w.write_bytes(&level.data)?;
    }
    Ok(())
}

pub fn read_image_data<R: Read>(r: &mut Reader<R>) -> Result<ImageData, CacheError> {
    let (path, _) = r.read_path()?;
    let size = r.read_u64()?;
    let time = secs_to_time(r.read_u64()?);
    let hash = r.read_u64()?;
    let crc32 = r.read_u32()?;
    let image_type = image_type_from_tag(r.read_u8()?);
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let ratio = r.read_u32()?;
    let defect = defect_from_tag(r.read_u8()?);
    let blockiness = r.read_f64()?;
    let blurring = r.read_f64()?;
    let average = r.read_f64()?;
    let variance = r.read_f64()?;
    let valid = r.read_bool()?;
    let index = r.read_u64()? as usize;

    let main_side = r.read_u32()?;
    let level_count = r.read_u8()?;
    let mut levels = Vec::with_capacity(level_count as usize);
    for _ in 0..level_count {
        let side = r.read_u32()?;
        let bytes = r.read_bytes()?;
        if side > 256 || bytes.len() != (side as usize) * (side as usize) {
            return Err(r.invalid_format(format!(
                "pyramid level claims side {side} but holds {} bytes",
                bytes.len()
            )));
        }
        levels.push(GrayView::new(side, bytes));
    }
    let pixel_data = if levels.is_empty() { Pyramid::empty() } else { Pyramid::build_from_levels(levels, main_side) };

    Ok(ImageData {
        path: PathBuf::from(path),
        size,
        time,
        hash,
        crc32,
        image_type,
        width,
        height,
        ratio,
        defect,
        blockiness,
        blurring,
        pixel_data,
        average,
        variance,
        valid,
        index,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scanner::FileInfo;

    #[test]
    fn round_trips_an_unfilled_fingerprint() {
        let info = FileInfo::new(PathBuf::from("/a/b.jpg"), 10, SystemTime::UNIX_EPOCH, 2);
        let data = ImageData::from_file_info(&info, true);

        let mut buf = Vec::new();
        write_image_data(&mut Writer::new(&mut buf, "test"), &data).unwrap();
        let restored = read_image_data(&mut Reader::new(buf.as_slice(), "test")).unwrap();

        assert_eq!(restored.path, data.path);
        assert_eq!(restored.size, data.size);
        assert_eq!(restored.index, data.index);
        assert_eq!(restored.valid, data.valid);
    }

    #[test]
    fn round_trips_a_filled_pyramid() {
        let info = FileInfo::new(PathBuf::from("/a.jpg"), 10, SystemTime::UNIX_EPOCH, 0);
        let mut data = ImageData::from_file_info(&info, false);
        data.pixel_data = Pyramid::build(GrayView::new(256, vec![7u8; 256 * 256]), 16);
        data.crc32 = 42;

        let mut buf = Vec::new();
        write_image_data(&mut Writer::new(&mut buf, "test"), &data).unwrap();
        let restored = read_image_data(&mut Reader::new(buf.as_slice(), "test")).unwrap();

        assert_eq!(restored.crc32, 42);
        assert_eq!(restored.pixel_data.main().unwrap().side, 16);
        assert_eq!(restored.pixel_data.fast().unwrap().side, 4);
    }
}
