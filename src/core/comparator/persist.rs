//! `MatchOutcome` list <-> typed-binary-stream encoding (the `adr`
//! result file).
//!
//! Like a mistake record, only identity/metadata is persisted; group
//! id, links, and selection are live-run bookkeeping and are dropped on
//! save, recomputed by `grouper::group` after the next load.

use super::{Hint, ImageInfo, MatchOutcome};
use crate::core::fingerprint::{Defect, ImageType, Transform};
use crate::core::io::{Reader, Writer};
use crate::error::CacheError;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

const MAGIC: &[u8; 4] = b"adr\0";
const FORMAT_VERSION: u32 = 1;

const TAG_DEFECT: u8 = 0;
const TAG_DUPLICATE: u8 = 1;

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

fn transform_tag(t: Transform) -> u8 {
    match t {
        Transform::Turn0 => 0,
        Transform::Turn90 => 1,
        Transform::Turn180 => 2,
        Transform::Turn270 => 3,
        Transform::MirrorTurn0 => 4,
        Transform::MirrorTurn90 => 5,
        Transform::MirrorTurn180 => 6,
        Transform::MirrorTurn270 => 7,
    }
}

fn transform_from_tag(tag: u8) -> Transform {
    match tag {
        1 => Transform::Turn90,
        2 => Transform::Turn180,
        3 => Transform::Turn270,
        4 => Transform::MirrorTurn0,
        5 => Transform::MirrorTurn90,
        6 => Transform::MirrorTurn180,
        7 => Transform::MirrorTurn270,
        _ => Transform::Turn0,
    }
}

fn hint_tag(h: Option<Hint>) -> u8 {
    match h {
        None => 0,
        Some(Hint::DeleteFirst) => 1,
        Some(Hint::DeleteSecond) => 2,
        Some(Hint::RenameFirstToSecond) => 3,
        Some(Hint::RenameSecondToFirst) => 4,
    }
}

fn hint_from_tag(tag: u8) -> Option<Hint> {
    match tag {
        1 => Some(Hint::DeleteFirst),
        2 => Some(Hint::DeleteSecond),
        3 => Some(Hint::RenameFirstToSecond),
        4 => Some(Hint::RenameSecondToFirst),
        _ => None,
    }
}

fn time_to_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

fn secs_to_time(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn write_image_info<W: Write>(w: &mut Writer<W>, info: &ImageInfo) -> Result<(), CacheError> {
    w.write_path(&info.path, false)?;
    w.write_u64(info.size)?;
    w.write_u64(time_to_secs(info.time))?;
    w.write_u8(image_type_tag(info.image_type))?;
    w.write_u32(info.width)?;
    w.write_u32(info.height)?;
    w.write_f64(info.blockiness)?;
    w.write_f64(info.blurring)?;
    Ok(())
}

fn read_image_info<R: Read>(r: &mut Reader<R>) -> Result<Arc<ImageInfo>, CacheError> {
    let (path, _) = r.read_path()?;
    let size = r.read_u64()?;
    let time = secs_to_time(r.read_u64()?);
    let image_type = image_type_from_tag(r.read_u8()?);
    let width = r.read_u32()?;
    let height = r.read_u32()?;
    let blockiness = r.read_f64()?;
    let blurring = r.read_f64()?;
    Ok(ImageInfo::from_fields(path, size, time, image_type, width, height, blockiness, blurring))
}

fn write_outcome<W: Write>(w: &mut Writer<W>, outcome: &MatchOutcome) -> Result<(), CacheError> {
    match outcome {
        MatchOutcome::Defect { image, defect } => {
            w.write_u8(TAG_DEFECT)?;
            write_image_info(w, image)?;
            w.write_u8(defect_tag(*defect))?;
        }
        MatchOutcome::Duplicate { first, second, difference, transform, hint, .. } => {
            w.write_u8(TAG_DUPLICATE)?;
            write_image_info(w, first)?;
            write_image_info(w, second)?;
            w.write_f64(*difference)?;
            w.write_u8(transform_tag(*transform))?;
            w.write_u8(hint_tag(*hint))?;
        }
    }
    Ok(())
}

fn read_outcome<R: Read>(r: &mut Reader<R>) -> Result<MatchOutcome, CacheError> {
    match r.read_u8()? {
        TAG_DEFECT => {
            let image = read_image_info(r)?;
            let defect = defect_from_tag(r.read_u8()?);
            Ok(MatchOutcome::Defect { image, defect })
        }
        _ => {
            let first = read_image_info(r)?;
            let second = read_image_info(r)?;
            let difference = r.read_f64()?;
            let transform = transform_from_tag(r.read_u8()?);
            let hint = hint_from_tag(r.read_u8()?);
            Ok(MatchOutcome::Duplicate { first, second, difference, transform, group: None, hint })
        }
    }
}

/// Save `results` (with groups/links/selection dropped) to `path` as an
/// `adr` file.
pub fn save_results(path: &Path, results: &[MatchOutcome]) -> Result<(), CacheError> {
    let file = File::create(path).map_err(|e| CacheError::Io { path: path.to_path_buf(), source: e })?;
    let mut w = Writer::new(BufWriter::new(file), path);
    w.write_magic(MAGIC)?;
    w.write_version(FORMAT_VERSION)?;
    w.write_u64(results.len() as u64)?;
    for outcome in results {
        write_outcome(&mut w, outcome)?;
    }
    Ok(())
}

/// Load an `adr` file back into a flat result list, ready for
/// grouping and the hint engine to re-run over.
pub fn load_results(path: &Path) -> Result<Vec<MatchOutcome>, CacheError> {
    let file = File::open(path)
        .map_err(|e| CacheError::OpenFailed { path: path.to_path_buf(), reason: e.to_string() })?;
    let mut r = Reader::new(BufReader::new(file), path);
    r.read_magic(MAGIC)?;
    r.read_version(FORMAT_VERSION)?;
    let count = r.read_u64()?;
    let mut results = Vec::with_capacity(count as usize);
    for _ in 0..count {
        results.push(read_outcome(&mut r)?);
    }
    Ok(results)
}
