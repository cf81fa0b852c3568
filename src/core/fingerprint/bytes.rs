//! Raw file reading for the fingerprint builder. Large files are
//! memory-mapped to skip the kernel-to-userspace copy; small files go
//! through plain `fs::read`, which beats mapping once setup overhead
//! dominates.

use memmap2::Mmap;
use std::fs::File;
use std::io;
use std::path::Path;

/// Files at or above this size are memory-mapped (1 MiB).
const MMAP_THRESHOLD: u64 = 1024 * 1024;

/// File bytes that may be owned or memory-mapped; callers only see a
/// byte slice either way.
pub enum FileBytes {
    Vec(Vec<u8>),
    Mmap(Mmap),
}

impl AsRef<[u8]> for FileBytes {
    fn as_ref(&self) -> &[u8] {
        match self {
            FileBytes::Vec(v) => v,
            FileBytes::Mmap(m) => m,
        }
    }
}

impl std::ops::Deref for FileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

/// Read a file's full contents, memory-mapping when it is large enough
/// to pay off.
pub fn read_file_bytes(path: &Path) -> io::Result<FileBytes> {
    let metadata = std::fs::metadata(path)?;
    if metadata.len() >= MMAP_THRESHOLD {
        let file = File::open(path)?;
        // SAFETY: read-only mapping; the file handle is held for the
        // lifetime of the map.
        let mmap = unsafe { Mmap::map(&file) }?;
        Ok(FileBytes::Mmap(mmap))
    } else {
        Ok(FileBytes::Vec(std::fs::read(path)?))
    }
}
