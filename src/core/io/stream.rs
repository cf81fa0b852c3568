//! Typed binary stream reader/writer.
//!
//! Wire format: `{magic: [u8; N]}{version: u32}{payload}`, little-endian
//! fixed-width integers, IEEE-754 doubles, strings as
//! `{len: u64}{UTF-16 code units}`, paths as a string plus a trailing
//! `subfolders: bool`.

use crate::error::CacheError;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Any chunk or record claiming to be larger than this is treated as
/// corrupt rather than trusted and allocated.
pub const SIZE_CHECK_LIMIT: u64 = 1 << 32;

/// Wraps a `Write` with the primitive encoders every persisted format
/// needs. `path` is the file this writer is producing, kept only for
/// error messages.
pub struct Writer<W: Write> {
    inner: W,
    path: PathBuf,
}

impl<W: Write> Writer<W> {
    pub fn new(inner: W, path: impl Into<PathBuf>) -> Self {
        Self { inner, path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> CacheError {
        CacheError::Io { path: self.path.clone(), source }
    }

    pub fn write_magic(&mut self, magic: &[u8]) -> Result<(), CacheError> {
        self.inner.write_all(magic).map_err(|e| self.io_err(e))
    }

    pub fn write_version(&mut self, version: u32) -> Result<(), CacheError> {
        self.write_u32(version)
    }

    pub fn write_u8(&mut self, v: u8) -> Result<(), CacheError> {
        self.inner.write_all(&[v]).map_err(|e| self.io_err(e))
    }

    pub fn write_bool(&mut self, v: bool) -> Result<(), CacheError> {
        self.write_u8(if v { 1 } else { 0 })
    }

    pub fn write_i16(&mut self, v: i16) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_u16(&mut self, v: u16) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_u32(&mut self, v: u32) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_i32(&mut self, v: i32) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_u64(&mut self, v: u64) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_f64(&mut self, v: f64) -> Result<(), CacheError> {
        self.inner.write_all(&v.to_le_bytes()).map_err(|e| self.io_err(e))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CacheError> {
        self.write_u64(bytes.len() as u64)?;
        self.inner.write_all(bytes).map_err(|e| self.io_err(e))
    }

    pub fn write_string(&mut self, s: &str) -> Result<(), CacheError> {
        let units: Vec<u16> = s.encode_utf16().collect();
        self.write_u64(units.len() as u64)?;
        for unit in units {
            self.write_u16(unit)?;
        }
        Ok(())
    }

    /// Path plus the `subfolders` flag paired with every persisted
    /// path (search roots recurse by default).
    pub fn write_path(&mut self, path: &Path, subfolders: bool) -> Result<(), CacheError> {
        self.write_string(&path.to_string_lossy())?;
        self.write_bool(subfolders)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Wraps a `Read` with the primitive decoders every persisted format
/// needs, validating lengths against `SIZE_CHECK_LIMIT` as it goes.
pub struct Reader<R: Read> {
    inner: R,
    path: PathBuf,
}

impl<R: Read> Reader<R> {
    pub fn new(inner: R, path: impl Into<PathBuf>) -> Self {
        Self { inner, path: path.into() }
    }

    fn io_err(&self, source: std::io::Error) -> CacheError {
        CacheError::Io { path: self.path.clone(), source }
    }

    fn format_err(&self, reason: impl Into<String>) -> CacheError {
        CacheError::InvalidFileFormat { path: self.path.clone(), reason: reason.into() }
    }

    /// Build an `InvalidFileFormat` against this stream's file, for
    /// callers validating decoded content the stream itself can't.
    pub fn invalid_format(&self, reason: impl Into<String>) -> CacheError {
        self.format_err(reason)
    }

    pub fn read_magic(&mut self, expected: &[u8]) -> Result<(), CacheError> {
        let mut buf = vec![0u8; expected.len()];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        if buf != expected {
            return Err(self.format_err(format!(
                "bad magic: expected {:?}, found {:?}",
                expected, buf
            )));
        }
        Ok(())
    }

    pub fn read_version(&mut self, expected: u32) -> Result<u32, CacheError> {
        let found = self.read_u32()?;
        if found != expected {
            return Err(CacheError::InvalidVersion { path: self.path.clone(), found, expected });
        }
        Ok(found)
    }

    pub fn read_u8(&mut self) -> Result<u8, CacheError> {
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(buf[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, CacheError> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i16(&mut self) -> Result<i16, CacheError> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(i16::from_le_bytes(buf))
    }

    pub fn read_u16(&mut self) -> Result<u16, CacheError> {
        let mut buf = [0u8; 2];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(u16::from_le_bytes(buf))
    }

    pub fn read_u32(&mut self) -> Result<u32, CacheError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(u32::from_le_bytes(buf))
    }

    pub fn read_i32(&mut self) -> Result<i32, CacheError> {
        let mut buf = [0u8; 4];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(i32::from_le_bytes(buf))
    }

    pub fn read_u64(&mut self) -> Result<u64, CacheError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(u64::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64, CacheError> {
        let mut buf = [0u8; 8];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CacheError> {
        let len = self.read_u64()?;
        if len > SIZE_CHECK_LIMIT {
            return Err(self.format_err(format!("byte length {} exceeds limit", len)));
        }
        let mut buf = vec![0u8; len as usize];
        self.inner.read_exact(&mut buf).map_err(|e| self.io_err(e))?;
        Ok(buf)
    }

    pub fn read_string(&mut self) -> Result<String, CacheError> {
        let len = self.read_u64()?;
        if len > SIZE_CHECK_LIMIT {
            return Err(self.format_err(format!("string length {} exceeds limit", len)));
        }
        let mut units = Vec::with_capacity(len as usize);
        for _ in 0..len {
            units.push(self.read_u16()?);
        }
        String::from_utf16(&units).map_err(|_| self.format_err("invalid UTF-16 string"))
    }

    pub fn read_path(&mut self) -> Result<(PathBuf, bool), CacheError> {
        let raw = self.read_string()?;
        let subfolders = self.read_bool()?;
        Ok((PathBuf::from(raw), subfolders))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_primitives() {
        let mut buf = Vec::new();
        {
            let mut w = Writer::new(&mut buf, "test");
            w.write_magic(b"adm\0").unwrap();
            w.write_version(1).unwrap();
            w.write_u64(42).unwrap();
            w.write_f64(3.5).unwrap();
            w.write_string("héllo").unwrap();
            w.write_path(Path::new("/a/b"), true).unwrap();
        }

        let mut r = Reader::new(buf.as_slice(), "test");
        r.read_magic(b"adm\0").unwrap();
        assert_eq!(r.read_version(1).unwrap(), 1);
        assert_eq!(r.read_u64().unwrap(), 42);
        assert_eq!(r.read_f64().unwrap(), 3.5);
        assert_eq!(r.read_string().unwrap(), "héllo");
        let (path, subfolders) = r.read_path().unwrap();
        assert_eq!(path, PathBuf::from("/a/b"));
        assert!(subfolders);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let buf = b"xxxx".to_vec();
        let mut r = Reader::new(buf.as_slice(), "test");
        assert!(r.read_magic(b"adm\0").is_err());
    }

    #[test]
    fn version_mismatch_is_rejected() {
        let mut buf = Vec::new();
        Writer::new(&mut buf, "test").write_version(2).unwrap();
        let mut r = Reader::new(buf.as_slice(), "test");
        let err = r.read_version(1).unwrap_err();
        assert!(matches!(err, CacheError::InvalidVersion { found: 2, expected: 1, .. }));
    }

    #[test]
    fn oversized_string_length_is_rejected() {
        let mut buf = Vec::new();
        Writer::new(&mut buf, "test").write_u64(SIZE_CHECK_LIMIT + 1).unwrap();
        let mut r = Reader::new(buf.as_slice(), "test");
        assert!(r.read_string().is_err());
    }
}
