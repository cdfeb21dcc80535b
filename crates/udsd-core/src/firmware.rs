//! Read-only firmware image shared across connections

use std::io;
use std::path::Path;

use bytes::Bytes;

/// Logical address of the first firmware byte.
pub const MEM_BASE: u128 = 0x1000;

/// Largest span a single ReadMemoryByAddress may request.
const MAX_READ_LEN: u128 = 0xFFE;

/// The firmware blob, loaded once at process start.
///
/// Immutable after construction, so it needs no synchronization; clone
/// handles are cheap ([`Bytes`]) and every connection reads the same
/// underlying buffer.
#[derive(Debug, Clone)]
pub struct FirmwareImage {
    data: Bytes,
}

impl FirmwareImage {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(std::fs::read(path)?))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read `size` bytes at logical address `addr`.
    ///
    /// Address and size are u128 because the wire format allows each to
    /// be encoded in up to 15 big-endian bytes; validating in the wide
    /// type avoids any truncation before the bounds check. Returns
    /// `None` when the span is oversized or falls outside
    /// `[MEM_BASE, MEM_BASE + len)`.
    pub fn read(&self, addr: u128, size: u128) -> Option<Bytes> {
        if size > MAX_READ_LEN {
            return None;
        }
        let end = addr.checked_add(size)?;
        if addr < MEM_BASE || end > MEM_BASE + self.data.len() as u128 {
            return None;
        }
        let offset = (addr - MEM_BASE) as usize;
        Some(self.data.slice(offset..offset + size as usize))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image() -> FirmwareImage {
        FirmwareImage::new((0u8..=255).collect::<Vec<u8>>())
    }

    #[test]
    fn reads_within_bounds() {
        let fw = image();
        assert_eq!(fw.read(MEM_BASE, 4).unwrap().as_ref(), &[0, 1, 2, 3]);
        assert_eq!(fw.read(MEM_BASE + 255, 1).unwrap().as_ref(), &[255]);
        assert_eq!(fw.read(MEM_BASE, 0).unwrap().len(), 0);
    }

    #[test]
    fn rejects_addresses_below_base() {
        let fw = image();
        assert!(fw.read(MEM_BASE - 1, 1).is_none());
        assert!(fw.read(0, 1).is_none());
    }

    #[test]
    fn rejects_spans_past_the_end() {
        let fw = image();
        assert!(fw.read(MEM_BASE + 255, 2).is_none());
        assert!(fw.read(MEM_BASE + 256, 1).is_none());
    }

    #[test]
    fn rejects_oversized_reads_regardless_of_image_size() {
        let fw = FirmwareImage::new(vec![0u8; 0x2000]);
        assert!(fw.read(MEM_BASE, 0xFFF).is_none());
        assert!(fw.read(MEM_BASE, 0xFFE).is_some());
    }

    #[test]
    fn huge_encoded_addresses_do_not_wrap() {
        let fw = image();
        // 15-byte big-endian addresses fit in u128; nothing truncates
        // them into the valid window.
        assert!(fw.read(u128::MAX - 0x1000, 1).is_none());
    }

    #[test]
    fn load_reads_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fw.bin");
        std::fs::write(&path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();

        let fw = FirmwareImage::load(&path).unwrap();
        assert_eq!(fw.len(), 4);
        assert_eq!(fw.read(MEM_BASE, 4).unwrap().as_ref(), &[0xDE, 0xAD, 0xBE, 0xEF]);
    }
}
