//! Running CRC-32 and size tracking for one gzip member

use crc32fast::Hasher as Crc32;

/// Checksum accumulator plus uncompressed byte count
///
/// The trailer only stores the size modulo 2^32, but the full count is kept
/// for error context.
#[derive(Clone, Default)]
pub struct RunningDigest {
    crc: Crc32,
    total: u64,
}

impl RunningDigest {
    pub fn new() -> Self {
        Self {
            crc: Crc32::new(),
            total: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        self.crc.update(data);
        self.total += data.len() as u64;
    }

    pub fn crc32(&self) -> u32 {
        self.crc.clone().finalize()
    }

    /// Uncompressed size modulo 2^32, as stored in ISIZE
    pub fn size(&self) -> u32 {
        self.total as u32
    }

    /// Full uncompressed byte count
    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl std::fmt::Debug for RunningDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunningDigest")
            .field("crc32", &format_args!("{:#010x}", self.crc32()))
            .field("total", &self.total)
            .finish()
    }
}
