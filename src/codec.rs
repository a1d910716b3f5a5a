//! Codec backend: raw deflate compressor/decompressor objects and CRC-32
//!
//! The gzip container logic never touches `flate2` directly. It goes through
//! the [`Backend`] trait so another deflate implementation can be supplied at
//! construction time. [`Flate2Backend`] is the default.

use crate::error::{GzipError, Result};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use std::ops::RangeInclusive;

/// Lowest accepted compression level (stored blocks)
pub const MIN_LEVEL: u32 = 0;
/// Fastest level that still compresses
pub const BEST_SPEED: u32 = 1;
/// Level used when the caller does not pick one
pub const DEFAULT_LEVEL: u32 = 6;
/// Highest accepted compression level
pub const BEST_COMPRESSION: u32 = 9;
/// Alias of [`BEST_COMPRESSION`]
pub const MAX_LEVEL: u32 = BEST_COMPRESSION;

/// Spare output capacity reserved before each compressor call
const OUTPUT_CHUNK: usize = 32 * 1024;

/// Flush behaviour for the incremental compressor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushMode {
    /// Emit everything buffered so far and align to a byte boundary.
    /// The member stays open.
    Sync,
    /// Like `Sync`, and also reset the dictionary so decoding can restart here
    Full,
    /// Terminate the deflate stream
    Finish,
}

/// Result of feeding one input slice to a [`Decompressor`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Inflate {
    /// Input bytes consumed; `input[consumed..]` is the unconsumed tail
    pub consumed: usize,
    /// Output bytes written to the front of the output slice
    pub produced: usize,
    /// The deflate stream ended during this call
    pub stream_end: bool,
}

/// Incremental raw-deflate compressor
pub trait Compressor {
    /// Compress all of `input`, appending whatever output is produced to `out`
    fn compress(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<()>;

    /// Flush buffered state according to `mode`, appending output to `out`
    fn flush(&mut self, mode: FlushMode, out: &mut Vec<u8>) -> Result<()>;
}

/// Incremental raw-deflate decompressor
pub trait Decompressor {
    /// Decompress from `input` into `out`, never writing more than `out.len()` bytes
    fn decompress(&mut self, input: &[u8], out: &mut [u8]) -> Result<Inflate>;
}

/// Factory for compressor/decompressor instances plus its level bounds
pub trait Backend {
    type Compressor: Compressor;
    type Decompressor: Decompressor;

    /// Inclusive range of accepted compression levels
    fn level_range(&self) -> RangeInclusive<u32>;

    /// New compressor for one member. `level` has already been validated.
    fn compressor(&self, level: u32) -> Self::Compressor;

    /// New decompressor for one member
    fn decompressor(&self) -> Self::Decompressor;

    /// Check `level` against [`Backend::level_range`]
    fn validate_level(&self, level: u32) -> Result<u32> {
        let range = self.level_range();
        if range.contains(&level) {
            Ok(level)
        } else {
            Err(GzipError::InvalidLevel {
                level,
                min: *range.start(),
                max: *range.end(),
            })
        }
    }
}

/// Running CRC-32 (gzip polynomial) of `data`, continuing from `seed`
pub fn crc32(data: &[u8], seed: u32) -> u32 {
    let mut hasher = crc32fast::Hasher::new_with_initial(seed);
    hasher.update(data);
    hasher.finalize()
}

/// Default backend built on `flate2`
#[derive(Debug, Clone, Copy, Default)]
pub struct Flate2Backend;

impl Backend for Flate2Backend {
    type Compressor = DeflateCompressor;
    type Decompressor = DeflateDecompressor;

    fn level_range(&self) -> RangeInclusive<u32> {
        MIN_LEVEL..=MAX_LEVEL
    }

    fn compressor(&self, level: u32) -> DeflateCompressor {
        DeflateCompressor {
            inner: Compress::new(Compression::new(level), false),
        }
    }

    fn decompressor(&self) -> DeflateDecompressor {
        DeflateDecompressor {
            inner: Decompress::new(false),
        }
    }
}

/// `flate2::Compress` without zlib framing
pub struct DeflateCompressor {
    inner: Compress,
}

impl Compressor for DeflateCompressor {
    fn compress(&mut self, mut input: &[u8], out: &mut Vec<u8>) -> Result<()> {
        while !input.is_empty() {
            out.reserve(OUTPUT_CHUNK);
            let before = self.inner.total_in();
            self.inner
                .compress_vec(input, out, FlushCompress::None)
                .map_err(|e| GzipError::Compression(e.to_string()))?;
            let consumed = (self.inner.total_in() - before) as usize;
            input = &input[consumed..];
        }
        Ok(())
    }

    fn flush(&mut self, mode: FlushMode, out: &mut Vec<u8>) -> Result<()> {
        let flush = match mode {
            FlushMode::Sync => FlushCompress::Sync,
            FlushMode::Full => FlushCompress::Full,
            FlushMode::Finish => FlushCompress::Finish,
        };
        loop {
            out.reserve(OUTPUT_CHUNK);
            let spare = out.capacity() - out.len();
            let before = out.len();
            let status = self
                .inner
                .compress_vec(&[], out, flush)
                .map_err(|e| GzipError::Compression(e.to_string()))?;
            if status == Status::StreamEnd {
                return Ok(());
            }
            // A flush that did not fill the spare space has nothing left pending
            if mode != FlushMode::Finish && out.len() - before < spare {
                return Ok(());
            }
        }
    }
}

/// `flate2::Decompress` without zlib framing
pub struct DeflateDecompressor {
    inner: Decompress,
}

impl Decompressor for DeflateDecompressor {
    fn decompress(&mut self, input: &[u8], out: &mut [u8]) -> Result<Inflate> {
        let in_before = self.inner.total_in();
        let out_before = self.inner.total_out();
        let status = self
            .inner
            .decompress(input, out, FlushDecompress::None)
            .map_err(|e| GzipError::Compression(format!("invalid deflate data: {}", e)))?;
        Ok(Inflate {
            consumed: (self.inner.total_in() - in_before) as usize,
            produced: (self.inner.total_out() - out_before) as usize,
            stream_end: status == Status::StreamEnd,
        })
    }
}
