//! One-shot helpers for data that fits in memory

use crate::error::Result;
use crate::reader::GzipReader;
use crate::writer::GzipWriter;

/// Compress `data` into a single gzip member
pub fn compress(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let writer = GzipWriter::with_level(Vec::with_capacity(data.len() / 2 + 64), level)?;
    write_all(writer, data)
}

/// Compress `data` with a fixed header timestamp, for reproducible output
pub fn compress_with_mtime(data: &[u8], level: u32, mtime: u32) -> Result<Vec<u8>> {
    let mut writer = GzipWriter::with_level(Vec::with_capacity(data.len() / 2 + 64), level)?;
    writer.set_mtime(mtime);
    write_all(writer, data)
}

/// Decompress every member in `data`, ignoring trailing garbage
pub fn decompress(data: &[u8]) -> Result<Vec<u8>> {
    GzipReader::new(data).read_all()
}

fn write_all(mut writer: GzipWriter<Vec<u8>>, data: &[u8]) -> Result<Vec<u8>> {
    writer.write_data(data)?;
    writer.finish()
}
