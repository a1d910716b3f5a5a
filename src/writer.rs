//! Streaming gzip writer that compresses data on-the-fly
//!
//! The member header is written on the first write (or flush/close, so even
//! an empty archive has one), compressed output goes straight to the sink,
//! and the CRC-32/ISIZE trailer is appended on close.
//!
//! Supports arbitrary writers (File, Vec<u8>, network streams, etc.)

use crate::codec::{Backend, Compressor, Flate2Backend, FlushMode, DEFAULT_LEVEL};
use crate::digest::RunningDigest;
use crate::error::{GzipError, Result};
use crate::header::{extra_flags_for_level, MemberHeader, Trailer};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Compressed bytes are held back until at least this many are buffered,
/// unless a flush or close forces them out
const SINK_FLUSH_THRESHOLD: usize = 64 * 1024;

/// Streaming gzip writer producing a single member
pub struct GzipWriter<W: Write, B: Backend = Flate2Backend> {
    output: Option<W>,
    compressor: B::Compressor,
    header: MemberHeader,
    mtime: Option<u32>,
    header_emitted: bool,
    closed: bool,
    /// Set once the compressor has been finished, even if writing the tail failed
    finishing: bool,
    digest: RunningDigest,
    buffer: Vec<u8>,
    compressed_count: u64,
}

impl GzipWriter<File> {
    /// Create a gzip file with the default compression level (6)
    ///
    /// The file name, without a trailing `.gz`, is recorded in the header.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::create_with_level(path, DEFAULT_LEVEL)
    }

    /// Create a gzip file with a custom compression level (0-9)
    pub fn create_with_level<P: AsRef<Path>>(path: P, level: u32) -> Result<Self> {
        Flate2Backend.validate_level(level)?;
        let path = path.as_ref();
        let file = File::create(path)?;
        let mut writer = Self::with_level(file, level)?;
        writer.record_file_name(path);
        Ok(writer)
    }

    /// Open `path` for appending a new member after any existing content
    pub fn append_with_level<P: AsRef<Path>>(path: P, level: u32) -> Result<Self> {
        Flate2Backend.validate_level(level)?;
        let path = path.as_ref();
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = Self::with_level(file, level)?;
        writer.record_file_name(path);
        Ok(writer)
    }

    /// Create `path` for writing, failing if it already exists
    pub fn create_new_with_level<P: AsRef<Path>>(path: P, level: u32) -> Result<Self> {
        Flate2Backend.validate_level(level)?;
        let path = path.as_ref();
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        let mut writer = Self::with_level(file, level)?;
        writer.record_file_name(path);
        Ok(writer)
    }

    fn record_file_name(&mut self, path: &Path) {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return;
        };
        let name = name.strip_suffix(".gz").unwrap_or(name);
        if !name.is_empty() && !name.contains('\0') {
            self.header.filename = Some(name.as_bytes().to_vec());
        }
    }
}

impl<W: Write> GzipWriter<W> {
    /// Create a writer over an arbitrary sink with the default compression level (6)
    pub fn new(writer: W) -> Result<Self> {
        Self::with_level(writer, DEFAULT_LEVEL)
    }

    /// Create a writer over an arbitrary sink with a custom compression level
    pub fn with_level(writer: W, level: u32) -> Result<Self> {
        Self::with_backend(writer, level, Flate2Backend)
    }
}

impl<W: Write, B: Backend> GzipWriter<W, B> {
    /// Create a writer that compresses with `backend`
    ///
    /// The level is validated against the backend before anything is written.
    pub fn with_backend(writer: W, level: u32, backend: B) -> Result<Self> {
        let level = backend.validate_level(level)?;
        let header = MemberHeader {
            extra_flags: extra_flags_for_level(level),
            ..MemberHeader::default()
        };
        Ok(Self {
            output: Some(writer),
            compressor: backend.compressor(level),
            header,
            mtime: None,
            header_emitted: false,
            closed: false,
            finishing: false,
            digest: RunningDigest::new(),
            buffer: Vec::new(),
            compressed_count: 0,
        })
    }

    /// Set the header modification time (default: current time at first write)
    ///
    /// Has no effect once the header has been written.
    pub fn set_mtime(&mut self, mtime: u32) -> &mut Self {
        self.warn_if_header_emitted("mtime");
        self.mtime = Some(mtime);
        self
    }

    /// Record an original file name in the header
    pub fn set_filename(&mut self, name: &str) -> Result<&mut Self> {
        self.warn_if_header_emitted("filename");
        let mut header = self.header.clone();
        header.filename = Some(name.as_bytes().to_vec());
        header.validate()?;
        self.header = header;
        Ok(self)
    }

    /// Record a comment in the header
    pub fn set_comment(&mut self, comment: &str) -> Result<&mut Self> {
        self.warn_if_header_emitted("comment");
        let mut header = self.header.clone();
        header.comment = Some(comment.as_bytes().to_vec());
        header.validate()?;
        self.header = header;
        Ok(self)
    }

    /// Attach an FEXTRA field (at most 65535 bytes)
    pub fn set_extra(&mut self, extra: Vec<u8>) -> Result<&mut Self> {
        self.warn_if_header_emitted("extra field");
        let mut header = self.header.clone();
        header.extra = Some(extra);
        header.validate()?;
        self.header = header;
        Ok(self)
    }

    /// Protect the header with an FHCRC field
    pub fn set_header_crc(&mut self, enabled: bool) -> &mut Self {
        self.warn_if_header_emitted("header CRC");
        self.header.header_crc = enabled;
        self
    }

    /// Mark the content as probably text (FTEXT)
    pub fn set_text(&mut self, text: bool) -> &mut Self {
        self.warn_if_header_emitted("text flag");
        self.header.text = text;
        self
    }

    /// Compress `data` into the member. Always accepts all of it.
    pub fn write_data(&mut self, data: &[u8]) -> Result<usize> {
        if self.closed || self.finishing {
            return Err(GzipError::Closed);
        }
        self.emit_header()?;
        if data.is_empty() {
            return Ok(0);
        }

        self.compressor.compress(data, &mut self.buffer)?;
        self.digest.update(data);

        if self.buffer.len() >= SINK_FLUSH_THRESHOLD {
            self.drain_buffer()?;
        }
        Ok(data.len())
    }

    /// Force out all data compressed so far without ending the member
    ///
    /// `FlushMode::Finish` is reserved for [`GzipWriter::close`] and is
    /// treated like `Sync` here.
    pub fn flush_mode(&mut self, mode: FlushMode) -> Result<()> {
        if self.closed || self.finishing {
            return Err(GzipError::Closed);
        }
        self.emit_header()?;
        let mode = match mode {
            FlushMode::Finish => FlushMode::Sync,
            other => other,
        };
        self.compressor.flush(mode, &mut self.buffer)?;
        self.drain_buffer()?;
        self.sink()?.flush()?;
        Ok(())
    }

    /// Finish the member: final compressed bytes, then the trailer
    ///
    /// Calling `close` again is a no-op. If a sink write fails part-way, the
    /// member is left unfinished and later calls return [`GzipError::Closed`]
    /// instead of writing a second tail.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.finishing {
            return Err(GzipError::Closed);
        }
        self.finishing = true;
        self.emit_header()?;
        self.compressor.flush(FlushMode::Finish, &mut self.buffer)?;
        self.drain_buffer()?;

        let trailer = Trailer::from(&self.digest);
        let output = self.sink()?;
        output.write_all(&trailer.to_bytes())?;
        output.flush()?;
        self.closed = true;

        log::debug!(
            "gzip member closed: {} bytes in, {} bytes compressed, crc32 {:#010x}",
            self.digest.total(),
            self.compressed_count,
            trailer.crc32
        );
        Ok(())
    }

    /// Close the member and return the sink
    pub fn finish(mut self) -> Result<W> {
        self.close()?;
        self.output.take().ok_or(GzipError::Closed)
    }

    /// Whether `close` has completed
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Uncompressed bytes written so far
    pub fn total_in(&self) -> u64 {
        self.digest.total()
    }

    /// Compressed bytes handed to the sink so far, header included
    pub fn total_out(&self) -> u64 {
        self.compressed_count
    }

    pub fn get_ref(&self) -> Option<&W> {
        self.output.as_ref()
    }

    pub fn get_mut(&mut self) -> Option<&mut W> {
        self.output.as_mut()
    }

    fn emit_header(&mut self) -> Result<()> {
        if self.header_emitted {
            return Ok(());
        }
        self.header.mtime = self.mtime.unwrap_or_else(current_mtime);
        let bytes = self.header.to_bytes();
        self.sink()?.write_all(&bytes)?;
        self.compressed_count += bytes.len() as u64;
        self.header_emitted = true;
        Ok(())
    }

    fn drain_buffer(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let output = self.output.as_mut().ok_or(GzipError::Closed)?;
        output.write_all(&self.buffer)?;
        self.compressed_count += self.buffer.len() as u64;
        self.buffer.clear();
        Ok(())
    }

    fn sink(&mut self) -> Result<&mut W> {
        self.output.as_mut().ok_or(GzipError::Closed)
    }

    fn warn_if_header_emitted(&self, field: &str) {
        if self.header_emitted {
            log::warn!("gzip header already written; {} change ignored", field);
        }
    }
}

impl<W: Write, B: Backend> Write for GzipWriter<W, B> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(self.write_data(buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(self.flush_mode(FlushMode::Sync)?)
    }
}

impl<W: Write, B: Backend> Drop for GzipWriter<W, B> {
    fn drop(&mut self) {
        if self.output.is_some() && !self.closed && !self.finishing {
            if let Err(e) = self.close() {
                log::warn!("failed to close gzip writer on drop: {}", e);
            }
        }
    }
}

fn current_mtime() -> u32 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as u32)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::{HeaderParse, FIXED_HEADER_LEN, TRAILER_LEN};
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_invalid_level_rejected_before_io() {
        let mut sink = Vec::new();
        let err = GzipWriter::with_level(&mut sink, 10).err().unwrap();
        assert!(matches!(err, GzipError::InvalidLevel { level: 10, .. }));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_header_written_on_first_write() {
        let mut writer = GzipWriter::new(Vec::new()).unwrap();
        writer.set_mtime(7);
        assert!(writer.get_ref().unwrap().is_empty());
        writer.write_data(b"x").unwrap();
        let sink = writer.get_ref().unwrap();
        assert!(sink.len() >= FIXED_HEADER_LEN);
        assert_eq!(&sink[..2], &[0x1f, 0x8b]);
        assert_eq!(&sink[4..8], &7u32.to_le_bytes());
    }

    #[test]
    fn test_empty_member_layout() {
        let mut writer = GzipWriter::new(Vec::new()).unwrap();
        writer.set_mtime(0);
        let out = writer.finish().unwrap();
        match MemberHeader::parse(&out) {
            HeaderParse::Complete { len, .. } => assert_eq!(len, FIXED_HEADER_LEN),
            other => panic!("unexpected: {:?}", other),
        }
        // Empty CRC and size
        assert_eq!(&out[out.len() - TRAILER_LEN..], &[0u8; TRAILER_LEN]);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut writer = GzipWriter::new(Vec::new()).unwrap();
        writer.set_mtime(1);
        writer.write_data(b"some data").unwrap();
        writer.close().unwrap();
        let once = writer.get_ref().unwrap().clone();
        writer.close().unwrap();
        assert_eq!(writer.get_ref().unwrap(), &once);
        assert!(writer.is_closed());
    }

    #[test]
    fn test_write_after_close_fails() {
        let mut writer = GzipWriter::new(Vec::new()).unwrap();
        writer.close().unwrap();
        assert!(matches!(writer.write_data(b"late"), Err(GzipError::Closed)));
        assert!(matches!(
            writer.flush_mode(FlushMode::Sync),
            Err(GzipError::Closed)
        ));
    }

    #[test]
    fn test_extra_flags_follow_level() {
        let out = GzipWriter::with_level(Vec::new(), 9).unwrap().finish().unwrap();
        assert_eq!(out[8], 2);
        let out = GzipWriter::with_level(Vec::new(), 1).unwrap().finish().unwrap();
        assert_eq!(out[8], 4);
        let out = GzipWriter::with_level(Vec::new(), 6).unwrap().finish().unwrap();
        assert_eq!(out[8], 0);
    }

    #[test]
    fn test_drop_closes_member() {
        let mut sink = Vec::new();
        {
            let mut writer = GzipWriter::new(&mut sink).unwrap();
            writer.write_data(b"dropped without close").unwrap();
        }
        let data = crate::oneshot::decompress(&sink).unwrap();
        assert_eq!(data, b"dropped without close");
    }

    /// Sink that starts failing once `fail` is set, counting every write attempt
    struct FailingSink {
        fail: Rc<Cell<bool>>,
        attempts: Rc<Cell<usize>>,
        data: Vec<u8>,
    }

    impl Write for FailingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.attempts.set(self.attempts.get() + 1);
            if self.fail.get() {
                return Err(io::Error::new(io::ErrorKind::Other, "disk full"));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_failed_close_is_not_retried() {
        let fail = Rc::new(Cell::new(false));
        let attempts = Rc::new(Cell::new(0));
        let sink = FailingSink {
            fail: Rc::clone(&fail),
            attempts: Rc::clone(&attempts),
            data: Vec::new(),
        };

        let mut writer = GzipWriter::new(sink).unwrap();
        writer.write_data(b"header goes out first").unwrap();
        fail.set(true);

        assert!(matches!(writer.close(), Err(GzipError::Io(_))));
        let after_failure = attempts.get();
        assert!(matches!(writer.close(), Err(GzipError::Closed)));
        assert!(matches!(writer.write_data(b"more"), Err(GzipError::Closed)));
        assert!(!writer.is_closed());
        drop(writer);
        assert_eq!(attempts.get(), after_failure);
    }

    #[test]
    fn test_counters() {
        let mut writer = GzipWriter::new(Vec::new()).unwrap();
        writer.write_data(&[b'a'; 1000]).unwrap();
        writer.close().unwrap();
        assert_eq!(writer.total_in(), 1000);
        let written = writer.get_ref().unwrap().len() as u64;
        assert_eq!(writer.total_out() + TRAILER_LEN as u64, written);
    }
}
