//! Streaming gzip reader - decompresses one or more concatenated members
//!
//! The reader never reads past what it needs: bytes the decompressor did not
//! consume (because the output bound was reached, or because they belong to
//! the trailer and the next member) are pushed back into the source so the
//! next step sees them first.
//!
//! Bytes after a complete member that do not form a gzip header are left
//! unread and treated as the end of the content. They stay available through
//! [`GzipReader::trailing_data`]. A header that starts correctly but is cut
//! off by the end of input is a truncation error, not trailing data.

use crate::codec::{Backend, Decompressor, Flate2Backend};
use crate::digest::RunningDigest;
use crate::error::{GzipError, Result};
use crate::header::{HeaderParse, MemberHeader, Trailer, TRAILER_LEN};
use crate::source::PushbackSource;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Default size of each read from the underlying source
pub const READ_BLOCK_SIZE: usize = 64 * 1024;

/// Where the reader is in the member sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Next bytes should be a member header
    AwaitingHeader,
    /// Decompressing a member payload
    InMember,
    /// A member ended and its trailer matched
    MemberComplete,
    /// Non-header bytes followed a complete member; they are left unread
    TrailingDataSeen,
    /// Source exhausted at a member boundary
    Exhausted,
}

/// Streaming gzip reader over any `Read` source
pub struct GzipReader<R: Read, B: Backend = Flate2Backend> {
    source: PushbackSource<R>,
    backend: B,
    decompressor: B::Decompressor,
    state: StreamState,
    digest: RunningDigest,
    header: Option<MemberHeader>,
    members: u64,
    decompressed: u64,
    block_size: usize,
}

impl GzipReader<File> {
    /// Open a gzip file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::new(File::open(path)?))
    }
}

impl<R: Read> GzipReader<R> {
    /// Create a reader using the default flate2 backend
    pub fn new(reader: R) -> Self {
        Self::with_backend(reader, Flate2Backend)
    }
}

impl<R: Read, B: Backend> GzipReader<R, B> {
    /// Create a reader that decompresses with `backend`
    pub fn with_backend(reader: R, backend: B) -> Self {
        let decompressor = backend.decompressor();
        Self {
            source: PushbackSource::new(reader),
            backend,
            decompressor,
            state: StreamState::AwaitingHeader,
            digest: RunningDigest::new(),
            header: None,
            members: 0,
            decompressed: 0,
            block_size: READ_BLOCK_SIZE,
        }
    }

    /// Set how many bytes are requested from the source per read (default 64KB)
    pub fn set_buffer_size(&mut self, size: usize) -> &mut Self {
        self.block_size = size.max(1);
        self
    }

    /// Read up to `size` decompressed bytes
    ///
    /// At most one buffer-size worth is returned per call. Returns an empty
    /// vector only at the end of the content. `size == 0` returns immediately
    /// without touching the source.
    pub fn read_chunk(&mut self, size: usize) -> Result<Vec<u8>> {
        if size == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0u8; size.min(self.block_size)];
        let n = self.read_into(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    /// Read and decompress everything up to the end of the content
    pub fn read_all(&mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; self.block_size];
        loop {
            let n = self.read_into(&mut buf)?;
            if n == 0 {
                return Ok(out);
            }
            out.extend_from_slice(&buf[..n]);
        }
    }

    /// Current state of the member state machine
    pub fn state(&self) -> StreamState {
        self.state
    }

    /// Number of members fully read and validated
    pub fn members_read(&self) -> u64 {
        self.members
    }

    /// Header of the member currently (or most recently) being read
    pub fn header(&self) -> Option<&MemberHeader> {
        self.header.as_ref()
    }

    /// Compressed bytes consumed from the source
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// Decompressed bytes returned so far, across all members
    pub fn decompressed(&self) -> u64 {
        self.decompressed
    }

    /// Bytes after the last member that were not a gzip header
    ///
    /// Only the bytes already pulled from the source are available here;
    /// the rest is still in the source.
    pub fn trailing_data(&self) -> &[u8] {
        match self.state {
            StreamState::TrailingDataSeen => self.source.pending(),
            _ => &[],
        }
    }

    pub fn get_ref(&self) -> &R {
        self.source.get_ref()
    }

    pub fn get_mut(&mut self) -> &mut R {
        self.source.get_mut()
    }

    /// Unread bytes already pulled from the source, and the source itself
    pub fn into_parts(self) -> (Vec<u8>, R) {
        self.source.into_parts()
    }

    /// Bounded read: fill at most `out.len()` bytes, looping until at least
    /// one byte is produced or the content ends
    fn read_into(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        loop {
            match self.state {
                StreamState::Exhausted | StreamState::TrailingDataSeen => return Ok(0),
                StreamState::AwaitingHeader | StreamState::MemberComplete => {
                    if !self.start_member()? {
                        return Ok(0);
                    }
                }
                StreamState::InMember => {
                    let produced = self.inflate_block(out)?;
                    if produced > 0 {
                        return Ok(produced);
                    }
                }
            }
        }
    }

    /// Parse the next member header. Returns false when there is no next member.
    fn start_member(&mut self) -> Result<bool> {
        self.state = StreamState::AwaitingHeader;
        if self.members > 0 {
            self.skip_zero_padding()?;
        }

        let mut window: Vec<u8> = Vec::new();
        loop {
            match MemberHeader::parse(&window) {
                HeaderParse::Complete { header, len } => {
                    self.source.prepend(window.split_off(len));
                    log::debug!(
                        "gzip member #{} header: {} bytes, flags {:#04x}, mtime {}",
                        self.members,
                        len,
                        header.flags(),
                        header.mtime
                    );
                    self.header = Some(header);
                    self.decompressor = self.backend.decompressor();
                    self.digest.reset();
                    self.state = StreamState::InMember;
                    return Ok(true);
                }
                HeaderParse::Invalid(reason) => {
                    self.source.prepend(window);
                    if self.members == 0 {
                        return Err(GzipError::BadHeader {
                            offset: self.source.position(),
                            reason,
                        });
                    }
                    log::debug!(
                        "ignoring trailing data after gzip member #{}: {}",
                        self.members - 1,
                        reason
                    );
                    self.state = StreamState::TrailingDataSeen;
                    return Ok(false);
                }
                HeaderParse::Incomplete => {
                    let chunk = self.source.read(self.block_size)?;
                    if !chunk.is_empty() {
                        window.extend_from_slice(&chunk);
                        continue;
                    }
                    if window.is_empty() {
                        log::debug!("gzip stream exhausted after {} member(s)", self.members);
                        self.state = StreamState::Exhausted;
                        return Ok(false);
                    }
                    // A valid header prefix cut off by the end of input
                    log::debug!(
                        "source ended {} bytes into the header of member #{}",
                        window.len(),
                        self.members
                    );
                    self.source.prepend(window);
                    return Err(self.truncated());
                }
            }
        }
    }

    /// Feed one source block to the decompressor. Returns the bytes produced.
    fn inflate_block(&mut self, out: &mut [u8]) -> Result<usize> {
        let mut block = self.source.read(self.block_size)?;
        let source_exhausted = block.is_empty();

        let step = self
            .decompressor
            .decompress(&block, out)
            .map_err(|e| self.corrupt(e))?;

        self.digest.update(&out[..step.produced]);
        self.decompressed += step.produced as u64;

        let unconsumed = block.len() - step.consumed;
        if unconsumed > 0 {
            block.drain(..step.consumed);
            self.source.prepend(block);
        }

        if step.stream_end {
            self.finish_member()?;
        } else if step.produced == 0 {
            if source_exhausted {
                return Err(self.truncated());
            }
            if step.consumed == 0 {
                return Err(self.corrupt(GzipError::Compression(
                    "decompressor made no progress".to_string(),
                )));
            }
        }
        Ok(step.produced)
    }

    /// Read and check the trailer of the member that just ended
    fn finish_member(&mut self) -> Result<()> {
        let bytes = self.source.read_exact_or_eof(TRAILER_LEN)?;
        let Ok(bytes) = <[u8; TRAILER_LEN]>::try_from(bytes.as_slice()) else {
            return Err(self.truncated());
        };
        let trailer = Trailer::parse(&bytes);
        if let Err(reason) = trailer.verify(&self.digest) {
            return Err(GzipError::CorruptMember {
                member: self.members,
                offset: self.source.position(),
                reason,
            });
        }

        log::debug!(
            "gzip member #{} complete: {} bytes, crc32 {:#010x}",
            self.members,
            self.digest.total(),
            trailer.crc32
        );
        self.members += 1;
        self.state = StreamState::MemberComplete;
        Ok(())
    }

    fn skip_zero_padding(&mut self) -> Result<()> {
        loop {
            let mut chunk = self.source.read(self.block_size)?;
            if chunk.is_empty() {
                return Ok(());
            }
            if let Some(start) = chunk.iter().position(|&b| b != 0) {
                chunk.drain(..start);
                self.source.prepend(chunk);
                return Ok(());
            }
        }
    }

    fn truncated(&self) -> GzipError {
        GzipError::UnexpectedEof {
            member: self.members,
            offset: self.source.position(),
            decompressed: self.decompressed,
        }
    }

    fn corrupt(&self, err: GzipError) -> GzipError {
        match err {
            GzipError::Compression(reason) => GzipError::CorruptMember {
                member: self.members,
                offset: self.source.position(),
                reason,
            },
            other => other,
        }
    }
}

impl<R: Read, B: Backend> Read for GzipReader<R, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.read_into(buf)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oneshot::compress;
    use std::io::Cursor;

    #[test]
    fn test_single_member() {
        let data = b"Hello, gzip!".repeat(50);
        let compressed = compress(&data, 6).unwrap();
        let mut reader = GzipReader::new(Cursor::new(compressed));
        assert_eq!(reader.state(), StreamState::AwaitingHeader);
        assert_eq!(reader.read_all().unwrap(), data);
        assert_eq!(reader.state(), StreamState::Exhausted);
        assert_eq!(reader.members_read(), 1);
    }

    #[test]
    fn test_huge_read_request_is_bounded() {
        let compressed = compress(b"ACGT", 6).unwrap();
        let mut reader = GzipReader::new(Cursor::new(compressed));
        assert_eq!(reader.read_chunk(usize::MAX).unwrap(), b"ACGT");
        assert!(reader.read_chunk(usize::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_cut_off_second_header_is_truncation() {
        let mut compressed = compress(b"first", 6).unwrap();
        let second = compress(b"second", 6).unwrap();
        compressed.extend_from_slice(&second[..4]);
        let mut reader = GzipReader::new(Cursor::new(compressed));
        match reader.read_all() {
            Err(GzipError::UnexpectedEof { member, .. }) => assert_eq!(member, 1),
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(reader.members_read(), 1);
    }

    #[test]
    fn test_zero_size_read_touches_nothing() {
        let compressed = compress(b"abc", 6).unwrap();
        let mut reader = GzipReader::new(Cursor::new(compressed));
        assert!(reader.read_chunk(0).unwrap().is_empty());
        assert_eq!(reader.get_ref().position(), 0);
        assert_eq!(reader.state(), StreamState::AwaitingHeader);
    }

    #[test]
    fn test_empty_source_is_empty_content() {
        let mut reader = GzipReader::new(Cursor::new(Vec::new()));
        assert!(reader.read_all().unwrap().is_empty());
        assert_eq!(reader.state(), StreamState::Exhausted);
        assert_eq!(reader.members_read(), 0);
    }

    #[test]
    fn test_state_after_member_boundary() {
        let mut compressed = compress(b"first", 6).unwrap();
        compressed.extend(compress(b"second", 6).unwrap());
        let mut reader = GzipReader::new(Cursor::new(compressed));

        assert_eq!(reader.read_chunk(5).unwrap(), b"first");
        // Output bound was hit exactly at the end of the payload
        assert_eq!(reader.read_chunk(100).unwrap(), b"second");
        assert_eq!(reader.members_read(), 2);
        assert!(reader.read_chunk(100).unwrap().is_empty());
        assert_eq!(reader.state(), StreamState::Exhausted);
    }

    #[test]
    fn test_trailing_data_kept_unread() {
        let mut compressed = compress(b"payload", 6).unwrap();
        compressed.extend_from_slice(b"not a gzip member");
        let mut reader = GzipReader::new(Cursor::new(compressed));
        assert_eq!(reader.read_all().unwrap(), b"payload");
        assert_eq!(reader.state(), StreamState::TrailingDataSeen);
        assert_eq!(reader.trailing_data(), b"not a gzip member");

        let (pending, _) = reader.into_parts();
        assert_eq!(pending, b"not a gzip member");
    }

    #[test]
    fn test_zero_padding_between_members() {
        let mut compressed = compress(b"one", 6).unwrap();
        compressed.extend_from_slice(&[0u8; 32]);
        compressed.extend(compress(b"two", 6).unwrap());
        compressed.extend_from_slice(&[0u8; 5]);
        let mut reader = GzipReader::new(Cursor::new(compressed));
        assert_eq!(reader.read_all().unwrap(), b"onetwo");
        assert_eq!(reader.members_read(), 2);
        assert_eq!(reader.state(), StreamState::Exhausted);
    }

    #[test]
    fn test_header_exposed() {
        let mut out = Vec::new();
        {
            let mut writer = crate::writer::GzipWriter::new(&mut out).unwrap();
            writer.set_mtime(42).set_filename("reads.fastq").unwrap();
            writer.write_data(b"ACGT").unwrap();
            writer.close().unwrap();
        }
        let mut reader = GzipReader::new(Cursor::new(out));
        assert_eq!(reader.read_all().unwrap(), b"ACGT");
        let header = reader.header().unwrap();
        assert_eq!(header.mtime, 42);
        assert_eq!(header.filename_lossy().as_deref(), Some("reads.fastq"));
    }

    #[test]
    fn test_tiny_source_blocks() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i % 251) as u8).collect();
        let mut compressed = compress(&data, 9).unwrap();
        compressed.extend(compress(&data, 1).unwrap());
        let mut reader = GzipReader::new(Cursor::new(compressed));
        reader.set_buffer_size(3);
        let mut expected = data.clone();
        expected.extend_from_slice(&data);
        assert_eq!(reader.read_all().unwrap(), expected);
    }

    #[test]
    fn test_truncated_header_on_first_member() {
        let compressed = compress(b"abc", 6).unwrap();
        let mut reader = GzipReader::new(Cursor::new(compressed[..5].to_vec()));
        let err = reader.read_all().unwrap_err();
        assert!(err.is_unexpected_eof(), "got {:?}", err);
    }

    #[test]
    fn test_not_gzip() {
        let mut reader = GzipReader::new(Cursor::new(b"plain text, not gzip".to_vec()));
        let err = reader.read_all().unwrap_err();
        assert!(matches!(err, GzipError::BadHeader { offset: 0, .. }), "got {:?}", err);
    }

    #[test]
    fn test_io_read_maps_errors() {
        let mut reader = GzipReader::new(Cursor::new(b"garbage".to_vec()));
        let mut buf = Vec::new();
        let err = reader.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        let gz = GzipError::from(err);
        assert!(matches!(gz, GzipError::BadHeader { .. }));
    }
}
