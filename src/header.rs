//! gzip member header and trailer (RFC 1952)
//!
//! Parsing works on a byte window that may end early. The caller keeps
//! pulling bytes while [`HeaderParse::Incomplete`] is returned and decides
//! what a missing tail means (truncation vs. clean end of stream).

use crate::codec::{crc32, BEST_COMPRESSION, BEST_SPEED};
use crate::digest::RunningDigest;
use crate::error::{GzipError, Result};

/// gzip magic bytes
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
/// Compression method byte for deflate, the only one defined
pub const METHOD_DEFLATE: u8 = 8;

pub const FLAG_TEXT: u8 = 0x01;
pub const FLAG_HCRC: u8 = 0x02;
pub const FLAG_EXTRA: u8 = 0x04;
pub const FLAG_NAME: u8 = 0x08;
pub const FLAG_COMMENT: u8 = 0x10;
const FLAG_RESERVED: u8 = 0xe0;

/// OS byte value for "unknown"
pub const OS_UNKNOWN: u8 = 255;

/// Size of the fixed part of the header
pub const FIXED_HEADER_LEN: usize = 10;
/// Size of the CRC-32 + ISIZE trailer
pub const TRAILER_LEN: usize = 8;

/// Parsed or to-be-written gzip member header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberHeader {
    /// Modification time, seconds since the Unix epoch (0 = not available)
    pub mtime: u32,
    /// XFL byte
    pub extra_flags: u8,
    /// OS byte
    pub os: u8,
    /// FTEXT hint
    pub text: bool,
    /// FEXTRA payload
    pub extra: Option<Vec<u8>>,
    /// FNAME bytes, without the terminating NUL
    pub filename: Option<Vec<u8>>,
    /// FCOMMENT bytes, without the terminating NUL
    pub comment: Option<Vec<u8>>,
    /// Whether an FHCRC field is present / should be written
    pub header_crc: bool,
}

impl Default for MemberHeader {
    fn default() -> Self {
        Self {
            mtime: 0,
            extra_flags: 0,
            os: OS_UNKNOWN,
            text: false,
            extra: None,
            filename: None,
            comment: None,
            header_crc: false,
        }
    }
}

/// Outcome of parsing a byte window as a member header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderParse {
    /// Header parsed; the payload starts at `len`
    Complete { header: MemberHeader, len: usize },
    /// The window is a valid header prefix but ends too early
    Incomplete,
    /// The window is not a gzip header
    Invalid(String),
}

/// XFL value conventionally written for a compression level
pub fn extra_flags_for_level(level: u32) -> u8 {
    match level {
        BEST_COMPRESSION => 2,
        BEST_SPEED => 4,
        _ => 0,
    }
}

impl MemberHeader {
    /// FLG byte describing which optional fields are present
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.text {
            flags |= FLAG_TEXT;
        }
        if self.header_crc {
            flags |= FLAG_HCRC;
        }
        if self.extra.is_some() {
            flags |= FLAG_EXTRA;
        }
        if self.filename.is_some() {
            flags |= FLAG_NAME;
        }
        if self.comment.is_some() {
            flags |= FLAG_COMMENT;
        }
        flags
    }

    /// Check that every optional field can be encoded
    pub fn validate(&self) -> Result<()> {
        if let Some(extra) = &self.extra {
            if extra.len() > u16::MAX as usize {
                return Err(GzipError::InvalidHeader(format!(
                    "extra field is {} bytes, maximum is {}",
                    extra.len(),
                    u16::MAX
                )));
            }
        }
        if self.filename.as_ref().is_some_and(|name| name.contains(&0)) {
            return Err(GzipError::InvalidHeader(
                "filename contains a NUL byte".to_string(),
            ));
        }
        if self.comment.as_ref().is_some_and(|c| c.contains(&0)) {
            return Err(GzipError::InvalidHeader(
                "comment contains a NUL byte".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize the header. Call [`MemberHeader::validate`] first.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(FIXED_HEADER_LEN + 16);
        out.extend_from_slice(&GZIP_MAGIC);
        out.push(METHOD_DEFLATE);
        out.push(self.flags());
        out.extend_from_slice(&self.mtime.to_le_bytes());
        out.push(self.extra_flags);
        out.push(self.os);

        if let Some(extra) = &self.extra {
            out.extend_from_slice(&(extra.len() as u16).to_le_bytes());
            out.extend_from_slice(extra);
        }
        if let Some(name) = &self.filename {
            out.extend_from_slice(name);
            out.push(0);
        }
        if let Some(comment) = &self.comment {
            out.extend_from_slice(comment);
            out.push(0);
        }
        if self.header_crc {
            let hcrc = crc32(&out, 0) as u16;
            out.extend_from_slice(&hcrc.to_le_bytes());
        }
        out
    }

    /// Try to parse a header from the start of `buf`
    pub fn parse(buf: &[u8]) -> HeaderParse {
        // Reject as soon as the available bytes prove this is not a header
        if buf.first().is_some_and(|&b| b != GZIP_MAGIC[0])
            || buf.get(1).is_some_and(|&b| b != GZIP_MAGIC[1])
        {
            return HeaderParse::Invalid("bad magic number".to_string());
        }
        if let Some(&method) = buf.get(2) {
            if method != METHOD_DEFLATE {
                return HeaderParse::Invalid(format!("unknown compression method {}", method));
            }
        }
        if let Some(&flags) = buf.get(3) {
            if flags & FLAG_RESERVED != 0 {
                return HeaderParse::Invalid(format!("reserved flag bits set: {:#04x}", flags));
            }
        }
        if buf.len() < FIXED_HEADER_LEN {
            return HeaderParse::Incomplete;
        }

        let flags = buf[3];
        let mut header = MemberHeader {
            mtime: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            extra_flags: buf[8],
            os: buf[9],
            text: flags & FLAG_TEXT != 0,
            extra: None,
            filename: None,
            comment: None,
            header_crc: flags & FLAG_HCRC != 0,
        };
        let mut pos = FIXED_HEADER_LEN;

        if flags & FLAG_EXTRA != 0 {
            let Some(len_bytes) = buf.get(pos..pos + 2) else {
                return HeaderParse::Incomplete;
            };
            let xlen = u16::from_le_bytes([len_bytes[0], len_bytes[1]]) as usize;
            let Some(extra) = buf.get(pos + 2..pos + 2 + xlen) else {
                return HeaderParse::Incomplete;
            };
            header.extra = Some(extra.to_vec());
            pos += 2 + xlen;
        }
        if flags & FLAG_NAME != 0 {
            let Some((name, next)) = read_zero_terminated(buf, pos) else {
                return HeaderParse::Incomplete;
            };
            header.filename = Some(name.to_vec());
            pos = next;
        }
        if flags & FLAG_COMMENT != 0 {
            let Some((comment, next)) = read_zero_terminated(buf, pos) else {
                return HeaderParse::Incomplete;
            };
            header.comment = Some(comment.to_vec());
            pos = next;
        }
        if header.header_crc {
            let Some(stored) = buf.get(pos..pos + 2) else {
                return HeaderParse::Incomplete;
            };
            let stored = u16::from_le_bytes([stored[0], stored[1]]);
            let computed = crc32(&buf[..pos], 0) as u16;
            if stored != computed {
                return HeaderParse::Invalid(format!(
                    "header CRC mismatch: stored {:#06x}, computed {:#06x}",
                    stored, computed
                ));
            }
            pos += 2;
        }

        HeaderParse::Complete { header, len: pos }
    }

    /// Filename as UTF-8, lossily converted
    pub fn filename_lossy(&self) -> Option<String> {
        self.filename
            .as_ref()
            .map(|name| String::from_utf8_lossy(name).into_owned())
    }
}

fn read_zero_terminated(buf: &[u8], pos: usize) -> Option<(&[u8], usize)> {
    let rest = buf.get(pos..)?;
    let nul = rest.iter().position(|&b| b == 0)?;
    Some((&rest[..nul], pos + nul + 1))
}

/// CRC-32 and uncompressed size following a member's payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trailer {
    pub crc32: u32,
    /// Uncompressed size modulo 2^32
    pub size: u32,
}

impl Trailer {
    pub fn parse(bytes: &[u8; TRAILER_LEN]) -> Self {
        Self {
            crc32: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            size: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    pub fn to_bytes(&self) -> [u8; TRAILER_LEN] {
        let mut out = [0u8; TRAILER_LEN];
        out[..4].copy_from_slice(&self.crc32.to_le_bytes());
        out[4..].copy_from_slice(&self.size.to_le_bytes());
        out
    }

    /// Compare against the digest of what was actually decompressed
    pub fn verify(&self, digest: &RunningDigest) -> std::result::Result<(), String> {
        let actual = Trailer::from(digest);
        if self.crc32 != actual.crc32 {
            return Err(format!(
                "CRC check failed {:#010x} != {:#010x}",
                self.crc32, actual.crc32
            ));
        }
        if self.size != actual.size {
            return Err(format!(
                "Incorrect length of data produced: trailer says {}, got {}",
                self.size, actual.size
            ));
        }
        Ok(())
    }
}

impl From<&RunningDigest> for Trailer {
    fn from(digest: &RunningDigest) -> Self {
        Self {
            crc32: digest.crc32(),
            size: digest.size(),
        }
    }
}
