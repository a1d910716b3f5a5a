//! Error types for s-gzip

use std::io;

/// Result type for s-gzip operations
pub type Result<T> = std::result::Result<T, GzipError>;

/// Error types that can occur while reading or writing gzip members
#[derive(Debug)]
pub enum GzipError {
    /// I/O error from the underlying source or sink
    Io(io::Error),
    /// Compression level outside the backend's supported range
    InvalidLevel { level: u32, min: u32, max: u32 },
    /// Unsupported mode string or incompatible mode/option combination
    InvalidMode(String),
    /// Header field that cannot be encoded (oversized extra field, NUL in a name)
    InvalidHeader(String),
    /// The first member does not start with a valid gzip header
    BadHeader { offset: u64, reason: String },
    /// Trailer mismatch or invalid deflate data inside a member
    CorruptMember {
        member: u64,
        offset: u64,
        reason: String,
    },
    /// Source exhausted before the current member was complete
    UnexpectedEof {
        member: u64,
        offset: u64,
        decompressed: u64,
    },
    /// Codec backend failure
    Compression(String),
    /// Write or flush on a closed writer
    Closed,
}

impl std::fmt::Display for GzipError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GzipError::Io(e) => write!(f, "I/O error: {}", e),
            GzipError::InvalidLevel { level, min, max } => write!(
                f,
                "Compression level should be between {} and {}, got {}",
                min, max, level
            ),
            GzipError::InvalidMode(msg) => write!(f, "Invalid mode: {}", msg),
            GzipError::InvalidHeader(msg) => write!(f, "Invalid gzip header field: {}", msg),
            GzipError::BadHeader { offset, reason } => {
                write!(f, "Not a gzipped file (at byte {}): {}", offset, reason)
            }
            GzipError::CorruptMember {
                member,
                offset,
                reason,
            } => write!(
                f,
                "Corrupt gzip member #{} (at byte {}): {}",
                member, offset, reason
            ),
            GzipError::UnexpectedEof {
                member,
                offset,
                decompressed,
            } => write!(
                f,
                "Compressed file ended before the end-of-stream marker was reached \
                 (member #{}, {} bytes read, {} bytes decompressed)",
                member, offset, decompressed
            ),
            GzipError::Compression(msg) => write!(f, "Codec error: {}", msg),
            GzipError::Closed => write!(f, "Operation on closed gzip writer"),
        }
    }
}

impl std::error::Error for GzipError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GzipError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for GzipError {
    fn from(err: io::Error) -> Self {
        // Errors that passed through our own `Read`/`Write` impls come back unwrapped
        if !err.get_ref().is_some_and(|inner| inner.is::<GzipError>()) {
            return GzipError::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<GzipError>()) {
            Some(Ok(gz)) => *gz,
            Some(Err(other)) => GzipError::Io(io::Error::new(kind, other)),
            None => GzipError::Io(io::Error::from(kind)),
        }
    }
}

impl From<GzipError> for io::Error {
    fn from(err: GzipError) -> Self {
        let kind = match &err {
            GzipError::Io(e) => e.kind(),
            GzipError::InvalidLevel { .. }
            | GzipError::InvalidMode(_)
            | GzipError::InvalidHeader(_) => io::ErrorKind::InvalidInput,
            GzipError::BadHeader { .. } | GzipError::CorruptMember { .. } => {
                io::ErrorKind::InvalidData
            }
            GzipError::UnexpectedEof { .. } => io::ErrorKind::UnexpectedEof,
            GzipError::Compression(_) => io::ErrorKind::Other,
            GzipError::Closed => io::ErrorKind::BrokenPipe,
        };
        match err {
            GzipError::Io(e) => e,
            other => io::Error::new(kind, other),
        }
    }
}

impl GzipError {
    /// True for the truncation class of errors
    pub fn is_unexpected_eof(&self) -> bool {
        matches!(self, GzipError::UnexpectedEof { .. })
    }

    /// True for malformed-input errors (bad header, trailer or payload)
    pub fn is_corrupt(&self) -> bool {
        matches!(
            self,
            GzipError::BadHeader { .. } | GzipError::CorruptMember { .. }
        )
    }
}
