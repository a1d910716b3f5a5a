//! # s-gzip: Streaming gzip container library
//!
//! `s-gzip` reads and writes gzip (RFC 1952) streams incrementally, with memory
//! bounded by the requested read size rather than by the size of the data.
//!
//! ## Features
//!
//! - **Streaming Read**: Decompress any `Read` source in bounded chunks
//! - **Multi-member**: Concatenated members decompress as one continuous stream
//! - **Trailing data**: Garbage after the last member is ignored, not an error
//! - **Streaming Write**: Compress on-the-fly into any `Write` sink
//! - **Pluggable codec**: Compression goes through a [`Backend`] trait, flate2 by default
//!
//! ## Quick Start
//!
//! ### Reading a gzip file
//!
//! ```no_run
//! use s_gzip::GzipReader;
//!
//! let mut reader = GzipReader::open("reads.fastq.gz")?;
//!
//! loop {
//!     let chunk = reader.read_chunk(64 * 1024)?;
//!     if chunk.is_empty() {
//!         break;
//!     }
//!     println!("got {} bytes", chunk.len());
//! }
//! println!("{} members", reader.members_read());
//! # Ok::<(), s_gzip::GzipError>(())
//! ```
//!
//! ### Writing a gzip file
//!
//! ```no_run
//! use s_gzip::GzipWriter;
//!
//! let mut writer = GzipWriter::create_with_level("output.txt.gz", 9)?;
//! writer.write_data(b"Hello, World!")?;
//! writer.close()?;
//! # Ok::<(), s_gzip::GzipError>(())
//! ```
//!
//! ### Using arbitrary writers (in-memory, network, etc.)
//!
//! ```no_run
//! use s_gzip::GzipWriter;
//!
//! let mut writer = GzipWriter::new(Vec::new())?;
//! writer.set_mtime(0).set_filename("data.txt")?;
//! writer.write_data(b"In-memory gzip content")?;
//!
//! // finish() returns the sink, allowing you to extract the data
//! let gz_bytes = writer.finish()?;
//! assert_eq!(s_gzip::decompress(&gz_bytes)?, b"In-memory gzip content");
//! # Ok::<(), s_gzip::GzipError>(())
//! ```

pub mod codec;
pub mod digest;
pub mod error;
pub mod file;
pub mod header;
pub mod oneshot;
pub mod reader;
pub mod source;
pub mod writer;

pub use codec::{
    Backend, Flate2Backend, FlushMode, BEST_COMPRESSION, BEST_SPEED, DEFAULT_LEVEL, MAX_LEVEL,
    MIN_LEVEL,
};
pub use error::{GzipError, Result};
pub use file::{open, GzipFile, GzipHandle, Mode, Newline, OpenOptions};
pub use header::MemberHeader;
pub use oneshot::{compress, compress_with_mtime, decompress};
pub use reader::{GzipReader, StreamState};
pub use writer::GzipWriter;
