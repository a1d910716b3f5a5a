//! File-style façade: open a gzip container by path or over an existing
//! handle, in binary or text mode
//!
//! ```no_run
//! use s_gzip::file::{open, Mode, OpenOptions};
//!
//! let mut out = open("notes.txt.gz", "wt".parse::<Mode>()?, OpenOptions::default())?;
//! std::io::Write::write_all(&mut out, b"first line\nsecond line\n")?;
//! out.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::codec::{Backend, Flate2Backend, DEFAULT_LEVEL};
use crate::error::{GzipError, Result};
use crate::reader::GzipReader;
use crate::writer::GzipWriter;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;
use std::str::FromStr;

/// How the container is accessed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Create or truncate
    Write,
    /// Create, failing if the file exists
    Exclusive,
    /// Add a new member after existing content
    Append,
}

impl Access {
    pub fn is_read(self) -> bool {
        self == Access::Read
    }
}

/// Parsed mode string (`"rb"`, `"wt"`, ...)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mode {
    pub access: Access,
    pub text: bool,
}

impl Default for Mode {
    fn default() -> Self {
        Self {
            access: Access::Read,
            text: false,
        }
    }
}

impl FromStr for Mode {
    type Err = GzipError;

    fn from_str(s: &str) -> Result<Self> {
        if s.contains('t') && s.contains('b') {
            return Err(GzipError::InvalidMode(format!("Invalid mode: {:?}", s)));
        }
        let (access, text) = match s {
            "r" | "rb" => (Access::Read, false),
            "w" | "wb" => (Access::Write, false),
            "x" | "xb" => (Access::Exclusive, false),
            "a" | "ab" => (Access::Append, false),
            "rt" => (Access::Read, true),
            "wt" => (Access::Write, true),
            "xt" => (Access::Exclusive, true),
            "at" => (Access::Append, true),
            _ => return Err(GzipError::InvalidMode(format!("Invalid mode: {:?}", s))),
        };
        Ok(Self { access, text })
    }
}

/// Line ending handling in text mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Newline {
    /// Reading: `\r\n` and `\r` become `\n`. Writing: no translation.
    #[default]
    Universal,
    /// Lines end at `\n`, nothing is translated
    Lf,
    /// Reading: lines end at `\r\n`, untranslated. Writing: `\n` becomes `\r\n`.
    CrLf,
}

/// Options for [`open`] and the `GzipHandle` constructors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenOptions {
    /// Compression level, validated in every mode
    pub level: u32,
    /// Text-mode newline handling; must be `None` in binary mode
    pub newline: Option<Newline>,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            level: DEFAULT_LEVEL,
            newline: None,
        }
    }
}

impl OpenOptions {
    pub fn level(mut self, level: u32) -> Self {
        self.level = level;
        self
    }

    pub fn newline(mut self, newline: Newline) -> Self {
        self.newline = Some(newline);
        self
    }

    fn validate(&self, mode: Mode) -> Result<()> {
        if !mode.text && self.newline.is_some() {
            return Err(GzipError::InvalidMode(
                "Argument 'newline' not supported in binary mode".to_string(),
            ));
        }
        Flate2Backend.validate_level(self.level)?;
        Ok(())
    }
}

/// Line-oriented UTF-8 reader over decompressed content
pub struct TextReader<R: Read> {
    inner: BufReader<GzipReader<R>>,
    newline: Newline,
}

impl<R: Read> TextReader<R> {
    pub fn new(reader: GzipReader<R>, newline: Newline) -> Self {
        Self {
            inner: BufReader::new(reader),
            newline,
        }
    }

    /// Append the next line, terminator included, to `buf`
    ///
    /// Returns the number of bytes appended; 0 means end of content.
    pub fn read_line(&mut self, buf: &mut String) -> Result<usize> {
        let mut line = Vec::new();
        match self.newline {
            Newline::Lf => {
                self.inner.read_until(b'\n', &mut line)?;
            }
            Newline::CrLf => loop {
                if self.inner.read_until(b'\n', &mut line)? == 0 || line.ends_with(b"\r\n") {
                    break;
                }
            },
            Newline::Universal => self.read_universal_line(&mut line)?,
        }
        let text = String::from_utf8(line)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        buf.push_str(&text);
        Ok(text.len())
    }

    /// Iterate over lines with the terminator removed
    pub fn lines(self) -> Lines<R> {
        Lines { reader: self }
    }

    /// Read the rest of the content as one string
    pub fn read_to_string(&mut self) -> Result<String> {
        let mut out = String::new();
        while self.read_line(&mut out)? > 0 {}
        Ok(out)
    }

    pub fn get_ref(&self) -> &GzipReader<R> {
        self.inner.get_ref()
    }

    pub fn into_inner(self) -> GzipReader<R> {
        self.inner.into_inner()
    }

    fn read_universal_line(&mut self, line: &mut Vec<u8>) -> Result<()> {
        loop {
            let available = self.inner.fill_buf()?;
            if available.is_empty() {
                return Ok(());
            }
            match available.iter().position(|&b| b == b'\n' || b == b'\r') {
                None => {
                    let n = available.len();
                    line.extend_from_slice(available);
                    self.inner.consume(n);
                }
                Some(i) => {
                    let is_cr = available[i] == b'\r';
                    line.extend_from_slice(&available[..i]);
                    line.push(b'\n');
                    self.inner.consume(i + 1);
                    if is_cr {
                        // \r\n may straddle a buffer refill
                        if self.inner.fill_buf()?.first() == Some(&b'\n') {
                            self.inner.consume(1);
                        }
                    }
                    return Ok(());
                }
            }
        }
    }
}

/// Raw reads apply the same newline translation as [`TextReader::read_line`]
impl<R: Read> Read for TextReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.newline != Newline::Universal || buf.is_empty() {
            return self.inner.read(buf);
        }

        let available = self.inner.fill_buf()?;
        let mut written = 0;
        let mut consumed = 0;
        let mut trailing_cr = false;
        while written < buf.len() && consumed < available.len() {
            let byte = available[consumed];
            consumed += 1;
            if byte == b'\r' {
                buf[written] = b'\n';
                match available.get(consumed) {
                    Some(b'\n') => consumed += 1,
                    Some(_) => {}
                    None => trailing_cr = true,
                }
            } else {
                buf[written] = byte;
            }
            written += 1;
        }
        self.inner.consume(consumed);

        if trailing_cr && self.inner.fill_buf()?.first() == Some(&b'\n') {
            self.inner.consume(1);
        }
        Ok(written)
    }
}

/// Iterator returned by [`TextReader::lines`]
pub struct Lines<R: Read> {
    reader: TextReader<R>,
}

impl<R: Read> Iterator for Lines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut line = String::new();
        match self.reader.read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => {
                let terminator = match self.reader.newline {
                    Newline::CrLf if line.ends_with("\r\n") => 2,
                    _ if line.ends_with('\n') => 1,
                    _ => 0,
                };
                line.truncate(line.len() - terminator);
                Some(Ok(line))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// UTF-8 writer with optional `\n` to `\r\n` translation
pub struct TextWriter<W: Write> {
    inner: GzipWriter<W>,
    newline: Newline,
}

impl<W: Write> TextWriter<W> {
    pub fn new(writer: GzipWriter<W>, newline: Newline) -> Self {
        Self {
            inner: writer,
            newline,
        }
    }

    /// Write `text`, returning its length in bytes before translation
    pub fn write_str(&mut self, text: &str) -> Result<usize> {
        self.write_translated(text.as_bytes())?;
        Ok(text.len())
    }

    pub fn close(&mut self) -> Result<()> {
        self.inner.close()
    }

    pub fn finish(self) -> Result<W> {
        self.inner.finish()
    }

    pub fn get_ref(&self) -> &GzipWriter<W> {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut GzipWriter<W> {
        &mut self.inner
    }

    fn write_translated(&mut self, bytes: &[u8]) -> Result<()> {
        if self.newline != Newline::CrLf {
            self.inner.write_data(bytes)?;
            return Ok(());
        }
        for (i, segment) in bytes.split(|&b| b == b'\n').enumerate() {
            if i > 0 {
                self.inner.write_data(b"\r\n")?;
            }
            self.inner.write_data(segment)?;
        }
        Ok(())
    }
}

impl<W: Write> Write for TextWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_translated(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// An open gzip container in one of four shapes
pub enum GzipHandle<R: Read, W: Write> {
    Reader(GzipReader<R>),
    Writer(GzipWriter<W>),
    TextReader(TextReader<R>),
    TextWriter(TextWriter<W>),
}

/// Handle returned by [`open`]
pub type GzipFile = GzipHandle<File, File>;

/// Open a gzip file by path
///
/// `w` truncates, `x` fails if the file already exists and `a` appends a new
/// member. Options are validated before the file is touched.
pub fn open<P: AsRef<Path>>(path: P, mode: Mode, options: OpenOptions) -> Result<GzipFile> {
    options.validate(mode)?;
    let path = path.as_ref();
    log::debug!("opening {} with mode {:?}", path.display(), mode);
    let handle = match mode.access {
        Access::Read => {
            let reader = GzipReader::open(path)?;
            GzipHandle::wrap_reader(reader, mode, options)
        }
        Access::Write => {
            let writer = GzipWriter::create_with_level(path, options.level)?;
            GzipHandle::wrap_writer(writer, mode, options)
        }
        Access::Exclusive => {
            let writer = GzipWriter::create_new_with_level(path, options.level)?;
            GzipHandle::wrap_writer(writer, mode, options)
        }
        Access::Append => {
            let writer = GzipWriter::append_with_level(path, options.level)?;
            GzipHandle::wrap_writer(writer, mode, options)
        }
    };
    Ok(handle)
}

impl<R: Read> GzipHandle<R, io::Sink> {
    /// Wrap a caller-supplied source; `mode` must be a read mode
    pub fn from_reader(reader: R, mode: Mode, options: OpenOptions) -> Result<Self> {
        options.validate(mode)?;
        if !mode.access.is_read() {
            return Err(GzipError::InvalidMode(format!(
                "{:?} mode needs a writable handle",
                mode.access
            )));
        }
        Ok(Self::wrap_reader(GzipReader::new(reader), mode, options))
    }
}

impl<W: Write> GzipHandle<io::Empty, W> {
    /// Wrap a caller-supplied sink; `mode` must be a write, exclusive or append mode
    pub fn from_writer(writer: W, mode: Mode, options: OpenOptions) -> Result<Self> {
        options.validate(mode)?;
        if mode.access.is_read() {
            return Err(GzipError::InvalidMode(
                "read mode needs a readable handle".to_string(),
            ));
        }
        let writer = GzipWriter::with_level(writer, options.level)?;
        Ok(Self::wrap_writer(writer, mode, options))
    }
}

impl<R: Read, W: Write> GzipHandle<R, W> {
    fn wrap_reader(reader: GzipReader<R>, mode: Mode, options: OpenOptions) -> Self {
        if mode.text {
            GzipHandle::TextReader(TextReader::new(reader, options.newline.unwrap_or_default()))
        } else {
            GzipHandle::Reader(reader)
        }
    }

    fn wrap_writer(mut writer: GzipWriter<W>, mode: Mode, options: OpenOptions) -> Self {
        if mode.text {
            writer.set_text(true);
            GzipHandle::TextWriter(TextWriter::new(writer, options.newline.unwrap_or_default()))
        } else {
            GzipHandle::Writer(writer)
        }
    }

    pub fn is_text(&self) -> bool {
        matches!(self, GzipHandle::TextReader(_) | GzipHandle::TextWriter(_))
    }

    pub fn is_reader(&self) -> bool {
        matches!(self, GzipHandle::Reader(_) | GzipHandle::TextReader(_))
    }

    /// Finish a writer's member; readers have nothing to finish
    pub fn close(&mut self) -> Result<()> {
        match self {
            GzipHandle::Writer(w) => w.close(),
            GzipHandle::TextWriter(w) => w.close(),
            GzipHandle::Reader(_) | GzipHandle::TextReader(_) => Ok(()),
        }
    }
}

fn unsupported(operation: &str) -> io::Error {
    io::Error::new(
        io::ErrorKind::Unsupported,
        format!("{} on a gzip handle opened for the other direction", operation),
    )
}

impl<R: Read, W: Write> Read for GzipHandle<R, W> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            GzipHandle::Reader(r) => r.read(buf),
            GzipHandle::TextReader(r) => r.read(buf),
            GzipHandle::Writer(_) | GzipHandle::TextWriter(_) => Err(unsupported("read")),
        }
    }
}

impl<R: Read, W: Write> Write for GzipHandle<R, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            GzipHandle::Writer(w) => w.write(buf),
            GzipHandle::TextWriter(w) => w.write(buf),
            GzipHandle::Reader(_) | GzipHandle::TextReader(_) => Err(unsupported("write")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            GzipHandle::Writer(w) => w.flush(),
            GzipHandle::TextWriter(w) => w.flush(),
            GzipHandle::Reader(_) | GzipHandle::TextReader(_) => Err(unsupported("flush")),
        }
    }
}
