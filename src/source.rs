//! Push-back byte source
//!
//! Wraps any `Read` and lets the gzip reader hand back bytes it read but did
//! not consume (the decompressor's unconsumed tail, or the start of the next
//! member). Re-queued bytes are delivered before any new physical read.

use std::io::{self, Read};

/// Byte source with a single re-queue slot
pub struct PushbackSource<R: Read> {
    inner: R,
    pending: Vec<u8>,
    pending_pos: usize,
    physical_reads: u64,
}

impl<R: Read> PushbackSource<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            pending: Vec::new(),
            pending_pos: 0,
            physical_reads: 0,
        }
    }

    /// Read up to `n` bytes. An empty result means the source is exhausted.
    ///
    /// Pending bytes are returned on their own, without touching the inner source.
    pub fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let remaining = self.pending.len() - self.pending_pos;
        if remaining > 0 {
            let take = remaining.min(n);
            let chunk = if self.pending_pos == 0 && take == self.pending.len() {
                std::mem::take(&mut self.pending)
            } else {
                self.pending[self.pending_pos..self.pending_pos + take].to_vec()
            };
            self.pending_pos += take;
            if self.pending_pos >= self.pending.len() {
                self.pending.clear();
                self.pending_pos = 0;
            }
            return Ok(chunk);
        }

        let mut buf = vec![0u8; n];
        let read = loop {
            match self.inner.read(&mut buf) {
                Ok(read) => break read,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        };
        buf.truncate(read);
        self.physical_reads += read as u64;
        log::trace!("pushback source: physical read of {} bytes", read);
        Ok(buf)
    }

    /// Read until `n` bytes are collected or the source is exhausted
    pub fn read_exact_or_eof(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(n);
        while out.len() < n {
            let chunk = self.read(n - out.len())?;
            if chunk.is_empty() {
                break;
            }
            out.extend_from_slice(&chunk);
        }
        Ok(out)
    }

    /// Queue `bytes` so the next `read` returns them first
    pub fn prepend(&mut self, mut bytes: Vec<u8>) {
        if bytes.is_empty() {
            return;
        }
        if self.pending_pos < self.pending.len() {
            bytes.extend_from_slice(&self.pending[self.pending_pos..]);
        }
        self.pending = bytes;
        self.pending_pos = 0;
    }

    /// Bytes read from the inner source but not yet consumed
    pub fn pending(&self) -> &[u8] {
        &self.pending[self.pending_pos..]
    }

    /// Number of source bytes consumed by the caller so far
    pub fn position(&self) -> u64 {
        self.physical_reads.saturating_sub(self.pending().len() as u64)
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Split into unconsumed pending bytes and the inner source
    pub fn into_parts(mut self) -> (Vec<u8>, R) {
        let pending = self.pending.split_off(self.pending_pos);
        (pending, self.inner)
    }
}
