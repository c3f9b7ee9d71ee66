/// Windowed line reading for inputs the router does not map: pipes and
/// files small enough that mmap setup costs more than it saves.
///
/// A 2MB window is refilled in place; the pending partial line slides to
/// the front of the buffer on refill, so a line is always contiguous when
/// yielded. Returned slices alias the window and are invalidated by the
/// next call — callers that must retain bytes across calls copy them into
/// an arena.
use std::io::{self, Read};

use memchr::memchr;

/// Window size: large enough to amortize read() syscalls, small enough
/// to stay cache- and memory-friendly.
pub const WINDOW_SIZE: usize = 2 * 1024 * 1024;

pub struct LineReader<R: Read> {
    inner: R,
    buf: Vec<u8>,
    /// First unconsumed byte.
    start: usize,
    /// One past the last valid byte.
    end: usize,
    eof: bool,
    /// Span of the most recently yielded line, for putback.
    last: Option<(usize, usize)>,
    putback: bool,
}

impl<R: Read> LineReader<R> {
    pub fn new(inner: R) -> LineReader<R> {
        LineReader::with_capacity(WINDOW_SIZE, inner)
    }

    /// Capacity hook for tests exercising refill and growth.
    pub fn with_capacity(cap: usize, inner: R) -> LineReader<R> {
        LineReader {
            inner,
            buf: vec![0; cap.max(16)],
            start: 0,
            end: 0,
            eof: false,
            last: None,
            putback: false,
        }
    }

    /// The next `\n`-delimited line without its newline. A final line
    /// with no trailing newline is yielded too. The returned slice is
    /// valid until the next call on this reader.
    pub fn next_line(&mut self) -> io::Result<Option<&[u8]>> {
        if self.putback {
            self.putback = false;
            let (s, e) = self.last.unwrap_or((0, 0));
            return Ok(Some(&self.buf[s..e]));
        }

        // Bytes before `search` have already been scanned for `\n`.
        let mut search = self.start;
        loop {
            if let Some(off) = memchr(b'\n', &self.buf[search..self.end]) {
                let s = self.start;
                let e = search + off;
                self.start = e + 1;
                self.last = Some((s, e));
                return Ok(Some(&self.buf[s..e]));
            }
            search = self.end;

            if self.eof {
                if self.start < self.end {
                    let (s, e) = (self.start, self.end);
                    self.start = self.end;
                    self.last = Some((s, e));
                    return Ok(Some(&self.buf[s..e]));
                }
                return Ok(None);
            }

            // Slide the pending partial line to the front of the window.
            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                search -= self.start;
                self.start = 0;
            }
            // A single line filling the whole window forces growth.
            if self.end == self.buf.len() {
                let doubled = self.buf.len() * 2;
                self.buf.resize(doubled, 0);
            }

            let n = match self.inner.read(&mut self.buf[self.end..]) {
                Ok(n) => n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            };
            if n == 0 {
                self.eof = true;
            } else {
                self.end += n;
            }
        }
    }

    /// Make the next `next_line` call return the most recent line again.
    /// Valid only until the following `next_line`.
    pub fn put_back(&mut self) {
        if self.last.is_some() {
            self.putback = true;
        }
    }
}
