/// RFC 4180 record reading for streamed input.
///
/// Quoted fields may contain delimiters, quotes (doubled), and line
/// breaks, so a record boundary is the first `\n` OUTSIDE quotes — plain
/// line splitting is wrong here. This path also materializes unescaped
/// field bytes into a caller-owned scratch buffer; it trades copies for
/// correctness and only ever runs on the stdin/small-input route.
use std::io::{self, Read};

use crate::scan::MAX_FIELDS;

use super::core::WINDOW_SIZE;

pub struct RecordReader<R: Read> {
    inner: R,
    buf: Vec<u8>,
    start: usize,
    end: usize,
    eof: bool,
}

impl<R: Read> RecordReader<R> {
    pub fn new(inner: R) -> RecordReader<R> {
        RecordReader::with_capacity(WINDOW_SIZE, inner)
    }

    pub fn with_capacity(cap: usize, inner: R) -> RecordReader<R> {
        RecordReader {
            inner,
            buf: vec![0; cap.max(16)],
            start: 0,
            end: 0,
            eof: false,
        }
    }

    /// The next logical record, without its terminating newline and with
    /// a trailing `\r` stripped. Quote state carries across window
    /// refills. The slice is valid until the next call.
    pub fn next_record(&mut self) -> io::Result<Option<&[u8]>> {
        let mut scan = self.start;
        let mut in_quotes = false;
        loop {
            while scan < self.end {
                let b = self.buf[scan];
                if b == b'"' {
                    in_quotes = !in_quotes;
                } else if b == b'\n' && !in_quotes {
                    let s = self.start;
                    let mut e = scan;
                    if e > s && self.buf[e - 1] == b'\r' {
                        e -= 1;
                    }
                    self.start = scan + 1;
                    return Ok(Some(&self.buf[s..e]));
                }
                scan += 1;
            }

            if self.eof {
                if self.start < self.end {
                    let s = self.start;
                    let mut e = self.end;
                    if e > s && self.buf[e - 1] == b'\r' {
                        e -= 1;
                    }
                    self.start = self.end;
                    return Ok(Some(&self.buf[s..e]));
                }
                return Ok(None);
            }

            if self.start > 0 {
                self.buf.copy_within(self.start..self.end, 0);
                self.end -= self.start;
                scan -= self.start;
                self.start = 0;
            }
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
}

/// Split one record into unescaped fields. Field bytes are appended to
/// `scratch` and `bounds` receives their (start, end) ranges — offsets,
/// not slices, so callers can keep reusing both buffers.
///
/// Returns false when the record holds more than MAX_FIELDS fields;
/// callers drop the record, matching the unquoted splitter.
pub fn split_quoted(record: &[u8], scratch: &mut Vec<u8>, bounds: &mut Vec<(usize, usize)>) -> bool {
    scratch.clear();
    bounds.clear();
    let n = record.len();
    let mut i = 0;
    loop {
        let fstart = scratch.len();
        if i < n && record[i] == b'"' {
            i += 1;
            while i < n {
                if record[i] == b'"' {
                    if i + 1 < n && record[i + 1] == b'"' {
                        scratch.push(b'"');
                        i += 2;
                    } else {
                        i += 1;
                        break;
                    }
                } else {
                    scratch.push(record[i]);
                    i += 1;
                }
            }
            // Tolerate stray bytes between the closing quote and the
            // delimiter rather than erroring mid-scan.
            while i < n && record[i] != b',' {
                i += 1;
            }
        } else {
            while i < n && record[i] != b',' {
                scratch.push(record[i]);
                i += 1;
            }
        }
        if bounds.len() == MAX_FIELDS {
            return false;
        }
        bounds.push((fstart, scratch.len()));
        if i < n {
            i += 1;
        } else {
            break;
        }
    }
    true
}
