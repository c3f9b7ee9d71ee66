/// Buffered CSV serialization.
///
/// Rows accumulate in a 1MB buffer that is handed to the sink in
/// whole-buffer writes — for a full-table scan this turns tens of
/// millions of tiny write calls into a few dozen. Field quoting follows
/// RFC 4180 on the way out: a field is wrapped in quotes exactly when it
/// contains a delimiter, a quote, or a line break, and embedded quotes
/// are doubled.
use std::io::{self, Write};

use memchr::{memchr, memchr3};

/// Output buffer size. Flushed whole once a row pushes it past this.
pub const OUTPUT_BUF_SIZE: usize = 1024 * 1024;

pub struct CsvWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    cap: usize,
}

impl<W: Write> CsvWriter<W> {
    pub fn new(inner: W) -> CsvWriter<W> {
        CsvWriter::with_capacity(OUTPUT_BUF_SIZE, inner)
    }

    /// Capacity hook for tests exercising the overflow path.
    pub fn with_capacity(cap: usize, inner: W) -> CsvWriter<W> {
        CsvWriter {
            inner,
            buf: Vec::with_capacity(cap),
            cap,
        }
    }

    /// Serialize one row. Fields are `,`-separated, the row is
    /// `\n`-terminated.
    pub fn write_row<'a, I>(&mut self, fields: I) -> io::Result<()>
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        let mut first = true;
        for field in fields {
            if !first {
                self.buf.push(b',');
            }
            first = false;
            self.push_field(field);
        }
        self.buf.push(b'\n');

        if self.buf.len() >= self.cap {
            self.flush_buf()?;
        }
        Ok(())
    }

    #[inline]
    fn push_field(&mut self, field: &[u8]) {
        if needs_quoting(field) {
            self.buf.push(b'"');
            for &b in field {
                if b == b'"' {
                    self.buf.push(b'"');
                }
                self.buf.push(b);
            }
            self.buf.push(b'"');
        } else {
            self.buf.extend_from_slice(field);
        }
    }

    fn flush_buf(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(())
    }

    /// Flush buffered rows through to the sink. Idempotent.
    pub fn flush(&mut self) -> io::Result<()> {
        self.flush_buf()?;
        self.inner.flush()
    }

    /// Flush and hand back the sink (tests inspect Vec<u8> sinks).
    pub fn finish(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }
}

/// RFC 4180: quote when the field contains the delimiter, a quote, or
/// either line-break byte.
#[inline]
fn needs_quoting(field: &[u8]) -> bool {
    memchr3(b',', b'"', b'\n', field).is_some() || memchr(b'\r', field).is_some()
}
