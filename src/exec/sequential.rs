/// Buffered execution for inputs the router does not map: small files
/// through the windowed line reader, and streams (stdin) through the
/// RFC 4180 record reader.
///
/// Non-sort queries write matching rows straight out of the window. A
/// sort needs rows to outlive the window, so matching rows are copied
/// into a private arena; records hold offsets until input is exhausted,
/// then borrow the frozen arena and run through the same sort core and
/// emission loop as the mapped paths.
use std::io::{Read, Write};

use crate::error::QueryError;
use crate::filter;
use crate::output::CsvWriter;
use crate::plan::{resolve, Header, ProjectionPlan, Query, QueryPlan, SortSpec};
use crate::reader::{split_quoted, LineReader, RecordReader};
use crate::scan::{split_row, strip_cr, MAX_FIELDS};
use crate::sort::{sort_records, Direction, SortRecord};

/// Bump arena for rows retained past a window refill. Only offsets are
/// handed out while it grows; slices are taken after the scan, when the
/// arena is frozen. Freed wholesale at query teardown.
struct RowArena {
    bytes: Vec<u8>,
}

impl RowArena {
    fn new() -> RowArena {
        RowArena { bytes: Vec::new() }
    }

    fn append(&mut self, b: &[u8]) -> (usize, usize) {
        let start = self.bytes.len();
        self.bytes.extend_from_slice(b);
        (start, self.bytes.len())
    }

    fn slice(&self, (s, e): (usize, usize)) -> &[u8] {
        &self.bytes[s..e]
    }
}

/// Run a query over a seekless/small byte source on the unquoted hot
/// path (2MB window, field scanner, direct writes).
pub fn run_file<R: Read, W: Write>(input: R, query: &Query, sink: W) -> Result<(), QueryError> {
    let mut reader = LineReader::new(input);
    let header = match reader.next_line()? {
        Some(line) => Header::parse_row(strip_cr(line))?,
        None => return Err(QueryError::EmptyInput),
    };
    let plan = resolve(query, &header)?;

    let mut writer = CsvWriter::new(sink);
    writer.write_row(header.projected(&plan.projection).iter().copied())?;

    if let Some(spec) = plan.sort {
        run_file_sort(&mut reader, &plan, spec, &mut writer)?;
    } else {
        let mut emitted = 0usize;
        loop {
            let raw = match reader.next_line()? {
                Some(l) => l,
                None => break,
            };
            let line = strip_cr(raw);
            if line.is_empty() {
                continue;
            }
            let mut fields: Vec<&[u8]> = Vec::with_capacity(16);
            if !split_row(line, &mut fields) {
                continue;
            }
            if let Some(pred) = &plan.predicate {
                if !filter::matches(&fields, pred) {
                    continue;
                }
            }
            write_projected(&mut writer, &fields, &plan.projection)?;
            emitted += 1;
            if plan.limit == Some(emitted) {
                break;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn run_file_sort<R: Read, W: Write>(
    reader: &mut LineReader<R>,
    plan: &QueryPlan,
    spec: SortSpec,
    writer: &mut CsvWriter<W>,
) -> Result<(), QueryError> {
    let descending = spec.direction == Direction::Desc;
    let mut arena = RowArena::new();
    // (row range, sort-field range) into the arena.
    let mut pending: Vec<((usize, usize), (usize, usize))> = Vec::new();

    loop {
        let raw = match reader.next_line()? {
            Some(l) => l,
            None => break,
        };
        let line = strip_cr(raw);
        if line.is_empty() {
            continue;
        }
        let mut fields: Vec<&[u8]> = Vec::with_capacity(16);
        if !split_row(line, &mut fields) {
            continue;
        }
        if let Some(pred) = &plan.predicate {
            if !filter::matches(&fields, pred) {
                continue;
            }
        }
        let sort_field = fields.get(spec.column).copied().unwrap_or(&[]);
        let row = arena.append(line);
        // The sort field aliases `line`; re-anchor its span on the copy.
        let sort = if sort_field.is_empty() {
            (row.0, row.0)
        } else {
            // SAFETY: sort_field is a sub-slice of line.
            let off = unsafe { sort_field.as_ptr().offset_from(line.as_ptr()) } as usize;
            (row.0 + off, row.0 + off + sort_field.len())
        };
        pending.push((row, sort));
    }

    let mut records: Vec<SortRecord<'_>> = pending
        .iter()
        .map(|&(row, sort)| SortRecord::new(arena.slice(sort), arena.slice(row), descending))
        .collect();
    sort_records(&mut records, spec.direction, plan.limit)?;
    super::mapped::emit_sorted(&records, plan, writer)
}

/// Run a query over a stream (stdin) through the RFC 4180 record
/// reader: quoted fields, doubled quotes, record-spanning newlines.
pub fn run_stream<R: Read, W: Write>(input: R, query: &Query, sink: W) -> Result<(), QueryError> {
    let mut reader = RecordReader::new(input);
    let mut scratch: Vec<u8> = Vec::new();
    let mut bounds: Vec<(usize, usize)> = Vec::new();

    let header = match reader.next_record()? {
        Some(rec) => {
            if !split_quoted(rec, &mut scratch, &mut bounds) {
                return Err(QueryError::TooManyFields(MAX_FIELDS));
            }
            Header::from_fields(bounds.iter().map(|&(s, e)| &scratch[s..e]))?
        }
        None => return Err(QueryError::EmptyInput),
    };
    let plan = resolve(query, &header)?;

    let mut writer = CsvWriter::new(sink);
    writer.write_row(header.projected(&plan.projection).iter().copied())?;

    if let Some(spec) = plan.sort {
        run_stream_sort(&mut reader, &plan, spec, &mut writer, &mut scratch, &mut bounds)?;
    } else {
        let mut emitted = 0usize;
        loop {
            let rec = match reader.next_record()? {
                Some(r) => r,
                None => break,
            };
            if rec.is_empty() {
                continue;
            }
            if !split_quoted(rec, &mut scratch, &mut bounds) {
                continue;
            }
            let fields: Vec<&[u8]> = bounds.iter().map(|&(s, e)| &scratch[s..e]).collect();
            if let Some(pred) = &plan.predicate {
                if !filter::matches(&fields, pred) {
                    continue;
                }
            }
            write_projected(&mut writer, &fields, &plan.projection)?;
            emitted += 1;
            if plan.limit == Some(emitted) {
                break;
            }
        }
    }

    writer.flush()?;
    Ok(())
}

fn run_stream_sort<R: Read, W: Write>(
    reader: &mut RecordReader<R>,
    plan: &QueryPlan,
    spec: SortSpec,
    writer: &mut CsvWriter<W>,
    scratch: &mut Vec<u8>,
    bounds: &mut Vec<(usize, usize)>,
) -> Result<(), QueryError> {
    let descending = spec.direction == Direction::Desc;
    let mut arena = RowArena::new();
    let mut pending: Vec<((usize, usize), (usize, usize))> = Vec::new();

    loop {
        let rec = match reader.next_record()? {
            Some(r) => r,
            None => break,
        };
        if rec.is_empty() {
            continue;
        }
        if !split_quoted(rec, scratch, bounds) {
            continue;
        }
        {
            let fields: Vec<&[u8]> = bounds.iter().map(|&(s, e)| &scratch[s..e]).collect();
            if let Some(pred) = &plan.predicate {
                if !filter::matches(&fields, pred) {
                    continue;
                }
            }
        }
        // The raw record is kept for emission (re-split with the quoted
        // splitter); the unescaped sort field is appended separately so
        // keys compare on the field's actual bytes.
        let row = arena.append(rec);
        let sort = match bounds.get(spec.column) {
            Some(&(s, e)) => arena.append(&scratch[s..e]),
            None => (row.0, row.0),
        };
        pending.push((row, sort));
    }

    let mut records: Vec<SortRecord<'_>> = pending
        .iter()
        .map(|&(row, sort)| SortRecord::new(arena.slice(sort), arena.slice(row), descending))
        .collect();
    sort_records(&mut records, spec.direction, plan.limit)?;

    // Quoted emission: rows from this path may contain embedded
    // delimiters, so the hot-path splitter does not apply.
    for rec in &records {
        if !split_quoted(rec.row_bytes, scratch, bounds) {
            continue;
        }
        match &plan.projection {
            ProjectionPlan::All => {
                writer.write_row(bounds.iter().map(|&(s, e)| &scratch[s..e]))?
            }
            ProjectionPlan::Columns(cols) => writer.write_row(cols.iter().map(|&i| {
                bounds
                    .get(i)
                    .map(|&(s, e)| &scratch[s..e])
                    .unwrap_or(&[])
            }))?,
        }
    }
    Ok(())
}

fn write_projected<W: Write>(
    writer: &mut CsvWriter<W>,
    fields: &[&[u8]],
    projection: &ProjectionPlan,
) -> Result<(), QueryError> {
    match projection {
        ProjectionPlan::All => writer.write_row(fields.iter().copied())?,
        ProjectionPlan::Columns(cols) => writer.write_row(
            cols.iter()
                .map(|&i| fields.get(i).copied().unwrap_or(&[])),
        )?,
    }
    Ok(())
}
