use std::io;

use thiserror::Error;

/// Errors surfaced by query execution.
///
/// Row-level conditions (a row over the field cap, a numeric parse failure
/// under a numeric predicate) are not errors: the row is skipped and the
/// scan continues. Everything here is raised at query setup, except `Io`
/// and `Resource`, which workers can hit mid-scan and which abort the
/// query after the join.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The input has no header line.
    #[error("empty input: no header line")]
    EmptyInput,

    /// A projection, predicate, or sort column is not in the header.
    #[error("column not found: {0}")]
    ColumnNotFound(String),

    /// A row exceeded the per-row field cap.
    #[error("row exceeds {0} fields")]
    TooManyFields(usize),

    /// A compound predicate with invalid structure reached the engine.
    #[error("invalid predicate: {0}")]
    InvalidPredicate(String),

    /// Underlying read, write, or map failure.
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    /// Scratch buffer or arena allocation failure.
    #[error("out of memory: {0}")]
    Resource(String),
}
