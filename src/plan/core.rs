/// Query tree and its resolution against a header row.
///
/// The surface parsers (SQL and simple mode) produce a `Query` that still
/// names columns by string. Once the input's header line is read, `resolve`
/// turns it into a `QueryPlan` of raw row positions — the only form the
/// scan loops ever see. Name lookup is ASCII-case-insensitive.
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::QueryError;
use crate::filter::{Compare, CompareOp, Predicate};
use crate::scan;
use crate::sort::Direction;

/// Where the input bytes come from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Source {
    Stdin,
    File(PathBuf),
}

impl Source {
    /// `-` and `stdin` (any case) select standard input.
    pub fn parse(s: &str) -> Source {
        if s == "-" || s.eq_ignore_ascii_case("stdin") {
            Source::Stdin
        } else {
            Source::File(PathBuf::from(s))
        }
    }
}

/// Projection by column name, before resolution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColumnSel {
    All,
    Columns(Vec<String>),
}

/// Predicate over column names, before resolution.
#[derive(Clone, Debug)]
pub enum PredExpr {
    Compare {
        column: String,
        op: CompareOp,
        literal: String,
    },
    And(Box<PredExpr>, Box<PredExpr>),
    Or(Box<PredExpr>, Box<PredExpr>),
    Not(Box<PredExpr>),
}

/// A validated query as produced by the surface parsers.
#[derive(Clone, Debug)]
pub struct Query {
    pub source: Source,
    pub projection: ColumnSel,
    pub predicate: Option<PredExpr>,
    pub sort: Option<(String, Direction)>,
    /// Surface limit; 0 means unbounded and is normalized away by resolve.
    pub limit: Option<u64>,
}

impl Query {
    /// A bare `SELECT * FROM source` skeleton.
    pub fn select_all(source: Source) -> Query {
        Query {
            source,
            projection: ColumnSel::All,
            predicate: None,
            sort: None,
            limit: None,
        }
    }

    /// The effective limit: `Some(n)` only for a positive surface limit.
    pub fn effective_limit(&self) -> Option<usize> {
        match self.limit {
            None | Some(0) => None,
            Some(n) => Some(n as usize),
        }
    }
}

/// The input's column names, in row order. Built once per query from the
/// first line.
#[derive(Clone, Debug)]
pub struct Header {
    names: Vec<String>,
}

impl Header {
    /// Build from already-split field bytes (the RFC 4180 path).
    pub fn from_fields<'a>(fields: impl IntoIterator<Item = &'a [u8]>) -> Result<Header, QueryError> {
        let names: Vec<String> = fields
            .into_iter()
            .map(|f| String::from_utf8_lossy(f).into_owned())
            .collect();
        if names.is_empty() || (names.len() == 1 && names[0].is_empty()) {
            return Err(QueryError::EmptyInput);
        }
        Ok(Header { names })
    }

    /// Split a raw header line on the hot path (unquoted commas).
    pub fn parse_row(line: &[u8]) -> Result<Header, QueryError> {
        if line.is_empty() {
            return Err(QueryError::EmptyInput);
        }
        let mut fields = Vec::new();
        if !scan::split_row(line, &mut fields) {
            return Err(QueryError::TooManyFields(scan::MAX_FIELDS));
        }
        Header::from_fields(fields.iter().copied())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// The header fields a projection emits, in output order.
    pub fn projected<'a>(&'a self, projection: &ProjectionPlan) -> Vec<&'a [u8]> {
        match projection {
            ProjectionPlan::All => self.names.iter().map(|n| n.as_bytes()).collect(),
            ProjectionPlan::Columns(cols) => cols
                .iter()
                .map(|&i| self.names.get(i).map(|n| n.as_bytes()).unwrap_or(b""))
                .collect(),
        }
    }
}

/// Case-folded name → row position. Folding is ASCII lowercasing only;
/// on duplicate folded names the first occurrence wins.
#[derive(Clone, Debug)]
pub struct ColumnIndex {
    map: HashMap<String, usize>,
}

impl ColumnIndex {
    pub fn build(header: &Header) -> ColumnIndex {
        let mut map = HashMap::with_capacity(header.len());
        for (i, name) in header.names().iter().enumerate() {
            map.entry(name.to_ascii_lowercase()).or_insert(i);
        }
        ColumnIndex { map }
    }

    pub fn lookup(&self, name: &str) -> Option<usize> {
        self.map.get(&name.to_ascii_lowercase()).copied()
    }
}

/// Resolved projection: row positions to emit, or everything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectionPlan {
    All,
    Columns(Vec<usize>),
}

/// Resolved ORDER BY: raw-row column position plus direction.
#[derive(Clone, Copy, Debug)]
pub struct SortSpec {
    pub column: usize,
    pub direction: Direction,
}

/// A fully resolved query: every column is a row position, the limit is
/// normalized, the predicate literals carry their pre-parsed thresholds.
#[derive(Clone, Debug)]
pub struct QueryPlan {
    pub projection: ProjectionPlan,
    pub predicate: Option<Predicate>,
    pub sort: Option<SortSpec>,
    pub limit: Option<usize>,
}

/// Resolve a surface query against the header. All name errors surface
/// here, before any worker spawns.
pub fn resolve(query: &Query, header: &Header) -> Result<QueryPlan, QueryError> {
    let index = ColumnIndex::build(header);

    let projection = match &query.projection {
        ColumnSel::All => ProjectionPlan::All,
        ColumnSel::Columns(names) => {
            let mut cols = Vec::with_capacity(names.len());
            for name in names {
                match index.lookup(name) {
                    Some(i) => cols.push(i),
                    None => return Err(QueryError::ColumnNotFound(name.clone())),
                }
            }
            ProjectionPlan::Columns(cols)
        }
    };

    let predicate = match &query.predicate {
        Some(expr) => Some(resolve_predicate(expr, &index)?),
        None => None,
    };

    let sort = match &query.sort {
        Some((name, direction)) => match index.lookup(name) {
            Some(column) => Some(SortSpec {
                column,
                direction: *direction,
            }),
            None => return Err(QueryError::ColumnNotFound(name.clone())),
        },
        None => None,
    };

    Ok(QueryPlan {
        projection,
        predicate,
        sort,
        limit: query.effective_limit(),
    })
}

fn resolve_predicate(expr: &PredExpr, index: &ColumnIndex) -> Result<Predicate, QueryError> {
    match expr {
        PredExpr::Compare {
            column,
            op,
            literal,
        } => match index.lookup(column) {
            Some(i) => Ok(Predicate::Compare(Compare::new(
                i,
                *op,
                literal.clone().into_bytes(),
            ))),
            None => Err(QueryError::ColumnNotFound(column.clone())),
        },
        PredExpr::And(l, r) => Ok(Predicate::And(
            Box::new(resolve_predicate(l, index)?),
            Box::new(resolve_predicate(r, index)?),
        )),
        PredExpr::Or(l, r) => Ok(Predicate::Or(
            Box::new(resolve_predicate(l, index)?),
            Box::new(resolve_predicate(r, index)?),
        )),
        PredExpr::Not(p) => Ok(Predicate::Not(Box::new(resolve_predicate(p, index)?))),
    }
}
