//! Positional "simple mode": query parts as plain shell arguments, for
//! one-liners where SQL is overkill.
//!
//! Grammar:
//!   FILE                         all columns
//!   FILE COLS                    projected columns (comma list or `*`)
//!   FILE COL OP VALUE            all columns, filtered
//!   FILE COLS COL OP VALUE       projected and filtered
//!
//! Sort, direction, and limit arrive as flags (`--sort COL`, `--desc`,
//! `--limit N`) and apply to either form.

use crate::filter::CompareOp;
use crate::plan::{ColumnSel, PredExpr, Query, Source};
use crate::sort::Direction;

use super::core::ParseError;

pub fn parse_simple(
    args: &[String],
    sort: Option<&str>,
    desc: bool,
    limit: Option<u64>,
) -> Result<Query, ParseError> {
    if args.is_empty() {
        return Err(ParseError::InvalidArgs("missing input file".into()));
    }
    let source = Source::parse(&args[0]);

    let (projection, filter_args) = match args.len() {
        1 => (ColumnSel::All, &args[1..1]),
        2 => (parse_columns(&args[1])?, &args[2..2]),
        4 => (ColumnSel::All, &args[1..4]),
        5 => (parse_columns(&args[1])?, &args[2..5]),
        n => {
            return Err(ParseError::InvalidArgs(format!(
                "expected FILE [COLUMNS] [COLUMN OP VALUE], got {} arguments",
                n
            )))
        }
    };

    let predicate = if filter_args.is_empty() {
        None
    } else {
        let op = CompareOp::parse(&filter_args[1]).ok_or_else(|| {
            ParseError::InvalidArgs(format!("unknown comparison operator '{}'", filter_args[1]))
        })?;
        Some(PredExpr::Compare {
            column: filter_args[0].clone(),
            op,
            literal: filter_args[2].clone(),
        })
    };

    let direction = if desc { Direction::Desc } else { Direction::Asc };
    let sort = sort.map(|col| (col.to_string(), direction));
    if sort.is_none() && desc {
        return Err(ParseError::InvalidArgs(
            "--desc requires --sort COLUMN".into(),
        ));
    }

    Ok(Query {
        source,
        projection,
        predicate,
        sort,
        limit,
    })
}

fn parse_columns(spec: &str) -> Result<ColumnSel, ParseError> {
    if spec == "*" {
        return Ok(ColumnSel::All);
    }
    let columns: Vec<String> = spec
        .split(',')
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect();
    if columns.is_empty() {
        return Err(ParseError::InvalidArgs(format!(
            "empty column list '{}'",
            spec
        )));
    }
    Ok(ColumnSel::Columns(columns))
}
