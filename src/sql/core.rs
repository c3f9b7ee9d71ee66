//! SQL surface parser wrapping `sqlparser-rs`.
//!
//! Converts a SQL string into the engine's `Query`. Only the subset the
//! engine executes is accepted: single-table SELECT with projection,
//! WHERE comparisons joined by AND/OR/NOT, single-column ORDER BY, and
//! LIMIT. GROUP BY parses at the surface and is rejected here.

use sqlparser::ast::{
    self as sp, Expr as SpExpr, GroupByExpr, SelectItem, SetExpr, Statement, TableFactor,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::filter::CompareOp;
use crate::plan::{ColumnSel, PredExpr, Query, Source};
use crate::sort::Direction;

/// Errors from the query surfaces (SQL and simple mode). These never
/// reach the engine — the front-end reports them and exits.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// sqlparser rejected the statement.
    SqlParser(String),
    /// The statement is not a SELECT query.
    NotASelect,
    /// Parsed fine but uses a feature the engine does not execute.
    Unsupported(String),
    /// Missing FROM clause.
    MissingFrom,
    /// Malformed simple-mode argument list.
    InvalidArgs(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::SqlParser(msg) => write!(f, "SQL parse error: {}", msg),
            ParseError::NotASelect => write!(f, "only SELECT statements are supported"),
            ParseError::Unsupported(msg) => write!(f, "unsupported: {}", msg),
            ParseError::MissingFrom => write!(f, "missing FROM clause"),
            ParseError::InvalidArgs(msg) => write!(f, "invalid arguments: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// Mode auto-detection: an invocation whose first argument begins with
/// the word `select` (any case) is SQL mode; anything else is the
/// positional simple mode.
pub fn is_sql_mode(args: &[String]) -> bool {
    args.first()
        .and_then(|a| a.split_whitespace().next())
        .map(|w| w.eq_ignore_ascii_case("select"))
        .unwrap_or(false)
}

/// Parse a SQL SELECT into a Query.
pub fn parse_sql(sql: &str) -> Result<Query, ParseError> {
    let dialect = GenericDialect {};
    let statements =
        Parser::parse_sql(&dialect, sql).map_err(|e| ParseError::SqlParser(e.to_string()))?;

    if statements.len() != 1 {
        return Err(ParseError::Unsupported(format!(
            "expected exactly one statement, got {}",
            statements.len()
        )));
    }

    match &statements[0] {
        Statement::Query(query) => convert_query(query),
        _ => Err(ParseError::NotASelect),
    }
}

fn convert_query(query: &sp::Query) -> Result<Query, ParseError> {
    let select = match query.body.as_ref() {
        SetExpr::Select(select) => select.as_ref(),
        _ => {
            return Err(ParseError::Unsupported(
                "only simple SELECT queries (no UNION, INTERSECT, ...)".into(),
            ))
        }
    };

    if select.distinct.is_some() {
        return Err(ParseError::Unsupported("SELECT DISTINCT".into()));
    }
    if select.having.is_some() {
        return Err(ParseError::Unsupported("HAVING".into()));
    }
    // GROUP BY is accepted by the grammar but has no execution path.
    match &select.group_by {
        GroupByExpr::Expressions(exprs, _) if exprs.is_empty() => {}
        _ => return Err(ParseError::Unsupported("GROUP BY".into())),
    }

    let source = extract_source(select)?;
    let projection = convert_select_items(&select.projection)?;
    let predicate = match &select.selection {
        Some(expr) => Some(convert_predicate(expr)?),
        None => None,
    };
    let sort = convert_order_by(query)?;
    let limit = match &query.limit {
        Some(expr) => Some(extract_limit(expr)?),
        None => None,
    };

    Ok(Query {
        source,
        projection,
        predicate,
        sort,
        limit,
    })
}

/// The single FROM table, interpreted as a file path (`a.csv` tokenizes
/// as schema `a`, table `csv` — rejoining with `.` recovers the name).
fn extract_source(select: &sp::Select) -> Result<Source, ParseError> {
    if select.from.is_empty() {
        return Err(ParseError::MissingFrom);
    }
    if select.from.len() > 1 {
        return Err(ParseError::Unsupported("multiple FROM tables (joins)".into()));
    }
    let table_with_joins = &select.from[0];
    if !table_with_joins.joins.is_empty() {
        return Err(ParseError::Unsupported("JOIN".into()));
    }
    match &table_with_joins.relation {
        TableFactor::Table { name, .. } => {
            let parts: Vec<String> = name.0.iter().map(|ident| ident.value.clone()).collect();
            Ok(Source::parse(&parts.join(".")))
        }
        _ => Err(ParseError::Unsupported(
            "only plain table references in FROM".into(),
        )),
    }
}

fn convert_select_items(items: &[SelectItem]) -> Result<ColumnSel, ParseError> {
    let mut columns = Vec::new();
    for item in items {
        match item {
            SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(_, _) => {
                return Ok(ColumnSel::All);
            }
            SelectItem::UnnamedExpr(expr) | SelectItem::ExprWithAlias { expr, .. } => {
                columns.push(column_name(expr)?);
            }
        }
    }
    if columns.is_empty() {
        return Err(ParseError::Unsupported("empty SELECT list".into()));
    }
    Ok(ColumnSel::Columns(columns))
}

fn column_name(expr: &SpExpr) -> Result<String, ParseError> {
    match expr {
        SpExpr::Identifier(ident) => Ok(ident.value.clone()),
        SpExpr::CompoundIdentifier(parts) => parts
            .last()
            .map(|i| i.value.clone())
            .ok_or_else(|| ParseError::Unsupported("empty compound identifier".into())),
        _ => Err(ParseError::Unsupported(
            "only plain column references are supported".into(),
        )),
    }
}

fn convert_predicate(expr: &SpExpr) -> Result<PredExpr, ParseError> {
    match expr {
        SpExpr::Nested(inner) => convert_predicate(inner),
        SpExpr::UnaryOp {
            op: sp::UnaryOperator::Not,
            expr: inner,
        } => Ok(PredExpr::Not(Box::new(convert_predicate(inner)?))),
        SpExpr::BinaryOp { left, op, right } => match op {
            sp::BinaryOperator::And => Ok(PredExpr::And(
                Box::new(convert_predicate(left)?),
                Box::new(convert_predicate(right)?),
            )),
            sp::BinaryOperator::Or => Ok(PredExpr::Or(
                Box::new(convert_predicate(left)?),
                Box::new(convert_predicate(right)?),
            )),
            _ => {
                let column = column_name(left)?;
                let op = convert_binop(op)?;
                let literal = literal_text(right)?;
                Ok(PredExpr::Compare {
                    column,
                    op,
                    literal,
                })
            }
        },
        _ => Err(ParseError::Unsupported(
            "WHERE supports comparisons joined by AND/OR/NOT".into(),
        )),
    }
}

fn convert_binop(op: &sp::BinaryOperator) -> Result<CompareOp, ParseError> {
    match op {
        sp::BinaryOperator::Eq => Ok(CompareOp::Eq),
        sp::BinaryOperator::NotEq => Ok(CompareOp::Ne),
        sp::BinaryOperator::Lt => Ok(CompareOp::Lt),
        sp::BinaryOperator::LtEq => Ok(CompareOp::Le),
        sp::BinaryOperator::Gt => Ok(CompareOp::Gt),
        sp::BinaryOperator::GtEq => Ok(CompareOp::Ge),
        _ => Err(ParseError::Unsupported(format!(
            "comparison operator {:?}",
            op
        ))),
    }
}

/// A comparison literal as raw text: numbers keep their source spelling
/// (the engine decides number-vs-string by re-parsing), strings shed
/// their quotes.
fn literal_text(expr: &SpExpr) -> Result<String, ParseError> {
    match expr {
        SpExpr::Value(sp::Value::Number(s, _)) => Ok(s.clone()),
        SpExpr::Value(sp::Value::SingleQuotedString(s))
        | SpExpr::Value(sp::Value::DoubleQuotedString(s)) => Ok(s.clone()),
        SpExpr::UnaryOp {
            op: sp::UnaryOperator::Minus,
            expr: inner,
        } => match inner.as_ref() {
            SpExpr::Value(sp::Value::Number(s, _)) => Ok(format!("-{}", s)),
            _ => Err(ParseError::Unsupported(
                "unary minus only on numeric literals".into(),
            )),
        },
        _ => Err(ParseError::Unsupported(
            "comparison right-hand side must be a literal".into(),
        )),
    }
}

fn convert_order_by(query: &sp::Query) -> Result<Option<(String, Direction)>, ParseError> {
    let order_by = match &query.order_by {
        Some(ob) => ob,
        None => return Ok(None),
    };
    let sp::OrderBy { exprs, .. } = order_by;
    if exprs.is_empty() {
        return Ok(None);
    }
    if exprs.len() > 1 {
        return Err(ParseError::Unsupported("multi-column ORDER BY".into()));
    }
    let o = &exprs[0];
    let column = column_name(&o.expr)?;
    let direction = if o.asc.unwrap_or(true) {
        Direction::Asc
    } else {
        Direction::Desc
    };
    Ok(Some((column, direction)))
}

fn extract_limit(expr: &SpExpr) -> Result<u64, ParseError> {
    match expr {
        SpExpr::Value(sp::Value::Number(s, _)) => s
            .parse::<u64>()
            .map_err(|_| ParseError::Unsupported(format!("LIMIT value: {}", s))),
        _ => Err(ParseError::Unsupported(
            "LIMIT must be a non-negative integer".into(),
        )),
    }
}
