use super::core::*;
use crate::error::QueryError;
use crate::filter::{CompareOp, Predicate};
use crate::sort::Direction;

fn header() -> Header {
    Header::parse_row(b"Id,Name,Amount").unwrap()
}

#[test]
fn test_source_parse() {
    assert_eq!(Source::parse("-"), Source::Stdin);
    assert_eq!(Source::parse("stdin"), Source::Stdin);
    assert_eq!(Source::parse("STDIN"), Source::Stdin);
    assert_eq!(Source::parse("data.csv"), Source::File("data.csv".into()));
}

#[test]
fn test_header_parse() {
    let h = header();
    assert_eq!(h.names(), &["Id", "Name", "Amount"]);
    assert_eq!(h.len(), 3);
}

#[test]
fn test_header_empty_line_is_empty_input() {
    assert!(matches!(Header::parse_row(b""), Err(QueryError::EmptyInput)));
}

#[test]
fn test_lookup_is_case_insensitive() {
    let h = header();
    let index = ColumnIndex::build(&h);
    assert_eq!(index.lookup("id"), Some(0));
    assert_eq!(index.lookup("ID"), Some(0));
    assert_eq!(index.lookup("aMoUnT"), Some(2));
    assert_eq!(index.lookup("missing"), None);
}

#[test]
fn test_duplicate_folded_names_first_wins() {
    let h = Header::parse_row(b"x,X,y").unwrap();
    let index = ColumnIndex::build(&h);
    assert_eq!(index.lookup("x"), Some(0));
}

#[test]
fn test_resolve_projection() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.projection = ColumnSel::Columns(vec!["name".into(), "id".into()]);
    let plan = resolve(&q, &h).unwrap();
    assert_eq!(plan.projection, ProjectionPlan::Columns(vec![1, 0]));
}

#[test]
fn test_resolve_unknown_column() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.projection = ColumnSel::Columns(vec!["nope".into()]);
    match resolve(&q, &h) {
        Err(QueryError::ColumnNotFound(name)) => assert_eq!(name, "nope"),
        other => panic!("expected ColumnNotFound, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_resolve_predicate_with_threshold() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.predicate = Some(PredExpr::Compare {
        column: "amount".into(),
        op: CompareOp::Gt,
        literal: "100".into(),
    });
    let plan = resolve(&q, &h).unwrap();
    match plan.predicate.unwrap() {
        Predicate::Compare(c) => {
            assert_eq!(c.column, 2);
            assert_eq!(c.op, CompareOp::Gt);
            assert_eq!(c.threshold, Some(100.0));
        }
        other => panic!("expected simple comparison, got {:?}", other),
    }
}

#[test]
fn test_resolve_string_literal_has_no_threshold() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.predicate = Some(PredExpr::Compare {
        column: "name".into(),
        op: CompareOp::Eq,
        literal: "alice".into(),
    });
    let plan = resolve(&q, &h).unwrap();
    match plan.predicate.unwrap() {
        Predicate::Compare(c) => assert_eq!(c.threshold, None),
        other => panic!("expected simple comparison, got {:?}", other),
    }
}

#[test]
fn test_resolve_sort_and_limit() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.sort = Some(("ID".into(), Direction::Desc));
    q.limit = Some(10);
    let plan = resolve(&q, &h).unwrap();
    let sort = plan.sort.unwrap();
    assert_eq!(sort.column, 0);
    assert_eq!(sort.direction, Direction::Desc);
    assert_eq!(plan.limit, Some(10));
}

#[test]
fn test_limit_zero_is_unbounded() {
    let h = header();
    let mut q = Query::select_all(Source::parse("t.csv"));
    q.limit = Some(0);
    let plan = resolve(&q, &h).unwrap();
    assert_eq!(plan.limit, None);
}

#[test]
fn test_projected_header() {
    let h = header();
    assert_eq!(
        h.projected(&ProjectionPlan::All),
        vec![b"Id" as &[u8], b"Name", b"Amount"]
    );
    assert_eq!(
        h.projected(&ProjectionPlan::Columns(vec![2, 0])),
        vec![b"Amount" as &[u8], b"Id"]
    );
}
