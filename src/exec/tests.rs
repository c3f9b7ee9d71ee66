use std::io::{Cursor, Write as _};

use tempfile::NamedTempFile;

use super::core::*;
use super::mapped::{chunk_bounds, run_mapped};
use super::sequential::{run_file, run_stream};
use crate::filter::CompareOp;
use crate::plan::{ColumnSel, PredExpr, Query, Source};
use crate::sort::Direction;
use crate::sql::parse_sql;
use crate::QueryError;

fn make_csv(content: &[u8]) -> NamedTempFile {
    let mut f = NamedTempFile::new().expect("create temp csv");
    f.write_all(content).expect("write csv");
    f.flush().expect("flush csv");
    f
}

fn query_on(file: &NamedTempFile, mut q: Query) -> Query {
    q.source = Source::File(file.path().to_path_buf());
    q
}

fn run_all_strategies(file: &NamedTempFile, q: &Query) -> Vec<u8> {
    let mut single = Vec::new();
    run_mapped(file.path(), q, &mut single, 1).unwrap();

    let mut parallel = Vec::new();
    run_mapped(file.path(), q, &mut parallel, 4).unwrap();
    assert_eq!(
        String::from_utf8_lossy(&single),
        String::from_utf8_lossy(&parallel),
        "parallel mapped diverged from single mapped"
    );

    let mut sequential = Vec::new();
    run_file(std::fs::File::open(file.path()).unwrap(), q, &mut sequential).unwrap();
    assert_eq!(
        String::from_utf8_lossy(&single),
        String::from_utf8_lossy(&sequential),
        "sequential diverged from single mapped"
    );

    single
}

#[test]
fn test_strategy_rules() {
    let mb = 1024 * 1024;
    // Big file, many cores, unbounded output.
    assert_eq!(select_strategy(12 * mb, 8, None, false), Strategy::ParallelMapped);
    // Big file but a short LIMIT and no sort: sequential wins past mmap.
    assert_eq!(select_strategy(12 * mb, 8, Some(10), false), Strategy::SingleMapped);
    // The sort forces the scan of everything, so fan out.
    assert_eq!(select_strategy(12 * mb, 8, Some(10), true), Strategy::ParallelMapped);
    // A huge LIMIT behaves like no limit.
    assert_eq!(
        select_strategy(12 * mb, 8, Some(200_000), false),
        Strategy::ParallelMapped
    );
    // One core never goes parallel.
    assert_eq!(select_strategy(12 * mb, 1, None, false), Strategy::SingleMapped);
    // Medium file: mapped, single-threaded.
    assert_eq!(select_strategy(7 * mb, 8, None, false), Strategy::SingleMapped);
    // Small file: buffered reads.
    assert_eq!(select_strategy(mb, 8, None, false), Strategy::Sequential);
}

#[test]
fn test_chunk_bounds_cover_region_exactly() {
    let mut data = Vec::new();
    for i in 0..1000 {
        data.extend_from_slice(format!("row-{},{}\n", i, i * 3).as_bytes());
    }
    for &w in &[1usize, 2, 3, 7, 8] {
        let bounds = chunk_bounds(&data, w);
        assert_eq!(bounds.first().unwrap().0, 0);
        assert_eq!(bounds.last().unwrap().1, data.len());
        for pair in bounds.windows(2) {
            assert_eq!(pair[0].1, pair[1].0, "gap or overlap between chunks");
        }
        // Every interior boundary sits one past a newline.
        for &(s, _) in &bounds[1..] {
            assert!(s == 0 || data[s - 1] == b'\n');
        }
    }
}

#[test]
fn test_chunk_bounds_tiny_input_many_workers() {
    let data = b"a\nb\n";
    let bounds = chunk_bounds(data, 8);
    assert_eq!(bounds.last().unwrap().1, data.len());
    let covered: usize = bounds.iter().map(|&(s, e)| e - s).sum();
    assert_eq!(covered, data.len());
}

#[test]
fn test_projection_with_filter() {
    // SELECT name FROM t WHERE id > 1
    let f = make_csv(b"id,name\n1,a\n2,b\n3,c\n");
    let mut q = Query::select_all(Source::Stdin);
    q.projection = ColumnSel::Columns(vec!["name".into()]);
    q.predicate = Some(PredExpr::Compare {
        column: "id".into(),
        op: CompareOp::Gt,
        literal: "1".into(),
    });
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"name\nb\nc\n");
}

#[test]
fn test_order_by_numeric_asc() {
    // SELECT * FROM t ORDER BY k ASC — numeric, not lexicographic.
    let f = make_csv(b"k,v\n10,x\n2,y\n33,z\n");
    let mut q = Query::select_all(Source::Stdin);
    q.sort = Some(("k".into(), Direction::Asc));
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"k,v\n2,y\n10,x\n33,z\n");
}

#[test]
fn test_order_by_string_desc_with_limit() {
    let f = make_csv(b"k,v\nbob,1\nalice,2\ncarol,3\n");
    let mut q = Query::select_all(Source::Stdin);
    q.sort = Some(("k".into(), Direction::Desc));
    q.limit = Some(2);
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"k,v\ncarol,3\nbob,1\n");
}

#[test]
fn test_stream_rfc4180_round_trip() {
    // Quoted fields with embedded delimiter and doubled quote survive
    // the stdin path byte-for-byte.
    let input = b"a,b\n\"hel,lo\",\"he\"\"llo\"\n";
    let q = Query::select_all(Source::Stdin);
    let mut out = Vec::new();
    run_stream(Cursor::new(input.to_vec()), &q, &mut out).unwrap();
    assert_eq!(out, input.to_vec());
}

#[test]
fn test_stream_with_filter_and_projection() {
    let input = b"id,name\n1,\"a,x\"\n2,plain\n";
    let mut q = Query::select_all(Source::Stdin);
    q.projection = ColumnSel::Columns(vec!["name".into()]);
    q.predicate = Some(PredExpr::Compare {
        column: "id".into(),
        op: CompareOp::Ge,
        literal: "1".into(),
    });
    let mut out = Vec::new();
    run_stream(Cursor::new(input.to_vec()), &q, &mut out).unwrap();
    assert_eq!(out, b"name\n\"a,x\"\nplain\n");
}

#[test]
fn test_stream_sort() {
    let input = b"k,v\n3,c\n1,\"a,a\"\n2,b\n";
    let mut q = Query::select_all(Source::Stdin);
    q.sort = Some(("k".into(), Direction::Asc));
    let mut out = Vec::new();
    run_stream(Cursor::new(input.to_vec()), &q, &mut out).unwrap();
    assert_eq!(out, b"k,v\n1,\"a,a\"\n2,b\n3,c\n");
}

#[test]
fn test_header_only_input() {
    let f = make_csv(b"id,name\n");
    let q = query_on(&f, Query::select_all(Source::Stdin));
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"id,name\n");
}

#[test]
fn test_single_row_no_trailing_newline() {
    let f = make_csv(b"id,name\n7,zoe");
    let q = query_on(&f, Query::select_all(Source::Stdin));
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"id,name\n7,zoe\n");
}

#[test]
fn test_crlf_is_normalized() {
    let f = make_csv(b"id,name\r\n1,a\r\n2,b\r\n");
    let mut q = Query::select_all(Source::Stdin);
    q.predicate = Some(PredExpr::Compare {
        column: "name".into(),
        op: CompareOp::Eq,
        literal: "b".into(),
    });
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"id,name\n2,b\n");
}

#[test]
fn test_limit_zero_means_unbounded() {
    let f = make_csv(b"x\n1\n2\n3\n");
    let mut q = Query::select_all(Source::Stdin);
    q.limit = Some(0);
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"x\n1\n2\n3\n");
}

#[test]
fn test_limit_beyond_matches_emits_all() {
    let f = make_csv(b"x\n1\n2\n");
    let mut q = Query::select_all(Source::Stdin);
    q.limit = Some(50);
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"x\n1\n2\n");
}

#[test]
fn test_row_over_field_cap_is_dropped() {
    let mut data = b"a,b\n1,x\n".to_vec();
    // One row with far more than the cap's worth of fields.
    data.extend(std::iter::repeat(b',').take(400));
    data.push(b'\n');
    data.extend_from_slice(b"2,y\n");
    let f = make_csv(&data);
    let q = query_on(&f, Query::select_all(Source::Stdin));
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"a,b\n1,x\n2,y\n");
}

#[test]
fn test_ragged_rows_project_empty_for_missing_columns() {
    let f = make_csv(b"a,b,c\n1,2,3\n4\n5,6\n");
    let mut q = Query::select_all(Source::Stdin);
    q.projection = ColumnSel::Columns(vec!["b".into(), "c".into()]);
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"b,c\n2,3\n,\n6,\n");
}

#[test]
fn test_empty_file_is_empty_input_error() {
    let f = make_csv(b"");
    let q = query_on(&f, Query::select_all(Source::Stdin));
    let mut out = Vec::new();
    assert!(matches!(
        run_query(&q, &mut out),
        Err(QueryError::EmptyInput)
    ));
}

#[test]
fn test_unknown_column_is_setup_error() {
    let f = make_csv(b"a,b\n1,2\n");
    let mut q = Query::select_all(Source::Stdin);
    q.projection = ColumnSel::Columns(vec!["nope".into()]);
    let q = query_on(&f, q);
    let mut out = Vec::new();
    match run_query(&q, &mut out) {
        Err(QueryError::ColumnNotFound(name)) => assert_eq!(name, "nope"),
        other => panic!("expected ColumnNotFound, got {:?}", other.map(|_| ())),
    }
    // Nothing but possibly nothing at all was written.
    assert!(out.is_empty());
}

#[test]
fn test_sql_end_to_end() {
    let f = make_csv(b"id,name\n1,a\n2,b\n3,c\n");
    let sql = format!(
        "SELECT name FROM \"{}\" WHERE id > 1",
        f.path().display()
    );
    let q = parse_sql(&sql).unwrap();
    let mut out = Vec::new();
    run_query(&q, &mut out).unwrap();
    assert_eq!(out, b"name\nb\nc\n");
}

#[test]
fn test_strategies_agree_on_larger_input() {
    // A few thousand rows with ties, empties, and non-numeric keys.
    let mut data = b"id,grp,name\n".to_vec();
    let mut seed = 1234u64;
    for i in 0..3000 {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let grp = seed % 17;
        data.extend_from_slice(format!("{},{},n{}\n", i, grp, seed % 97).as_bytes());
    }
    let f = make_csv(&data);

    // Filter + projection.
    let mut q = Query::select_all(Source::Stdin);
    q.projection = ColumnSel::Columns(vec!["name".into(), "id".into()]);
    q.predicate = Some(PredExpr::Compare {
        column: "grp".into(),
        op: CompareOp::Le,
        literal: "8".into(),
    });
    run_all_strategies(&f, &query_on(&f, q.clone()));

    // Same, sorted descending with a limit.
    let mut q2 = q.clone();
    q2.sort = Some(("grp".into(), Direction::Desc));
    q2.limit = Some(40);
    run_all_strategies(&f, &query_on(&f, q2));

    // Unfiltered full sort ascending.
    let mut q3 = Query::select_all(Source::Stdin);
    q3.sort = Some(("grp".into(), Direction::Asc));
    run_all_strategies(&f, &query_on(&f, q3));
}

#[test]
fn test_top_k_over_large_numeric_column() {
    // ORDER BY col DESC LIMIT 10 over tens of thousands of rows must
    // return the 10 largest regardless of execution path.
    let n = 50_000u64;
    let mut data = b"col\n".to_vec();
    let mut seed = 9u64;
    let mut max_seen = Vec::new();
    for _ in 0..n {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let v = seed % 10_000_000;
        max_seen.push(v);
        data.extend_from_slice(format!("{}\n", v).as_bytes());
    }
    max_seen.sort_unstable_by(|a, b| b.cmp(a));
    let mut expected = b"col\n".to_vec();
    for v in &max_seen[..10] {
        expected.extend_from_slice(format!("{}\n", v).as_bytes());
    }

    let f = make_csv(&data);
    let mut q = Query::select_all(Source::Stdin);
    q.sort = Some(("col".into(), Direction::Desc));
    q.limit = Some(10);
    let out = run_all_strategies(&f, &query_on(&f, q));
    assert_eq!(
        String::from_utf8_lossy(&out),
        String::from_utf8_lossy(&expected)
    );
}

#[test]
fn test_single_column_string_sort_matches_byte_sort() {
    // With one non-numeric column, ORDER BY ASC must agree byte-for-byte
    // with sorting the data region's lines.
    let mut rows: Vec<&[u8]> = vec![
        b"pear", b"apple", b"zebra", b"fig", b"apricot", b"banana", b"kiwi", b"apple2",
    ];
    let mut data = b"word\n".to_vec();
    for r in &rows {
        data.extend_from_slice(r);
        data.push(b'\n');
    }
    let f = make_csv(&data);
    let mut q = Query::select_all(Source::Stdin);
    q.sort = Some(("word".into(), Direction::Asc));
    let out = run_all_strategies(&f, &query_on(&f, q));

    rows.sort();
    let mut expected = b"word\n".to_vec();
    for r in &rows {
        expected.extend_from_slice(r);
        expected.push(b'\n');
    }
    assert_eq!(out, expected);
}

#[test]
fn test_predicate_matching_nothing_emits_header_only() {
    let mut data = b"x\n".to_vec();
    for i in 0..2000 {
        data.extend_from_slice(format!("{}\n", i).as_bytes());
    }
    let f = make_csv(&data);
    let mut q = Query::select_all(Source::Stdin);
    q.predicate = Some(PredExpr::Compare {
        column: "x".into(),
        op: CompareOp::Gt,
        literal: "1000000000000000000".into(),
    });
    let q = query_on(&f, q);
    let out = run_all_strategies(&f, &q);
    assert_eq!(out, b"x\n");
}
