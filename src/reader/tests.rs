use std::io::Cursor;

use super::core::*;
use super::rfc4180::*;

fn collect_lines(data: &[u8], cap: usize) -> Vec<Vec<u8>> {
    let mut reader = LineReader::with_capacity(cap, Cursor::new(data.to_vec()));
    let mut out = Vec::new();
    while let Some(line) = reader.next_line().unwrap() {
        out.push(line.to_vec());
    }
    out
}

#[test]
fn test_lines_basic() {
    let got = collect_lines(b"one\ntwo\nthree\n", 1024);
    assert_eq!(got, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);
}

#[test]
fn test_lines_no_trailing_newline() {
    let got = collect_lines(b"a\nb", 1024);
    assert_eq!(got, vec![b"a".to_vec(), b"b".to_vec()]);
}

#[test]
fn test_lines_across_refills() {
    // A window far smaller than the input forces compaction + refill
    // between almost every line.
    let mut data = Vec::new();
    let mut expected = Vec::new();
    for i in 0..200 {
        let line = format!("line-{:04}-{}", i, "x".repeat(i % 23));
        expected.push(line.clone().into_bytes());
        data.extend_from_slice(line.as_bytes());
        data.push(b'\n');
    }
    assert_eq!(collect_lines(&data, 32), expected);
}

#[test]
fn test_line_longer_than_window_grows() {
    let long = "y".repeat(500);
    let data = format!("{}\nshort\n", long);
    let got = collect_lines(data.as_bytes(), 16);
    assert_eq!(got, vec![long.into_bytes(), b"short".to_vec()]);
}

#[test]
fn test_empty_input() {
    assert!(collect_lines(b"", 64).is_empty());
}

#[test]
fn test_put_back_re_yields_last_line() {
    let mut reader = LineReader::with_capacity(64, Cursor::new(b"head\nrow\n".to_vec()));
    assert_eq!(reader.next_line().unwrap().unwrap(), b"head");
    reader.put_back();
    assert_eq!(reader.next_line().unwrap().unwrap(), b"head");
    assert_eq!(reader.next_line().unwrap().unwrap(), b"row");
    assert_eq!(reader.next_line().unwrap(), None);
}

fn collect_records(data: &[u8], cap: usize) -> Vec<Vec<u8>> {
    let mut reader = RecordReader::with_capacity(cap, Cursor::new(data.to_vec()));
    let mut out = Vec::new();
    while let Some(rec) = reader.next_record().unwrap() {
        out.push(rec.to_vec());
    }
    out
}

#[test]
fn test_records_plain() {
    let got = collect_records(b"a,b\n1,2\n", 64);
    assert_eq!(got, vec![b"a,b".to_vec(), b"1,2".to_vec()]);
}

#[test]
fn test_records_crlf() {
    let got = collect_records(b"a,b\r\n1,2\r\n", 64);
    assert_eq!(got, vec![b"a,b".to_vec(), b"1,2".to_vec()]);
}

#[test]
fn test_record_with_quoted_newline_spans_lines() {
    let got = collect_records(b"a,b\n\"x\ny\",2\n", 64);
    assert_eq!(got, vec![b"a,b".to_vec(), b"\"x\ny\",2".to_vec()]);
}

#[test]
fn test_record_quote_state_across_refills() {
    // Window smaller than the quoted field: the quote state must carry
    // across compaction.
    let inner = "z".repeat(100);
    let data = format!("\"{}\",tail\nnext\n", inner);
    let got = collect_records(data.as_bytes(), 16);
    assert_eq!(got.len(), 2);
    assert_eq!(got[0], format!("\"{}\",tail", inner).into_bytes());
    assert_eq!(got[1], b"next".to_vec());
}

#[test]
fn test_final_record_without_newline() {
    let got = collect_records(b"a,b\n1,2", 64);
    assert_eq!(got, vec![b"a,b".to_vec(), b"1,2".to_vec()]);
}

#[test]
fn test_crlf_inside_quotes_is_preserved() {
    // Only the record terminator's \r is stripped; quoted bytes pass
    // through untouched.
    let got = collect_records(b"a\r\n\"x\r\ny\"\r\n", 64);
    assert_eq!(got, vec![b"a".to_vec(), b"\"x\r\ny\"".to_vec()]);
}

fn split_all(record: &[u8]) -> Vec<Vec<u8>> {
    let mut scratch = Vec::new();
    let mut bounds = Vec::new();
    assert!(split_quoted(record, &mut scratch, &mut bounds));
    bounds
        .iter()
        .map(|&(s, e)| scratch[s..e].to_vec())
        .collect()
}

#[test]
fn test_split_quoted_plain() {
    assert_eq!(
        split_all(b"a,b,c"),
        vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]
    );
}

#[test]
fn test_split_quoted_embedded_delimiter() {
    assert_eq!(
        split_all(b"\"hel,lo\",x"),
        vec![b"hel,lo".to_vec(), b"x".to_vec()]
    );
}

#[test]
fn test_split_quoted_doubled_quotes() {
    assert_eq!(split_all(b"\"he\"\"llo\""), vec![b"he\"llo".to_vec()]);
}

#[test]
fn test_split_quoted_embedded_newline() {
    assert_eq!(
        split_all(b"\"x\ny\",2"),
        vec![b"x\ny".to_vec(), b"2".to_vec()]
    );
}

#[test]
fn test_split_quoted_empty_fields() {
    assert_eq!(
        split_all(b",\"\","),
        vec![b"".to_vec(), b"".to_vec(), b"".to_vec()]
    );
}

#[test]
fn test_split_quoted_trailing_comma() {
    assert_eq!(split_all(b"a,"), vec![b"a".to_vec(), b"".to_vec()]);
}

#[test]
fn test_split_quoted_field_cap() {
    let record = vec![b','; crate::scan::MAX_FIELDS];
    let mut scratch = Vec::new();
    let mut bounds = Vec::new();
    assert!(!split_quoted(&record, &mut scratch, &mut bounds));
}
