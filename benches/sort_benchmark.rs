use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fquery::sort::{sort_records, Direction, SortRecord};

fn lcg(seed: &mut u64) -> u64 {
    *seed = seed
        .wrapping_mul(6364136223846793005)
        .wrapping_add(1442695040888963407);
    *seed >> 16
}

fn numeric_rows(n: usize) -> Vec<Vec<u8>> {
    let mut seed = 42u64;
    (0..n)
        .map(|_| format!("{},payload-bytes", lcg(&mut seed) % 10_000_000).into_bytes())
        .collect()
}

fn records<'a>(rows: &'a [Vec<u8>], descending: bool) -> Vec<SortRecord<'a>> {
    rows.iter()
        .map(|row| {
            let end = row.iter().position(|&b| b == b',').unwrap_or(row.len());
            SortRecord::new(&row[..end], row, descending)
        })
        .collect()
}

fn bench_full_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_full");
    group.sample_size(20);
    for n in [10_000usize, 100_000, 1_000_000] {
        let rows = numeric_rows(n);
        group.bench_with_input(BenchmarkId::new("numeric_asc", n), &rows, |b, rows| {
            b.iter(|| {
                let mut recs = records(rows, false);
                sort_records(black_box(&mut recs), Direction::Asc, None).unwrap();
                recs.len()
            })
        });
    }
    group.finish();
}

fn bench_top_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_top_k");
    group.sample_size(20);
    let rows = numeric_rows(1_000_000);
    for k in [10usize, 100, 1000] {
        group.bench_with_input(BenchmarkId::new("limit", k), &rows, |b, rows| {
            b.iter(|| {
                let mut recs = records(rows, true);
                sort_records(black_box(&mut recs), Direction::Desc, Some(k)).unwrap();
                recs.len()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_full_sort, bench_top_k);
criterion_main!(benches);
