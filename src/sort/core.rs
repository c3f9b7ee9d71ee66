/// Adaptive sort over lightweight per-row records.
///
/// One entry point, three strategies: a bounded heap when only a small
/// top-K is wanted, an indirect LSD radix sort when every key is numeric
/// and the input is large, and an index-comparison sort (pdqsort,
/// parallel above 10K records) for everything else. Records carry their
/// keys pre-computed, so no parsing ever happens inside the sort.
use std::cmp::Ordering;

use rayon::prelude::*;

use crate::error::QueryError;
use crate::filter::parse_f64;

use super::key::radix_key;
use super::radix;

/// The minimal per-row payload carried through a sort: two pre-computed
/// keys plus aliasing references to the sort field and the whole raw row.
/// 48 bytes; never a heap allocation per row.
#[derive(Clone, Copy, Debug)]
pub struct SortRecord<'a> {
    /// u64 whose unsigned order equals the output order (direction mask
    /// already applied). Drives the radix strategy.
    pub radix_key: u64,
    /// The sort field parsed as f64, or NaN when the parse failed.
    pub numeric_key: f64,
    /// Raw bytes of the sort column.
    pub sort_bytes: &'a [u8],
    /// Raw bytes of the whole row, re-split at emission time.
    pub row_bytes: &'a [u8],
}

impl<'a> SortRecord<'a> {
    /// Build a record from the raw sort field and its row.
    #[inline]
    pub fn new(sort_field: &'a [u8], row: &'a [u8], descending: bool) -> Self {
        let numeric = parse_f64(sort_field).unwrap_or(f64::NAN);
        SortRecord {
            radix_key: radix_key(sort_field, numeric, descending),
            numeric_key: numeric,
            sort_bytes: sort_field,
            row_bytes: row,
        }
    }
}

/// Sort direction. Descending never negates a comparator — keys are
/// mask-flipped and comparison operands swapped instead, keeping every
/// predicate a strict weak order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Largest K served by the bounded heap. Sized so the kept records stay
/// resident in L1d during the replace/sift loop: ~128KB L1d on the arm64
/// performance cores, ~48KB on current x86_64, at 48 bytes a record.
#[cfg(target_arch = "aarch64")]
pub const HEAP_MAX_K: usize = 2048;
#[cfg(target_arch = "x86_64")]
pub const HEAP_MAX_K: usize = 1024;
#[cfg(not(any(target_arch = "aarch64", target_arch = "x86_64")))]
pub const HEAP_MAX_K: usize = 512;

/// Minimum record count before the radix sort beats pdqsort; below this
/// the counting passes' random writes lose to cache-friendly comparisons.
#[cfg(target_arch = "aarch64")]
pub const RADIX_MIN_N: usize = 8192;
#[cfg(not(target_arch = "aarch64"))]
pub const RADIX_MIN_N: usize = 16384;

/// Record count above which the comparison sort goes parallel.
const PAR_SORT_MIN: usize = 10_000;

/// Ascending-intent comparison: numeric when both keys parsed, byte-wise
/// on the raw sort field otherwise. A non-numeric record sorts after
/// every numeric one, so failed parses land at the end of an ascending
/// sort.
#[inline]
pub fn cmp_records(a: &SortRecord, b: &SortRecord) -> Ordering {
    match (a.numeric_key.is_nan(), b.numeric_key.is_nan()) {
        (false, false) => a
            .numeric_key
            .partial_cmp(&b.numeric_key)
            .unwrap_or(Ordering::Equal),
        (true, true) => a.sort_bytes.cmp(b.sort_bytes),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
    }
}

/// Sort `records` in `direction` order, keeping at most `limit` of them.
/// On return the vector holds the sorted prefix (all records when no
/// limit). Strategy:
///
/// - limit K small relative to N and within the heap cap: bounded heap,
///   O(N log K), K records of working set;
/// - every key numeric and N large: indirect LSD radix on (key, index)
///   pairs with pass skipping;
/// - otherwise: pdqsort with the semantic comparator.
pub fn sort_records<'a>(
    records: &mut Vec<SortRecord<'a>>,
    direction: Direction,
    limit: Option<usize>,
) -> Result<(), QueryError> {
    let n = records.len();
    if n <= 1 {
        return Ok(());
    }

    if let Some(k) = limit {
        if k > 0 && k <= HEAP_MAX_K && k < n / 4 {
            top_k(records, k, direction);
            return Ok(());
        }
    }

    let all_numeric = records.iter().all(|r| !r.numeric_key.is_nan());
    if all_numeric && n >= RADIX_MIN_N {
        radix::sort_by_key(records)?;
    } else {
        comparison_sort(records, direction);
    }

    if let Some(k) = limit {
        if k < records.len() {
            records.truncate(k);
        }
    }
    Ok(())
}

/// Keep the best K records via an in-place binary heap over the vector's
/// first K slots. The heap is ordered by "sorts later", so the root is
/// always the weakest kept record and a better candidate replaces it in
/// O(log K). A final heap-sort of the kept region yields output order.
fn top_k<'a>(records: &mut Vec<SortRecord<'a>>, k: usize, direction: Direction) {
    let asc = direction == Direction::Asc;
    // after(a, b): a sorts after b in the final output.
    let after = |a: &SortRecord, b: &SortRecord| -> bool {
        match cmp_records(a, b) {
            Ordering::Greater => asc,
            Ordering::Less => !asc,
            Ordering::Equal => false,
        }
    };

    for i in (0..k / 2).rev() {
        sift_down(records, i, k, &after);
    }
    for i in k..records.len() {
        if after(&records[0], &records[i]) {
            records.swap(0, i);
            sift_down(records, 0, k, &after);
        }
    }
    // Pop the worst record to the shrinking end until best-first remains.
    for end in (1..k).rev() {
        records.swap(0, end);
        sift_down(records, 0, end, &after);
    }
    records.truncate(k);
}

fn sift_down<'a, F>(records: &mut [SortRecord<'a>], mut root: usize, len: usize, after: &F)
where
    F: Fn(&SortRecord<'a>, &SortRecord<'a>) -> bool,
{
    loop {
        let left = 2 * root + 1;
        if left >= len {
            break;
        }
        let mut top = root;
        if after(&records[left], &records[top]) {
            top = left;
        }
        let right = left + 1;
        if right < len && after(&records[right], &records[top]) {
            top = right;
        }
        if top == root {
            break;
        }
        records.swap(root, top);
        root = top;
    }
}

/// pdqsort fallback. Descending output is produced by sorting with the
/// operands swapped.
fn comparison_sort(records: &mut [SortRecord<'_>], direction: Direction) {
    let parallel = records.len() > PAR_SORT_MIN;
    match (direction, parallel) {
        (Direction::Asc, true) => records.par_sort_unstable_by(|a, b| cmp_records(a, b)),
        (Direction::Asc, false) => records.sort_unstable_by(|a, b| cmp_records(a, b)),
        (Direction::Desc, true) => records.par_sort_unstable_by(|a, b| cmp_records(b, a)),
        (Direction::Desc, false) => records.sort_unstable_by(|a, b| cmp_records(b, a)),
    }
}
