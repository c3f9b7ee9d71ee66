/// Strategy routing: pick the cheapest execution path that can saturate
/// the machine for a given file size, core count, and query shape.
use std::io::{self, Write};

use tracing::debug;

use crate::common::io::{file_size, open_noatime};
use crate::error::QueryError;
use crate::plan::{Query, Source};

use super::{mapped, sequential};

/// Below this, mmap setup (page tables, TLB shootdown on unmap) costs
/// more than the buffered reader it would replace.
pub const MMAP_MIN_BYTES: u64 = 5 * 1024 * 1024;

/// Fan-out threshold. Parallelism pays off only once each worker gets a
/// few megabytes to chew through.
pub const PARALLEL_MIN_BYTES: u64 = 10 * 1024 * 1024;

/// A limited non-sort query below this many rows finishes in
/// milliseconds sequentially; spawning workers would only add overhead.
pub const PARALLEL_MIN_LIMIT: usize = 100_000;

/// Per-worker bookkeeping grows past this point without buying
/// bandwidth, so extra cores are deliberately left idle.
pub const MAX_WORKERS: usize = 8;

/// The execution paths a file-backed query can take. Streamed input
/// (stdin) bypasses this choice entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    ParallelMapped,
    SingleMapped,
    Sequential,
}

/// First matching rule wins:
/// 1. big file + multiple cores + (large or unbounded output, or a
///    sort): parallel mapped;
/// 2. medium file: single-threaded mapped;
/// 3. otherwise: buffered sequential reads.
pub fn select_strategy(
    file_len: u64,
    cores: usize,
    limit: Option<usize>,
    has_sort: bool,
) -> Strategy {
    let big_output = limit.map(|l| l > PARALLEL_MIN_LIMIT).unwrap_or(true);
    if file_len > PARALLEL_MIN_BYTES && cores > 1 && (big_output || has_sort) {
        Strategy::ParallelMapped
    } else if file_len > MMAP_MIN_BYTES {
        Strategy::SingleMapped
    } else {
        Strategy::Sequential
    }
}

pub fn available_cores() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Execute a query, writing the CSV result to `sink`. All resources —
/// mapping, worker lists, arena, output buffer — are released before
/// this returns.
pub fn run_query<W: Write>(query: &Query, sink: W) -> Result<(), QueryError> {
    match &query.source {
        Source::Stdin => {
            debug!("strategy: stream (stdin)");
            let stdin = io::stdin();
            sequential::run_stream(stdin.lock(), query, sink)
        }
        Source::File(path) => {
            let len = file_size(path)?;
            let cores = available_cores();
            let strategy =
                select_strategy(len, cores, query.effective_limit(), query.sort.is_some());
            debug!(file_len = len, cores, ?strategy, "strategy selected");
            match strategy {
                Strategy::ParallelMapped => {
                    mapped::run_mapped(path, query, sink, cores.min(MAX_WORKERS))
                }
                Strategy::SingleMapped => mapped::run_mapped(path, query, sink, 1),
                Strategy::Sequential => {
                    let file = open_noatime(path)?;
                    sequential::run_file(file, query, sink)
                }
            }
        }
    }
}
