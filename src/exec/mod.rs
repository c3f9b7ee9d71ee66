pub mod core;
pub mod mapped;
pub mod sequential;

#[cfg(test)]
mod tests;

pub use self::core::{
    available_cores, run_query, select_strategy, Strategy, MAX_WORKERS, MMAP_MIN_BYTES,
    PARALLEL_MIN_BYTES, PARALLEL_MIN_LIMIT,
};
