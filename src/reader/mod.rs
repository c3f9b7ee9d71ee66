pub mod core;
pub mod rfc4180;

#[cfg(test)]
mod tests;

pub use self::core::{LineReader, WINDOW_SIZE};
pub use self::rfc4180::{split_quoted, RecordReader};
