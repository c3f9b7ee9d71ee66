pub mod core;


pub use self::core::{matches, matches_compare, parse_f64, Compare, CompareOp, Predicate};
