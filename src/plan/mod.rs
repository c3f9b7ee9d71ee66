pub mod core;

#[cfg(test)]
mod tests;

pub use self::core::{
    resolve, ColumnIndex, ColumnSel, Header, PredExpr, ProjectionPlan, Query, QueryPlan, SortSpec,
    Source,
};
