//! Row and column structuring of a table body.

pub mod cells;
pub mod columns;
pub mod rows;

pub use cells::assign_cells;
pub use columns::{build_columns, infer_columns, ColumnLayout};
pub use rows::cluster_rows;
