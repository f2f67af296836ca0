//! CSV ingestion: feature tables, scalers, undersampling and raw
//! transactions for merchant-day aggregation.

pub mod columns;
pub mod dates;
pub mod raw;
pub mod reader;
pub mod sampling;
pub mod scaler;

pub use columns::FeatureColumns;
pub use raw::{read_raw_transactions, RawColumns, RawTransaction};
pub use reader::{read_table, Dataset, ReadOptions, Table};
pub use sampling::undersample_indices;
pub use scaler::{Scaler, ScalerKind};
