pub mod builder;
pub mod filter;
pub mod period;

pub use builder::{distinct_values, RecordQuery, DEFAULT_ROW_LIMIT};
pub use filter::RowFilter;
pub use period::MonthRange;
