//! In-memory grouping, funnel aggregation and interval statistics shared by
//! every report.

pub mod collate;
pub mod funnel;
pub mod grouping;
pub mod intervals;
pub mod stats;
pub mod tree;
pub mod types;

pub use funnel::{aggregate, aggregate_contacts, conversion_rows, FunnelStage};
pub use grouping::{group_by, group_labeled, Group};
pub use intervals::{analyze_intervals, interval_stats, IntervalKind};
pub use tree::build_tree;
pub use types::*;
