//! The sales, SDR and marketing dashboards, assembled from fetched rows.
//!
//! Every builder here is a pure function of its rows, filters and a
//! [`ReportContext`]; fetching happens in [`crate::Dashboard`].

pub mod attribution;
pub mod deals;
pub mod marketing;
pub mod sales;
pub mod sdr;

use crate::config::Config;
use crate::date_util::DateParser;
use crate::error::Result;
use crate::metrics::funnel::aggregate;
use crate::metrics::tree::build_tree;
use crate::metrics::types::{FunnelCounts, GroupNode};
use crate::record::{Field, Record};
use crate::storage::schema::SchemaCapabilities;

pub use marketing::{MarketingFilters, MarketingReport};
pub use sales::{SalesFilters, SalesReport};
pub use sdr::{SdrFilters, SdrReport};

/// Deployment-level settings the report builders need.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportContext {
    pub parser: DateParser,
    pub mode_count: usize,
    /// First-touch tabs are built only when enabled and the columns exist.
    pub first_touch: bool,
    pub normalize_utm: bool,
    pub owner_allowlist: Vec<String>,
}

impl Default for ReportContext {
    fn default() -> Self {
        let config = Config::default();
        Self {
            parser: DateParser::default(),
            mode_count: config.mode_count,
            first_touch: config.first_touch,
            normalize_utm: config.normalize_utm,
            owner_allowlist: config.owner_allowlist,
        }
    }
}

impl ReportContext {
    pub fn new(config: &Config, caps: &SchemaCapabilities) -> Result<Self> {
        Ok(Self {
            parser: config.date_parser()?,
            mode_count: config.mode_count,
            first_touch: config.first_touch && caps.first_touch(),
            normalize_utm: config.normalize_utm,
            owner_allowlist: config.owner_allowlist.clone(),
        })
    }
}

pub(crate) fn field_text(record: &Record, field: Field) -> Option<String> {
    record.text(field).map(|s| s.into_owned())
}

/// Country → Program tree with deal funnel metrics.
pub(crate) fn country_program_breakdown(records: &[&Record]) -> Vec<GroupNode<FunnelCounts>> {
    const LEVELS: [Field; 2] = [Field::Country, Field::Program];
    build_tree(records, LEVELS.len(), |r, level| field_text(r, LEVELS[level]), aggregate)
}
