pub mod config;
pub mod date_util;
pub mod error;
pub mod export;
pub mod metrics;
pub mod query;
pub mod record;
pub mod reports;
pub mod storage;

pub use config::Config;
pub use date_util::DateParser;
pub use error::{Error, Result};
pub use metrics::{ContactFunnel, ConversionRow, FunnelCounts, GroupNode, IntervalRow};
pub use query::{MonthRange, RecordQuery, RowFilter};
pub use record::{Field, Record, Value, NOT_SET};
pub use reports::deals::EnrichedDeal;
pub use reports::marketing::MarketingTab;
pub use reports::{
    MarketingFilters, MarketingReport, ReportContext, SalesFilters, SalesReport, SdrFilters,
    SdrReport,
};
pub use storage::schema::SchemaCapabilities;
pub use storage::Database;

use log::info;

/// Main entry point: a CRM dataset plus the settings its reports run with.
pub struct Dashboard {
    db: Database,
    config: Config,
    capabilities: SchemaCapabilities,
    context: ReportContext,
}

impl Dashboard {
    /// Probe the dataset's optional columns once and keep the result for
    /// every report built from this handle.
    pub async fn new(db: Database, config: Config) -> Result<Self> {
        config.validate()?;
        let capabilities = db.capabilities().await?;
        let context = ReportContext::new(&config, &capabilities)?;
        info!(
            "reporting in {}, first-touch tabs {}",
            context.parser.timezone().name(),
            if context.first_touch { "on" } else { "off" }
        );
        Ok(Self {
            db,
            config,
            capabilities,
            context,
        })
    }

    /// Access the database (for direct queries in the CLI).
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn capabilities(&self) -> &SchemaCapabilities {
        &self.capabilities
    }

    pub fn context(&self) -> &ReportContext {
        &self.context
    }

    fn deal_query(&self) -> RecordQuery {
        RecordQuery::deals().limit(self.config.row_limit)
    }

    pub async fn sales(&self, filters: &SalesFilters) -> Result<SalesReport> {
        let mut query = self.deal_query();
        if let Some(ref pipeline) = filters.pipeline {
            query = query.pipeline(pipeline);
        }
        let rows = query.fetch(&self.db).await?;
        Ok(reports::sales::build(&rows, filters, &self.context))
    }

    pub async fn sdr(&self, filters: &SdrFilters) -> Result<SdrReport> {
        let rows = self.deal_query().fetch(&self.db).await?;
        Ok(reports::sdr::build(&rows, filters, &self.context))
    }

    pub async fn marketing(&self, filters: &MarketingFilters) -> Result<MarketingReport> {
        let rows = RecordQuery::contacts_with_deals(&self.capabilities)
            .limit(self.config.row_limit)
            .fetch(&self.db)
            .await?;
        Ok(reports::marketing::build(&rows, filters, &self.context))
    }

    /// Every deal with its derived timings.
    pub async fn deals(&self) -> Result<Vec<EnrichedDeal>> {
        let rows = self.deal_query().fetch(&self.db).await?;
        Ok(reports::deals::enrich(rows, &self.context.parser))
    }

    pub async fn owners(&self) -> Result<Vec<String>> {
        query::distinct_values(&self.db, Field::Owner).await
    }

    pub async fn sdr_agents(&self) -> Result<Vec<String>> {
        query::distinct_values(&self.db, Field::SdrAgent).await
    }
}
