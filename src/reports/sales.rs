use log::debug;
use serde::Serialize;

use crate::metrics::funnel::{aggregate, conversion_rows};
use crate::metrics::grouping::group_labeled;
use crate::metrics::intervals::analyze_intervals;
use crate::metrics::types::{ConversionRow, FunnelCounts, GroupNode, IntervalRow};
use crate::query::filter::RowFilter;
use crate::query::period::MonthRange;
use crate::record::{Field, Record};
use crate::reports::{country_program_breakdown, field_text, ReportContext};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SalesFilters {
    pub created: MonthRange,
    pub distributed: MonthRange,
    /// Month of the completed call.
    pub call: MonthRange,
    pub proposal: MonthRange,
    /// Owner name fragments, any of which may match.
    pub owners: Vec<String>,
    pub pipeline: Option<String>,
}

impl SalesFilters {
    pub fn row_filter(&self, ctx: &ReportContext) -> RowFilter {
        let pipelines: Vec<String> = self.pipeline.iter().cloned().collect();
        RowFilter::new()
            .month_range(Field::DealCreated, &self.created)
            .month_range(Field::DistributedAt, &self.distributed)
            .month_range(Field::CalendlyTime, &self.call)
            .month_range(Field::ProposalSentAt, &self.proposal)
            .contains_any(Field::Owner, &ctx.owner_allowlist)
            .contains_any(Field::Owner, &self.owners)
            .equals_any(Field::Pipeline, &pipelines)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesReport {
    pub overview: FunnelCounts,
    pub owner_conversion: Vec<ConversionRow>,
    pub time_intervals: Vec<IntervalRow>,
    pub breakdown: Vec<GroupNode<FunnelCounts>>,
}

pub fn build(records: &[Record], filters: &SalesFilters, ctx: &ReportContext) -> SalesReport {
    let rows = filters.row_filter(ctx).apply(records, &ctx.parser);
    debug!("sales: {} of {} rows after filters", rows.len(), records.len());

    let owner = |r: &Record| field_text(r, Field::Owner);
    let by_owner = group_labeled(&rows, owner);

    SalesReport {
        overview: aggregate(&rows),
        owner_conversion: conversion_rows(&by_owner),
        time_intervals: analyze_intervals(&rows, owner, &ctx.parser, ctx.mode_count),
        breakdown: country_program_breakdown(&rows),
    }
}
