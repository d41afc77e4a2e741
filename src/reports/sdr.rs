use log::debug;
use serde::Serialize;

use crate::metrics::collate;
use crate::metrics::funnel::{aggregate, conversion_rows};
use crate::metrics::grouping::group_labeled;
use crate::metrics::intervals::analyze_intervals;
use crate::metrics::types::{ConversionRow, FunnelCounts, GroupNode, IntervalRow};
use crate::query::filter::RowFilter;
use crate::query::period::MonthRange;
use crate::record::{Field, Record};
use crate::reports::{country_program_breakdown, field_text, ReportContext};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SdrFilters {
    pub created: MonthRange,
    pub distributed: MonthRange,
    pub call: MonthRange,
    pub proposal: MonthRange,
    /// SDR agent name fragments, any of which may match.
    pub agents: Vec<String>,
}

impl SdrFilters {
    pub fn row_filter(&self) -> RowFilter {
        RowFilter::new()
            .month_range(Field::DealCreated, &self.created)
            .month_range(Field::DistributedAt, &self.distributed)
            .month_range(Field::CalendlyTime, &self.call)
            .month_range(Field::ProposalSentAt, &self.proposal)
            .contains_any(Field::SdrAgent, &self.agents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReasonCount {
    pub reason: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SdrReport {
    pub overview: FunnelCounts,
    pub agent_conversion: Vec<ConversionRow>,
    pub time_intervals: Vec<IntervalRow>,
    pub mql_lost_reasons: Vec<ReasonCount>,
    pub breakdown: Vec<GroupNode<FunnelCounts>>,
}

pub fn build(records: &[Record], filters: &SdrFilters, ctx: &ReportContext) -> SdrReport {
    let rows = filters.row_filter().apply(records, &ctx.parser);
    debug!("sdr: {} of {} rows after filters", rows.len(), records.len());

    let agent = |r: &Record| field_text(r, Field::SdrAgent);
    let by_agent = group_labeled(&rows, agent);

    SdrReport {
        overview: aggregate(&rows),
        agent_conversion: conversion_rows(&by_agent),
        time_intervals: analyze_intervals(&rows, agent, &ctx.parser, ctx.mode_count),
        mql_lost_reasons: lost_reasons(&rows),
        breakdown: country_program_breakdown(&rows),
    }
}

/// Lost-reason frequencies, most common first; ties by reason.
pub fn lost_reasons(rows: &[&Record]) -> Vec<ReasonCount> {
    let mut reasons: Vec<ReasonCount> =
        group_labeled(rows, |r| field_text(r, Field::MqlLostReason))
            .into_iter()
            .map(|g| ReasonCount {
                count: g.records.len() as u64,
                reason: g.label,
            })
            .collect();
    reasons.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| collate::compare(&a.reason, &b.reason))
    });
    reasons
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> ReportContext {
        ReportContext {
            parser: crate::date_util::DateParser::new(chrono_tz::UTC),
            ..Default::default()
        }
    }

    fn deal(id: &str, agent: &str, reason: Option<&str>) -> Record {
        Record::new()
            .with("deal_id", id)
            .with("sdr_agent", agent)
            .with("created_at", "2024-03-01 08:00")
            .with("mql_lost_reason", reason)
    }

    #[test]
    fn test_agent_rows_and_reasons() {
        let rows = vec![
            deal("D1", "Ana", Some("No budget")),
            deal("D2", "Rui", Some("no budget")),
            deal("D3", "Rui", Some("Unreachable")),
            deal("D4", "Rui", None)
                .with("distributed_at", "2024-03-01 08:15")
                .with("calendly_created_at", "2024-03-02 08:15"),
        ];
        let report = build(&rows, &SdrFilters::default(), &ctx());

        assert_eq!(report.overview.created, 4);
        let labels: Vec<&str> = report.agent_conversion.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["Ana", "Rui"]);
        assert_eq!(report.agent_conversion[1].conversion.conv_created_to_distributed, 33.3);

        assert_eq!(
            report.mql_lost_reasons,
            vec![
                ReasonCount { reason: "No budget".into(), count: 2 },
                ReasonCount { reason: "(not set)".into(), count: 1 },
                ReasonCount { reason: "Unreachable".into(), count: 1 },
            ]
        );

        let rui = &report.time_intervals[1];
        assert_eq!(rui.stats.distribution.avg, Some(15.0));
        assert_eq!(rui.stats.booking.avg, Some(1.0));
    }

    #[test]
    fn test_agent_filter_is_substring() {
        let rows = vec![deal("D1", "Ana Silva", None), deal("D2", "Rui", None)];
        let filters = SdrFilters {
            agents: vec!["SILVA".into()],
            ..Default::default()
        };
        let report = build(&rows, &filters, &ctx());
        assert_eq!(report.overview.created, 1);
        assert_eq!(report.agent_conversion[0].label, "Ana Silva");
    }

    #[test]
    fn test_created_alias_honoured_by_month_filter() {
        let rows = vec![deal("D1", "Ana", None)];
        let filters = SdrFilters {
            created: MonthRange::single("2024-04").unwrap(),
            ..Default::default()
        };
        let report = build(&rows, &filters, &ctx());
        assert_eq!(report.overview.created, 0);
    }
}
