use crate::date_util::DateParser;
use crate::metrics::grouping::group_labeled;
use crate::metrics::stats::{avg, median, top_modes};
use crate::metrics::types::{IntervalRow, IntervalStats, IntervalSummary};
use crate::record::{Field, Record};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntervalUnit {
    Minutes,
    Days,
}

/// The six pipeline intervals the dashboards report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntervalKind {
    Distribution,
    Booking,
    Connection,
    DistributionToShow,
    Proposal,
    Close,
}

impl IntervalKind {
    pub const ALL: [IntervalKind; 6] = [
        IntervalKind::Distribution,
        IntervalKind::Booking,
        IntervalKind::Connection,
        IntervalKind::DistributionToShow,
        IntervalKind::Proposal,
        IntervalKind::Close,
    ];

    /// Start and end timestamp fields.
    pub fn endpoints(self) -> (Field, Field) {
        match self {
            IntervalKind::Distribution => (Field::DealCreated, Field::DistributedAt),
            IntervalKind::Booking => (Field::DistributedAt, Field::CalendlyCreatedAt),
            IntervalKind::Connection => (Field::CalendlyCreatedAt, Field::CalendlyTime),
            IntervalKind::DistributionToShow => (Field::DistributedAt, Field::CalendlyTime),
            IntervalKind::Proposal => (Field::CalendlyTime, Field::ProposalSentAt),
            IntervalKind::Close => (Field::ProposalSentAt, Field::ProposalSignedAt),
        }
    }

    pub fn unit(self) -> IntervalUnit {
        match self {
            IntervalKind::Distribution | IntervalKind::Proposal => IntervalUnit::Minutes,
            _ => IntervalUnit::Days,
        }
    }

    pub fn column_prefix(self) -> &'static str {
        match self {
            IntervalKind::Distribution => "t_dist",
            IntervalKind::Booking => "t_booking",
            IntervalKind::Connection => "t_conn",
            IntervalKind::DistributionToShow => "t_dist_show",
            IntervalKind::Proposal => "t_prop",
            IntervalKind::Close => "t_close",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            IntervalKind::Distribution => "distribution",
            IntervalKind::Booking => "booking",
            IntervalKind::Connection => "connection",
            IntervalKind::DistributionToShow => "distribution-to-show",
            IntervalKind::Proposal => "proposal",
            IntervalKind::Close => "close",
        }
    }

    /// Interval length for one record in this kind's unit, if both ends
    /// parse and are in order.
    pub fn sample(self, record: &Record, parser: &DateParser) -> Option<f64> {
        let (start, end) = self.endpoints();
        let start = record.text(start);
        let end = record.text(end);
        match self.unit() {
            IntervalUnit::Minutes => parser.diff_minutes(start.as_deref(), end.as_deref()),
            IntervalUnit::Days => parser.diff_days(start.as_deref(), end.as_deref()),
        }
    }

    fn slot(self, stats: &mut IntervalStats) -> &mut IntervalSummary {
        match self {
            IntervalKind::Distribution => &mut stats.distribution,
            IntervalKind::Booking => &mut stats.booking,
            IntervalKind::Connection => &mut stats.connection,
            IntervalKind::DistributionToShow => &mut stats.distribution_to_show,
            IntervalKind::Proposal => &mut stats.proposal,
            IntervalKind::Close => &mut stats.close,
        }
    }
}

pub fn summarize(samples: &[f64], mode_count: usize) -> IntervalSummary {
    IntervalSummary {
        avg: avg(samples),
        median: median(samples),
        modes: top_modes(samples, mode_count),
    }
}

/// All six interval summaries over one set of records.
pub fn interval_stats(records: &[&Record], parser: &DateParser, mode_count: usize) -> IntervalStats {
    let mut stats = IntervalStats::default();
    for kind in IntervalKind::ALL {
        let samples: Vec<f64> = records
            .iter()
            .filter_map(|r| kind.sample(r, parser))
            .collect();
        *kind.slot(&mut stats) = summarize(&samples, mode_count);
    }
    stats
}

/// Interval statistics per group, sorted by group label.
pub fn analyze_intervals<F>(
    records: &[&Record],
    key_fn: F,
    parser: &DateParser,
    mode_count: usize,
) -> Vec<IntervalRow>
where
    F: Fn(&Record) -> Option<String>,
{
    group_labeled(records, key_fn)
        .into_iter()
        .map(|g| IntervalRow {
            stats: interval_stats(&g.records, parser, mode_count),
            label: g.label,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::stats::DEFAULT_MODE_COUNT;

    fn parser() -> DateParser {
        DateParser::new(chrono_tz::UTC)
    }

    fn agent(r: &Record) -> Option<String> {
        r.text(Field::SdrAgent).map(|s| s.into_owned())
    }

    #[test]
    fn test_sample_units() {
        let p = parser();
        let r = Record::new()
            .with("deal_created", "2024-01-01 10:00")
            .with("distributed_at", "2024-01-01 10:45")
            .with("calendly_created_at", "2024-01-03 10:45");

        assert_eq!(IntervalKind::Distribution.sample(&r, &p), Some(45.0));
        assert_eq!(IntervalKind::Booking.sample(&r, &p), Some(2.0));
        assert_eq!(IntervalKind::Connection.sample(&r, &p), None);
    }

    #[test]
    fn test_negative_interval_excluded() {
        let p = parser();
        let rows = [
            Record::new()
                .with("deal_created", "2024-01-02 10:00")
                .with("distributed_at", "2024-01-01 10:00"),
            Record::new()
                .with("deal_created", "2024-01-01 10:00")
                .with("distributed_at", "2024-01-01 10:30"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let stats = interval_stats(&refs, &p, DEFAULT_MODE_COUNT);
        assert_eq!(stats.distribution.avg, Some(30.0));
        assert_eq!(stats.distribution.modes, "30 (1)");
    }

    #[test]
    fn test_empty_samples_report_nulls() {
        let rows = [Record::new().with("sdr_agent", "Ana")];
        let refs: Vec<&Record> = rows.iter().collect();
        let out = analyze_intervals(&refs, agent, &parser(), DEFAULT_MODE_COUNT);

        assert_eq!(out.len(), 1);
        for (_, s) in out[0].stats.entries() {
            assert_eq!(s, &IntervalSummary::default());
        }
    }

    #[test]
    fn test_grouped_and_sorted() {
        let rows = [
            Record::new()
                .with("sdr_agent", "Zoe")
                .with("proposal_sent_at", "2024-01-01")
                .with("proposal_signed_at", "2024-01-04 12:00"),
            Record::new()
                .with("sdr_agent", "ana")
                .with("calendly_time", "2024-01-01 09:00")
                .with("proposal_sent_at", "2024-01-01 11:00"),
            Record::new()
                .with("sdr_agent", "Ana")
                .with("calendly_time", "2024-01-01 09:00")
                .with("proposal_sent_at", "2024-01-01 10:00"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let out = analyze_intervals(&refs, agent, &parser(), DEFAULT_MODE_COUNT);

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].label, "ana");
        assert_eq!(out[0].stats.proposal.avg, Some(90.0));
        assert_eq!(out[0].stats.proposal.median, Some(90.0));
        assert_eq!(out[0].stats.proposal.modes, "60 (1), 120 (1)");
        assert_eq!(out[1].label, "Zoe");
        assert_eq!(out[1].stats.close.avg, Some(3.5));
    }

    #[test]
    fn test_prefixes_match_stats_entries() {
        let stats = IntervalStats::default();
        let entries = stats.entries();
        for (kind, (prefix, _)) in IntervalKind::ALL.iter().zip(entries.iter()) {
            assert_eq!(kind.column_prefix(), *prefix);
        }
    }
}
