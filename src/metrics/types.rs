use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Deal counts per funnel stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FunnelCounts {
    pub created: u64,
    pub distributed: u64,
    pub calls_scheduled: u64,
    pub calls_completed: u64,
    pub proposals: u64,
    pub closed_won: u64,
}

/// Adjacent-stage conversion percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ConversionRates {
    pub conv_created_to_distributed: f64,
    pub conv_distributed_to_scheduled: f64,
    pub conv_scheduled_to_completed: f64,
    pub conv_completed_to_proposal: f64,
    pub conv_proposal_to_won: f64,
}

/// Funnel metrics for a contact-level (marketing) bucket. `contacts` is
/// the raw row count; the deal stages follow the same rules as
/// [`FunnelCounts`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContactFunnel {
    pub contacts: u64,
    pub deals_created: u64,
    pub distributed: u64,
    pub calls_scheduled: u64,
    pub calls_completed: u64,
    pub proposals: u64,
    pub closed_won: u64,
}

/// One owner or agent line of a conversion table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversionRow {
    pub label: String,
    #[serde(flatten)]
    pub funnel: FunnelCounts,
    #[serde(flatten)]
    pub conversion: ConversionRates,
}

/// A node of a hierarchical report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupNode<M> {
    /// Unique across the whole tree: ancestor labels joined with `/`.
    pub key: String,
    pub label: String,
    pub metrics: M,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<GroupNode<M>>>,
}

impl<M> GroupNode<M> {
    pub fn children(&self) -> &[GroupNode<M>] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// avg / median / modes for one interval sample set.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct IntervalSummary {
    pub avg: Option<f64>,
    pub median: Option<f64>,
    pub modes: String,
}

/// Summaries of the six pipeline intervals.
///
/// Serializes flat as `t_<interval>_avg`, `t_<interval>_med` and
/// `t_<interval>_modes`, the shape the dashboards consume.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IntervalStats {
    pub distribution: IntervalSummary,
    pub booking: IntervalSummary,
    pub connection: IntervalSummary,
    pub distribution_to_show: IntervalSummary,
    pub proposal: IntervalSummary,
    pub close: IntervalSummary,
}

impl IntervalStats {
    pub fn entries(&self) -> [(&'static str, &IntervalSummary); 6] {
        [
            ("t_dist", &self.distribution),
            ("t_booking", &self.booking),
            ("t_conn", &self.connection),
            ("t_dist_show", &self.distribution_to_show),
            ("t_prop", &self.proposal),
            ("t_close", &self.close),
        ]
    }
}

impl Serialize for IntervalStats {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(18))?;
        for (prefix, summary) in self.entries() {
            map.serialize_entry(&format!("{prefix}_avg"), &summary.avg)?;
            map.serialize_entry(&format!("{prefix}_med"), &summary.median)?;
            map.serialize_entry(&format!("{prefix}_modes"), &summary.modes)?;
        }
        map.end()
    }
}

/// Interval statistics for one group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntervalRow {
    pub label: String,
    #[serde(flatten)]
    pub stats: IntervalStats,
}
