use crate::metrics::grouping::Group;
use crate::metrics::stats::pct;
use crate::metrics::types::{ContactFunnel, ConversionRates, ConversionRow, FunnelCounts};
use crate::record::{Field, Record};

/// Pipeline stages in funnel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunnelStage {
    Created,
    Distributed,
    CallScheduled,
    CallCompleted,
    ProposalSent,
    ClosedWon,
}

impl FunnelStage {
    pub const ALL: [FunnelStage; 6] = [
        FunnelStage::Created,
        FunnelStage::Distributed,
        FunnelStage::CallScheduled,
        FunnelStage::CallCompleted,
        FunnelStage::ProposalSent,
        FunnelStage::ClosedWon,
    ];

    /// Timestamp field whose presence marks the stage as reached.
    pub fn field(self) -> Field {
        match self {
            FunnelStage::Created => Field::DealCreated,
            FunnelStage::Distributed => Field::DistributedAt,
            FunnelStage::CallScheduled => Field::CalendlyCreatedAt,
            FunnelStage::CallCompleted => Field::CalendlyTime,
            FunnelStage::ProposalSent => Field::ProposalSentAt,
            FunnelStage::ClosedWon => Field::ProposalSignedAt,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FunnelStage::Created => "created",
            FunnelStage::Distributed => "distributed",
            FunnelStage::CallScheduled => "calls_scheduled",
            FunnelStage::CallCompleted => "calls_completed",
            FunnelStage::ProposalSent => "proposals",
            FunnelStage::ClosedWon => "closed_won",
        }
    }

    /// Stages are independent: a later stage counts even if an earlier
    /// timestamp is missing. Creation also needs a deal id.
    pub fn reached(self, record: &Record) -> bool {
        match self {
            FunnelStage::Created => record.has(Field::DealId) && record.has(Field::DealCreated),
            stage => record.has(stage.field()),
        }
    }
}

fn count(records: &[&Record], stage: FunnelStage) -> u64 {
    records.iter().filter(|r| stage.reached(r)).count() as u64
}

/// Funnel counts over a set of deal rows.
pub fn aggregate(records: &[&Record]) -> FunnelCounts {
    FunnelCounts {
        created: count(records, FunnelStage::Created),
        distributed: count(records, FunnelStage::Distributed),
        calls_scheduled: count(records, FunnelStage::CallScheduled),
        calls_completed: count(records, FunnelStage::CallCompleted),
        proposals: count(records, FunnelStage::ProposalSent),
        closed_won: count(records, FunnelStage::ClosedWon),
    }
}

/// Funnel counts over contact rows joined to their deals.
pub fn aggregate_contacts(records: &[&Record]) -> ContactFunnel {
    let deals = aggregate(records);
    ContactFunnel {
        contacts: records.len() as u64,
        deals_created: deals.created,
        distributed: deals.distributed,
        calls_scheduled: deals.calls_scheduled,
        calls_completed: deals.calls_completed,
        proposals: deals.proposals,
        closed_won: deals.closed_won,
    }
}

impl FunnelCounts {
    pub fn get(&self, stage: FunnelStage) -> u64 {
        match stage {
            FunnelStage::Created => self.created,
            FunnelStage::Distributed => self.distributed,
            FunnelStage::CallScheduled => self.calls_scheduled,
            FunnelStage::CallCompleted => self.calls_completed,
            FunnelStage::ProposalSent => self.proposals,
            FunnelStage::ClosedWon => self.closed_won,
        }
    }
}

impl ConversionRates {
    pub fn from_counts(c: &FunnelCounts) -> Self {
        Self {
            conv_created_to_distributed: pct(c.distributed, c.created),
            conv_distributed_to_scheduled: pct(c.calls_scheduled, c.distributed),
            conv_scheduled_to_completed: pct(c.calls_completed, c.calls_scheduled),
            conv_completed_to_proposal: pct(c.proposals, c.calls_completed),
            conv_proposal_to_won: pct(c.closed_won, c.proposals),
        }
    }
}

/// One conversion row per group, in the groups' order.
pub fn conversion_rows(groups: &[Group<'_>]) -> Vec<ConversionRow> {
    groups
        .iter()
        .map(|g| {
            let funnel = aggregate(&g.records);
            ConversionRow {
                label: g.label.clone(),
                conversion: ConversionRates::from_counts(&funnel),
                funnel,
            }
        })
        .collect()
}
