use log::debug;
use serde::Serialize;

use crate::metrics::funnel::aggregate_contacts;
use crate::metrics::tree::build_tree;
use crate::metrics::types::{ContactFunnel, GroupNode};
use crate::query::filter::RowFilter;
use crate::query::period::MonthRange;
use crate::record::{Field, Record, Value};
use crate::reports::attribution::{mask_email, normalize_utm};
use crate::reports::{field_text, ReportContext};

/// Rows shown in the sample table under the tabs.
pub const SAMPLE_ROWS: usize = 10;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarketingFilters {
    pub contact_created: MonthRange,
    pub deal_created: MonthRange,
    pub distributed: MonthRange,
    pub proposal_sent: MonthRange,
    pub proposal_signed: MonthRange,
    /// Apply only the contact-created range.
    pub contact_only: bool,
}

impl MarketingFilters {
    pub fn row_filter(&self) -> RowFilter {
        let filter = RowFilter::new().month_range(Field::ContactCreated, &self.contact_created);
        if self.contact_only {
            return filter;
        }
        filter
            .month_range(Field::DealCreated, &self.deal_created)
            .month_range(Field::DistributedAt, &self.distributed)
            .month_range(Field::ProposalSentAt, &self.proposal_sent)
            .month_range(Field::ProposalSignedAt, &self.proposal_signed)
    }
}

/// The four attribution trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketingTab {
    /// Medium → Source → Campaign.
    Utm,
    /// First-touch Medium → Source → Campaign.
    FirstTouch,
    /// Submission page → Medium → Source.
    Submission,
    /// First-touch submission page → Medium → Source.
    FtSubmission,
}

impl MarketingTab {
    pub const ALL: [MarketingTab; 4] = [
        MarketingTab::Utm,
        MarketingTab::FirstTouch,
        MarketingTab::Submission,
        MarketingTab::FtSubmission,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarketingTab::Utm => "utm",
            MarketingTab::FirstTouch => "first_touch",
            MarketingTab::Submission => "submission",
            MarketingTab::FtSubmission => "ft_submission",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|t| t.name() == s)
    }

    pub fn is_first_touch(self) -> bool {
        matches!(self, MarketingTab::FirstTouch | MarketingTab::FtSubmission)
    }

    /// Column headers of each level, for export.
    pub fn levels(self) -> [&'static str; 3] {
        match self {
            MarketingTab::Utm | MarketingTab::FirstTouch => ["medium", "source", "campaign"],
            MarketingTab::Submission | MarketingTab::FtSubmission => {
                ["submission_page", "medium", "source"]
            }
        }
    }
}

/// Attribution values of one contact, either last or first touch.
struct Touch {
    medium: Option<String>,
    source: Option<String>,
    campaign: Option<String>,
    page: Option<String>,
}

impl Touch {
    fn read(record: &Record, first_touch: bool, normalize: bool) -> Self {
        let [medium, source, campaign, page] = if first_touch {
            [Field::FtMedium, Field::FtSource, Field::FtCampaign, Field::FtSubmissionPage]
        } else {
            [Field::UtmMedium, Field::UtmSource, Field::UtmCampaign, Field::SubmissionPage]
        };
        let mut touch = Touch {
            medium: field_text(record, medium),
            source: field_text(record, source),
            campaign: field_text(record, campaign),
            page: field_text(record, page),
        };
        if normalize {
            let (medium, source) = normalize_utm(touch.medium.as_deref(), touch.source.as_deref());
            touch.medium = Some(medium);
            touch.source = Some(source);
        }
        touch
    }

    fn level(self, tab: MarketingTab, level: usize) -> Option<String> {
        match (tab, level) {
            (MarketingTab::Utm | MarketingTab::FirstTouch, 0) => self.medium,
            (MarketingTab::Utm | MarketingTab::FirstTouch, 1) => self.source,
            (MarketingTab::Utm | MarketingTab::FirstTouch, _) => self.campaign,
            (_, 0) => self.page,
            (_, 1) => self.medium,
            (_, _) => self.source,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketingReport {
    pub utm: Vec<GroupNode<ContactFunnel>>,
    pub first_touch: Vec<GroupNode<ContactFunnel>>,
    pub submission: Vec<GroupNode<ContactFunnel>>,
    pub ft_submission: Vec<GroupNode<ContactFunnel>>,
    /// First filtered rows, emails masked.
    pub sample_rows: Vec<Record>,
}

impl MarketingReport {
    pub fn tab(&self, tab: MarketingTab) -> &[GroupNode<ContactFunnel>] {
        match tab {
            MarketingTab::Utm => &self.utm,
            MarketingTab::FirstTouch => &self.first_touch,
            MarketingTab::Submission => &self.submission,
            MarketingTab::FtSubmission => &self.ft_submission,
        }
    }
}

pub fn build(records: &[Record], filters: &MarketingFilters, ctx: &ReportContext) -> MarketingReport {
    let rows = filters.row_filter().apply(records, &ctx.parser);
    debug!("marketing: {} of {} rows after filters", rows.len(), records.len());

    let tree = |tab: MarketingTab| {
        if tab.is_first_touch() && !ctx.first_touch {
            return Vec::new();
        }
        build_tree(
            &rows,
            tab.levels().len(),
            |r, level| Touch::read(r, tab.is_first_touch(), ctx.normalize_utm).level(tab, level),
            aggregate_contacts,
        )
    };

    MarketingReport {
        utm: tree(MarketingTab::Utm),
        first_touch: tree(MarketingTab::FirstTouch),
        submission: tree(MarketingTab::Submission),
        ft_submission: tree(MarketingTab::FtSubmission),
        sample_rows: sample_rows(&rows),
    }
}

fn sample_rows(rows: &[&Record]) -> Vec<Record> {
    rows.iter()
        .take(SAMPLE_ROWS)
        .map(|r| {
            let mut sample = (*r).clone();
            let masked = mask_email(r.text(Field::Email).as_deref());
            sample.insert(Field::Email.name(), Value::Text(masked));
            sample
        })
        .collect()
}
