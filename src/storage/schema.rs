use std::collections::HashSet;

use serde::Serialize;

use crate::record::Field;

/// Primary key of `contacts`, joined from `deals."Primary Contact ID"`.
pub const CONTACT_KEY_COLUMN: &str = "ID";
pub const DEAL_CONTACT_COLUMN: &str = "Primary Contact ID";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Contacts,
    Deals,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Contacts => "contacts",
            Table::Deals => "deals",
        }
    }

    /// Alias used in report queries.
    pub fn alias(self) -> &'static str {
        match self {
            Table::Contacts => "c",
            Table::Deals => "d",
        }
    }
}

/// Physical table and column a field is read from.
pub fn column_for(field: Field) -> (Table, &'static str) {
    match field {
        Field::ContactId => (Table::Contacts, CONTACT_KEY_COLUMN),
        Field::Email => (Table::Contacts, "Email"),
        Field::ContactCreated => (Table::Contacts, "Date Created"),
        Field::UtmMedium => (Table::Contacts, "UTM Medium"),
        Field::UtmSource => (Table::Contacts, "UTM Source"),
        Field::UtmCampaign => (Table::Contacts, "UTM Campaign"),
        Field::SubmissionPage => (Table::Contacts, "Submission Page"),
        Field::FtMedium => (Table::Contacts, "First Touch UTM Medium"),
        Field::FtSource => (Table::Contacts, "First Touch UTM Source"),
        Field::FtCampaign => (Table::Contacts, "First Touch UTM Campaign"),
        Field::FtSubmissionPage => (Table::Contacts, "First Touch Submission Page"),
        Field::DealId => (Table::Deals, "Deal ID"),
        Field::DealCreated => (Table::Deals, "Deal Creation Date Time"),
        Field::Owner => (Table::Deals, "Owner Name"),
        Field::SdrAgent => (Table::Deals, "--- SDR AGENT --- REQUIRED FIELD ---"),
        Field::Country => (Table::Deals, "Primary Country of Interest"),
        Field::Program => (Table::Deals, "Primary Program of Interest"),
        Field::Pipeline => (Table::Deals, "Pipeline"),
        Field::MqlLostReason => (Table::Deals, "MQL Lost Reason"),
        Field::DistributedAt => (Table::Deals, "DISTRIBUTION Time"),
        Field::CalendlyCreatedAt => (Table::Deals, "CALENDLY Event Created At"),
        Field::CalendlyTime => (Table::Deals, "CALENDLY Time"),
        Field::ProposalSentAt => (Table::Deals, "Deal Proposal Sent Date Time"),
        Field::ProposalSignedAt => (Table::Deals, "Deal Proposal Signed Date Time"),
    }
}

/// Attribution columns that older exports may lack.
pub const OPTIONAL_FIELDS: [Field; 8] = [
    Field::UtmMedium,
    Field::UtmSource,
    Field::UtmCampaign,
    Field::SubmissionPage,
    Field::FtMedium,
    Field::FtSource,
    Field::FtCampaign,
    Field::FtSubmissionPage,
];

/// Which optional attribution columns exist in this dataset. Probed once
/// when the database is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchemaCapabilities {
    pub utm_medium: bool,
    pub utm_source: bool,
    pub utm_campaign: bool,
    pub submission_page: bool,
    pub ft_medium: bool,
    pub ft_source: bool,
    pub ft_campaign: bool,
    pub ft_submission_page: bool,
}

impl SchemaCapabilities {
    /// Every optional column present.
    pub fn all() -> Self {
        Self {
            utm_medium: true,
            utm_source: true,
            utm_campaign: true,
            submission_page: true,
            ft_medium: true,
            ft_source: true,
            ft_campaign: true,
            ft_submission_page: true,
        }
    }

    pub fn probe(conn: &rusqlite::Connection) -> Result<Self, rusqlite::Error> {
        let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('contacts')")?;
        let columns: HashSet<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<_, _>>()?;

        let present = |field: Field| columns.contains(column_for(field).1);
        Ok(Self {
            utm_medium: present(Field::UtmMedium),
            utm_source: present(Field::UtmSource),
            utm_campaign: present(Field::UtmCampaign),
            submission_page: present(Field::SubmissionPage),
            ft_medium: present(Field::FtMedium),
            ft_source: present(Field::FtSource),
            ft_campaign: present(Field::FtCampaign),
            ft_submission_page: present(Field::FtSubmissionPage),
        })
    }

    /// Whether `field` can be selected. Non-optional fields always can.
    pub fn has(&self, field: Field) -> bool {
        match field {
            Field::UtmMedium => self.utm_medium,
            Field::UtmSource => self.utm_source,
            Field::UtmCampaign => self.utm_campaign,
            Field::SubmissionPage => self.submission_page,
            Field::FtMedium => self.ft_medium,
            Field::FtSource => self.ft_source,
            Field::FtCampaign => self.ft_campaign,
            Field::FtSubmissionPage => self.ft_submission_page,
            _ => true,
        }
    }

    /// First-touch attribution needs at least a medium or source column.
    pub fn first_touch(&self) -> bool {
        self.ft_medium || self.ft_source
    }

    pub fn missing(&self) -> Vec<Field> {
        OPTIONAL_FIELDS
            .into_iter()
            .filter(|f| !self.has(*f))
            .collect()
    }
}
