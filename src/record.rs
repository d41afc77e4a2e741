use std::borrow::Cow;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::metrics::stats::format_number;

/// Display label used for any empty, null, or missing grouping value.
pub const NOT_SET: &str = "(not set)";

/// A single cell of a fetched row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Number(f64),
    Text(String),
}

static NULL: Value = Value::Null;

impl Value {
    /// The cell as text, or `None` when it is null or blank.
    pub fn as_text(&self) -> Option<Cow<'_, str>> {
        match self {
            Value::Null => None,
            Value::Number(n) => Some(Cow::Owned(format_number(*n))),
            Value::Text(s) if s.trim().is_empty() => None,
            Value::Text(s) => Some(Cow::Borrowed(s.as_str())),
        }
    }

    pub fn is_present(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Number(n) => !n.is_nan(),
            Value::Text(s) => !s.trim().is_empty(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// The fixed set of fields the reports understand, with the row aliases
/// each one is read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ContactId,
    Email,
    ContactCreated,
    UtmMedium,
    UtmSource,
    UtmCampaign,
    SubmissionPage,
    FtMedium,
    FtSource,
    FtCampaign,
    FtSubmissionPage,
    DealId,
    DealCreated,
    Owner,
    SdrAgent,
    Country,
    Program,
    Pipeline,
    MqlLostReason,
    DistributedAt,
    CalendlyCreatedAt,
    CalendlyTime,
    ProposalSentAt,
    ProposalSignedAt,
}

impl Field {
    /// Canonical row key.
    pub fn name(self) -> &'static str {
        self.aliases()[0]
    }

    /// Row keys this field may appear under, canonical first.
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Field::ContactId => &["contact_id"],
            Field::Email => &["email"],
            Field::ContactCreated => &["contact_created"],
            Field::UtmMedium => &["utm_medium"],
            Field::UtmSource => &["utm_source"],
            Field::UtmCampaign => &["utm_campaign"],
            Field::SubmissionPage => &["submission_page"],
            Field::FtMedium => &["ft_medium"],
            Field::FtSource => &["ft_source"],
            Field::FtCampaign => &["ft_campaign"],
            Field::FtSubmissionPage => &["ft_submission_page"],
            Field::DealId => &["deal_id"],
            Field::DealCreated => &["deal_created", "created_at"],
            Field::Owner => &["owner"],
            Field::SdrAgent => &["sdr_agent"],
            Field::Country => &["country"],
            Field::Program => &["program"],
            Field::Pipeline => &["pipeline"],
            Field::MqlLostReason => &["mql_lost_reason"],
            Field::DistributedAt => &["distributed_at"],
            Field::CalendlyCreatedAt => &["calendly_created_at"],
            Field::CalendlyTime => &["calendly_time"],
            Field::ProposalSentAt => &["proposal_sent_at"],
            Field::ProposalSignedAt => &["proposal_signed_at"],
        }
    }
}

/// A flat row from the contacts/deals join. Missing keys read as null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record {
    fields: IndexMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Raw lookup by row key.
    pub fn raw(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }

    /// Value of a field, taking the first alias that is present.
    pub fn value(&self, field: Field) -> &Value {
        field
            .aliases()
            .iter()
            .map(|key| self.raw(key))
            .find(|v| v.is_present())
            .unwrap_or(&NULL)
    }

    pub fn text(&self, field: Field) -> Option<Cow<'_, str>> {
        self.value(field).as_text()
    }

    pub fn has(&self, field: Field) -> bool {
        self.value(field).is_present()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
