use log::debug;
use rusqlite::types::ValueRef;

use crate::error::{Error, Result};
use crate::metrics::collate;
use crate::record::{Field, Record, Value};
use crate::storage::schema::{column_for, SchemaCapabilities, Table, DEAL_CONTACT_COLUMN};
use crate::storage::Database;

/// Row cap applied when none is configured.
pub const DEFAULT_ROW_LIMIT: u32 = 200_000;

const DEAL_FIELDS: [Field; 13] = [
    Field::DealId,
    Field::Owner,
    Field::SdrAgent,
    Field::Country,
    Field::Program,
    Field::Pipeline,
    Field::MqlLostReason,
    Field::DealCreated,
    Field::DistributedAt,
    Field::CalendlyCreatedAt,
    Field::CalendlyTime,
    Field::ProposalSentAt,
    Field::ProposalSignedAt,
];

const CONTACT_FIELDS: [Field; 11] = [
    Field::ContactId,
    Field::Email,
    Field::ContactCreated,
    Field::UtmMedium,
    Field::UtmSource,
    Field::UtmCampaign,
    Field::SubmissionPage,
    Field::FtMedium,
    Field::FtSource,
    Field::FtCampaign,
    Field::FtSubmissionPage,
];

#[derive(Debug, Clone, PartialEq)]
enum Source {
    Deals,
    ContactsWithDeals(SchemaCapabilities),
}

/// Builder for the row sets the reports consume.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordQuery {
    source: Source,
    pipeline: Option<String>,
    limit: u32,
}

impl RecordQuery {
    /// One row per deal, for the sales and SDR views.
    pub fn deals() -> Self {
        Self {
            source: Source::Deals,
            pipeline: None,
            limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Contacts left-joined to their deals, for the marketing view. Optional
    /// columns the dataset lacks come back as nulls.
    pub fn contacts_with_deals(caps: &SchemaCapabilities) -> Self {
        Self {
            source: Source::ContactsWithDeals(*caps),
            pipeline: None,
            limit: DEFAULT_ROW_LIMIT,
        }
    }

    /// Keep deals in this pipeline (trimmed, case-insensitive).
    pub fn pipeline(mut self, name: &str) -> Self {
        let name = name.trim();
        self.pipeline = (!name.is_empty()).then(|| name.to_string());
        self
    }

    pub fn limit(mut self, n: u32) -> Self {
        self.limit = n;
        self
    }

    /// Execute the query and convert each row into a [`Record`] keyed by
    /// the canonical field names.
    pub async fn fetch(self, db: &Database) -> Result<Vec<Record>> {
        let builder = self;
        let records = db
            .reader()
            .call(move |conn| {
                let (sql, params) = builder.build_sql();
                let param_refs: Vec<&dyn rusqlite::types::ToSql> =
                    params.iter().map(|p| p.as_ref()).collect();
                let mut stmt = conn.prepare(&sql)?;
                let names: Vec<String> = stmt
                    .column_names()
                    .into_iter()
                    .map(String::from)
                    .collect();
                let rows = stmt.query_map(param_refs.as_slice(), |row| {
                    let mut record = Record::new();
                    for (i, name) in names.iter().enumerate() {
                        record.insert(name.as_str(), to_value(row.get_ref(i)?));
                    }
                    Ok(record)
                })?;
                rows.collect::<std::result::Result<Vec<Record>, _>>()
            })
            .await
            .map_err(|e| Error::Database(e.to_string()))?;

        debug!("fetched {} rows", records.len());
        Ok(records)
    }

    fn build_sql(&self) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut params: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
        let mut param_idx = 1;

        let (select, from) = match &self.source {
            Source::Deals => (
                DEAL_FIELDS.iter().map(|f| select_column(*f)).collect::<Vec<_>>(),
                "FROM deals d".to_string(),
            ),
            Source::ContactsWithDeals(caps) => {
                let columns = CONTACT_FIELDS
                    .iter()
                    .chain(DEAL_FIELDS.iter())
                    .map(|f| {
                        if caps.has(*f) {
                            select_column(*f)
                        } else {
                            format!("NULL AS {}", f.name())
                        }
                    })
                    .collect::<Vec<_>>();
                let from = format!(
                    "FROM contacts c LEFT JOIN deals d ON d.{} = c.{}",
                    quote_ident(DEAL_CONTACT_COLUMN),
                    quote_ident(column_for(Field::ContactId).1),
                );
                (columns, from)
            }
        };

        let mut sql = format!("SELECT {} {from}", select.join(", "));

        if let Some(ref pipeline) = self.pipeline {
            sql.push_str(&format!(
                " WHERE LOWER(TRIM(d.{})) = LOWER(?{param_idx})",
                quote_ident(column_for(Field::Pipeline).1)
            ));
            params.push(Box::new(pipeline.clone()));
            param_idx += 1;
        }

        sql.push_str(&format!(" LIMIT ?{param_idx}"));
        params.push(Box::new(self.limit));

        (sql, params)
    }
}

/// Distinct non-blank values of a deal column, trimmed and sorted for
/// display. Used for the owner and SDR agent pickers.
pub async fn distinct_values(db: &Database, field: Field) -> Result<Vec<String>> {
    let (table, column) = column_for(field);
    if table != Table::Deals {
        return Err(Error::InvalidFilter(format!(
            "{} is not a deal field",
            field.name()
        )));
    }
    let column = quote_ident(column);
    let sql = format!(
        "SELECT DISTINCT TRIM({column}) FROM deals \
         WHERE {column} IS NOT NULL AND TRIM({column}) <> ''"
    );

    let mut values: Vec<String> = db
        .reader()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
            rows.collect::<std::result::Result<Vec<String>, _>>()
        })
        .await?;

    values.sort_by(|a, b| collate::compare(a, b));
    values.dedup();
    Ok(values)
}

fn select_column(field: Field) -> String {
    let (table, column) = column_for(field);
    format!("{}.{} AS {}", table.alias(), quote_ident(column), field.name())
}

pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn to_value(v: ValueRef<'_>) -> Value {
    match v {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Number(i as f64),
        ValueRef::Real(f) => Value::Number(f),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(_) => Value::Null,
    }
}
