use crate::date_util::DateParser;
use crate::query::period::MonthRange;
use crate::record::{Field, Record};

#[derive(Debug, Clone, PartialEq)]
enum Constraint {
    Months(Field, MonthRange),
    ContainsAny(Field, Vec<String>),
    EqualsAny(Field, Vec<String>),
}

/// Conjunction of row predicates. Unset ranges and empty include-lists are
/// dropped when added, so an empty filter passes every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowFilter {
    constraints: Vec<Constraint>,
}

impl RowFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep rows whose `field` month key lies in `range`.
    pub fn month_range(mut self, field: Field, range: &MonthRange) -> Self {
        if !range.is_unbounded() {
            self.constraints.push(Constraint::Months(field, range.clone()));
        }
        self
    }

    /// Keep rows whose `field` contains any of `needles`, ignoring case.
    pub fn contains_any(mut self, field: Field, needles: &[String]) -> Self {
        let needles = lowered(needles);
        if !needles.is_empty() {
            self.constraints.push(Constraint::ContainsAny(field, needles));
        }
        self
    }

    /// Keep rows whose trimmed `field` equals one of `values`, ignoring case.
    pub fn equals_any(mut self, field: Field, values: &[String]) -> Self {
        let values = lowered(values);
        if !values.is_empty() {
            self.constraints.push(Constraint::EqualsAny(field, values));
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.constraints.is_empty()
    }

    pub fn matches(&self, record: &Record, parser: &DateParser) -> bool {
        self.constraints.iter().all(|c| match c {
            Constraint::Months(field, range) => {
                let text = record.text(*field);
                range.contains(parser.month_key(text.as_deref()).as_deref())
            }
            Constraint::ContainsAny(field, needles) => {
                let hay = record
                    .text(*field)
                    .map(|s| s.to_lowercase())
                    .unwrap_or_default();
                needles.iter().any(|n| hay.contains(n.as_str()))
            }
            Constraint::EqualsAny(field, values) => {
                let value = record
                    .text(*field)
                    .map(|s| s.trim().to_lowercase())
                    .unwrap_or_default();
                values.iter().any(|v| *v == value)
            }
        })
    }

    pub fn apply<'a>(&self, records: &'a [Record], parser: &DateParser) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r, parser)).collect()
    }
}

fn lowered(list: &[String]) -> Vec<String> {
    list.iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
