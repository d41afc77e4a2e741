use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::{Error, Result};

static RE_MONTH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-(\d{2})(?:-\d{2})?$").unwrap());

/// An inclusive range of `YYYY-MM` month keys. Either end may be open.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthRange {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl MonthRange {
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Exactly one month.
    pub fn single(month: &str) -> Result<Self> {
        let month = parse_month(month)?;
        Ok(Self {
            from: Some(month.clone()),
            to: Some(month),
        })
    }

    /// Build a range from optional ends. Blank ends are open; a full date is
    /// truncated to its month.
    pub fn parse(from: Option<&str>, to: Option<&str>) -> Result<Self> {
        let from = non_blank(from).map(parse_month).transpose()?;
        let to = non_blank(to).map(parse_month).transpose()?;
        if let (Some(f), Some(t)) = (&from, &to) {
            if f > t {
                return Err(Error::InvalidFilter(format!(
                    "month range starts after it ends: {f}..{t}"
                )));
            }
        }
        Ok(Self { from, to })
    }

    /// Parse the command-line form:
    /// - `2024-01..2024-03` — inclusive range
    /// - `2024-01..` / `..2024-03` — open on one side
    /// - `2024-02` — a single month
    pub fn parse_spec(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.split_once("..") {
            Some((from, to)) => Self::parse(Some(from), Some(to)),
            None if s.is_empty() => Ok(Self::unbounded()),
            None => Self::single(s),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether a month key falls inside the range. A missing key only
    /// passes an unbounded range.
    pub fn contains(&self, month: Option<&str>) -> bool {
        if self.is_unbounded() {
            return true;
        }
        let Some(month) = month else {
            return false;
        };
        if let Some(from) = &self.from {
            if month < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.to {
            if month > to.as_str() {
                return false;
            }
        }
        true
    }
}

impl fmt::Display for MonthRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.from, &self.to) {
            (None, None) => write!(f, "all"),
            (Some(a), Some(b)) if a == b => write!(f, "{a}"),
            (a, b) => write!(
                f,
                "{}..{}",
                a.as_deref().unwrap_or(""),
                b.as_deref().unwrap_or("")
            ),
        }
    }
}

fn non_blank(s: Option<&str>) -> Option<&str> {
    s.map(str::trim).filter(|s| !s.is_empty())
}

fn parse_month(s: &str) -> Result<String> {
    let s = s.trim();
    let caps = RE_MONTH
        .captures(s)
        .ok_or_else(|| Error::InvalidFilter(format!("invalid month: {s} (expected YYYY-MM)")))?;
    let month: u32 = caps[2]
        .parse()
        .map_err(|_| Error::InvalidFilter(format!("invalid month: {s}")))?;
    if !(1..=12).contains(&month) {
        return Err(Error::InvalidFilter(format!("invalid month: {s}")));
    }
    Ok(format!("{}-{}", &caps[1], &caps[2]))
}
