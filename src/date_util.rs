use std::sync::LazyLock;

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Timelike, Utc,
};
use chrono_tz::Tz;
use regex::Regex;

/// Business reporting zone used when none is configured.
pub const DEFAULT_REPORTING_TZ: Tz = chrono_tz::Europe::Lisbon;

static RE_US_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})(?:[ T](\d{1,2}):(\d{2})(?::(\d{2}))?)?").unwrap()
});

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%z",
    "%Y-%m-%d %H:%M:%S%.f %z",
    "%Y-%m-%d %H:%M %z",
];

const UTC_SUFFIX_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f UTC", "%Y-%m-%d %H:%M UTC"];

const NAIVE_ISO_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const NAIVE_FALLBACK_FORMATS: &[&str] = &[
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
    "%B %d, %Y %H:%M:%S",
    "%B %d, %Y %H:%M",
];

const DATE_FALLBACK_FORMATS: &[&str] = &["%Y/%m/%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y"];

/// Parses the timestamp shapes found in the CRM export and resolves them
/// against the fixed reporting time zone.
///
/// Values carrying an explicit offset are taken as-is. Values without one
/// (including bare dates, which resolve to midnight) are read as wall-clock
/// time in the reporting zone, so a month key always matches the calendar
/// month the business recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateParser {
    tz: Tz,
}

impl Default for DateParser {
    fn default() -> Self {
        Self::new(DEFAULT_REPORTING_TZ)
    }
}

impl DateParser {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Parse a raw cell into an instant. Never fails loudly: anything that
    /// cannot be read yields `None`.
    pub fn parse(&self, raw: Option<&str>) -> Option<DateTime<Utc>> {
        let t = raw?.trim();
        if t.is_empty() {
            return None;
        }
        self.parse_iso(t)
            .or_else(|| self.parse_us(t))
            .or_else(|| self.parse_fallback(t))
    }

    /// Whole minutes from `start` to `end`. `None` when either side is
    /// unreadable or `end` precedes `start`.
    pub fn diff_minutes(&self, start: Option<&str>, end: Option<&str>) -> Option<f64> {
        let delta = self.delta(start, end)?;
        Some((delta.num_milliseconds() as f64 / 60_000.0).round())
    }

    /// Days from `start` to `end`, rounded to two decimals, same null rules
    /// as [`DateParser::diff_minutes`].
    pub fn diff_days(&self, start: Option<&str>, end: Option<&str>) -> Option<f64> {
        let delta = self.delta(start, end)?;
        let days = delta.num_milliseconds() as f64 / 86_400_000.0;
        Some((days * 100.0).round() / 100.0)
    }

    /// `YYYY-MM` of the instant in the reporting zone.
    pub fn month_key(&self, raw: Option<&str>) -> Option<String> {
        let instant = self.parse(raw)?;
        Some(instant.with_timezone(&self.tz).format("%Y-%m").to_string())
    }

    /// English weekday name in the reporting zone.
    pub fn day_of_week(&self, raw: Option<&str>) -> Option<String> {
        let instant = self.parse(raw)?;
        Some(instant.with_timezone(&self.tz).format("%A").to_string())
    }

    /// Hour of day (0-23) in the reporting zone.
    pub fn hour(&self, raw: Option<&str>) -> Option<u32> {
        let instant = self.parse(raw)?;
        Some(instant.with_timezone(&self.tz).hour())
    }

    fn delta(&self, start: Option<&str>, end: Option<&str>) -> Option<Duration> {
        let a = self.parse(start)?;
        let b = self.parse(end)?;
        let delta = b - a;
        if delta < Duration::zero() {
            None
        } else {
            Some(delta)
        }
    }

    fn parse_iso(&self, t: &str) -> Option<DateTime<Utc>> {
        let isoish = t.replacen(' ', "T", 1);

        if let Ok(dt) = DateTime::parse_from_rfc3339(&isoish) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(&isoish, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        for fmt in NAIVE_ISO_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(&isoish, fmt) {
                return self.localize(naive);
            }
        }
        NaiveDate::parse_from_str(&isoish, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .and_then(|naive| self.localize(naive))
    }

    fn parse_us(&self, t: &str) -> Option<DateTime<Utc>> {
        let caps = RE_US_DATE.captures(t)?;
        let num = |i: usize| -> Option<u32> {
            caps.get(i).map_or(Some(0), |m| m.as_str().parse().ok())
        };
        let year: i32 = caps[3].parse().ok()?;
        let date = NaiveDate::from_ymd_opt(year, num(1)?, num(2)?)?;
        let naive = date.and_hms_opt(num(4)?, num(5)?, num(6)?)?;
        self.localize(naive)
    }

    fn parse_fallback(&self, t: &str) -> Option<DateTime<Utc>> {
        if let Ok(dt) = DateTime::parse_from_rfc2822(t) {
            return Some(dt.with_timezone(&Utc));
        }
        for fmt in OFFSET_FORMATS {
            if let Ok(dt) = DateTime::parse_from_str(t, fmt) {
                return Some(dt.with_timezone(&Utc));
            }
        }
        for fmt in UTC_SUFFIX_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
                return Some(naive.and_utc());
            }
        }
        for fmt in NAIVE_FALLBACK_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(t, fmt) {
                return self.localize(naive);
            }
        }
        for fmt in DATE_FALLBACK_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(t, fmt) {
                return date.and_hms_opt(0, 0, 0).and_then(|n| self.localize(n));
            }
        }
        None
    }

    /// Resolve wall-clock time in the reporting zone. Ambiguous times (DST
    /// fall-back) take the earlier instant; times inside a spring-forward gap
    /// are shifted past it.
    fn localize(&self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        let local = match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => self
                .tz
                .from_local_datetime(&(naive + Duration::hours(1)))
                .earliest()?,
        };
        Some(local.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utc() -> DateParser {
        DateParser::new(chrono_tz::UTC)
    }

    #[test]
    fn test_parse_space_and_iso_forms() {
        let p = utc();
        let a = p.parse(Some("2024-01-02 10:30:00")).unwrap();
        let b = p.parse(Some("2024-01-02T10:30:00")).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_rfc3339(), "2024-01-02T10:30:00+00:00");

        let c = p.parse(Some("2024-01-02 10:30")).unwrap();
        assert_eq!(a, c);

        let frac = p.parse(Some("2024-01-02T10:30:00.250")).unwrap();
        assert_eq!(frac.timestamp_subsec_millis(), 250);
    }

    #[test]
    fn test_parse_explicit_offset() {
        let p = DateParser::new(chrono_tz::America::New_York);
        let z = p.parse(Some("2024-01-02T10:00:00Z")).unwrap();
        assert_eq!(z.to_rfc3339(), "2024-01-02T10:00:00+00:00");
        let off = p.parse(Some("2024-01-02 12:00:00+02:00")).unwrap();
        assert_eq!(off, z);
    }

    #[test]
    fn test_parse_utc_suffix_is_not_localized() {
        let p = DateParser::new(chrono_tz::Asia::Tokyo);
        let suffixed = p.parse(Some("2024-01-31 20:00:00 UTC")).unwrap();
        assert_eq!(suffixed.to_rfc3339(), "2024-01-31T20:00:00+00:00");
        assert_eq!(suffixed, p.parse(Some("2024-01-31T20:00:00Z")).unwrap());
        assert_eq!(
            p.month_key(Some("2024-01-31 20:00:00 UTC")).as_deref(),
            Some("2024-02")
        );
        assert_eq!(
            p.diff_minutes(Some("2024-01-31 20:00 UTC"), Some("2024-02-01T05:30:00+09:00")),
            Some(30.0)
        );
    }

    #[test]
    fn test_parse_date_only_is_midnight() {
        let p = utc();
        let d = p.parse(Some("2024-03-15")).unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-15T00:00:00+00:00");
    }

    #[test]
    fn test_parse_us_format() {
        let p = utc();
        let d = p.parse(Some("03/15/2024 14:05")).unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-15T14:05:00+00:00");
        let d = p.parse(Some("3/5/2024 9:05")).unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-05T09:05:00+00:00");
        assert!(p.parse(Some("13/45/2024 10:00")).is_none());
    }

    #[test]
    fn test_parse_fallback_forms() {
        let p = utc();
        assert!(p.parse(Some("Tue, 2 Jan 2024 10:00:00 +0000")).is_some());
        assert!(p.parse(Some("2024/01/02")).is_some());
        assert!(p.parse(Some("January 2, 2024")).is_some());
    }

    #[test]
    fn test_parse_blank_and_garbage() {
        let p = utc();
        assert!(p.parse(None).is_none());
        assert!(p.parse(Some("")).is_none());
        assert!(p.parse(Some("   ")).is_none());
        assert!(p.parse(Some("not a date")).is_none());
        assert!(p.parse(Some("2024-13-45")).is_none());
    }

    #[test]
    fn test_diff_minutes() {
        let p = utc();
        assert_eq!(
            p.diff_minutes(Some("2024-01-01 10:00"), Some("2024-01-01 11:30")),
            Some(90.0)
        );
        assert_eq!(
            p.diff_minutes(Some("2024-01-01 10:00:00"), Some("2024-01-01 10:00:40")),
            Some(1.0)
        );
        assert_eq!(
            p.diff_minutes(Some("2024-01-01 10:00"), Some("2024-01-01 10:00")),
            Some(0.0)
        );
    }

    #[test]
    fn test_diff_out_of_order_is_none() {
        let p = utc();
        assert_eq!(
            p.diff_minutes(Some("2024-01-02 10:00"), Some("2024-01-01 10:00")),
            None
        );
        assert_eq!(p.diff_days(Some("2024-01-02"), Some("2024-01-01")), None);
    }

    #[test]
    fn test_diff_missing_side_is_none() {
        let p = utc();
        assert_eq!(p.diff_days(None, Some("2024-01-01")), None);
        assert_eq!(p.diff_days(Some("2024-01-01"), Some("garbage")), None);
    }

    #[test]
    fn test_diff_days_rounds_two_places() {
        let p = utc();
        assert_eq!(
            p.diff_days(Some("2024-01-01 00:00"), Some("2024-01-02 08:00")),
            Some(1.33)
        );
        assert_eq!(p.diff_days(Some("2024-01-01"), Some("2024-01-31")), Some(30.0));
    }

    #[test]
    fn test_month_key_uses_reporting_zone() {
        // 23:30 UTC on Jan 31 is already February in Tokyo
        let tokyo = DateParser::new(chrono_tz::Asia::Tokyo);
        assert_eq!(
            tokyo.month_key(Some("2024-01-31T23:30:00Z")).as_deref(),
            Some("2024-02")
        );
        assert_eq!(
            utc().month_key(Some("2024-01-31T23:30:00Z")).as_deref(),
            Some("2024-01")
        );
        // Naive values stay in the month they were written in
        assert_eq!(
            tokyo.month_key(Some("2024-03-01")).as_deref(),
            Some("2024-03")
        );
        assert_eq!(tokyo.month_key(Some("")), None);
    }

    #[test]
    fn test_localize_dst_gap() {
        // 01:30 does not exist in Lisbon on 2024-03-31
        let p = DateParser::default();
        let d = p.parse(Some("2024-03-31 01:30")).unwrap();
        assert_eq!(d.to_rfc3339(), "2024-03-31T01:30:00+00:00");
    }

    #[test]
    fn test_day_of_week_and_hour() {
        let p = utc();
        assert_eq!(p.day_of_week(Some("2024-01-01 09:15")).as_deref(), Some("Monday"));
        assert_eq!(p.hour(Some("2024-01-01 09:15")), Some(9));
        assert_eq!(p.hour(None), None);
    }
}
