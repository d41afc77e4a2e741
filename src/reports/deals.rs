use chrono::Timelike;
use serde::Serialize;

use crate::date_util::DateParser;
use crate::metrics::intervals::IntervalKind;
use crate::record::{Field, Record};

/// A deal row with its pipeline timings worked out.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedDeal {
    #[serde(flatten)]
    pub record: Record,
    pub time_to_distribution_min: Option<f64>,
    pub time_to_booking_days: Option<f64>,
    pub time_to_connection_days: Option<f64>,
    pub distribution_to_show_days: Option<f64>,
    pub time_to_proposal_min: Option<f64>,
    pub time_to_close_days: Option<f64>,
    /// English weekday the deal was created, in the reporting zone.
    pub created_day_of_week: Option<String>,
    /// UTC hour the deal was created.
    pub created_hour: Option<u32>,
}

pub fn enrich_one(record: Record, parser: &DateParser) -> EnrichedDeal {
    let sample = |kind: IntervalKind| kind.sample(&record, parser);
    let created = record.text(Field::DealCreated).map(|s| s.into_owned());

    EnrichedDeal {
        time_to_distribution_min: sample(IntervalKind::Distribution),
        time_to_booking_days: sample(IntervalKind::Booking),
        time_to_connection_days: sample(IntervalKind::Connection),
        distribution_to_show_days: sample(IntervalKind::DistributionToShow),
        time_to_proposal_min: sample(IntervalKind::Proposal),
        time_to_close_days: sample(IntervalKind::Close),
        created_day_of_week: parser.day_of_week(created.as_deref()),
        created_hour: parser.parse(created.as_deref()).map(|dt| dt.hour()),
        record,
    }
}

pub fn enrich(records: Vec<Record>, parser: &DateParser) -> Vec<EnrichedDeal> {
    records
        .into_iter()
        .map(|r| enrich_one(r, parser))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enrich_timings() {
        let parser = DateParser::default();
        let record = Record::new()
            .with("deal_id", "D1")
            .with("deal_created", "2024-07-01T10:00:00Z")
            .with("distributed_at", "2024-07-01T10:20:00Z")
            .with("calendly_created_at", "2024-07-02T10:20:00Z")
            .with("calendly_time", "2024-07-03T22:20:00Z");
        let deal = enrich_one(record, &parser);

        assert_eq!(deal.time_to_distribution_min, Some(20.0));
        assert_eq!(deal.time_to_booking_days, Some(1.0));
        assert_eq!(deal.time_to_connection_days, Some(1.5));
        assert_eq!(deal.distribution_to_show_days, Some(2.5));
        assert_eq!(deal.time_to_proposal_min, None);
        assert_eq!(deal.created_day_of_week.as_deref(), Some("Monday"));
        // stored in UTC even though Lisbon is UTC+1 in July
        assert_eq!(deal.created_hour, Some(10));
    }

    #[test]
    fn test_enriched_json_is_flat() {
        let parser = DateParser::default();
        let deals = enrich(vec![Record::new().with("deal_id", "D9")], &parser);
        let json = serde_json::to_value(&deals[0]).unwrap();

        assert_eq!(json["deal_id"], "D9");
        assert!(json["time_to_close_days"].is_null());
        assert!(json["created_hour"].is_null());
    }
}
