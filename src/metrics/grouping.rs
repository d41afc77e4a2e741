use indexmap::IndexMap;

use crate::metrics::collate;
use crate::record::{Record, NOT_SET};

/// Partition `records` by `key_fn`, keeping first-seen key order.
/// A `None` key lands under the empty string.
pub fn group_by<'a, F>(records: &[&'a Record], key_fn: F) -> IndexMap<String, Vec<&'a Record>>
where
    F: Fn(&Record) -> Option<String>,
{
    let mut groups: IndexMap<String, Vec<&'a Record>> = IndexMap::new();
    for &record in records {
        let key = key_fn(record).unwrap_or_default();
        groups.entry(key).or_default().push(record);
    }
    groups
}

/// A bucket of records sharing a case-folded key.
#[derive(Debug, Clone)]
pub struct Group<'a> {
    /// Display label: the trimmed casing of the first record seen.
    pub label: String,
    pub records: Vec<&'a Record>,
}

/// Case-folding key for a raw grouping value.
pub fn normalize_key(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => NOT_SET.to_string(),
    }
}

/// Group by trimmed, lower-cased key and return the groups sorted by label.
/// Empty and missing values collapse into `(not set)`.
pub fn group_labeled<'a, F>(records: &[&'a Record], key_fn: F) -> Vec<Group<'a>>
where
    F: Fn(&Record) -> Option<String>,
{
    let mut groups: Vec<Group<'a>> =
        group_by(records, |r| Some(normalize_key(key_fn(r).as_deref())))
            .into_values()
            .map(|records| Group {
                label: display_label(key_fn(records[0]).as_deref()),
                records,
            })
            .collect();
    groups.sort_by(|a, b| collate::compare(&a.label, &b.label));
    groups
}

fn display_label(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => NOT_SET.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Field, Value};

    fn medium(r: &Record) -> Option<String> {
        r.text(Field::UtmMedium).map(|s| s.into_owned())
    }

    #[test]
    fn test_group_by_first_seen_order() {
        let rows = [
            Record::new().with("utm_medium", "social"),
            Record::new().with("utm_medium", "cpc"),
            Record::new(),
            Record::new().with("utm_medium", "social"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let groups = group_by(&refs, medium);

        let keys: Vec<&str> = groups.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["social", "cpc", ""]);
        assert_eq!(groups["social"].len(), 2);
    }

    #[test]
    fn test_case_folding_keeps_first_label() {
        let rows = [
            Record::new().with("utm_source", "Facebook Ads"),
            Record::new().with("utm_source", " facebook ads "),
            Record::new().with("utm_source", "Google"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let groups = group_labeled(&refs, |r| r.text(Field::UtmSource).map(|s| s.into_owned()));

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].label, "Facebook Ads");
        assert_eq!(groups[0].records.len(), 2);
        assert_eq!(groups[1].label, "Google");
    }

    #[test]
    fn test_labeled_groups_partition_like_group_by() {
        let rows = [
            Record::new().with("utm_medium", "Social"),
            Record::new().with("utm_medium", "cpc"),
            Record::new().with("utm_medium", "social "),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let folded = group_by(&refs, |r| Some(normalize_key(medium(r).as_deref())));
        let labeled = group_labeled(&refs, medium);

        assert_eq!(folded.len(), labeled.len());
        assert_eq!(labeled[1].label, "Social");
        assert_eq!(labeled[1].records, folded["social"]);
    }

    #[test]
    fn test_blank_and_null_collapse_to_not_set() {
        let rows = [
            Record::new().with("utm_medium", Value::Null),
            Record::new().with("utm_medium", ""),
            Record::new().with("utm_medium", "(Not Set)"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let groups = group_labeled(&refs, medium);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].label, NOT_SET);
        assert_eq!(groups[0].records.len(), 3);
    }

    #[test]
    fn test_sorted_by_collation() {
        let rows = [
            Record::new().with("utm_medium", "organic"),
            Record::new().with("utm_medium", "Email"),
            Record::new().with("utm_medium", "cpc"),
        ];
        let refs: Vec<&Record> = rows.iter().collect();
        let labels: Vec<String> = group_labeled(&refs, medium)
            .into_iter()
            .map(|g| g.label)
            .collect();
        assert_eq!(labels, vec!["cpc", "Email", "organic"]);
    }
}
