use crate::record::NOT_SET;

const TOP_LEVEL_MEDIUMS: [&str; 8] = [
    "organic", "social", "cpc", "ppc", "redirect", "referrer", "email", NOT_SET,
];

const SOCIAL_NETWORKS: [(&[&str], &str); 4] = [
    (&["facebook", "meta"], "facebook"),
    (&["instagram"], "instagram"),
    (&["linkedin"], "linkedin"),
    (&["youtube"], "youtube"),
];

/// Fold a UTM medium/source pair into a canonical channel.
///
/// Both values are trimmed and lower-cased. Paid traffic (cpc/ppc in either
/// value) keeps its source; otherwise known social networks, newsletters and
/// the corporate redirect domain are rewritten. Any medium outside the
/// top-level set becomes `other`.
pub fn normalize_utm(medium: Option<&str>, source: Option<&str>) -> (String, String) {
    let mut med = lowered(medium);
    let mut src = lowered(source);

    let mentions = |needle: &str, med: &str, src: &str| med.contains(needle) || src.contains(needle);
    let paid = mentions("cpc", &med, &src) || mentions("ppc", &med, &src);

    if !paid {
        let network = SOCIAL_NETWORKS
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| mentions(n, &med, &src)))
            .map(|(_, name)| *name);

        if let Some(network) = network {
            med = "social".to_string();
            src = network.to_string();
        } else if med.contains("newsletter") {
            med = "email".to_string();
            src = "newsletter".to_string();
        } else if src.contains("all channels") {
            med = "social".to_string();
            src = "all channels".to_string();
        } else if src.contains("globalcitizensolutions") {
            med = "redirect".to_string();
        }
    }

    if !TOP_LEVEL_MEDIUMS.contains(&med.as_str()) {
        med = "other".to_string();
    }
    (med, src)
}

fn lowered(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_lowercase(),
        _ => NOT_SET.to_string(),
    }
}

/// `jane@example.com` → `j***@example.com`. Anything without exactly one
/// `@` and a non-empty local part shows as `(not set)`.
pub fn mask_email(email: Option<&str>) -> String {
    let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) else {
        return NOT_SET.to_string();
    };
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(user), Some(domain), None) => match user.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => NOT_SET.to_string(),
        },
        _ => NOT_SET.to_string(),
    }
}
