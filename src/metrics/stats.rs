use std::collections::HashMap;

/// Number of modes reported when no count is configured.
pub const DEFAULT_MODE_COUNT: usize = 3;

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

/// Percentage of `numerator` over `denominator`, one decimal place.
/// A zero denominator yields `0.0`.
pub fn pct(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    round_to(numerator as f64 / denominator as f64 * 100.0, 1)
}

/// Mean rounded to two decimals.
pub fn avg(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let sum: f64 = samples.iter().sum();
    Some(round_to(sum / samples.len() as f64, 2))
}

pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }
    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    let value = if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    };
    Some(round_to(value, 2))
}

/// The `top` most frequent values as `"value (count)"`, comma-joined.
/// Ties on frequency go to the smaller value.
pub fn top_modes(samples: &[f64], top: usize) -> String {
    if samples.is_empty() {
        return String::new();
    }

    let mut counts: HashMap<u64, (f64, usize)> = HashMap::new();
    for &v in samples {
        // fold -0.0 into 0.0 so they share a bucket
        let v = if v == 0.0 { 0.0 } else { v };
        counts.entry(v.to_bits()).or_insert((v, 0)).1 += 1;
    }

    let mut ranked: Vec<(f64, usize)> = counts.into_values().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.total_cmp(&b.0)));

    ranked
        .into_iter()
        .take(top)
        .map(|(v, c)| format!("{} ({c})", format_number(v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Render a number the way the dashboard shows it: at most two decimals,
/// no trailing zeros, integers without a fractional part.
pub fn format_number(value: f64) -> String {
    let rounded = round_to(value, 2);
    if rounded.fract() == 0.0 && rounded.abs() < 1e15 {
        format!("{}", rounded as i64)
    } else {
        let s = format!("{rounded:.2}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pct_zero_denominator() {
        assert_eq!(pct(0, 0), 0.0);
        assert_eq!(pct(7, 0), 0.0);
    }

    #[test]
    fn test_pct_rounding() {
        assert_eq!(pct(1, 3), 33.3);
        assert_eq!(pct(2, 3), 66.7);
        assert_eq!(pct(5, 5), 100.0);
        assert_eq!(pct(3, 2), 150.0);
    }

    #[test]
    fn test_avg() {
        assert_eq!(avg(&[]), None);
        assert_eq!(avg(&[1.0, 2.0]), Some(1.5));
        assert_eq!(avg(&[1.0, 1.0, 2.0]), Some(1.33));
    }

    #[test]
    fn test_median() {
        assert_eq!(median(&[1.0, 2.0, 3.0, 4.0]), Some(2.5));
        assert_eq!(median(&[5.0]), Some(5.0));
        assert_eq!(median(&[]), None);
        assert_eq!(median(&[9.0, 1.0, 4.0]), Some(4.0));
        assert_eq!(median(&[0.5, 0.6]), Some(0.55));
    }

    #[test]
    fn test_top_modes_tie_break() {
        assert_eq!(top_modes(&[3.0, 3.0, 1.0, 1.0, 2.0], 2), "1 (2), 3 (2)");
        assert_eq!(top_modes(&[3.0, 3.0, 1.0, 1.0, 2.0], 3), "1 (2), 3 (2), 2 (1)");
    }

    #[test]
    fn test_top_modes_frequency_first() {
        assert_eq!(top_modes(&[5.0, 1.0, 5.0, 5.0, 1.0, 9.0], 3), "5 (3), 1 (2), 9 (1)");
    }

    #[test]
    fn test_top_modes_empty_and_fractional() {
        assert_eq!(top_modes(&[], 3), "");
        assert_eq!(top_modes(&[1.25, 1.25, 0.5], 3), "1.25 (2), 0.5 (1)");
    }

    #[test]
    fn test_format_number() {
        assert_eq!(format_number(2.0), "2");
        assert_eq!(format_number(2.5), "2.5");
        assert_eq!(format_number(1.333), "1.33");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(0.1 + 0.2), "0.3");
    }
}
