//! Parsing of free-form time and distance constraints.
//!
//! Callers send constraints like "2 hours", "30 mins", "1000 m" or "3 miles".
//! These never fail: malformed input degrades to permissive defaults (120
//! minutes / 5.0 km) so a bad constraint string cannot abort tour generation.

pub const DEFAULT_DURATION_MINUTES: i64 = 120;
pub const DEFAULT_DISTANCE_KM: f64 = 5.0;

const KM_PER_MILE: f64 = 1.60934;

/// Parse a duration constraint to minutes.
///
/// A bare number passes through as minutes (zero/empty falls back to the
/// default). Otherwise the first matching unit marker of `hour`, `min`, `day`
/// wins, with the numeric portion taken from the digits and decimal point
/// preceding it.
pub fn parse_duration_to_minutes(text: &str) -> i64 {
    let trimmed = text.trim();
    if let Ok(minutes) = trimmed.parse::<f64>() {
        if minutes > 0.0 {
            return minutes as i64;
        }
        return DEFAULT_DURATION_MINUTES;
    }

    let lower = trimmed.to_lowercase();
    if let Some(prefix) = lower.split("hour").next().filter(|_| lower.contains("hour")) {
        return numeric_prefix(prefix)
            .map(|hours| (hours * 60.0) as i64)
            .unwrap_or(DEFAULT_DURATION_MINUTES);
    }
    if lower.contains("min") {
        return digits_only(&lower).unwrap_or(DEFAULT_DURATION_MINUTES);
    }
    if let Some(prefix) = lower.split("day").next().filter(|_| lower.contains("day")) {
        return numeric_prefix(prefix)
            .map(|days| (days * 24.0 * 60.0) as i64)
            .unwrap_or(DEFAULT_DURATION_MINUTES);
    }

    DEFAULT_DURATION_MINUTES
}

/// Parse a distance constraint to kilometers.
///
/// Unit precedence is `km`/`kilometer`, then `mile`, then bare `m` (meters),
/// so "5 km" never parses as meters. Miles convert at 1.60934 km per mile.
pub fn parse_distance_to_km(text: &str) -> f64 {
    let trimmed = text.trim();
    if let Ok(km) = trimmed.parse::<f64>() {
        if km > 0.0 {
            return km;
        }
        return DEFAULT_DISTANCE_KM;
    }

    let lower = trimmed.to_lowercase();
    if lower.contains("km") || lower.contains("kilometer") {
        let prefix = lower.split("km").next().unwrap_or("");
        return numeric_prefix(prefix).unwrap_or(DEFAULT_DISTANCE_KM);
    }
    if lower.contains("mile") {
        let prefix = lower.split("mile").next().unwrap_or("");
        return numeric_prefix(prefix)
            .map(|miles| miles * KM_PER_MILE)
            .unwrap_or(DEFAULT_DISTANCE_KM);
    }
    if lower.contains('m') {
        return digits_only(&lower)
            .map(|meters| meters as f64 / 1000.0)
            .unwrap_or(DEFAULT_DISTANCE_KM);
    }

    DEFAULT_DISTANCE_KM
}

fn numeric_prefix(text: &str) -> Option<f64> {
    let filtered: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    filtered.parse::<f64>().ok()
}

fn digits_only(text: &str) -> Option<i64> {
    let filtered: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
    filtered.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hours_to_minutes() {
        assert_eq!(parse_duration_to_minutes("2 hours"), 120);
        assert_eq!(parse_duration_to_minutes("1 hour"), 60);
        assert_eq!(parse_duration_to_minutes("1.5 hours"), 90);
    }

    #[test]
    fn parses_minutes() {
        assert_eq!(parse_duration_to_minutes("30 mins"), 30);
        assert_eq!(parse_duration_to_minutes("45 minutes"), 45);
    }

    #[test]
    fn parses_days() {
        assert_eq!(parse_duration_to_minutes("1 day"), 1440);
        assert_eq!(parse_duration_to_minutes("2 days"), 2880);
    }

    #[test]
    fn bare_number_passes_through_as_minutes() {
        assert_eq!(parse_duration_to_minutes("90"), 90);
        assert_eq!(parse_duration_to_minutes("0"), DEFAULT_DURATION_MINUTES);
    }

    #[test]
    fn unparseable_duration_defaults_to_120() {
        assert_eq!(parse_duration_to_minutes("a while"), 120);
        assert_eq!(parse_duration_to_minutes(""), 120);
        assert_eq!(parse_duration_to_minutes("hours"), 120);
    }

    #[test]
    fn parses_kilometers() {
        assert_eq!(parse_distance_to_km("5 km"), 5.0);
        assert_eq!(parse_distance_to_km("2.5 kilometers"), 2.5);
    }

    #[test]
    fn parses_miles_with_conversion() {
        let km = parse_distance_to_km("3 miles");
        assert!((km - 4.82802).abs() < 1e-5);
    }

    #[test]
    fn parses_meters() {
        assert_eq!(parse_distance_to_km("1000 m"), 1.0);
        assert_eq!(parse_distance_to_km("500 meters"), 0.5);
    }

    #[test]
    fn km_takes_precedence_over_meters() {
        assert_eq!(parse_distance_to_km("10 km"), 10.0);
    }

    #[test]
    fn bare_number_passes_through_as_km() {
        assert_eq!(parse_distance_to_km("3"), 3.0);
        assert_eq!(parse_distance_to_km("0"), DEFAULT_DISTANCE_KM);
    }

    #[test]
    fn unparseable_distance_defaults_to_5() {
        assert_eq!(parse_distance_to_km("walking distance... sort of"), 5.0);
        assert_eq!(parse_distance_to_km(""), 5.0);
    }
}
