use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::America::Los_Angeles;

/// Renders an event date the way the dashboard shows it: "Jan 3, 2026" in
/// Pacific time. Plain `YYYY-MM-DD` values are anchored at noon UTC so the
/// zone conversion cannot shift them into the previous day. Anything that
/// does not parse is returned unchanged.
pub fn format_event_date(value: &str) -> String {
    let Some(instant) = parse_instant(value) else {
        return value.to_string();
    };
    instant
        .with_timezone(&Los_Angeles)
        .format("%b %-d, %Y")
        .to_string()
}

fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    if is_date_only(value) {
        let date = NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()?;
        return Some(Utc.from_utc_datetime(&date.and_hms_opt(12, 0, 0)?));
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }

    // Zone-less timestamps as the backend emits them are taken as UTC.
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }

    None
}

/// Exactly `YYYY-MM-DD`, two-digit month and day.
fn is_date_only(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && [0, 1, 2, 3, 5, 6, 8, 9]
            .iter()
            .all(|&i| bytes[i].is_ascii_digit())
}
