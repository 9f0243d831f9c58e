/// Deadline extraction from the portal's free-text submission banners
use std::sync::LazyLock;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use regex::Regex;

static DEADLINE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{1,2}) ([A-Za-z]+) (\d{4}) \| (\d{2}):(\d{2})")
        .expect("deadline pattern is valid")
});

const MONTHS: [&str; 12] = [
    "Januari",
    "Februari",
    "Maret",
    "April",
    "Mei",
    "Juni",
    "Juli",
    "Agustus",
    "September",
    "Oktober",
    "November",
    "Desember",
];

/// Month number (1-12) for an Indonesian month name. Case-sensitive.
pub fn month_number(name: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|m| *m == name)
        .map(|idx| idx as u32 + 1)
}

/// Find a deadline such as `Jumat, 4 Juli 2025 | 23:55 WIB` inside `text` and
/// interpret it as wall-clock time in `tz`.
///
/// Returns `None` when there is no match, the month name is unknown, or the
/// numeric parts do not form a real date/time (e.g. hour 25). None of these
/// are errors: most tasks simply have no deadline.
pub fn parse_deadline_in<Tz: TimeZone>(text: Option<&str>, tz: &Tz) -> Option<DateTime<Tz>> {
    let caps = DEADLINE_PATTERN.captures(text?)?;

    let day: u32 = caps[1].parse().ok()?;
    let month = month_number(&caps[2])?;
    let year: i32 = caps[3].parse().ok()?;
    let hour: u32 = caps[4].parse().ok()?;
    let minute: u32 = caps[5].parse().ok()?;

    let naive = NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, 0)?;
    tz.from_local_datetime(&naive).earliest()
}

/// Parse a deadline in the browser's local time zone
pub fn parse_deadline(text: Option<&str>) -> Option<DateTime<Local>> {
    parse_deadline_in(text, &Local)
}

/// True iff a deadline is found in `text` and it is strictly after `now`
pub fn is_deadline_active_in<Tz: TimeZone>(
    text: Option<&str>,
    now: DateTime<Utc>,
    tz: &Tz,
) -> bool {
    parse_deadline_in(text, tz)
        .map(|deadline| deadline.with_timezone(&Utc) > now)
        .unwrap_or(false)
}

pub fn is_deadline_active(text: Option<&str>, now: DateTime<Utc>) -> bool {
    is_deadline_active_in(text, now, &Local)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, FixedOffset};

    fn wib() -> FixedOffset {
        FixedOffset::east_opt(7 * 3600).unwrap()
    }

    #[test]
    fn test_parse_banner() {
        let text = "[Batas Waktu Pengumpulan Tugas : Jumat, 4 Juli 2025 | 23:55 WIB]";
        let parsed = parse_deadline_in(Some(text), &wib()).unwrap();
        let expected = wib().with_ymd_and_hms(2025, 7, 4, 23, 55, 0).unwrap();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn test_parse_single_and_double_digit_days() {
        let one = parse_deadline_in(Some("1 Maret 2026 | 08:00"), &wib()).unwrap();
        let two = parse_deadline_in(Some("31 Desember 2026 | 00:05"), &wib()).unwrap();
        assert_eq!(one, wib().with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap());
        assert_eq!(two, wib().with_ymd_and_hms(2026, 12, 31, 0, 5, 0).unwrap());
    }

    #[test]
    fn test_parse_no_match() {
        assert_eq!(parse_deadline_in(None, &wib()), None);
        assert_eq!(parse_deadline_in(Some(""), &wib()), None);
        assert_eq!(parse_deadline_in(Some("tidak ada batas waktu"), &wib()), None);
        // Missing the "| HH:MM" part
        assert_eq!(parse_deadline_in(Some("4 Juli 2025"), &wib()), None);
    }

    #[test]
    fn test_parse_unknown_or_miscased_month() {
        assert_eq!(parse_deadline_in(Some("4 July 2025 | 23:55"), &wib()), None);
        assert_eq!(parse_deadline_in(Some("4 juli 2025 | 23:55"), &wib()), None);
    }

    #[test]
    fn test_parse_out_of_range_components() {
        assert_eq!(parse_deadline_in(Some("4 Juli 2025 | 25:00"), &wib()), None);
        assert_eq!(parse_deadline_in(Some("32 Juli 2025 | 10:00"), &wib()), None);
        assert_eq!(parse_deadline_in(Some("30 Februari 2025 | 10:00"), &wib()), None);
        assert_eq!(parse_deadline_in(Some("4 Juli 2025 | 10:61"), &wib()), None);
    }

    #[test]
    fn test_out_of_range_is_never_active() {
        let now = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
        assert!(!is_deadline_active_in(Some("4 Juli 2999 | 25:00"), now, &wib()));
    }

    #[test]
    fn test_deadline_active_is_strict_and_monotonic() {
        let text = Some("10 Oktober 2026 | 12:00");
        let deadline = parse_deadline_in(text, &wib()).unwrap().with_timezone(&Utc);

        assert!(is_deadline_active_in(text, deadline - Duration::minutes(1), &wib()));
        assert!(!is_deadline_active_in(text, deadline, &wib()));
        assert!(!is_deadline_active_in(text, deadline + Duration::days(3), &wib()));
    }

    #[test]
    fn test_month_number() {
        assert_eq!(month_number("Januari"), Some(1));
        assert_eq!(month_number("Mei"), Some(5));
        assert_eq!(month_number("Desember"), Some(12));
        assert_eq!(month_number("May"), None);
    }
}
