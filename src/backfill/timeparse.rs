use chrono::NaiveTime;

/// Accepted time-of-day formats, tried in order. First match wins.
/// 24-hour forms come first; 12-hour forms accept "9:15am" and "5:45 PM"
/// (chrono parses the meridiem marker case-insensitively).
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M%p", "%I:%M %p"];

pub fn parse_time_of_day(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Minutes since midnight, for window arithmetic.
pub fn minutes_of_day(t: NaiveTime) -> u32 {
    use chrono::Timelike;
    t.hour() * 60 + t.minute()
}

/// Back from minutes to a wall-clock time with a fixed ":00" seconds field.
/// Hours wrap modulo 24; inputs should never exceed a day of minutes in
/// practice.
pub fn time_from_minutes(total: u32) -> NaiveTime {
    let total = total % (24 * 60);
    NaiveTime::from_hms_opt(total / 60, total % 60, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
}
