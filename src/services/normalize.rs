use chrono::{Datelike, Duration, Local, NaiveDate, NaiveTime, Weekday};

/// Absolute date formats accepted from users, tried in order. Day-first
/// beats month-first for the ambiguous slash forms.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d-%m-%Y",
    "%d/%m/%Y",
    "%m/%d/%Y",
    "%d %B %Y",
    "%B %d %Y",
    "%d %b %Y",
    "%b %d %Y",
];

/// Resolve a free-form date expression to `YYYY-MM-DD`, relative to the
/// current local date. Unparseable input is returned verbatim so the
/// conversation layer can keep the field in the missing set and re-prompt.
pub fn normalize_date(raw: &str) -> String {
    normalize_date_on(raw, Local::now().date_naive())
}

/// Same as [`normalize_date`] with an explicit "today", so relative
/// expressions are deterministic under test.
pub fn normalize_date_on(raw: &str, today: NaiveDate) -> String {
    let cleaned = raw.trim().to_lowercase().replace(',', " ");
    let cleaned = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    let resolved = match cleaned.as_str() {
        "today" => Some(today),
        "tomorrow" => Some(today + Duration::days(1)),
        "day after tomorrow" => Some(today + Duration::days(2)),
        _ => None,
    };
    if let Some(date) = resolved {
        return date.format("%Y-%m-%d").to_string();
    }

    let weekday_name = cleaned.strip_prefix("next ").unwrap_or(&cleaned);
    if let Some(weekday) = parse_weekday(weekday_name) {
        return next_weekday(today, weekday).format("%Y-%m-%d").to_string();
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(&cleaned, format) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    raw.to_string()
}

/// Resolve a free-form time expression to 24-hour `HH:MM`. A bare hour
/// without an am/pm marker is taken as 24-hour when it is in 0..=23.
/// Unparseable input is returned verbatim, same contract as dates.
pub fn normalize_time(raw: &str) -> String {
    let cleaned = raw.trim().to_lowercase();

    let (body, pm) = if let Some(stripped) = cleaned.strip_suffix("pm") {
        (stripped.trim_end(), Some(true))
    } else if let Some(stripped) = cleaned.strip_suffix("am") {
        (stripped.trim_end(), Some(false))
    } else {
        (cleaned.as_str(), None)
    };

    let (hour_str, minute_str) = match body.split_once(':') {
        Some((h, m)) => (h.trim(), m.trim()),
        None => (body, "0"),
    };

    let (hour, minute) = match (hour_str.parse::<u32>(), minute_str.parse::<u32>()) {
        (Ok(h), Ok(m)) => (h, m),
        _ => return fallback_parse(raw),
    };
    if minute > 59 {
        return raw.to_string();
    }

    let hour = match pm {
        // 12-hour clock: 12am is midnight, 12pm is noon
        Some(is_pm) => match hour {
            1..=11 if is_pm => hour + 12,
            12 if !is_pm => 0,
            1..=12 => hour,
            _ => return raw.to_string(),
        },
        None if hour <= 23 => hour,
        None => return raw.to_string(),
    };

    format!("{hour:02}:{minute:02}")
}

fn fallback_parse(raw: &str) -> String {
    for format in ["%H:%M:%S", "%I:%M %p"] {
        if let Ok(time) = NaiveTime::parse_from_str(raw.trim(), format) {
            return time.format("%H:%M").to_string();
        }
    }
    raw.to_string()
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

/// First occurrence of `weekday` strictly after `today`.
fn next_weekday(today: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (weekday.num_days_from_monday() + 7 - today.weekday().num_days_from_monday()) % 7;
    let ahead = if ahead == 0 { 7 } else { ahead };
    today + Duration::days(ahead as i64)
}
