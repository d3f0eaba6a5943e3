use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;
use time::{macros::time, Date, Month, PrimitiveDateTime};

/// One body row of an export, keyed by header cell.
pub type RowRecord = HashMap<String, String>;

lazy_static! {
    static ref ISO_DATE_RE: Regex = Regex::new(
        r"^(\d{4})-(\d{2})-(\d{2})(?:[T ]\d{2}:\d{2}(?::\d{2}(?:\.\d+)?)?(?:Z|[+-]\d{2}:?\d{2})?)?$"
    )
    .unwrap();
    static ref US_DATE_RE: Regex = Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").unwrap();
    static ref GROUPED_NUMBER_RE: Regex = Regex::new(r"^-?\d{1,3}(,\d{3})+(\.\d+)?$").unwrap();
}

/// Numeric value of a cell, or `0.0` for anything that isn't a finite number.
///
/// Thousands separators (`1,234.5`) are accepted; a lone comma such as `1,5`
/// is not a decimal point and still yields `0.0`.
pub fn parse_number(value: &str) -> f64 {
    let value = value.trim();
    let cleaned = if GROUPED_NUMBER_RE.is_match(value) {
        value.replace(',', "")
    } else {
        value.to_string()
    };
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// Recognises `YYYY-MM-DD`, `MM/DD/YYYY` and ISO-8601 timestamps.
///
/// The calendar date is read straight from the string's own components. A
/// timestamp such as `2024-01-15T23:30:00-08:00` is the 15th, never the 16th.
pub fn parse_date(value: &str) -> Option<Date> {
    let value = value.trim();

    let (year, month, day): (i32, u8, u8) = if let Some(caps) = ISO_DATE_RE.captures(value) {
        (caps[1].parse().ok()?, caps[2].parse().ok()?, caps[3].parse().ok()?)
    } else if let Some(caps) = US_DATE_RE.captures(value) {
        (caps[3].parse().ok()?, caps[1].parse().ok()?, caps[2].parse().ok()?)
    } else {
        return None;
    };

    calendar_date(year, month, day)
}

fn calendar_date(year: i32, month: u8, day: u8) -> Option<Date> {
    let month = Month::try_from(month).ok()?;
    Date::from_calendar_date(year, month, day).ok()
}

/// Anchors a calendar date at local noon.
pub fn at_noon(date: Date) -> PrimitiveDateTime {
    date.with_time(time!(12:00))
}

pub fn normalize_header(value: &str) -> String {
    value.trim().to_lowercase()
}

/// True when every required header is present, compared case-insensitively.
pub fn has_required_headers(headers: &[String], required: &[&str]) -> bool {
    if headers.is_empty() {
        return false;
    }
    let present: Vec<String> = headers.iter().map(|h| normalize_header(h)).collect();
    required
        .iter()
        .all(|r| present.contains(&normalize_header(r)))
}

pub fn format_date_key(date: Date) -> String {
    format!(
        "{:04}-{:02}-{:02}",
        date.year(),
        u8::from(date.month()),
        date.day()
    )
}

/// First non-empty value under any of `keys`.
///
/// Exact header matches win; a case-insensitive pass over the row's headers
/// follows. Returns an empty string when nothing matches.
pub fn get_value(row: &RowRecord, keys: &[&str]) -> String {
    for key in keys {
        if let Some(v) = row.get(*key) {
            if !v.trim().is_empty() {
                return v.trim().to_string();
            }
        }
    }

    for key in keys {
        let wanted = normalize_header(key);
        let hit = row
            .iter()
            .find(|(k, v)| normalize_header(k) == wanted && !v.trim().is_empty());
        if let Some((_, v)) = hit {
            return v.trim().to_string();
        }
    }

    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    fn row(pairs: &[(&str, &str)]) -> RowRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn parse_number_is_total() {
        for bad in ["", "   ", "abc", "12g", "NaN", "inf", "--1"] {
            assert_eq!(parse_number(bad), 0.0, "input {bad:?}");
        }
        assert_eq!(parse_number("42"), 42.0);
        assert_eq!(parse_number("-10"), -10.0);
        assert_eq!(parse_number("3.14"), 3.14);
        assert_eq!(parse_number(" 7.5 "), 7.5);
    }

    #[test]
    fn parse_number_accepts_thousands_separators() {
        assert_eq!(parse_number("1,234"), 1234.0);
        assert_eq!(parse_number(" 2,010.5 "), 2010.5);
        assert_eq!(parse_number("-1,000,000"), -1_000_000.0);
        assert_eq!(parse_number("1,5"), 0.0);
        assert_eq!(parse_number("12,34"), 0.0);
    }

    #[test]
    fn parse_date_accepts_three_formats() {
        assert_eq!(parse_date("2024-01-15"), Some(date!(2024 - 01 - 15)));
        assert_eq!(parse_date("01/15/2024"), Some(date!(2024 - 01 - 15)));
        assert_eq!(parse_date("1/5/2024"), Some(date!(2024 - 01 - 05)));
        assert_eq!(parse_date("2024-01-15T08:30:00Z"), Some(date!(2024 - 01 - 15)));
        assert_eq!(
            parse_date("2024-01-15T23:30:00.000-08:00"),
            Some(date!(2024 - 01 - 15))
        );
    }

    #[test]
    fn parse_date_rejects_garbage_and_impossible_dates() {
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date("2024-02-30"), None);
        assert_eq!(parse_date("13/01/2024"), None);
        assert_eq!(parse_date("2024/01/15"), None);
    }

    #[test]
    fn us_dates_keep_their_components() {
        for (input, y, m, d) in [
            ("12/31/2023", 2023, 12, 31),
            ("01/01/2024", 2024, 1, 1),
            ("03/10/2024", 2024, 3, 10),
        ] {
            let parsed = parse_date(input).unwrap();
            assert_eq!(parsed.year(), y);
            assert_eq!(u8::from(parsed.month()), m);
            assert_eq!(parsed.day(), d);
        }
    }

    #[test]
    fn date_key_round_trips() {
        assert_eq!(format_date_key(parse_date("2024-03-05").unwrap()), "2024-03-05");
        assert_eq!(format_date_key(parse_date("03/05/2024").unwrap()), "2024-03-05");
        assert_eq!(
            format_date_key(parse_date("2024-03-05T00:15:00+09:00").unwrap()),
            "2024-03-05"
        );
    }

    #[test]
    fn noon_anchor_stays_on_same_day() {
        let anchored = at_noon(date!(2024 - 11 - 03));
        assert_eq!(anchored, datetime!(2024-11-03 12:00));
        assert_eq!(anchored.date(), date!(2024 - 11 - 03));
    }

    #[test]
    fn required_headers_are_case_insensitive() {
        let headers: Vec<String> = vec![" Date".into(), "MEAL".into(), "Calories".into()];
        assert!(has_required_headers(&headers, &["date", "meal", "calories"]));
        assert!(!has_required_headers(&headers, &["date", "type"]));
        assert!(!has_required_headers(&[], &[]));
    }

    #[test]
    fn get_value_prefers_exact_then_case_insensitive() {
        let r = row(&[("Calories", "250"), ("energy (kcal)", "300"), ("Name", "")]);

        assert_eq!(get_value(&r, &["Calories", "Energy (kcal)"]), "250");
        assert_eq!(get_value(&r, &["Energy (kcal)"]), "300");
        assert_eq!(get_value(&r, &["Name", "Food"]), "");
        assert_eq!(get_value(&r, &["missing"]), "");
    }
}
