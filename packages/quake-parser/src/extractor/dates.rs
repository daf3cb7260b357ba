//! Fuzzy publication-date parsing.
//!
//! Date text scraped from a page is rarely clean: it arrives wrapped in labels
//! ("Published:", "Last updated on"), times and time zones. The parser scans
//! the text for the earliest recognisable calendar date and discards
//! everything else, including the time of day.
//!
//! Recognised shapes, in tie-break order when two start at the same offset:
//! 1. ISO-like year-first dates: `2024-03-03`, `2024/3/3`, `2024-03-03T10:00:00Z`
//! 2. Month name first: `March 3, 2024`, `Mar. 3rd 2024`, `Feb-06-2023`
//! 3. Day first with month name: `3 March 2024`, `3rd of March, 2024`, `06-Feb-2023`
//! 4. Numeric with trailing year: `03/15/2024` (month first), `15.03.2024`
//!    (day first), `2/6/23` (two-digit years are 20xx)
//! 5. Month and year only: `March 2024` (first day of the month)
//! 6. Compact `20230206`

use chrono::NaiveDate;
use regex::{Captures, Regex};
use std::sync::LazyLock;

const MONTHS: &str = "january|february|march|april|may|june|july|august|september|october|november|december|jan|feb|mar|apr|jun|jul|aug|sept|sep|oct|nov|dec";

static YEAR_FIRST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(\d{4})[-/.](\d{1,2})[-/.](\d{1,2})").unwrap());

static MONTH_NAME_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b({})\.?[-\s]+(\d{{1,2}})(?:st|nd|rd|th)?,?[-\s]+(\d{{4}})\b",
        MONTHS
    ))
    .unwrap()
});

static DAY_FIRST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?i)\b(\d{{1,2}})(?:st|nd|rd|th)?[-\s]+(?:of\s+)?({})\.?,?[-\s]+(\d{{4}})\b",
        MONTHS
    ))
    .unwrap()
});

static NUMERIC_YEAR_LAST: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})([/.-])(\d{1,2})[/.-](\d{4}|\d{2})\b").unwrap()
});

static MONTH_YEAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\b({})\.?,?[-\s]+(\d{{4}})\b", MONTHS)).unwrap()
});

static COMPACT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})(\d{2})(\d{2})\b").unwrap());

/// Find the earliest calendar date anywhere in `text`.
pub fn parse_fuzzy_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    // min_by_key keeps the first of equal offsets, so list order breaks ties.
    [
        first_match(&YEAR_FIRST, text, year_first),
        first_match(&MONTH_NAME_FIRST, text, month_name_first),
        first_match(&DAY_FIRST, text, day_first),
        first_match(&NUMERIC_YEAR_LAST, text, numeric_year_last),
        first_match(&MONTH_YEAR, text, month_year),
        first_match(&COMPACT, text, year_first),
    ]
    .into_iter()
    .flatten()
    .min_by_key(|(start, _)| *start)
    .map(|(_, date)| date)
}

/// Parse and normalise to `YYYY-MM-DD`.
pub fn normalize_date(text: &str) -> Option<String> {
    parse_fuzzy_date(text).map(|d| d.format("%Y-%m-%d").to_string())
}

/// Byte offset and date of the first match of `re` that is a real date.
fn first_match(
    re: &Regex,
    text: &str,
    build: fn(&Captures<'_>) -> Option<NaiveDate>,
) -> Option<(usize, NaiveDate)> {
    re.captures_iter(text)
        .find_map(|caps| Some((caps.get(0)?.start(), build(&caps)?)))
}

fn year_first(caps: &Captures<'_>) -> Option<NaiveDate> {
    ymd(
        caps[1].parse().ok()?,
        caps[2].parse().ok()?,
        caps[3].parse().ok()?,
    )
}

fn month_name_first(caps: &Captures<'_>) -> Option<NaiveDate> {
    ymd(
        caps[3].parse().ok()?,
        month_number(&caps[1])?,
        caps[2].parse().ok()?,
    )
}

fn day_first(caps: &Captures<'_>) -> Option<NaiveDate> {
    ymd(
        caps[3].parse().ok()?,
        month_number(&caps[2])?,
        caps[1].parse().ok()?,
    )
}

fn numeric_year_last(caps: &Captures<'_>) -> Option<NaiveDate> {
    let a: u32 = caps[1].parse().ok()?;
    let b: u32 = caps[3].parse().ok()?;
    let year: i32 = caps[4].parse().ok()?;
    let year = if caps[4].len() == 2 { 2000 + year } else { year };

    // Dotted dates are day-first; slashes and dashes are month-first
    // unless the first number cannot be a month.
    let day_first = &caps[2] == "." || a > 12;
    if day_first {
        ymd(year, b, a)
    } else {
        ymd(year, a, b)
    }
}

fn month_year(caps: &Captures<'_>) -> Option<NaiveDate> {
    ymd(caps[2].parse().ok()?, month_number(&caps[1])?, 1)
}

fn ymd(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    let prefix: String = name.chars().take(3).collect::<String>().to_lowercase();
    let month = match prefix.as_str() {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(month)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_and_month_name() {
        assert_eq!(
            normalize_date("Published: March 3, 2024").as_deref(),
            Some("2024-03-03")
        );
    }

    #[test]
    fn test_iso_with_time_drops_time() {
        assert_eq!(
            normalize_date("Updated 2023-02-06T04:17:00+03:00").as_deref(),
            Some("2023-02-06")
        );
    }

    #[test]
    fn test_day_first_with_ordinal() {
        assert_eq!(
            normalize_date("Posted on the 6th of February, 2023 at 10:24").as_deref(),
            Some("2023-02-06")
        );
        assert_eq!(normalize_date("6 Feb 2023").as_deref(), Some("2023-02-06"));
    }

    #[test]
    fn test_abbreviated_month_with_period() {
        assert_eq!(
            normalize_date("Sept. 19th 2017 | 13:14 CDT").as_deref(),
            Some("2017-09-19")
        );
    }

    #[test]
    fn test_numeric_orders() {
        assert_eq!(normalize_date("03/15/2024").as_deref(), Some("2024-03-15"));
        assert_eq!(normalize_date("15/03/2024").as_deref(), Some("2024-03-15"));
        assert_eq!(normalize_date("05.03.2024").as_deref(), Some("2024-03-05"));
    }

    #[test]
    fn test_month_and_year_only() {
        assert_eq!(normalize_date("Issue of May 2021").as_deref(), Some("2021-05-01"));
    }

    #[test]
    fn test_rejects_text_without_dates() {
        assert_eq!(normalize_date(""), None);
        assert_eq!(normalize_date("Share this article"), None);
        assert_eq!(normalize_date("2024-13-45"), None);
    }

    #[test]
    fn test_words_containing_month_prefixes_are_ignored() {
        assert_eq!(normalize_date("Marine decade report"), None);
    }

    #[test]
    fn test_dash_separated_month_names() {
        assert_eq!(normalize_date("06-Feb-2023").as_deref(), Some("2023-02-06"));
        assert_eq!(normalize_date("Feb-06-2023").as_deref(), Some("2023-02-06"));
    }

    #[test]
    fn test_two_digit_years_are_this_century() {
        assert_eq!(normalize_date("2/6/23").as_deref(), Some("2023-02-06"));
        assert_eq!(normalize_date("Posted 15.03.24").as_deref(), Some("2024-03-15"));
    }

    #[test]
    fn test_compact_year_month_day() {
        assert_eq!(normalize_date("20230206").as_deref(), Some("2023-02-06"));
        assert_eq!(normalize_date("ref 20231399"), None);
    }

    #[test]
    fn test_earliest_date_in_text_wins() {
        assert_eq!(
            normalize_date("Updated March 3, 2024 (ref 2019-01-01)").as_deref(),
            Some("2024-03-03")
        );
        assert_eq!(
            normalize_date("2019-01-01, revised March 3, 2024").as_deref(),
            Some("2019-01-01")
        );
    }
}
