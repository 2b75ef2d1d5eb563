//! Deterministic date-range resolution for extraction prompts.
//!
//! Maps free-text phrases like "family events this weekend" to a concrete
//! inclusive date range via explicit phrase rules. No language model is
//! involved; unmatched prompts fall back to a fixed forward window.

use chrono::{Datelike, Days, Months, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::DEFAULT_EXTRACT_WINDOW_DAYS;

/// Inclusive date range implied by a prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

const MONTH_NAMES: &[&str] = &[
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

static NEXT_N_DAYS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"next\s+(\d+)\s+days?").expect("static regex"));
static EXPLICIT_RANGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+\s+\d{1,2})\s*[-–to]+\s*(\w+\s+\d{1,2})").expect("static regex"));
static IN_MONTH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"\bin\s+(january|february|march|april|may|june|july|august|september|october|november|december)\b",
    )
    .expect("static regex")
});

/// Resolve the date range implied by an extraction prompt.
///
/// Rules are applied in order ("next weekend" is checked before "next week"
/// because the former contains the latter); the first match wins. Unmatched
/// prompts get a forward window of [`DEFAULT_EXTRACT_WINDOW_DAYS`] days.
#[must_use]
pub fn date_range_from_prompt(prompt: &str, today: NaiveDate) -> DateRange {
    let text = prompt.to_lowercase();
    // 0 = Sunday .. 6 = Saturday
    let wday = today.weekday().num_days_from_sunday();

    if text.contains("this weekend") {
        let saturday = if wday == 6 || wday == 0 {
            today
        } else {
            plus_days(today, u64::from(6 - wday))
        };
        return DateRange { from: saturday, to: plus_days(saturday, 1) };
    }

    if text.contains("next weekend") {
        let mut days_until_sat = (6 - wday) % 7;
        if days_until_sat == 0 {
            days_until_sat = 7;
        }
        let saturday = plus_days(today, u64::from(days_until_sat) + 7);
        return DateRange { from: saturday, to: plus_days(saturday, 1) };
    }

    if text.contains("next week") {
        let until_monday = (1i64 - i64::from(wday)).rem_euclid(7) as u64;
        let monday = plus_days(today, until_monday + 7);
        return DateRange { from: monday, to: plus_days(monday, 6) };
    }

    if text.contains("this week") {
        return DateRange { from: today, to: plus_days(today, u64::from(6 - wday)) };
    }

    if let Some(caps) = NEXT_N_DAYS.captures(&text) {
        if let Ok(n) = caps[1].parse::<u64>() {
            return DateRange { from: today, to: plus_days(today, n) };
        }
    }

    if text.contains("this month") {
        return DateRange { from: today, to: end_of_month(today) };
    }

    if text.contains("next month") {
        let start = first_of_next_month(today);
        return DateRange { from: start, to: end_of_month(start) };
    }

    if let Some(caps) = EXPLICIT_RANGE.captures(&text) {
        if let (Some(from), Some(to)) =
            (parse_fuzzy_date(&caps[1], today.year()), parse_fuzzy_date(&caps[2], today.year()))
        {
            return DateRange { from, to };
        }
    }

    if let Some(caps) = IN_MONTH.captures(&text) {
        if let Some(month) = month_number(&caps[1]) {
            if let Some(mut start) = NaiveDate::from_ymd_opt(today.year(), month, 1) {
                // A month already well behind us means next year's instance
                if start < minus_days(today, 30) {
                    start = start + Months::new(12);
                }
                let from = start.max(today);
                return DateRange { from, to: end_of_month(start) };
            }
        }
    }

    DateRange { from: today, to: plus_days(today, DEFAULT_EXTRACT_WINDOW_DAYS as u64) }
}

/// Parse fragments like "feb 10" or "february 15". Month names match by
/// prefix (3+ letters); the given year is assumed.
fn parse_fuzzy_date(text: &str, year: i32) -> Option<NaiveDate> {
    let mut parts = text.split_whitespace();
    let month_part = parts.next()?;
    let day: u32 = parts.next()?.parse().ok()?;
    let month = month_number(month_part)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn month_number(name: &str) -> Option<u32> {
    if name.len() < 3 {
        return None;
    }
    let lower = name.to_lowercase();
    MONTH_NAMES
        .iter()
        .position(|month| month.starts_with(&lower))
        .map(|idx| idx as u32 + 1)
}

fn plus_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(date)
}

fn minus_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days)).unwrap_or(date)
}

fn first_of_next_month(date: NaiveDate) -> NaiveDate {
    let first = NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date);
    first + Months::new(1)
}

fn end_of_month(date: NaiveDate) -> NaiveDate {
    minus_days(first_of_next_month(date), 1)
}
