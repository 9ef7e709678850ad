//! Display Helpers
//!
//! Russian plural forms, money and date formatting for the board and lists.

use chrono::{DateTime, NaiveDate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluralForm {
    One,
    Few,
    Many,
}

pub fn plural_form(n: usize) -> PluralForm {
    let tens = n % 100;
    let ones = n % 10;
    if (11..=14).contains(&tens) {
        PluralForm::Many
    } else if ones == 1 {
        PluralForm::One
    } else if (2..=4).contains(&ones) {
        PluralForm::Few
    } else {
        PluralForm::Many
    }
}

pub fn deal_noun(n: usize) -> &'static str {
    match plural_form(n) {
        PluralForm::One => "сделка",
        PluralForm::Few => "сделки",
        PluralForm::Many => "сделок",
    }
}

/// "3 сделки"
pub fn deals_label(n: usize) -> String {
    format!("{n} {}", deal_noun(n))
}

/// Whole roubles with non-breaking-space thousands: "1 250 000 ₽"
pub fn format_amount(amount: f64) -> String {
    let rounded = amount.round();
    let digits = format!("{}", rounded.abs() as u64);
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 * 2);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('\u{a0}');
        }
        grouped.push(ch);
    }
    let sign = if rounded < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}\u{a0}₽")
}

/// Backend dates arrive as `YYYY-MM-DD` or full RFC 3339 timestamps
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|dt| dt.date_naive()))
}

/// "05.03.2025"; unparseable input is shown as is
pub fn format_date(value: &str) -> String {
    parse_date(value).map_or_else(|| value.to_string(), |date| date.format("%d.%m.%Y").to_string())
}

/// "05.03.2025 14:30" in the timestamp's own offset; plain dates stay dates
pub fn format_date_time(value: &str) -> String {
    match DateTime::parse_from_rfc3339(value.trim()) {
        Ok(timestamp) => timestamp.format("%d.%m.%Y %H:%M").to_string(),
        Err(_) => format_date(value),
    }
}

pub fn is_overdue(due: &str, today: NaiveDate) -> bool {
    parse_date(due).is_some_and(|date| date < today)
}
