//! pt-BR display helpers.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static YMD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("valid date pattern"));

/// `"2024-03-07"` becomes `"07/03/2024"`. Anything that is not zero-padded
/// `YYYY-MM-DD` yields an empty string. The digits are not checked against
/// the calendar.
pub fn format_ymd_to_dmy(value: &str) -> String {
    match YMD.captures(value) {
        Some(caps) => format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]),
        None => String::new(),
    }
}

pub fn format_date_dmy(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// Brazilian real, e.g. `R$ 1.234,56`. The space after the symbol is a
/// non-breaking space, as browsers render it. Non-finite amounts give "".
pub fn format_brl(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }

    let cents = (amount.abs() * 100.0).round() as u64;
    let digits = (cents / 100).to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}R$\u{a0}{grouped},{:02}", cents % 100)
}
