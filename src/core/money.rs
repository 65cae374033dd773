use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

pub const DISPLAY_DECIMALS: u32 = 2;

/// Rounds an amount to paise, half-up, with a fixed scale of two digits.
///
/// Only for display and transmission: estimator intermediates stay unrounded.
pub fn round_amount(value: Decimal) -> Decimal {
    let mut rounded =
        value.round_dp_with_strategy(DISPLAY_DECIMALS, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(DISPLAY_DECIMALS);
    rounded
}

/// Formats an amount as rupees with Indian digit grouping, e.g. `₹1,03,172.60`.
pub fn format_inr(value: Decimal) -> String {
    let rounded = round_amount(value);
    let text = rounded.abs().to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let grouped = group_indian(whole);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    format!("{sign}₹{grouped}.{fraction}")
}

fn group_indian(whole: &str) -> String {
    if whole.len() <= 3 {
        return whole.to_string();
    }
    let (head, last_three) = whole.split_at(whole.len() - 3);
    let mut groups = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, pair) = rest.split_at(rest.len() - 2);
        groups.push(pair);
        rest = front;
    }
    if !rest.is_empty() {
        groups.push(rest);
    }
    groups.reverse();
    format!("{},{last_three}", groups.join(","))
}

/// Reads the leading number of a plan's return label (`"12%"`, `"12.5% p.a."`).
pub fn parse_percent(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim_start();
    let end = trimmed
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(trimmed.len());
    if end == 0 {
        return None;
    }
    Decimal::from_str(&trimmed[..end]).ok()
}
