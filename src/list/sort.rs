use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::cmp::Ordering;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::item::{DisplayType, Item};

/// Sort the data rows of `items` in place by `field`.
///
/// Sentinel rows (header, footer, loading placeholder) keep their exact
/// positions; only the slots holding data rows are permuted. The sort is
/// stable, so rows that compare equal keep their relative order.
///
/// Missing or null values sort first when ascending and last when
/// descending. Number, money and date columns compare numerically (dates as
/// epoch milliseconds). Everything else compares as text with accents and
/// case folded first, so "Émile" sorts among the E's rather than after "Z".
pub fn sort_items(items: &mut [Item], field: &str, display_type: DisplayType, ascending: bool) {
    let slots: Vec<usize> = items
        .iter()
        .enumerate()
        .filter(|(_, item)| !item.is_sentinel())
        .map(|(index, _)| index)
        .collect();

    if slots.len() < 2 {
        return;
    }

    let mut rows: Vec<Item> = slots
        .iter()
        .map(|&index| std::mem::take(&mut items[index]))
        .collect();

    rows.sort_by(|a, b| {
        let ordering = compare_values(a.get(field), b.get(field), display_type);
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });

    for (index, row) in slots.into_iter().zip(rows) {
        items[index] = row;
    }
}

/// Ascending comparison of two field values; null/missing first.
pub fn compare_values(a: Option<&Value>, b: Option<&Value>, display_type: DisplayType) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());

    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(a), Some(b)) => {
            if display_type.is_numeric() || display_type == DisplayType::Boolean {
                let a = numeric_key(a, display_type);
                let b = numeric_key(b, display_type);
                match (a, b) {
                    (None, None) => Ordering::Equal,
                    (None, Some(_)) => Ordering::Less,
                    (Some(_), None) => Ordering::Greater,
                    (Some(a), Some(b)) => a.total_cmp(&b),
                }
            } else {
                compare_text(&text_key(a), &text_key(b))
            }
        }
    }
}

/// Numeric sort key. Values that cannot be read as a number sort with nulls.
fn numeric_key(value: &Value, display_type: DisplayType) -> Option<f64> {
    match (value, display_type) {
        (Value::Bool(b), _) => Some(if *b { 1.0 } else { 0.0 }),
        (Value::Number(n), _) => n.as_f64(),
        (Value::String(s), DisplayType::Date) => parse_date_millis(s).map(|ms| ms as f64),
        (Value::String(s), DisplayType::Boolean) => match s.trim() {
            "true" | "1" => Some(1.0),
            "false" | "0" => Some(0.0),
            _ => None,
        },
        (Value::String(s), _) => parse_amount(s),
        _ => None,
    }
}

/// Parse a plain or formatted amount such as `"1,250.50"` or `"$ 12"`.
fn parse_amount(s: &str) -> Option<f64> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Epoch milliseconds for RFC 3339 timestamps, `YYYY-MM-DD HH:MM:SS` and
/// `YYYY-MM-DD` dates (naive values are read as UTC).
fn parse_date_millis(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp_millis())
}

fn text_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Primary text key: canonical decomposition with combining marks dropped,
/// then lowercased.
fn fold_text(s: &str) -> String {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Accent- and case-insensitive comparison. Ties are broken by the accented
/// lowercase form and then case-sensitively, which keeps "apple" next to
/// "Apple" and "Elise" next to "Élise".
fn compare_text(a: &str, b: &str) -> Ordering {
    fold_text(a)
        .cmp(&fold_text(b))
        .then_with(|| a.to_lowercase().cmp(&b.to_lowercase()))
        .then_with(|| a.cmp(b))
}
