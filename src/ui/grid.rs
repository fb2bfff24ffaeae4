//! Cell formatting for the list grid.

use serde_json::Value;

use infinilist::list::{DisplayType, Item, LayoutDescriptor};
use infinilist::util::fit_cell;

/// Gap between columns.
const SEPARATOR: &str = "  ";

/// Text for one cell.
pub(super) fn format_value(value: Option<&Value>, display_type: DisplayType) -> String {
    let Some(value) = value else {
        return String::new();
    };
    match (display_type, value) {
        (_, Value::Null) => String::new(),
        (DisplayType::Money, Value::Number(n)) => n.as_f64().map(format_money).unwrap_or_default(),
        (DisplayType::Boolean, Value::Bool(b)) => yes_no(*b).to_string(),
        (DisplayType::Boolean, Value::Number(n)) => yes_no(n.as_f64() != Some(0.0)).to_string(),
        (_, Value::String(s)) => s.clone(),
        (_, other) => other.to_string(),
    }
}

fn yes_no(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

/// Two decimals with thousands separators: `-1234.5` → `-1,234.50`.
fn format_money(amount: f64) -> String {
    let fixed = format!("{:.2}", amount.abs());
    let (whole, cents) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{sign}{grouped}.{cents}")
}

/// Width of a column in terminal cells.
pub(super) fn column_width(layout: &LayoutDescriptor) -> usize {
    let default = match layout.display_type {
        DisplayType::Number => 8,
        DisplayType::Money => 12,
        DisplayType::Date => 12,
        DisplayType::Boolean => 6,
        DisplayType::Text => 16,
    };
    let mut width = layout.width.unwrap_or(default);
    if let Some(min) = layout.min_width {
        width = width.max(min);
    }
    if let Some(max) = layout.max_width {
        width = width.min(max);
    }
    usize::from(width.max(1))
}

/// Column labels, aligned like the data beneath them.
pub(super) fn header_line(columns: &[LayoutDescriptor]) -> String {
    columns
        .iter()
        .map(|c| fit_cell(&c.label, column_width(c), c.align))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

/// One data row.
pub(super) fn row_line(item: &Item, columns: &[LayoutDescriptor]) -> String {
    columns
        .iter()
        .map(|c| {
            let text = format_value(item.get(&c.field), c.display_type);
            fit_cell(&text, column_width(c), c.align)
        })
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}
