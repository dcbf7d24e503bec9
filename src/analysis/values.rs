use serde_json::Value;

use super::Row;

/// Non-null values of `column`, in row order. Missing keys count as null.
pub(crate) fn column_values<'a>(rows: &'a [Row], column: &str) -> Vec<&'a Value> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_null())
        .collect()
}

/// Numeric reading of a cell: JSON numbers and strings holding a finite number.
pub(crate) fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
        }
        _ => None,
    }
}

pub(crate) fn numeric_values(rows: &[Row], column: &str) -> Vec<f64> {
    column_values(rows, column)
        .into_iter()
        .filter_map(as_number)
        .collect()
}

/// True when the column has values and every non-null one is numeric.
pub(crate) fn is_fully_numeric(rows: &[Row], column: &str) -> bool {
    let values = column_values(rows, column);
    !values.is_empty() && values.iter().all(|value| as_number(value).is_some())
}

/// Text used to group rows by a categorical cell.
pub(crate) fn label(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(text)) => text.clone(),
        Some(other) => other.to_string(),
    }
}

pub(crate) fn humanize(column: &str) -> String {
    column.replace('_', " ")
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// en-US grouping with at most three fraction digits, e.g. `1,234.5`.
pub(crate) fn format_number(value: f64) -> String {
    let (sign, body) = grouped(value, 3, false);
    format!("{}{}", sign, body)
}

/// US dollar amount with a fixed number of fraction digits, e.g. `$1,234.50`.
pub(crate) fn format_currency(value: f64, decimals: usize) -> String {
    let (sign, body) = grouped(value, decimals, true);
    format!("{}${}", sign, body)
}

fn grouped(value: f64, decimals: usize, fixed: bool) -> (&'static str, String) {
    let rounded = format!("{:.*}", decimals, value.abs());
    let (integer, fraction) = rounded.split_once('.').unwrap_or((rounded.as_str(), ""));
    let fraction = if fixed {
        fraction
    } else {
        fraction.trim_end_matches('0')
    };

    let mut body = String::with_capacity(rounded.len() + integer.len() / 3);
    for (i, digit) in integer.chars().enumerate() {
        if i > 0 && (integer.len() - i) % 3 == 0 {
            body.push(',');
        }
        body.push(digit);
    }
    if !fraction.is_empty() {
        body.push('.');
        body.push_str(fraction);
    }

    let is_zero = rounded.chars().all(|c| c == '0' || c == '.');
    let sign = if value < 0.0 && !is_zero { "-" } else { "" };
    (sign, body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn numbers_from_json_and_text() {
        assert_eq!(as_number(&json!(3)), Some(3.0));
        assert_eq!(as_number(&json!("  4.5 ")), Some(4.5));
        assert_eq!(as_number(&json!("")), None);
        assert_eq!(as_number(&json!("abc")), None);
        assert_eq!(as_number(&json!(true)), None);
    }

    #[test]
    fn formats_like_en_us() {
        assert_eq!(format_number(1234567.0), "1,234,567");
        assert_eq!(format_number(1234.5), "1,234.5");
        assert_eq!(format_number(0.12345), "0.123");
        assert_eq!(format_number(-999.0), "-999");
        assert_eq!(format_currency(600.0, 0), "$600");
        assert_eq!(format_currency(1234.5, 2), "$1,234.50");
        assert_eq!(format_currency(-12.0, 2), "-$12.00");
    }
}
