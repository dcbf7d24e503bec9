use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::LazyLock;

use super::values::{as_number, column_values};
use super::Row;

/// Share of sampled values that must satisfy a predicate for a column to be
/// given that kind.
const CLASSIFICATION_THRESHOLD: f64 = 0.8;

static DATE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{4}-\d{2}-\d{2}|\d{2}/\d{2}/\d{4}|^\d{13}$").unwrap()
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Numeric,
    Date,
    Boolean,
    Categorical,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnTypeInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
}

pub fn infer_types(rows: &[Row], columns: &[String]) -> Vec<ColumnTypeInfo> {
    columns
        .iter()
        .map(|name| ColumnTypeInfo {
            name: name.clone(),
            kind: infer_column(rows, name),
        })
        .collect()
}

/// Classifies one column. Checks run numeric, date, boolean, categorical and
/// the first that passes wins, so `0`/`1` columns are numeric.
pub fn infer_column(rows: &[Row], column: &str) -> ColumnKind {
    let values = column_values(rows, column);
    if values.is_empty() {
        return ColumnKind::Unknown;
    }

    let share = |predicate: fn(&Value) -> bool| {
        values.iter().filter(|value| predicate(value)).count() as f64 / values.len() as f64
    };

    if share(is_numeric) >= CLASSIFICATION_THRESHOLD {
        ColumnKind::Numeric
    } else if share(is_date_like) >= CLASSIFICATION_THRESHOLD {
        ColumnKind::Date
    } else if share(is_boolean_like) >= CLASSIFICATION_THRESHOLD {
        ColumnKind::Boolean
    } else {
        ColumnKind::Categorical
    }
}

fn is_numeric(value: &Value) -> bool {
    as_number(value).is_some()
}

fn is_date_like(value: &Value) -> bool {
    match value {
        Value::String(text) => DATE_PATTERN.is_match(text),
        // Unix timestamps in seconds or milliseconds.
        Value::Number(number) => number
            .as_f64()
            .is_some_and(|n| n > 1_000_000_000.0 && n < 9_999_999_999_999.0),
        _ => false,
    }
}

fn is_boolean_like(value: &Value) -> bool {
    match value {
        Value::Bool(_) => true,
        Value::Number(number) => number.as_f64().is_some_and(|n| n == 0.0 || n == 1.0),
        Value::String(text) => matches!(
            text.trim().to_ascii_lowercase().as_str(),
            "true" | "false" | "yes" | "no" | "0" | "1"
        ),
        _ => false,
    }
}
