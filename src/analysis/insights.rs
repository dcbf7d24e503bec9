use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::LazyLock;

use super::values::{
    as_number, format_currency, format_number, humanize, is_fully_numeric, label, mean,
    numeric_values,
};
use super::Row;

/// Relative change between the two halves of a series that counts as a trend.
const TREND_THRESHOLD: f64 = 0.05;
const MIN_TREND_VALUES: usize = 3;
const MIN_ANOMALY_VALUES: usize = 5;
const OUTLIER_STD_DEVS: f64 = 2.0;
/// Outliers are only reported while they stay below this share of the column.
const MAX_OUTLIER_SHARE: f64 = 0.1;
const MAX_FOLLOW_UP_QUESTIONS: usize = 4;

static CURRENCY_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|amount|revenue|cost|total|sales").unwrap());
static COUNT_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)count|quantity|stock").unwrap());
static TIME_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|time|created|updated|year|month").unwrap());
static CATEGORY_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)region|category|type|name|status").unwrap());

static FOLLOW_UP_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)date|time|created|year|month").unwrap());
static FOLLOW_UP_MEASURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)price|amount|revenue|quantity|total").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Summary,
    Trend,
    Comparison,
    Anomaly,
    Recommendation,
}

/// How directly the heuristic saw the pattern. Not a probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Insight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub text: String,
    pub confidence: Confidence,
}

impl Insight {
    fn new(kind: InsightKind, text: String, confidence: Confidence) -> Self {
        Self {
            kind,
            text,
            confidence,
        }
    }
}

/// Insights for a result set in generation order: summary, numeric summaries,
/// trends, comparison, anomalies. Empty results stop after the summary.
pub fn generate_insights(rows: &[Row], columns: &[String], _question: &str) -> Vec<Insight> {
    if rows.is_empty() {
        return vec![Insight::new(
            InsightKind::Summary,
            "No results found for this query.".to_string(),
            Confidence::High,
        )];
    }

    let mut insights = vec![Insight::new(
        InsightKind::Summary,
        format!(
            "Found {} {} with {} {}.",
            rows.len(),
            plural(rows.len(), "result"),
            columns.len(),
            plural(columns.len(), "column")
        ),
        Confidence::High,
    )];

    insights.extend(numeric_insights(rows, columns));
    insights.extend(trend_insights(rows, columns));
    insights.extend(comparison_insight(rows, columns));
    insights.extend(anomaly_insights(rows, columns));
    insights
}

fn numeric_insights(rows: &[Row], columns: &[String]) -> Vec<Insight> {
    let mut insights = Vec::new();

    for column in columns {
        let values = numeric_values(rows, column);
        if values.len() < 2 {
            continue;
        }

        let sum: f64 = values.iter().sum();
        // Overflowed totals have no readable rendering.
        if !sum.is_finite() {
            continue;
        }
        let (min, max) = bounds(&values);

        if CURRENCY_COLUMN.is_match(column) {
            insights.push(Insight::new(
                InsightKind::Summary,
                format!(
                    "Total {}: {}, ranging from {} to {}.",
                    humanize(column),
                    format_currency(sum, 0),
                    format_currency(min, 2),
                    format_currency(max, 2)
                ),
                Confidence::High,
            ));
        } else if COUNT_COLUMN.is_match(column) {
            insights.push(Insight::new(
                InsightKind::Summary,
                format!(
                    "Total {}: {}, average: {:.1}.",
                    humanize(column),
                    format_number(sum),
                    mean(&values)
                ),
                Confidence::High,
            ));
        }
    }

    insights
}

fn trend_insights(rows: &[Row], columns: &[String]) -> Vec<Insight> {
    if !columns.iter().any(|column| TIME_COLUMN.is_match(column)) {
        return Vec::new();
    }

    let mut insights = Vec::new();
    for column in columns {
        if !is_fully_numeric(rows, column) {
            continue;
        }
        let values = numeric_values(rows, column);
        if values.len() < MIN_TREND_VALUES {
            continue;
        }

        let (first_half, second_half) = values.split_at(values.len() / 2);
        let first_mean = mean(first_half);
        let second_mean = mean(second_half);
        if first_mean == 0.0 {
            continue;
        }

        let change = (second_mean - first_mean) / first_mean.abs();
        if change.abs() > TREND_THRESHOLD {
            let direction = if change > 0.0 { "increased" } else { "decreased" };
            insights.push(Insight::new(
                InsightKind::Trend,
                format!(
                    "{} {} by {:.1}% over the time period.",
                    humanize(column),
                    direction,
                    change.abs() * 100.0
                ),
                Confidence::Medium,
            ));
        }
    }

    insights
}

fn comparison_insight(rows: &[Row], columns: &[String]) -> Option<Insight> {
    let category = columns
        .iter()
        .find(|column| CATEGORY_COLUMN.is_match(column))?;
    let measure = columns
        .iter()
        .find(|column| is_fully_numeric(rows, column))?;

    let mut totals: Vec<(String, f64)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let Some(value) = row.get(measure.as_str()).and_then(as_number) else {
            continue;
        };
        let group = label(row.get(category.as_str()));
        match positions.get(&group) {
            Some(&position) => totals[position].1 += value,
            None => {
                positions.insert(group.clone(), totals.len());
                totals.push((group, value));
            }
        }
    }

    if totals.len() < 2 {
        return None;
    }
    totals.sort_by(|a, b| b.1.total_cmp(&a.1));

    let (top, top_total) = &totals[0];
    let (runner_up, runner_up_total) = &totals[1];
    Some(Insight::new(
        InsightKind::Comparison,
        format!(
            "Top {}: \"{}\" leads with {}, followed by \"{}\" at {}.",
            humanize(category),
            top,
            format_number(*top_total),
            runner_up,
            format_number(*runner_up_total)
        ),
        Confidence::High,
    ))
}

fn anomaly_insights(rows: &[Row], columns: &[String]) -> Vec<Insight> {
    let mut insights = Vec::new();

    for column in columns {
        let values = numeric_values(rows, column);
        if values.len() < MIN_ANOMALY_VALUES {
            continue;
        }

        let outliers = find_outliers(&values);
        let notable = !outliers.is_empty()
            && (outliers.len() as f64) < values.len() as f64 * MAX_OUTLIER_SHARE;
        if notable {
            insights.push(Insight::new(
                InsightKind::Anomaly,
                format!(
                    "{} unusual {} detected in {} (significantly different from average).",
                    outliers.len(),
                    plural(outliers.len(), "value"),
                    humanize(column)
                ),
                Confidence::Medium,
            ));
        }
    }

    insights
}

/// Values further than two population standard deviations from the mean.
pub fn find_outliers(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let average = mean(values);
    let variance = values
        .iter()
        .map(|value| (value - average).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    let limit = OUTLIER_STD_DEVS * variance.sqrt();

    values
        .iter()
        .copied()
        .filter(|value| (value - average).abs() > limit)
        .collect()
}

/// Up to four follow-up questions, ordered time, category, measure, generic.
pub fn generate_follow_up_questions(
    rows: &[Row],
    columns: &[String],
    _question: &str,
) -> Vec<String> {
    if rows.is_empty() {
        return vec![
            "Can you show me all available tables?".to_string(),
            "Which columns are available in each table?".to_string(),
        ];
    }

    let mentions = |pattern: &Regex| columns.iter().any(|column| pattern.is_match(column));
    let mut questions: Vec<&str> = Vec::new();

    if mentions(&FOLLOW_UP_TIME) {
        questions.push("How does this trend look over the last 6 months?");
        questions.push("Can you compare this year vs last year?");
    }

    if mentions(&CATEGORY_COLUMN) {
        questions.push("Can you break this down by category?");
        questions.push("Which region performs best?");
    }

    if mentions(&FOLLOW_UP_MEASURE) {
        questions.push("What is the average and total?");
        questions.push("Show me the top 5 results");
    }

    questions.push("Can you visualize this data?");
    questions.push("What insights can you find?");

    questions
        .into_iter()
        .take(MAX_FOLLOW_UP_QUESTIONS)
        .map(str::to_string)
        .collect()
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), &value| {
            (min.min(value), max.max(value))
        })
}

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        noun.to_string()
    } else {
        format!("{}s", noun)
    }
}
