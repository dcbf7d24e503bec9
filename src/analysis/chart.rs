use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use super::column_types::{infer_types, ColumnKind, ColumnTypeInfo};
use super::Row;

/// Largest result that is still drawn as a pie.
const PIE_MAX_ROWS: usize = 7;
/// Results longer than this with a numeric column become an area chart.
const AREA_MIN_ROWS: usize = 20;

static AGGREGATION_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)count|sum|avg|total|max|min").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Area,
    Table,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartRecommendation {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub reason: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_axis: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y_axis: Option<String>,
}

impl ChartRecommendation {
    fn new(kind: ChartKind, reason: &str) -> Self {
        Self {
            kind,
            reason: reason.to_string(),
            x_axis: None,
            y_axis: None,
        }
    }

    fn with_axes(mut self, x_axis: Option<&str>, y_axis: Option<&str>) -> Self {
        self.x_axis = x_axis.map(str::to_string);
        self.y_axis = y_axis.map(str::to_string);
        self
    }
}

/// Picks a chart for a result set. The rules are checked in order and the
/// first one that applies decides.
pub fn recommend_chart(rows: &[Row], columns: &[String]) -> ChartRecommendation {
    if rows.is_empty() {
        return ChartRecommendation::new(ChartKind::Table, "No data to visualize");
    }

    let types = infer_types(rows, columns);
    let numeric = names_of(&types, ColumnKind::Numeric);
    let categorical = names_of(&types, ColumnKind::Categorical);
    let dates = names_of(&types, ColumnKind::Date);

    if !dates.is_empty() && !numeric.is_empty() {
        return ChartRecommendation::new(
            ChartKind::Line,
            "Time series data detected - line chart shows trends over time",
        )
        .with_axes(dates.first().copied(), numeric.first().copied());
    }

    if categorical.len() == 1 && !numeric.is_empty() {
        let recommendation = if rows.len() <= PIE_MAX_ROWS {
            ChartRecommendation::new(
                ChartKind::Pie,
                "Small categorical dataset - pie chart shows proportions",
            )
        } else {
            ChartRecommendation::new(
                ChartKind::Bar,
                "Categorical data - bar chart compares values across categories",
            )
        };
        return recommendation.with_axes(categorical.first().copied(), numeric.first().copied());
    }

    if numeric.len() >= 2 {
        return ChartRecommendation::new(
            ChartKind::Bar,
            "Multiple numeric values - bar chart compares metrics",
        )
        .with_axes(columns.first().map(String::as_str), numeric.first().copied());
    }

    let has_aggregation = columns
        .iter()
        .any(|column| AGGREGATION_PATTERN.is_match(column));
    if has_aggregation && !categorical.is_empty() {
        let y_axis = numeric
            .first()
            .copied()
            .or_else(|| columns.get(1).map(String::as_str));
        return ChartRecommendation::new(
            ChartKind::Bar,
            "Aggregated data - bar chart shows computed values by category",
        )
        .with_axes(categorical.first().copied(), y_axis);
    }

    if rows.len() > AREA_MIN_ROWS && !numeric.is_empty() {
        return ChartRecommendation::new(
            ChartKind::Area,
            "Large dataset - area chart shows overall trends",
        )
        .with_axes(columns.first().map(String::as_str), numeric.first().copied());
    }

    ChartRecommendation::new(
        ChartKind::Table,
        "Complex data structure - table view provides detailed information",
    )
}

fn names_of(types: &[ColumnTypeInfo], kind: ColumnKind) -> Vec<&str> {
    types
        .iter()
        .filter(|info| info.kind == kind)
        .map(|info| info.name.as_str())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn columns(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    fn table(names: &[&str], data: Vec<Vec<Value>>) -> Vec<Row> {
        data.into_iter()
            .map(|cells| {
                names
                    .iter()
                    .map(|name| name.to_string())
                    .zip(cells)
                    .collect::<Row>()
            })
            .collect()
    }

    fn category_rows(count: usize) -> Vec<Row> {
        let data = (0..count)
            .map(|i| vec![json!(format!("region-{}", i)), json!(i * 10)])
            .collect();
        table(&["region", "revenue"], data)
    }

    #[test]
    fn empty_results_get_a_table() {
        let recommendation = recommend_chart(&[], &[]);
        assert_eq!(recommendation.kind, ChartKind::Table);
        assert_eq!(recommendation.reason, "No data to visualize");
    }

    #[test]
    fn dates_and_numbers_make_a_line() {
        for count in [1, 5, 50] {
            let data = (0..count)
                .map(|i| vec![json!(format!("2024-01-{:02}", i % 28 + 1)), json!(i)])
                .collect();
            let rows = table(&["sale_date", "revenue"], data);
            let recommendation = recommend_chart(&rows, &columns(&["sale_date", "revenue"]));
            assert_eq!(recommendation.kind, ChartKind::Line);
            assert_eq!(recommendation.x_axis.as_deref(), Some("sale_date"));
            assert_eq!(recommendation.y_axis.as_deref(), Some("revenue"));
        }
    }

    #[test]
    fn pie_up_to_seven_rows_then_bar() {
        let names = columns(&["region", "revenue"]);
        assert_eq!(recommend_chart(&category_rows(7), &names).kind, ChartKind::Pie);
        assert_eq!(recommend_chart(&category_rows(8), &names).kind, ChartKind::Bar);
    }

    #[test]
    fn several_numeric_columns_make_a_bar() {
        let rows = table(
            &["id", "price", "stock"],
            vec![vec![json!(1), json!(9.5), json!(3)], vec![json!(2), json!(4.0), json!(8)]],
        );
        let recommendation = recommend_chart(&rows, &columns(&["id", "price", "stock"]));
        assert_eq!(recommendation.kind, ChartKind::Bar);
        assert_eq!(recommendation.x_axis.as_deref(), Some("id"));
        assert_eq!(recommendation.y_axis.as_deref(), Some("id"));
    }

    #[test]
    fn aggregates_by_category_make_a_bar() {
        // Two categorical columns skip the pie/bar rule; the aggregate name decides.
        let rows = table(
            &["region", "status", "order_count"],
            vec![
                vec![json!("North"), json!("open"), json!(4)],
                vec![json!("South"), json!("closed"), json!(6)],
            ],
        );
        let recommendation =
            recommend_chart(&rows, &columns(&["region", "status", "order_count"]));
        assert_eq!(recommendation.kind, ChartKind::Bar);
        assert_eq!(recommendation.x_axis.as_deref(), Some("region"));
        assert_eq!(recommendation.y_axis.as_deref(), Some("order_count"));
    }

    #[test]
    fn long_single_numeric_results_make_an_area() {
        let data = (0..21).map(|i| vec![json!(i)]).collect();
        let rows = table(&["score"], data);
        let recommendation = recommend_chart(&rows, &columns(&["score"]));
        assert_eq!(recommendation.kind, ChartKind::Area);
        assert_eq!(recommendation.x_axis.as_deref(), Some("score"));
    }

    #[test]
    fn anything_else_is_a_table() {
        let rows = table(&["name"], vec![vec![json!("Widget")], vec![json!("Gadget")]]);
        let recommendation = recommend_chart(&rows, &columns(&["name"]));
        assert_eq!(recommendation.kind, ChartKind::Table);
        assert!(!recommendation.reason.is_empty());
    }

    #[test]
    fn serializes_with_boundary_names() {
        let chart = recommend_chart(&category_rows(3), &columns(&["region", "revenue"]));
        let value = serde_json::to_value(chart).unwrap();
        assert_eq!(value["type"], "pie");
        assert_eq!(value["xAxis"], "region");
        assert_eq!(value["yAxis"], "revenue");
    }
}
