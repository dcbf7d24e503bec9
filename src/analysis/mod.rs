//! Result analysis: column typing, chart recommendation, insights and
//! follow-up questions for a tabular query result.
//!
//! Every function here is pure and infallible. Empty or oddly shaped results
//! degrade to a table recommendation and a single summary insight.

pub mod chart;
pub mod column_types;
pub mod insights;
mod values;

use serde::{Deserialize, Serialize};

pub use chart::{recommend_chart, ChartKind, ChartRecommendation};
pub use column_types::{infer_column, infer_types, ColumnKind, ColumnTypeInfo};
pub use insights::{
    find_outliers, generate_follow_up_questions, generate_insights, Confidence, Insight,
    InsightKind,
};

/// One result row keyed by column name.
pub type Row = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub chart: ChartRecommendation,
    pub insights: Vec<Insight>,
    pub follow_up_questions: Vec<String>,
}

pub fn analyze(rows: &[Row], columns: &[String], question: &str) -> AnalysisReport {
    AnalysisReport {
        chart: recommend_chart(rows, columns),
        insights: generate_insights(rows, columns, question),
        follow_up_questions: generate_follow_up_questions(rows, columns, question),
    }
}
