//! Bounded in-memory audit log of answered questions and executed queries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryStatus {
    Success,
    /// Stopped by the SQL gateway before execution.
    Rejected,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHistoryItem {
    pub prompt: String,
    pub sql_query: String,
    pub result_count: usize,
    pub execution_time_ms: u64,
    pub status: QueryStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl QueryHistoryItem {
    pub fn success(
        prompt: &str,
        sql_query: &str,
        result_count: usize,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            prompt: prompt.to_string(),
            sql_query: sql_query.to_string(),
            result_count,
            execution_time_ms,
            status: QueryStatus::Success,
            error_message: None,
            created_at: Utc::now(),
        }
    }

    /// `execution_time_ms` is the time spent on the attempt before it failed.
    pub fn failure(
        prompt: &str,
        sql_query: &str,
        status: QueryStatus,
        error_message: &str,
        execution_time_ms: u64,
    ) -> Self {
        Self {
            prompt: prompt.to_string(),
            sql_query: sql_query.to_string(),
            result_count: 0,
            execution_time_ms,
            status,
            error_message: Some(error_message.to_string()),
            created_at: Utc::now(),
        }
    }
}

const MAX_ERROR_GROUPS: usize = 10;
const MAX_HOURS: usize = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorCount {
    pub error: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyCount {
    pub hour: String,
    pub count: usize,
}

/// Usage metrics over the entries currently held by a [`QueryHistory`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total_queries: usize,
    pub successful_queries: usize,
    /// Percentage of entries that did not succeed.
    pub error_rate: f64,
    /// Rounded mean over successful entries, in milliseconds.
    pub avg_execution_time: u64,
    pub total_rows_returned: usize,
    pub error_breakdown: Vec<ErrorCount>,
    pub queries_over_time: Vec<HourlyCount>,
}

impl HistoryStats {
    fn from_items<'a>(items: impl IntoIterator<Item = &'a QueryHistoryItem>) -> Self {
        let mut total_queries = 0;
        let mut successful_queries = 0;
        let mut total_time_ms = 0u64;
        let mut total_rows_returned = 0;
        let mut errors: HashMap<&str, usize> = HashMap::new();
        let mut hours: BTreeMap<String, usize> = BTreeMap::new();

        for item in items {
            total_queries += 1;
            *hours
                .entry(item.created_at.format("%Y-%m-%d %H:00:00").to_string())
                .or_default() += 1;

            if item.status == QueryStatus::Success {
                successful_queries += 1;
                total_time_ms += item.execution_time_ms;
                total_rows_returned += item.result_count;
            } else {
                let message = item.error_message.as_deref().unwrap_or("Unknown error");
                *errors.entry(message).or_default() += 1;
            }
        }

        let error_rate = if total_queries > 0 {
            (total_queries - successful_queries) as f64 / total_queries as f64 * 100.0
        } else {
            0.0
        };
        let avg_execution_time = if successful_queries > 0 {
            (total_time_ms as f64 / successful_queries as f64).round() as u64
        } else {
            0
        };

        let mut error_breakdown: Vec<ErrorCount> = errors
            .into_iter()
            .map(|(error, count)| ErrorCount {
                error: error.to_string(),
                count,
            })
            .collect();
        error_breakdown.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.error.cmp(&b.error)));
        error_breakdown.truncate(MAX_ERROR_GROUPS);

        let skip = hours.len().saturating_sub(MAX_HOURS);
        let queries_over_time = hours
            .into_iter()
            .skip(skip)
            .map(|(hour, count)| HourlyCount { hour, count })
            .collect();

        Self {
            total_queries,
            successful_queries,
            error_rate,
            avg_execution_time,
            total_rows_returned,
            error_breakdown,
            queries_over_time,
        }
    }
}

/// Newest entries first. The oldest entry is dropped once `capacity` is reached.
pub struct QueryHistory {
    capacity: usize,
    items: RwLock<VecDeque<QueryHistoryItem>>,
}

impl QueryHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            items: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub async fn record(&self, item: QueryHistoryItem) {
        if self.capacity == 0 {
            return;
        }
        let mut items = self.items.write().await;
        if items.len() == self.capacity {
            items.pop_back();
        }
        items.push_front(item);
    }

    pub async fn recent(&self, limit: usize) -> Vec<QueryHistoryItem> {
        self.items.read().await.iter().take(limit).cloned().collect()
    }

    pub async fn stats(&self) -> HistoryStats {
        HistoryStats::from_items(self.items.read().await.iter())
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn keeps_newest_first_within_capacity() {
        let history = QueryHistory::new(2);
        for prompt in ["first", "second", "third"] {
            history
                .record(QueryHistoryItem::success(prompt, "SELECT 1", 1, 3))
                .await;
        }

        let items = history.recent(10).await;
        let prompts: Vec<&str> = items.iter().map(|item| item.prompt.as_str()).collect();
        assert_eq!(prompts, vec!["third", "second"]);
        assert_eq!(history.len().await, 2);
    }

    #[tokio::test]
    async fn limits_recent_entries() {
        let history = QueryHistory::new(50);
        for i in 0..5 {
            history
                .record(QueryHistoryItem::success(&format!("q{}", i), "SELECT 1", i, 1))
                .await;
        }
        assert_eq!(history.recent(3).await.len(), 3);
    }

    #[tokio::test]
    async fn failures_serialize_with_message() {
        let history = QueryHistory::new(5);
        history
            .record(QueryHistoryItem::failure(
                "drop everything",
                "DROP TABLE users",
                QueryStatus::Rejected,
                "Forbidden operation detected: DROP. Only SELECT queries are allowed.",
                2,
            ))
            .await;

        let value = serde_json::to_value(&history.recent(1).await[0]).unwrap();
        assert_eq!(value["status"], "rejected");
        assert_eq!(value["sqlQuery"], "DROP TABLE users");
        assert!(value["errorMessage"].as_str().unwrap().starts_with("Forbidden"));
        assert!(value["createdAt"].is_string());
        assert_eq!(value["executionTimeMs"], 2);
    }

    fn at(mut item: QueryHistoryItem, timestamp: &str) -> QueryHistoryItem {
        item.created_at = timestamp.parse().unwrap();
        item
    }

    #[tokio::test]
    async fn stats_summarise_the_log() {
        let history = QueryHistory::new(10);
        let items = [
            at(QueryHistoryItem::success("a", "SELECT 1", 3, 10), "2024-05-01T09:15:00Z"),
            at(QueryHistoryItem::success("b", "SELECT 2", 5, 15), "2024-05-01T09:45:00Z"),
            at(
                QueryHistoryItem::failure("c", "SELECT x", QueryStatus::Error, "no column x", 7),
                "2024-05-01T10:05:00Z",
            ),
            at(
                QueryHistoryItem::failure("d", "DROP t", QueryStatus::Rejected, "forbidden", 1),
                "2024-05-01T10:10:00Z",
            ),
            at(
                QueryHistoryItem::failure("e", "SELECT y", QueryStatus::Error, "no column x", 4),
                "2024-05-01T11:00:00Z",
            ),
        ];
        for item in items {
            history.record(item).await;
        }

        let stats = history.stats().await;
        assert_eq!(stats.total_queries, 5);
        assert_eq!(stats.successful_queries, 2);
        assert_eq!(stats.error_rate, 60.0);
        assert_eq!(stats.avg_execution_time, 13);
        assert_eq!(stats.total_rows_returned, 8);
        assert_eq!(
            stats.error_breakdown,
            vec![
                ErrorCount {
                    error: "no column x".to_string(),
                    count: 2
                },
                ErrorCount {
                    error: "forbidden".to_string(),
                    count: 1
                },
            ]
        );
        let hours: Vec<(&str, usize)> = stats
            .queries_over_time
            .iter()
            .map(|bucket| (bucket.hour.as_str(), bucket.count))
            .collect();
        assert_eq!(
            hours,
            vec![
                ("2024-05-01 09:00:00", 2),
                ("2024-05-01 10:00:00", 2),
                ("2024-05-01 11:00:00", 1)
            ]
        );
    }

    #[tokio::test]
    async fn stats_of_an_empty_log_are_zero() {
        let stats = QueryHistory::new(5).stats().await;
        assert_eq!(stats.total_queries, 0);
        assert_eq!(stats.error_rate, 0.0);
        assert_eq!(stats.avg_execution_time, 0);
        assert!(stats.error_breakdown.is_empty());
        assert!(stats.queries_over_time.is_empty());
    }

    #[tokio::test]
    async fn stats_keep_the_latest_hours() {
        let history = QueryHistory::new(50);
        for hour in 0..26 {
            let timestamp = format!("2024-05-{:02}T{:02}:30:00Z", 1 + hour / 24, hour % 24);
            history
                .record(at(QueryHistoryItem::success("q", "SELECT 1", 1, 1), &timestamp))
                .await;
        }

        let stats = history.stats().await;
        assert_eq!(stats.queries_over_time.len(), 24);
        assert_eq!(stats.queries_over_time[0].hour, "2024-05-01 02:00:00");
        assert_eq!(stats.queries_over_time[23].hour, "2024-05-02 01:00:00");
    }
}
