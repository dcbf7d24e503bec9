use tracing::debug;

use super::models::SqlRequest;

const SQL_KEYWORDS: [&str; 8] = [
    "SELECT", "WITH", "INSERT", "UPDATE", "DELETE", "CREATE", "ALTER", "DROP",
];

/// Prompt for a read-only DuckDB query. Ends inside an open ```sql fence so
/// completion models answer with bare SQL.
pub fn build_prompt(request: &SqlRequest) -> String {
    let mut prompt = format!(
        r#"
### Instructions:
Your task is to convert a question into a SQL query for DuckDB, given a database schema.
Adhere to these rules:
- **Only write a single read-only SELECT statement.** Common table expressions (`WITH ... SELECT`) are allowed.
- **Never modify data or schema**: no INSERT, UPDATE, DELETE, DROP, CREATE, ALTER, TRUNCATE, GRANT, REVOKE, EXEC or EXECUTE.
- **Be careful with column names - they are case sensitive**
- **Use the exact spelling of column names as provided in the schema**
- **Deliberately go through the question and database schema word by word** to appropriately answer the question
- **Use Table Aliases** to prevent ambiguity. For example, `SELECT table1.col1, table2.col1 FROM table1 JOIN table2 ON table1.id = table2.id`.
- When creating a ratio, always cast the numerator as float

### Input:
Generate a SQL query that answers the question `{}`.
This query will run on a DuckDB database with the following tables and columns:

{}
"#,
        request.question, request.schema
    );

    if let Some(feedback) = &request.feedback {
        prompt.push_str(&format!(
            r#"
### Previous attempt:
This query was tried and failed:
```sql
{}
```
Error: {}
Hints: {}
Write a corrected query that avoids this error.
"#,
            feedback.sql, feedback.error, feedback.suggestion
        ));
    }

    prompt.push_str(&format!(
        r#"
### Response:
Based on your instructions, here is the SQL query I have generated to answer the question `{}`:
```sql
"#,
        request.question
    ));

    debug!("Prepared LLM prompt: {}", prompt);
    prompt
}

/// Pulls the SQL out of a model reply: a ```sql block, a plain fenced block,
/// text before a lone closing fence, or the first line that starts with a
/// SQL keyword up to its semicolon.
pub fn extract_sql(content: &str) -> String {
    let lowered = content.to_ascii_lowercase();
    if let Some(start) = lowered.find("```sql") {
        let body = &content[start + 6..];
        let end = body.find("```").unwrap_or(body.len());
        debug!("Extracted SQL using code block markers");
        return body[..end].trim().to_string();
    }

    if let Some(start) = content.find("```") {
        let body = &content[start + 3..];
        if let Some(end) = body.find("```") {
            debug!("Extracted SQL using simple code block markers");
            return body[..end].trim().to_string();
        }

        // The prompt opened the fence, so the reply may only close it.
        let before = content[..start].trim();
        if !before.is_empty() {
            return before.to_string();
        }
    }

    let lines: Vec<&str> = content.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim().to_uppercase();
        if !SQL_KEYWORDS.iter().any(|kw| trimmed.starts_with(kw)) {
            continue;
        }

        let mut sql = line.trim().to_string();
        if !sql.ends_with(';') {
            for next_line in lines[i + 1..].iter().map(|l| l.trim()) {
                if next_line.starts_with("```") {
                    break;
                }
                sql.push(' ');
                sql.push_str(next_line);
                if next_line.ends_with(';') {
                    break;
                }
            }
        }

        debug!("Extracted SQL using line scanning");
        return sql.trim().to_string();
    }

    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::models::AttemptFeedback;

    #[test]
    fn prompt_carries_question_and_schema() {
        let prompt = build_prompt(&SqlRequest::new(
            "How many orders?",
            "CREATE TABLE \"orders\" (\n    \"id\" INTEGER\n);",
        ));
        assert!(prompt.contains("`How many orders?`"));
        assert!(prompt.contains("CREATE TABLE \"orders\""));
        assert!(prompt.contains("read-only SELECT"));
        assert!(!prompt.contains("### Previous attempt"));
        assert!(prompt.trim_end().ends_with("```sql"));
    }

    #[test]
    fn prompt_includes_previous_failure() {
        let request = SqlRequest::new("How many orders?", "").with_feedback(AttemptFeedback {
            sql: "SELECT COUNT(*) FROM order".to_string(),
            error: "Table with name order does not exist!".to_string(),
            suggestion: "Check that the table name is spelled correctly.".to_string(),
        });
        let prompt = build_prompt(&request);
        assert!(prompt.contains("SELECT COUNT(*) FROM order"));
        assert!(prompt.contains("Error: Table with name order does not exist!"));
        assert!(prompt.contains("Hints: Check that the table name"));
    }

    #[test]
    fn extracts_sql_fence() {
        let reply = "Here you go:\n```SQL\nSELECT id FROM users;\n```\nEnjoy.";
        assert_eq!(extract_sql(reply), "SELECT id FROM users;");
    }

    #[test]
    fn extracts_unclosed_sql_fence() {
        assert_eq!(extract_sql("```sql\nSELECT 1;"), "SELECT 1;");
    }

    #[test]
    fn extracts_plain_fence() {
        assert_eq!(extract_sql("```\nSELECT 2\n```"), "SELECT 2");
    }

    #[test]
    fn extracts_text_before_closing_fence() {
        assert_eq!(
            extract_sql("select count(*) from orders;\n```"),
            "select count(*) from orders;"
        );
    }

    #[test]
    fn scans_lines_for_statements() {
        let reply = "The query is:\nSELECT name\nFROM users\nWHERE id = 1;\nThis returns names.";
        assert_eq!(extract_sql(reply), "SELECT name FROM users WHERE id = 1;");
    }

    #[test]
    fn falls_back_to_whole_reply() {
        assert_eq!(extract_sql("  I cannot answer that.  "), "I cannot answer that.");
    }
}
