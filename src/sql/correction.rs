use regex::Regex;
use std::sync::LazyLock;

static JOIN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)\bjoin\b").unwrap());
static UNCONDITIONED_JOIN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(cross|natural)\s+join\b").unwrap());
static JOIN_CONDITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(on|using)\b").unwrap());

const GENERIC_TIPS: [&str; 3] = [
    "Review the SQL syntax",
    "Check table and column names against the schema",
    "Ensure proper use of quotes for string literals",
];

/// Advisory tips for a query that failed against the live database.
///
/// Matches well-known fragments of the execution error (and a JOIN without a
/// condition in the query) and never retries anything itself.
pub fn suggest_correction(query: &str, error_message: &str) -> String {
    let error = error_message.to_lowercase();
    let mut tips: Vec<&str> = Vec::new();

    if error.contains("syntax error") {
        tips.push("Check for missing commas, parentheses, or quotes");
    }

    if is_missing_table(&error) {
        tips.push("Verify the table name exists in the schema");
        tips.push("Use the schema tool to see available tables");
    }

    if is_missing_column(&error) {
        tips.push("Check if the column name is spelled correctly");
        tips.push("Use the schema tool to see available columns");
    }

    if error.contains("ambiguous") {
        tips.push("Use table aliases to disambiguate column names (e.g., t1.id, t2.id)");
    }

    if has_join_without_condition(query) {
        tips.push("Add an ON clause to your JOIN statement");
    }

    if tips.is_empty() {
        tips.extend(GENERIC_TIPS);
    }

    tips.join(". ") + "."
}

fn is_missing_table(error: &str) -> bool {
    error.contains("no such table")
        || ((error.contains("table") || error.contains("relation"))
            && (error.contains("does not exist") || error.contains("not found")))
}

fn is_missing_column(error: &str) -> bool {
    error.contains("no such column")
        || error.contains("referenced column")
        || (error.contains("column") && error.contains("does not exist"))
}

fn has_join_without_condition(query: &str) -> bool {
    let joins = JOIN.find_iter(query).count();
    let unconditioned = UNCONDITIONED_JOIN.find_iter(query).count();
    let conditions = JOIN_CONDITION.find_iter(query).count();
    joins > unconditioned + conditions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors() {
        assert_eq!(
            suggest_correction("SELECT", "near \"FROM\": syntax error"),
            "Check for missing commas, parentheses, or quotes."
        );
    }

    #[test]
    fn missing_tables_across_engines() {
        for message in [
            "no such table: prodcts",
            "Catalog Error: Table with name prodcts does not exist!",
            "relation \"prodcts\" does not exist",
        ] {
            let tips = suggest_correction("SELECT * FROM prodcts", message);
            assert!(tips.contains("Verify the table name exists"), "{}", message);
        }
    }

    #[test]
    fn missing_columns_across_engines() {
        for message in [
            "no such column: nme",
            "Binder Error: Referenced column \"nme\" not found in FROM clause!",
            "column \"nme\" does not exist",
        ] {
            let tips = suggest_correction("SELECT nme FROM products", message);
            assert!(tips.contains("column name is spelled correctly"), "{}", message);
        }
    }

    #[test]
    fn ambiguous_references() {
        let tips = suggest_correction(
            "SELECT id FROM a JOIN b ON a.id = b.id",
            "ambiguous column name: id",
        );
        assert_eq!(
            tips,
            "Use table aliases to disambiguate column names (e.g., t1.id, t2.id)."
        );
    }

    #[test]
    fn join_without_condition() {
        let tips = suggest_correction("SELECT * FROM sales JOIN products", "some failure");
        assert_eq!(tips, "Add an ON clause to your JOIN statement.");

        let tips = suggest_correction("SELECT * FROM sales CROSS JOIN products", "some failure");
        assert!(!tips.contains("ON clause"));
    }

    #[test]
    fn combines_tips_in_detection_order() {
        let tips = suggest_correction("SELECT x FROM t", "syntax error; no such column: x");
        assert_eq!(
            tips,
            "Check for missing commas, parentheses, or quotes. \
             Check if the column name is spelled correctly. \
             Use the schema tool to see available columns."
        );
    }

    #[test]
    fn falls_back_to_generic_tips() {
        assert_eq!(
            suggest_correction("SELECT 1", "disk I/O error"),
            "Review the SQL syntax. Check table and column names against the schema. \
             Ensure proper use of quotes for string literals."
        );
    }
}
