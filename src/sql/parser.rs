use serde::{Deserialize, Serialize};
use sqlparser::ast::{Query, SetExpr, Statement};
use sqlparser::dialect::{
    Dialect, DuckDbDialect, GenericDialect, MySqlDialect, PostgreSqlDialect, SQLiteDialect,
};
use sqlparser::parser::Parser;
use sqlparser::tokenizer::{Token, Tokenizer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// SQL dialect the parser is configured for. Follows the connected database.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SqlDialect {
    Generic,
    #[default]
    DuckDb,
    Sqlite,
    Postgres,
    MySql,
}

impl SqlDialect {
    fn parser_dialect(&self) -> Box<dyn Dialect> {
        match self {
            SqlDialect::Generic => Box::new(GenericDialect {}),
            SqlDialect::DuckDb => Box::new(DuckDbDialect {}),
            SqlDialect::Sqlite => Box::new(SQLiteDialect {}),
            SqlDialect::Postgres => Box::new(PostgreSqlDialect {}),
            SqlDialect::MySql => Box::new(MySqlDialect {}),
        }
    }
}

impl FromStr for SqlDialect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "generic" => Ok(SqlDialect::Generic),
            "duckdb" => Ok(SqlDialect::DuckDb),
            "sqlite" => Ok(SqlDialect::Sqlite),
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" => Ok(SqlDialect::MySql),
            other => Err(format!("Unsupported SQL dialect: {}", other)),
        }
    }
}

/// Raised when the text is not valid SQL for the configured dialect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
}

/// Category tag of a parsed statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Ddl,
    Other,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatementKind::Select => "select",
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Delete => "delete",
            StatementKind::Ddl => "ddl",
            StatementKind::Other => "other",
        };
        f.write_str(name)
    }
}

/// One statement of a [`SyntaxTree`] together with its kind tag.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    kind: StatementKind,
    statement: Statement,
}

impl ParsedStatement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    pub fn is_select(&self) -> bool {
        self.kind == StatementKind::Select
    }

    pub fn statement(&self) -> &Statement {
        &self.statement
    }
}

/// Parsed form of a piece of SQL text, statements kept in source order.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    statements: Vec<ParsedStatement>,
}

impl SyntaxTree {
    pub fn statements(&self) -> &[ParsedStatement] {
        &self.statements
    }

    pub fn first(&self) -> Option<&ParsedStatement> {
        self.statements.first()
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// Re-serializes every statement from the tree, joined with `"; "`.
    pub fn to_sql(&self) -> String {
        self.statements
            .iter()
            .map(|parsed| parsed.statement.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Parses `text` into a syntax tree. Performs no semantic checks.
pub fn parse(text: &str, dialect: SqlDialect) -> Result<SyntaxTree, ParseError> {
    let parser_dialect = dialect.parser_dialect();
    let statements = Parser::parse_sql(parser_dialect.as_ref(), text).map_err(|e| ParseError {
        message: e.to_string(),
    })?;

    if statements.is_empty() {
        return Err(ParseError {
            message: "no SQL statement found".to_string(),
        });
    }

    let statements = statements
        .into_iter()
        .map(|statement| ParsedStatement {
            kind: classify(&statement),
            statement,
        })
        .collect();

    Ok(SyntaxTree { statements })
}

/// True when `rewritten` keeps every literal and square bracket of `source`.
///
/// Some dialects parse trailing subscripts such as `f(x)[1]` and then drop
/// them when the tree is printed, which silently changes the query.
pub fn is_faithful_rewrite(source: &str, rewritten: &str, dialect: SqlDialect) -> bool {
    match (
        significant_tokens(source, dialect),
        significant_tokens(rewritten, dialect),
    ) {
        (Some(before), Some(after)) => before == after,
        _ => false,
    }
}

fn significant_tokens(text: &str, dialect: SqlDialect) -> Option<Vec<String>> {
    let parser_dialect = dialect.parser_dialect();
    let tokens = Tokenizer::new(parser_dialect.as_ref(), text).tokenize().ok()?;

    let mut significant: Vec<String> = tokens
        .into_iter()
        .filter_map(|token| match token {
            Token::Number(number, _) => Some(number),
            Token::SingleQuotedString(text) => Some(format!("'{}'", text)),
            Token::LBracket => Some("[".to_string()),
            Token::RBracket => Some("]".to_string()),
            _ => None,
        })
        .collect();
    significant.sort();
    Some(significant)
}

/// Tags a statement with its kind.
///
/// A query only counts as a select when every body it is built from, including
/// CTE definitions and both sides of set operations, is a plain `SELECT` that
/// writes nowhere (`SELECT ... INTO` creates a table and is tagged DDL). Other
/// bodies such as `VALUES` are tagged other.
pub fn classify(statement: &Statement) -> StatementKind {
    match statement {
        Statement::Query(query) => classify_query(query),
        Statement::Insert { .. } => StatementKind::Insert,
        Statement::Update { .. } => StatementKind::Update,
        Statement::Delete { .. } => StatementKind::Delete,
        Statement::CreateTable { .. }
        | Statement::CreateView { .. }
        | Statement::CreateSchema { .. }
        | Statement::CreateDatabase { .. }
        | Statement::AlterTable { .. }
        | Statement::Drop { .. }
        | Statement::Truncate { .. } => StatementKind::Ddl,
        _ => StatementKind::Other,
    }
}

fn classify_query(query: &Query) -> StatementKind {
    if let Some(with) = &query.with {
        for cte in &with.cte_tables {
            let kind = classify_query(&cte.query);
            if kind != StatementKind::Select {
                return kind;
            }
        }
    }
    classify_body(&query.body)
}

fn classify_body(body: &SetExpr) -> StatementKind {
    match body {
        SetExpr::Select(select) if select.into.is_some() => StatementKind::Ddl,
        SetExpr::Select(_) => StatementKind::Select,
        SetExpr::Query(query) => classify_query(query),
        SetExpr::SetOperation { left, right, .. } => match classify_body(left) {
            StatementKind::Select => classify_body(right),
            other => other,
        },
        SetExpr::Insert(_) => StatementKind::Insert,
        _ => StatementKind::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(sql: &str) -> Vec<StatementKind> {
        parse(sql, SqlDialect::Generic)
            .unwrap()
            .statements()
            .iter()
            .map(ParsedStatement::kind)
            .collect()
    }

    #[test]
    fn tags_each_statement_in_source_order() {
        assert_eq!(
            kinds("SELECT 1; INSERT INTO t VALUES (1); DELETE FROM t"),
            vec![
                StatementKind::Select,
                StatementKind::Insert,
                StatementKind::Delete
            ]
        );
    }

    #[test]
    fn tags_ddl_statements() {
        assert_eq!(kinds("DROP TABLE t"), vec![StatementKind::Ddl]);
        assert_eq!(kinds("CREATE TABLE t (id INT)"), vec![StatementKind::Ddl]);
        assert_eq!(kinds("ALTER TABLE t ADD COLUMN x INT"), vec![StatementKind::Ddl]);
    }

    #[test]
    fn select_into_is_not_a_read() {
        assert_eq!(kinds("SELECT * INTO archive FROM sales"), vec![StatementKind::Ddl]);
    }

    #[test]
    fn set_operations_and_ctes_stay_select() {
        assert_eq!(
            kinds("WITH r AS (SELECT id FROM a) SELECT id FROM r UNION SELECT id FROM b"),
            vec![StatementKind::Select]
        );
    }

    #[test]
    fn transaction_control_is_other() {
        assert_eq!(kinds("COMMIT"), vec![StatementKind::Other]);
    }

    #[test]
    fn values_bodies_are_other() {
        assert_eq!(kinds("VALUES (1), (2)"), vec![StatementKind::Other]);
    }

    #[test]
    fn faithful_rewrites_keep_literals_and_brackets() {
        assert!(is_faithful_rewrite(
            "select 'a''b', 1.5 from t where x = -2",
            "SELECT 'a''b', 1.5 FROM t WHERE x = -2",
            SqlDialect::Generic
        ));
        assert!(!is_faithful_rewrite(
            "SELECT f(x)[1]",
            "SELECT f(x)",
            SqlDialect::DuckDb
        ));
        assert!(!is_faithful_rewrite("SELECT 1", "SELECT 2", SqlDialect::Generic));
    }

    #[test]
    fn rejects_invalid_sql() {
        let err = parse("SELEC * FRM t", SqlDialect::Generic).unwrap_err();
        assert!(!err.message.is_empty());
    }

    #[test]
    fn rejects_text_without_statements() {
        assert!(parse(";", SqlDialect::Generic).is_err());
    }

    #[test]
    fn dialect_names_parse() {
        assert_eq!("DuckDB".parse::<SqlDialect>(), Ok(SqlDialect::DuckDb));
        assert_eq!("postgresql".parse::<SqlDialect>(), Ok(SqlDialect::Postgres));
        assert!("oracle".parse::<SqlDialect>().is_err());
    }
}
