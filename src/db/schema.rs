use duckdb::Connection;

use super::executor::ExecutionError;

const COLUMNS_QUERY: &str = "
    SELECT table_schema, table_name, column_name, data_type, is_nullable
    FROM information_schema.columns
    WHERE table_schema NOT IN ('information_schema', 'pg_catalog')
    ORDER BY table_schema, table_name, ordinal_position
";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDefinition {
    pub table_schema: String,
    pub table_name: String,
    pub column_name: String,
    pub data_type: String,
    pub nullable: bool,
}

/// Reads column metadata for every user table and renders it as DDL.
pub fn load_ddl(conn: &Connection) -> Result<String, ExecutionError> {
    let mut stmt = conn.prepare(COLUMNS_QUERY)?;
    let columns = stmt
        .query_map([], |row| {
            Ok(ColumnDefinition {
                table_schema: row.get(0)?,
                table_name: row.get(1)?,
                column_name: row.get(2)?,
                data_type: row.get(3)?,
                nullable: row.get::<_, String>(4)? == "YES",
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(render_ddl(&columns))
}

/// One `CREATE TABLE` per table, in input order. Tables in `main` are left
/// unqualified; other schemas are prefixed.
pub fn render_ddl(columns: &[ColumnDefinition]) -> String {
    let mut statements: Vec<String> = Vec::new();
    let mut current: Option<(&str, &str)> = None;
    let mut definitions: Vec<String> = Vec::new();

    for column in columns {
        let key = (column.table_schema.as_str(), column.table_name.as_str());
        if current != Some(key) {
            if let Some((schema, table)) = current {
                statements.push(create_table(schema, table, &definitions));
                definitions.clear();
            }
            current = Some(key);
        }

        let null_str = if column.nullable { "" } else { " NOT NULL" };
        definitions.push(format!(
            "    \"{}\" {}{}",
            column.column_name, column.data_type, null_str
        ));
    }

    if let Some((schema, table)) = current {
        statements.push(create_table(schema, table, &definitions));
    }

    statements.join("\n\n")
}

fn create_table(schema: &str, table: &str, definitions: &[String]) -> String {
    let name = if schema == "main" {
        format!("\"{}\"", table)
    } else {
        format!("\"{}\".\"{}\"", schema, table)
    };
    format!("CREATE TABLE {} (\n{}\n);", name, definitions.join(",\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column(
        schema: &str,
        table: &str,
        name: &str,
        data_type: &str,
        nullable: bool,
    ) -> ColumnDefinition {
        ColumnDefinition {
            table_schema: schema.to_string(),
            table_name: table.to_string(),
            column_name: name.to_string(),
            data_type: data_type.to_string(),
            nullable,
        }
    }

    #[test]
    fn groups_columns_by_table() {
        let ddl = render_ddl(&[
            column("main", "orders", "id", "INTEGER", false),
            column("main", "orders", "total_amount", "DECIMAL(10,2)", true),
            column("sales", "regions", "name", "VARCHAR", true),
        ]);

        assert_eq!(
            ddl,
            "CREATE TABLE \"orders\" (\n    \"id\" INTEGER NOT NULL,\n    \
             \"total_amount\" DECIMAL(10,2)\n);\n\n\
             CREATE TABLE \"sales\".\"regions\" (\n    \"name\" VARCHAR\n);"
        );
    }

    #[test]
    fn no_tables_is_empty() {
        assert_eq!(render_ddl(&[]), "");
    }
}
