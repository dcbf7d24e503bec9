use sqlparser::ast::{
    Expr, Function, FunctionArg, FunctionArgExpr, GroupByExpr, Query, Select, SelectItem, SetExpr,
    Statement, TableFactor, TableWithJoins,
};
use tracing::debug;

use super::parser::{parse, SqlDialect};

pub const FALLBACK_EXPLANATION: &str = "Unable to parse query explanation.";
pub const NON_SELECT_EXPLANATION: &str = "This query performs a non-SELECT operation.";

/// Describes the first statement of `query` in one sentence.
///
/// Never fails: unparsable input yields [`FALLBACK_EXPLANATION`].
pub fn explain(query: &str, dialect: SqlDialect) -> String {
    let tree = match parse(query, dialect) {
        Ok(tree) => tree,
        Err(e) => {
            debug!("Could not parse query for explanation: {}", e);
            return FALLBACK_EXPLANATION.to_string();
        }
    };

    let Some(first) = tree.first() else {
        return FALLBACK_EXPLANATION.to_string();
    };
    if !first.is_select() {
        return NON_SELECT_EXPLANATION.to_string();
    }
    let Statement::Query(query) = first.statement() else {
        return NON_SELECT_EXPLANATION.to_string();
    };
    let Some(select) = leftmost_select(&query.body) else {
        return NON_SELECT_EXPLANATION.to_string();
    };

    describe(query, select)
}

fn describe(query: &Query, select: &Select) -> String {
    let mut parts = vec![describe_projection(&select.projection)];

    let tables = describe_relations(&select.from);
    if !tables.is_empty() {
        parts.push(format!("from {}", tables.join(", ")));
    }

    if select.selection.is_some() {
        parts.push("with filtering conditions".to_string());
    }

    let grouped = match &select.group_by {
        GroupByExpr::All => true,
        GroupByExpr::Expressions(exprs) => !exprs.is_empty(),
    };
    if grouped {
        parts.push("grouped by specific columns".to_string());
    }

    if !query.order_by.is_empty() {
        parts.push("sorted by specific columns".to_string());
    }

    if let Some(limit) = &query.limit {
        parts.push(format!("limited to {} rows", limit));
    }

    parts.join(", ") + "."
}

// For set operations the left-most branch is the one described.
fn leftmost_select(body: &SetExpr) -> Option<&Select> {
    match body {
        SetExpr::Select(select) => Some(select),
        SetExpr::Query(query) => leftmost_select(&query.body),
        SetExpr::SetOperation { left, .. } => leftmost_select(left),
        _ => None,
    }
}

fn describe_projection(projection: &[SelectItem]) -> String {
    if let [SelectItem::Wildcard(_)] = projection {
        return "Selecting all columns".to_string();
    }
    let items: Vec<String> = projection.iter().map(describe_item).collect();
    format!("Selecting: {}", items.join(", "))
}

fn describe_item(item: &SelectItem) -> String {
    match item {
        SelectItem::Wildcard(_) | SelectItem::QualifiedWildcard(..) => "all columns".to_string(),
        SelectItem::UnnamedExpr(expr) => describe_expr(expr),
        SelectItem::ExprWithAlias {
            expr: Expr::Function(function),
            alias,
        } => format!("{} as {}", describe_function(function), alias.value),
        SelectItem::ExprWithAlias { alias, .. } => alias.value.clone(),
    }
}

fn describe_expr(expr: &Expr) -> String {
    match expr {
        Expr::Function(function) => describe_function(function),
        Expr::Identifier(ident) => ident.value.clone(),
        Expr::CompoundIdentifier(idents) => idents
            .last()
            .map(|ident| ident.value.clone())
            .unwrap_or_else(|| expr.to_string()),
        other => other.to_string(),
    }
}

fn describe_function(function: &Function) -> String {
    let argument = function
        .args
        .first()
        .map(describe_argument)
        .unwrap_or_else(|| "*".to_string());
    format!("{}({})", function.name, argument)
}

fn describe_argument(arg: &FunctionArg) -> String {
    let arg = match arg {
        FunctionArg::Named { arg, .. } => arg,
        FunctionArg::Unnamed(arg) => arg,
    };
    match arg {
        FunctionArgExpr::Expr(expr) => describe_expr(expr),
        FunctionArgExpr::QualifiedWildcard(_) | FunctionArgExpr::Wildcard => "*".to_string(),
    }
}

fn describe_relations(from: &[TableWithJoins]) -> Vec<String> {
    from.iter()
        .flat_map(|table| {
            std::iter::once(&table.relation).chain(table.joins.iter().map(|join| &join.relation))
        })
        .map(describe_relation)
        .collect()
}

fn describe_relation(relation: &TableFactor) -> String {
    match relation {
        TableFactor::Table { name, .. } => name.to_string(),
        TableFactor::Derived {
            alias: Some(alias), ..
        } => alias.name.value.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn explain_generic(sql: &str) -> String {
        explain(sql, SqlDialect::Generic)
    }

    #[test]
    fn describes_wildcard_selects() {
        assert_eq!(
            explain_generic("SELECT * FROM products"),
            "Selecting all columns, from products."
        );
    }

    #[test]
    fn describes_every_clause() {
        let sql = "SELECT region, SUM(total_amount) AS revenue FROM sales \
                   WHERE quantity > 1 GROUP BY region ORDER BY revenue DESC LIMIT 5";
        assert_eq!(
            explain_generic(sql),
            "Selecting: region, SUM(total_amount) as revenue, from sales, \
             with filtering conditions, grouped by specific columns, \
             sorted by specific columns, limited to 5 rows."
        );
    }

    #[test]
    fn lists_joined_tables_and_qualified_columns() {
        let sql = "SELECT s.id, COUNT(*) FROM sales s JOIN products p ON s.product_id = p.id";
        assert_eq!(
            explain_generic(sql),
            "Selecting: id, COUNT(*), from sales, products."
        );
    }

    #[test]
    fn non_select_statements_get_a_fixed_sentence() {
        assert_eq!(explain_generic("COMMIT"), NON_SELECT_EXPLANATION);
    }

    #[test]
    fn unparsable_input_falls_back() {
        assert_eq!(explain_generic("this is not sql"), FALLBACK_EXPLANATION);
    }

    #[test]
    fn set_operations_describe_the_first_branch() {
        assert_eq!(
            explain_generic("SELECT id FROM a UNION SELECT id FROM b"),
            "Selecting: id, from a."
        );
    }
}
