use crate::selection::OrderByExpression;

const ALL_COLUMNS: &str = "*";

fn expand_star<'a>(select: &'a [String], all_columns: &'a [String]) -> Vec<&'a str> {
    let mut out = Vec::new();
    for expression in select {
        if expression == ALL_COLUMNS {
            let mut physical: Vec<&str> = all_columns
                .iter()
                .map(String::as_str)
                .filter(|name| !name.starts_with('$'))
                .collect();
            physical.sort_unstable();
            out.extend(physical);
        } else {
            out.push(expression.as_str());
        }
    }

    out
}

/// Expressions to fetch for a selection: order-by expressions first, then
/// the remaining selected ones, without duplicates. Order-by is ignored when
/// `limit` is zero.
#[must_use]
pub fn extract_expressions(
    select: &[String],
    order_by: &[OrderByExpression],
    limit: usize,
    all_columns: &[String],
) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let mut push = |expression: &str| {
        if !out.iter().any(|e| e == expression) {
            out.push(expression.to_string());
        }
    };

    if limit > 0 {
        for expression in order_by {
            push(&expression.expression);
        }
    }
    for expression in expand_star(select, all_columns) {
        push(expression);
    }

    out
}

/// Output column names in select order. Duplicates are kept.
#[must_use]
pub fn selection_columns(select: &[String], all_columns: &[String]) -> Vec<String> {
    expand_star(select, all_columns)
        .into_iter()
        .map(str::to_string)
        .collect()
}
