//! SQL generation for SQLite.
//!
//! Every identifier is double-quoted and every value is bound as a `?`
//! parameter; nothing from a request is spliced into SQL text.

use serde::Serialize;
use std::fmt;

use crate::filter::{Filter, FilterValue};
use crate::plan::{EagerLoad, ExistsClause, QueryPlan};
use crate::schema::{DELETED_AT, EntitySchema};
use crate::traits::Row;

/// Helper column carrying the per-parent position of a related row.
pub const RANK_COLUMN: &str = "__quarry_rank";

const RANKED_ALIAS: &str = "__quarry_ranked";

/// A rendered statement with its bound parameters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// SQL text with `?` placeholders.
    pub sql: String,
    /// Parameters, in placeholder order.
    pub params: Vec<FilterValue>,
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Quote an identifier, doubling embedded quotes.
///
/// Dotted names are quoted per segment, so `users.id` becomes
/// `"users"."id"`.
pub fn quote_ident(name: &str) -> String {
    name.split('.')
        .map(escape_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

fn escape_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// A SQL builder for constructing statements.
#[derive(Debug, Clone, Default)]
pub(crate) struct SqlBuilder {
    sql: String,
    params: Vec<FilterValue>,
}

impl SqlBuilder {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Push a literal SQL string.
    pub(crate) fn push(&mut self, sql: &str) -> &mut Self {
        self.sql.push_str(sql);
        self
    }

    /// Push a placeholder and bind its value.
    pub(crate) fn push_param(&mut self, value: FilterValue) -> &mut Self {
        self.sql.push('?');
        self.params.push(value);
        self
    }

    /// Push a quoted identifier.
    pub(crate) fn push_ident(&mut self, name: &str) -> &mut Self {
        self.sql.push_str(&quote_ident(name));
        self
    }

    /// Push a column, qualified when a table or alias is given.
    pub(crate) fn push_column(&mut self, qualifier: Option<&str>, column: &str) -> &mut Self {
        if let Some(qualifier) = qualifier {
            self.sql.push_str(&escape_identifier(qualifier));
            self.sql.push('.');
            self.sql.push_str(&escape_identifier(column));
        } else {
            self.push_ident(column);
        }
        self
    }

    /// Push a predicate.
    pub(crate) fn push_filter(&mut self, filter: &Filter, qualifier: Option<&str>) -> &mut Self {
        match filter {
            Filter::None => {
                self.push("1 = 1");
            }
            Filter::Equals(column, FilterValue::Null) | Filter::IsNull(column) => {
                self.push_column(qualifier, column).push(" IS NULL");
            }
            Filter::Equals(column, value) => {
                self.push_column(qualifier, column)
                    .push(" = ")
                    .push_param(value.clone());
            }
            Filter::Gt(column, value) => {
                self.push_column(qualifier, column)
                    .push(" > ")
                    .push_param(value.clone());
            }
            Filter::Lt(column, value) => {
                self.push_column(qualifier, column)
                    .push(" < ")
                    .push_param(value.clone());
            }
            Filter::And(filters) => {
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        self.push(" AND ");
                    }
                    let group = matches!(filter, Filter::And(_));
                    if group {
                        self.push("(");
                    }
                    self.push_filter(filter, qualifier);
                    if group {
                        self.push(")");
                    }
                }
            }
            Filter::Not(inner) => {
                self.push("NOT (").push_filter(inner, qualifier).push(")");
            }
        }
        self
    }

    pub(crate) fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Render the root SELECT of a plan.
pub(crate) fn select(plan: &QueryPlan) -> Statement {
    let mut b = SqlBuilder::new();

    b.push("SELECT ");
    match plan.projection {
        Some(ref fields) => {
            for (i, field) in fields.iter().enumerate() {
                if i > 0 {
                    b.push(", ");
                }
                b.push_ident(field);
            }
        }
        None => {
            b.push("*");
        }
    }
    b.push(" FROM ").push_ident(&plan.table);

    let mut first = true;
    if !plan.filter.is_none() {
        b.push(" WHERE ").push_filter(&plan.filter, None);
        first = false;
    }
    for (i, clause) in plan.exists.iter().enumerate() {
        b.push(if first { " WHERE " } else { " AND " });
        push_exists(&mut b, clause, &plan.table, &format!("r{}", i + 1));
        first = false;
    }

    if !plan.group_by.is_empty() {
        b.push(" GROUP BY ");
        for (i, key) in plan.group_by.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_ident(key);
        }
    }

    if !plan.order_by.is_empty() {
        b.push(" ORDER BY ");
        for (i, order) in plan.order_by.iter().enumerate() {
            if i > 0 {
                b.push(", ");
            }
            b.push_ident(&order.column).push(" ").push(order.order.as_sql());
        }
    }

    b.build()
}

fn push_exists(b: &mut SqlBuilder, clause: &ExistsClause, parent: &str, alias: &str) {
    if clause.negate {
        b.push("NOT ");
    }
    b.push("EXISTS (SELECT 1 FROM ")
        .push_ident(&clause.table)
        .push(" AS ")
        .push_ident(alias)
        .push(" WHERE ")
        .push_column(Some(alias), &clause.foreign_key)
        .push(" = ")
        .push_column(Some(parent), &clause.local_key);
    if clause.soft_deletes {
        b.push(" AND ").push_column(Some(alias), DELETED_AT).push(" IS NULL");
    }
    if !clause.comparison.is_none() {
        b.push(" AND ").push_filter(&clause.comparison, Some(alias));
    }
    b.push(")");
}

/// Render the query loading one relation for a batch of parent keys.
///
/// Rows are ranked within each parent by the load's order, so the limit
/// applies per parent. Results come back in rank order.
pub(crate) fn load(load: &EagerLoad, keys: &[FilterValue]) -> Statement {
    let mut b = SqlBuilder::new();
    let table = load.table.as_str();

    b.push("SELECT * FROM (SELECT ")
        .push_ident(table)
        .push(".*, ROW_NUMBER() OVER (PARTITION BY ")
        .push_column(Some(table), &load.foreign_key)
        .push(" ORDER BY ")
        .push_column(Some(table), &load.order.column)
        .push(" ")
        .push(load.order.order.as_sql())
        .push(") AS ")
        .push_ident(RANK_COLUMN)
        .push(" FROM ")
        .push_ident(table)
        .push(" WHERE ")
        .push_column(Some(table), &load.foreign_key)
        .push(" IN (");
    for (i, key) in keys.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_param(key.clone());
    }
    b.push(")");

    if load.soft_deletes {
        b.push(" AND ").push_column(Some(table), DELETED_AT).push(" IS NULL");
    }
    if !load.constraint.is_none() {
        b.push(" AND ").push_filter(&load.constraint, Some(table));
    }

    b.push(") AS ").push_ident(RANKED_ALIAS);
    if let Some(limit) = load.limit {
        b.push(" WHERE ")
            .push_ident(RANK_COLUMN)
            .push(" <= ")
            .push_param(FilterValue::Int(i64::try_from(limit).unwrap_or(i64::MAX)));
    }
    b.push(" ORDER BY ").push_ident(RANK_COLUMN);

    b.build()
}

/// Render a single-row lookup by column, skipping soft-deleted rows.
pub(crate) fn find_by(entity: &EntitySchema, column: &str, value: FilterValue) -> Statement {
    let mut b = SqlBuilder::new();
    b.push("SELECT * FROM ")
        .push_ident(&entity.table)
        .push(" WHERE ")
        .push_filter(&Filter::Equals(column.to_string(), value), None);
    if entity.soft_deletes {
        b.push(" AND ").push_ident(DELETED_AT).push(" IS NULL");
    }
    b.push(" LIMIT 1");
    b.build()
}

/// Render an INSERT of the given columns.
pub(crate) fn insert(table: &str, data: &Row) -> Statement {
    let mut b = SqlBuilder::new();
    b.push("INSERT INTO ").push_ident(table);

    if data.is_empty() {
        b.push(" DEFAULT VALUES");
        return b.build();
    }

    b.push(" (");
    for (i, column) in data.keys().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(column);
    }
    b.push(") VALUES (");
    for (i, value) in data.values().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_param(FilterValue::from_json(value));
    }
    b.push(")");
    b.build()
}

/// Render an UPDATE of one row, skipping soft-deleted rows.
pub(crate) fn update(
    entity: &EntitySchema,
    data: &Row,
    column: &str,
    value: FilterValue,
) -> Statement {
    let mut b = SqlBuilder::new();
    b.push("UPDATE ").push_ident(&entity.table).push(" SET ");
    for (i, (col, val)) in data.iter().enumerate() {
        if i > 0 {
            b.push(", ");
        }
        b.push_ident(col).push(" = ").push_param(FilterValue::from_json(val));
    }
    b.push(" WHERE ")
        .push_filter(&Filter::Equals(column.to_string(), value), None);
    if entity.soft_deletes {
        b.push(" AND ").push_ident(DELETED_AT).push(" IS NULL");
    }
    b.build()
}

/// Render a DELETE of one row.
pub(crate) fn delete(entity: &EntitySchema, column: &str, value: FilterValue) -> Statement {
    let mut b = SqlBuilder::new();
    b.push("DELETE FROM ")
        .push_ident(&entity.table)
        .push(" WHERE ")
        .push_filter(&Filter::Equals(column.to_string(), value), None);
    b.build()
}
