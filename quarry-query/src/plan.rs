//! Query plans: resolved request specs compiled against an entity schema.
//!
//! [`QueryInputs`] is what presentation code hands over, either assembled
//! with the builder methods or parsed from a whole request object.
//! [`QueryPlan`] is the compiled, immutable result. It is only produced by
//! [`Repository::plan`](crate::Repository::plan) and
//! [`Repository::find_many`](crate::Repository::find_many).
//!
//! Compilation applies, in order: projection, equality filters, eager
//! loads, existence predicates, grouping and sorting.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::config::QueryLimits;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::normalize::{normalize_filters, normalize_list, normalize_sort, type_name};
use crate::quarry_trace;
use crate::relations::{
    ComparisonOperator, ExistenceSpec, LoadSpec, RelationType, resolve_existence_list,
    resolve_loads,
};
use crate::schema::{DELETED_AT, EntitySchema, Schema};
use crate::sql::{self, Statement};
use crate::types::{FieldList, FilterMap, GroupKeys, OrderByField, SortOrder, SortSpec};

static NULL: Value = Value::Null;

/// Resolved request specs for one query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryInputs {
    /// Projected fields; `None` selects every column.
    pub select: Option<FieldList>,
    /// Equality filters, all of which must hold.
    pub filters: FilterMap,
    /// Relations to eager load.
    pub loads: Vec<LoadSpec>,
    /// Existence predicates over relations.
    pub exists: Vec<ExistenceSpec>,
    /// Grouping keys.
    pub group_by: Option<GroupKeys>,
    /// Sort order, first entry primary.
    pub sort: SortSpec,
}

impl QueryInputs {
    /// Create empty inputs: every column of every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a whole request object.
    ///
    /// Recognized keys are `select`, `filters`, `load`, `where_has` (or
    /// `whereHas`), `group_by` (or `groupBy`) and `sort`. Other keys are
    /// ignored.
    pub fn from_request(request: &Value) -> QueryResult<Self> {
        let map = match request {
            Value::Null => return Ok(Self::default()),
            Value::Object(map) => map,
            other => {
                return Err(QueryError::invalid_input(
                    "request",
                    format!("expected an object, got {}", type_name(other)),
                ));
            }
        };

        Ok(Self {
            select: normalize_list(map.get("select")),
            filters: normalize_filters(field(map, &["filters"]))?,
            loads: resolve_loads(field(map, &["load"]))?,
            exists: resolve_existence_list(field(map, &["where_has", "whereHas"]))?,
            group_by: normalize_list(map.get("group_by").or_else(|| map.get("groupBy"))),
            sort: normalize_sort(field(map, &["sort"]))?,
        })
    }

    /// Project the given fields.
    pub fn select(mut self, fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let fields: FieldList = fields.into_iter().map(Into::into).collect();
        self.select = if fields.is_empty() { None } else { Some(fields) };
        self
    }

    /// Require `field = value`.
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    /// Eager load a relation.
    pub fn load(mut self, spec: LoadSpec) -> Self {
        self.loads.push(spec);
        self
    }

    /// Add an existence predicate.
    pub fn exists(mut self, spec: ExistenceSpec) -> Self {
        self.exists.push(spec);
        self
    }

    /// Group by the given keys.
    pub fn group_by(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        let keys: GroupKeys = keys.into_iter().map(Into::into).collect();
        self.group_by = if keys.is_empty() { None } else { Some(keys) };
        self
    }

    /// Append a sort key.
    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort.insert(field.into(), order);
        self
    }
}

fn field<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> &'a Value {
    keys.iter().find_map(|key| map.get(*key)).unwrap_or(&NULL)
}

/// A relation load compiled against the schema.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct EagerLoad {
    /// Key the related records are attached under.
    pub(crate) name: String,
    pub(crate) relation_type: RelationType,
    pub(crate) table: String,
    /// Column on the parent rows.
    pub(crate) local_key: String,
    /// Column on the related rows.
    pub(crate) foreign_key: String,
    pub(crate) soft_deletes: bool,
    pub(crate) order: OrderByField,
    /// Per-parent cap; `None` loads every match.
    pub(crate) limit: Option<u64>,
    /// Extra predicate on the related rows.
    pub(crate) constraint: Filter,
    /// Attach an empty relation without querying.
    pub(crate) empty: bool,
    pub(crate) nested: Vec<EagerLoad>,
}

/// An `[NOT] EXISTS` predicate compiled against the schema.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ExistsClause {
    pub(crate) table: String,
    pub(crate) local_key: String,
    pub(crate) foreign_key: String,
    pub(crate) soft_deletes: bool,
    /// Comparison on the related primary key.
    pub(crate) comparison: Filter,
    pub(crate) negate: bool,
}

/// A compiled query bound to one entity.
#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub(crate) entity: String,
    pub(crate) table: String,
    pub(crate) projection: Option<FieldList>,
    /// Columns added to the projection for relation matching only.
    pub(crate) hidden: Vec<String>,
    pub(crate) filter: Filter,
    pub(crate) exists: Vec<ExistsClause>,
    pub(crate) group_by: GroupKeys,
    pub(crate) order_by: Vec<OrderByField>,
    pub(crate) loads: Vec<EagerLoad>,
}

impl QueryPlan {
    pub(crate) fn compile(
        schema: &Schema,
        entity: &str,
        inputs: &QueryInputs,
        limits: &QueryLimits,
    ) -> QueryResult<Self> {
        let root = schema.entity_or_err(entity)?;
        check_limits(inputs, limits)?;

        let mut filter = Filter::and(
            inputs
                .filters
                .iter()
                .map(|(field, value)| equality(field, value)),
        );
        if root.soft_deletes {
            filter = filter.and_then(Filter::IsNull(DELETED_AT.to_string()));
        }

        // a repeated relation keeps its first position and its last spec
        let mut loads: IndexMap<String, EagerLoad> = IndexMap::new();
        for spec in &inputs.loads {
            let load = eager_load(schema, root, spec)?;
            loads.insert(load.name.clone(), load);
        }

        let mut exists = Vec::with_capacity(inputs.exists.len());
        for spec in &inputs.exists {
            let (relation, related) = schema.resolve_relation(root, &spec.relation)?;
            let comparison = match spec.value {
                Some(ref value) => compare(&spec.operator, &related.primary_key, value),
                None => Filter::None,
            };

            if let Some(ref nested) = spec.nested_load {
                let nested = eager_load(schema, related, nested)?;
                if let Some(existing) = loads.get_mut(&relation.name) {
                    // an already loaded relation gains the nested load
                    if !existing.nested.iter().any(|n| n.name == nested.name) {
                        existing.nested.push(nested);
                    }
                } else {
                    loads.insert(
                        relation.name.clone(),
                        EagerLoad {
                            name: relation.name.clone(),
                            relation_type: relation.relation_type,
                            table: related.table.clone(),
                            local_key: relation.local_key.clone(),
                            foreign_key: relation.foreign_key.clone(),
                            soft_deletes: related.soft_deletes,
                            order: OrderByField::asc(&related.primary_key),
                            limit: None,
                            constraint: comparison.clone(),
                            empty: spec.negate,
                            nested: vec![nested],
                        },
                    );
                }
            }

            exists.push(ExistsClause {
                table: related.table.clone(),
                local_key: relation.local_key.clone(),
                foreign_key: relation.foreign_key.clone(),
                soft_deletes: related.soft_deletes,
                comparison,
                negate: spec.negate,
            });
        }

        let loads: Vec<EagerLoad> = loads.into_values().collect();

        let mut hidden = Vec::new();
        let projection = inputs.select.clone().map(|mut fields| {
            for load in loads.iter().filter(|l| !l.empty) {
                if !fields.contains(&load.local_key) {
                    fields.push(load.local_key.clone());
                    hidden.push(load.local_key.clone());
                }
            }
            fields
        });

        quarry_trace!(
            entity = %root.name,
            loads = loads.len(),
            exists = exists.len(),
            hidden = hidden.len(),
            "Compiled query plan"
        );

        Ok(Self {
            entity: root.name.clone(),
            table: root.table.clone(),
            projection,
            hidden,
            filter,
            exists,
            group_by: inputs.group_by.clone().unwrap_or_default(),
            order_by: inputs
                .sort
                .iter()
                .map(|(field, order)| OrderByField::new(field, *order))
                .collect(),
            loads,
        })
    }

    /// Name of the target entity.
    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Table the root query reads.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Columns in the root SQL projection, `None` for all.
    pub fn projection(&self) -> Option<&[String]> {
        self.projection.as_deref()
    }

    /// Columns fetched only to match related records; removed from results.
    pub fn hidden_columns(&self) -> &[String] {
        &self.hidden
    }

    /// Names of the relations attached to each result, in load order.
    pub fn relation_names(&self) -> Vec<&str> {
        self.loads.iter().map(|l| l.name.as_str()).collect()
    }

    /// The root statement.
    pub fn to_statement(&self) -> Statement {
        sql::select(self)
    }
}

fn equality(field: &str, value: &FilterValue) -> Filter {
    match value {
        FilterValue::Null => Filter::IsNull(field.to_string()),
        value => Filter::Equals(field.to_string(), value.clone()),
    }
}

fn compare(operator: &ComparisonOperator, column: &str, value: &FilterValue) -> Filter {
    let column = column.to_string();
    match operator {
        ComparisonOperator::Gt => Filter::Gt(column, value.clone()),
        ComparisonOperator::Lt => Filter::Lt(column, value.clone()),
        ComparisonOperator::Eq | ComparisonOperator::Other(_) => equality(&column, value),
    }
}

fn eager_load(schema: &Schema, parent: &EntitySchema, spec: &LoadSpec) -> QueryResult<EagerLoad> {
    let (relation, related) = schema.resolve_relation(parent, &spec.relation)?;
    let order = spec.sort_order().ok_or_else(|| {
        QueryError::invalid_input(
            format!("load.{}.direction", spec.relation),
            format!("expected ASC or DESC, got '{}'", spec.direction),
        )
    })?;

    Ok(EagerLoad {
        name: relation.name.clone(),
        relation_type: relation.relation_type,
        table: related.table.clone(),
        local_key: relation.local_key.clone(),
        foreign_key: relation.foreign_key.clone(),
        soft_deletes: related.soft_deletes,
        order: OrderByField::new(&spec.order_key, order),
        limit: Some(spec.limit),
        constraint: Filter::None,
        empty: false,
        nested: Vec::new(),
    })
}

fn check_limits(inputs: &QueryInputs, limits: &QueryLimits) -> QueryResult<()> {
    let specs = inputs
        .loads
        .iter()
        .chain(inputs.exists.iter().filter_map(|e| e.nested_load.as_ref()));

    if let Some(max) = limits.max_relation_limit {
        for spec in specs.clone() {
            if spec.limit > max {
                return Err(QueryError::limit_exceeded(
                    format!("Limit for relation '{}'", spec.relation),
                    spec.limit,
                    max,
                ));
            }
        }
    }

    if let Some(max) = limits.max_eager_loads {
        let count = specs.count();
        if count > max {
            return Err(QueryError::limit_exceeded(
                "Eager load count",
                count as u64,
                max as u64,
            ));
        }
    }

    Ok(())
}
