//! Translation of specifications into PostgreSQL clauses.

use dubox_application::{
    Comparison, Condition, Criterion, FilterValue, Page, QueryEntity, SortDirection, SortKey,
};
use dubox_core::{AppError, AppResult};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

/// How a column stores its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ColumnKind {
    /// Native column type matching the filter value.
    Native,
    /// Text column; ordered byte-wise to match in-memory ordering.
    Text,
    /// Text column holding lowercase UUIDs. UUID values are bound as text.
    UuidText,
}

/// SQL expression backing one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SqlColumn {
    pub expression: &'static str,
    pub kind: ColumnKind,
}

impl SqlColumn {
    pub(crate) const fn native(expression: &'static str) -> Self {
        Self {
            expression,
            kind: ColumnKind::Native,
        }
    }

    pub(crate) const fn text(expression: &'static str) -> Self {
        Self {
            expression,
            kind: ColumnKind::Text,
        }
    }

    pub(crate) const fn uuid_text(expression: &'static str) -> Self {
        Self {
            expression,
            kind: ColumnKind::UuidText,
        }
    }
}

/// Entity stored in one PostgreSQL table.
pub(crate) trait SqlEntity: QueryEntity {
    /// Maps a field to its column expression.
    fn column(field: Self::Field) -> SqlColumn;
}

/// Appends ` WHERE ...` for the criteria, or nothing when there are none.
pub(crate) fn push_where<E: SqlEntity>(
    builder: &mut QueryBuilder<'_, Postgres>,
    criteria: &[Criterion<E::Field>],
) {
    if criteria.is_empty() {
        return;
    }

    builder.push(" WHERE ");
    for (index, criterion) in criteria.iter().enumerate() {
        if index > 0 {
            builder.push(" AND ");
        }
        push_criterion::<E>(builder, criterion);
    }
}

/// Appends ` ORDER BY ...`, or nothing for an empty ordering.
pub(crate) fn push_order_by<E: SqlEntity>(
    builder: &mut QueryBuilder<'_, Postgres>,
    ordering: &[SortKey<E::Field>],
) {
    if ordering.is_empty() {
        return;
    }

    builder.push(" ORDER BY ");
    for (index, key) in ordering.iter().enumerate() {
        if index > 0 {
            builder.push(", ");
        }

        push_column(builder, E::column(key.field));
        builder.push(' ');
        builder.push(key.direction.as_str());
        builder.push(match key.direction {
            SortDirection::Ascending => " NULLS LAST",
            SortDirection::Descending => " NULLS FIRST",
        });
    }
}

/// Appends ` LIMIT ... OFFSET ...` for the page.
pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, page: Page) -> AppResult<()> {
    let limit = i64::try_from(page.limit())
        .map_err(|error| AppError::Validation(format!("invalid page size: {error}")))?;
    let offset = i64::try_from(page.offset())
        .map_err(|error| AppError::Validation(format!("invalid page offset: {error}")))?;

    builder.push(" LIMIT ");
    builder.push_bind(limit);
    builder.push(" OFFSET ");
    builder.push_bind(offset);
    Ok(())
}

fn push_criterion<E: SqlEntity>(
    builder: &mut QueryBuilder<'_, Postgres>,
    criterion: &Criterion<E::Field>,
) {
    match criterion {
        Criterion::Condition(condition) => push_condition::<E>(builder, condition),
        Criterion::AnyOf(conditions) if conditions.is_empty() => {
            builder.push("FALSE");
        }
        Criterion::AnyOf(conditions) => {
            builder.push('(');
            for (index, condition) in conditions.iter().enumerate() {
                if index > 0 {
                    builder.push(" OR ");
                }
                push_condition::<E>(builder, condition);
            }
            builder.push(')');
        }
    }
}

fn push_condition<E: SqlEntity>(
    builder: &mut QueryBuilder<'_, Postgres>,
    condition: &Condition<E::Field>,
) {
    let column = E::column(condition.field());

    match condition {
        Condition::Compare {
            comparison, value, ..
        } => {
            push_column(builder, column);
            builder.push(' ');
            builder.push(comparison_operator(*comparison));
            builder.push(' ');
            push_value(builder, column, value);
        }
        Condition::In { values, .. } if values.is_empty() => {
            builder.push("FALSE");
        }
        Condition::In { values, .. } => {
            builder.push(column.expression);
            builder.push(" = ANY(");
            push_value_array(builder, column, values);
            builder.push(')');
        }
        Condition::ContainsText { needle, .. } => {
            builder.push("STRPOS(LOWER(");
            builder.push(column.expression);
            builder.push("::TEXT), LOWER(");
            builder.push_bind(needle.clone());
            builder.push(")) > 0");
        }
        Condition::IsNull { .. } => {
            builder.push(column.expression);
            builder.push(" IS NULL");
        }
        Condition::IsNotNull { .. } => {
            builder.push(column.expression);
            builder.push(" IS NOT NULL");
        }
    }
}

// Text compares byte-wise, matching the in-memory evaluator.
fn push_column(builder: &mut QueryBuilder<'_, Postgres>, column: SqlColumn) {
    builder.push(column.expression);
    if column.kind == ColumnKind::Text {
        builder.push(" COLLATE \"C\"");
    }
}

fn comparison_operator(comparison: Comparison) -> &'static str {
    match comparison {
        Comparison::Eq => "=",
        Comparison::Neq => "<>",
        Comparison::Gt => ">",
        Comparison::Gte => ">=",
        Comparison::Lt => "<",
        Comparison::Lte => "<=",
    }
}

fn push_value(builder: &mut QueryBuilder<'_, Postgres>, column: SqlColumn, value: &FilterValue) {
    match value {
        FilterValue::Uuid(value) if column.kind == ColumnKind::UuidText => {
            builder.push_bind(value.to_string());
        }
        FilterValue::Uuid(value) => {
            builder.push_bind(*value);
        }
        FilterValue::Text(value) => {
            builder.push_bind(value.clone());
        }
        FilterValue::Integer(value) => {
            builder.push_bind(*value);
        }
        FilterValue::Boolean(value) => {
            builder.push_bind(*value);
        }
        FilterValue::Timestamp(value) => {
            builder.push_bind(*value);
        }
    }
}

/// Binds a value set as one array parameter. Sets mixing value kinds can
/// never match a single column and fall back to an inline array.
fn push_value_array(
    builder: &mut QueryBuilder<'_, Postgres>,
    column: SqlColumn,
    values: &[FilterValue],
) {
    if let Some(ids) = collect_values(values, |value| match value {
        FilterValue::Uuid(id) => Some(*id),
        _ => None,
    }) {
        if column.kind == ColumnKind::UuidText {
            builder.push_bind(ids.iter().map(Uuid::to_string).collect::<Vec<_>>());
        } else {
            builder.push_bind(ids);
        }
    } else if let Some(texts) =
        collect_values(values, |value| value.as_text().map(str::to_owned))
    {
        builder.push_bind(texts);
    } else if let Some(integers) = collect_values(values, |value| match value {
        FilterValue::Integer(integer) => Some(*integer),
        _ => None,
    }) {
        builder.push_bind(integers);
    } else if let Some(flags) = collect_values(values, |value| match value {
        FilterValue::Boolean(flag) => Some(*flag),
        _ => None,
    }) {
        builder.push_bind(flags);
    } else if let Some(timestamps) = collect_values(values, |value| match value {
        FilterValue::Timestamp(timestamp) => Some(*timestamp),
        _ => None,
    }) {
        builder.push_bind(timestamps);
    } else {
        builder.push("ARRAY[");
        for (index, value) in values.iter().enumerate() {
            if index > 0 {
                builder.push(", ");
            }
            push_value(builder, column, value);
        }
        builder.push(']');
    }
}

fn collect_values<T>(
    values: &[FilterValue],
    extract: impl Fn(&FilterValue) -> Option<T>,
) -> Option<Vec<T>> {
    values.iter().map(extract).collect()
}
