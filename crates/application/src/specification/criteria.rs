use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use dubox_domain::{ProjectId, TeamId, UserId};

use super::QueryRecord;

/// Typed value a criterion compares a field against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    /// Identifier column.
    Uuid(Uuid),
    /// Text column.
    Text(String),
    /// Integer column.
    Integer(i64),
    /// Boolean column.
    Boolean(bool),
    /// Timestamp column.
    Timestamp(DateTime<Utc>),
}

impl FilterValue {
    /// Orders two values of the same kind. Values of different kinds are
    /// incomparable.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Uuid(left), Self::Uuid(right)) => Some(left.cmp(right)),
            (Self::Text(left), Self::Text(right)) => Some(left.cmp(right)),
            (Self::Integer(left), Self::Integer(right)) => Some(left.cmp(right)),
            (Self::Boolean(left), Self::Boolean(right)) => Some(left.cmp(right)),
            (Self::Timestamp(left), Self::Timestamp(right)) => Some(left.cmp(right)),
            _ => None,
        }
    }

    /// Returns the text payload for text values.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }
}

impl From<Uuid> for FilterValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<UserId> for FilterValue {
    fn from(value: UserId) -> Self {
        Self::Uuid(value.as_uuid())
    }
}

impl From<ProjectId> for FilterValue {
    fn from(value: ProjectId) -> Self {
        Self::Uuid(value.as_uuid())
    }
}

impl From<TeamId> for FilterValue {
    fn from(value: TeamId) -> Self {
        Self::Uuid(value.as_uuid())
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// Binary comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// Equality.
    Eq,
    /// Inequality.
    Neq,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal.
    Lte,
}

impl Comparison {
    /// Returns whether `field <op> value` holds given `field.cmp(value)`.
    #[must_use]
    pub fn holds(&self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Neq => ordering != Ordering::Equal,
            Self::Gt => ordering == Ordering::Greater,
            Self::Gte => ordering != Ordering::Less,
            Self::Lt => ordering == Ordering::Less,
            Self::Lte => ordering != Ordering::Greater,
        }
    }
}

/// Single predicate over one field.
///
/// Every condition except [`Condition::IsNull`] is false for a null field,
/// the same way SQL treats comparisons with `NULL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition<F> {
    /// Binary comparison against one value.
    Compare {
        /// Compared field.
        field: F,
        /// Operator.
        comparison: Comparison,
        /// Right-hand value.
        value: FilterValue,
    },
    /// Membership in a value set. An empty set matches nothing.
    In {
        /// Tested field.
        field: F,
        /// Allowed values.
        values: Vec<FilterValue>,
    },
    /// Case-insensitive substring match on a text field.
    ContainsText {
        /// Searched field.
        field: F,
        /// Substring to look for.
        needle: String,
    },
    /// Field is null.
    IsNull {
        /// Tested field.
        field: F,
    },
    /// Field is not null.
    IsNotNull {
        /// Tested field.
        field: F,
    },
}

impl<F: Copy> Condition<F> {
    /// `field = value`.
    pub fn equals(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Eq, value)
    }

    /// `field <> value`.
    pub fn not_equals(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Neq, value)
    }

    /// `field > value`.
    pub fn greater_than(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Gt, value)
    }

    /// `field >= value`.
    pub fn at_least(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Gte, value)
    }

    /// `field < value`.
    pub fn less_than(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Lt, value)
    }

    /// `field <= value`.
    pub fn at_most(field: F, value: impl Into<FilterValue>) -> Self {
        Self::compare(field, Comparison::Lte, value)
    }

    /// `field IN (values)`.
    pub fn one_of<V: Into<FilterValue>>(field: F, values: impl IntoIterator<Item = V>) -> Self {
        Self::In {
            field,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Case-insensitive substring search.
    pub fn contains_text(field: F, needle: impl Into<String>) -> Self {
        Self::ContainsText {
            field,
            needle: needle.into(),
        }
    }

    /// `field IS NULL`.
    pub fn is_null(field: F) -> Self {
        Self::IsNull { field }
    }

    /// `field IS NOT NULL`.
    pub fn is_not_null(field: F) -> Self {
        Self::IsNotNull { field }
    }

    fn compare(field: F, comparison: Comparison, value: impl Into<FilterValue>) -> Self {
        Self::Compare {
            field,
            comparison,
            value: value.into(),
        }
    }

    /// Returns the field this condition reads.
    #[must_use]
    pub fn field(&self) -> F {
        match self {
            Self::Compare { field, .. }
            | Self::In { field, .. }
            | Self::ContainsText { field, .. }
            | Self::IsNull { field }
            | Self::IsNotNull { field } => *field,
        }
    }

    /// Evaluates the condition against one field value.
    #[must_use]
    pub fn matches_value(&self, candidate: Option<&FilterValue>) -> bool {
        match (self, candidate) {
            (Self::IsNull { .. }, candidate) => candidate.is_none(),
            (Self::IsNotNull { .. }, candidate) => candidate.is_some(),
            (_, None) => false,
            (
                Self::Compare {
                    comparison, value, ..
                },
                Some(candidate),
            ) => candidate
                .compare(value)
                .is_some_and(|ordering| comparison.holds(ordering)),
            (Self::In { values, .. }, Some(candidate)) => values.contains(candidate),
            (Self::ContainsText { needle, .. }, Some(candidate)) => {
                candidate.as_text().is_some_and(|text| {
                    text.to_lowercase().contains(needle.to_lowercase().as_str())
                })
            }
        }
    }
}

/// One top-level conjunct of a specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Criterion<F> {
    /// Single condition.
    Condition(Condition<F>),
    /// At least one of the conditions holds. Empty groups match nothing.
    AnyOf(Vec<Condition<F>>),
}

impl<F: Copy> Criterion<F> {
    /// Evaluates the criterion against an in-memory record.
    pub fn matches<R>(&self, record: &R) -> bool
    where
        R: QueryRecord<Field = F>,
    {
        match self {
            Self::Condition(condition) => {
                condition.matches_value(record.field_value(condition.field()).as_ref())
            }
            Self::AnyOf(conditions) => conditions.iter().any(|condition| {
                condition.matches_value(record.field_value(condition.field()).as_ref())
            }),
        }
    }
}
