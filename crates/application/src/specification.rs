//! Storage-agnostic query specifications.
//!
//! A [`Specification`] bundles conjunctive criteria, eager-load paths,
//! ordering, paging and an execution hint. Builder methods consume and
//! return the value, so a base specification can be cloned and extended by
//! several callers without any of them observing the others' additions.

mod criteria;
mod includes;
mod paging;


use std::fmt::{self, Debug, Formatter};
use std::marker::PhantomData;

use dubox_domain::AccessScope;

pub use criteria::{Comparison, Condition, Criterion, FilterValue};
pub use includes::{IncludePath, QueryExecution};
pub use paging::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, Page, Paged, PagingConfig};

/// Entity that specifications can target.
pub trait QueryEntity {
    /// Queryable fields of the entity.
    type Field: Copy + Eq + Debug + Send + Sync + 'static;

    /// Unique field used as the ordering tiebreaker for paged queries.
    fn key_field() -> Self::Field;
}

/// Entity whose field values can be read in memory.
pub trait QueryRecord: QueryEntity {
    /// Returns the value of one field, or `None` when it is null.
    fn field_value(&self, field: Self::Field) -> Option<FilterValue>;
}

/// Sort direction of one ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first, nulls last.
    Ascending,
    /// Largest first, nulls first.
    Descending,
}

impl SortDirection {
    /// Returns the SQL keyword.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ascending => "ASC",
            Self::Descending => "DESC",
        }
    }
}

/// One ordering key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey<F> {
    /// Sorted field.
    pub field: F,
    /// Direction.
    pub direction: SortDirection,
}

/// Declarative query over entity `E`.
pub struct Specification<E: QueryEntity> {
    criteria: Vec<Criterion<E::Field>>,
    includes: Vec<IncludePath>,
    ordering: Vec<SortKey<E::Field>>,
    page: Option<Page>,
    split_query: bool,
    entity: PhantomData<fn() -> E>,
}

impl<E: QueryEntity> Specification<E> {
    /// Creates a specification matching every row, unordered and unpaged.
    #[must_use]
    pub fn new() -> Self {
        Self {
            criteria: Vec::new(),
            includes: Vec::new(),
            ordering: Vec::new(),
            page: None,
            split_query: false,
            entity: PhantomData,
        }
    }

    /// Adds a conjunct.
    #[must_use]
    pub fn filter(mut self, condition: Condition<E::Field>) -> Self {
        self.criteria.push(Criterion::Condition(condition));
        self
    }

    /// Adds a conjunct that holds when any of the conditions holds.
    #[must_use]
    pub fn any_of(mut self, conditions: impl IntoIterator<Item = Condition<E::Field>>) -> Self {
        self.criteria
            .push(Criterion::AnyOf(conditions.into_iter().collect()));
        self
    }

    /// Folds a visibility scope into the criteria. Unrestricted scopes add
    /// nothing; restricted scopes require `field` to be one of the ids, so
    /// an empty scope matches no row.
    #[must_use]
    pub fn restrict_to<Id>(self, field: E::Field, scope: &AccessScope<Id>) -> Self
    where
        Id: Copy + Ord + Into<FilterValue>,
    {
        match scope {
            AccessScope::Unrestricted => self,
            AccessScope::Restricted(ids) => {
                self.filter(Condition::one_of(field, ids.iter().copied()))
            }
        }
    }

    /// Adds an eager-load path. Repeated paths are kept once.
    #[must_use]
    pub fn include(mut self, include: IncludePath) -> Self {
        if !self
            .includes
            .iter()
            .any(|existing| existing.as_str() == include.as_str())
        {
            self.includes.push(include);
        }
        self
    }

    /// Appends an ascending ordering key. Fields already ordered on keep
    /// their first position and direction.
    #[must_use]
    pub fn order_by(self, field: E::Field) -> Self {
        self.push_order(field, SortDirection::Ascending)
    }

    /// Appends a descending ordering key.
    #[must_use]
    pub fn order_by_descending(self, field: E::Field) -> Self {
        self.push_order(field, SortDirection::Descending)
    }

    fn push_order(mut self, field: E::Field, direction: SortDirection) -> Self {
        if !self.ordering.iter().any(|key| key.field == field) {
            self.ordering.push(SortKey { field, direction });
        }
        self
    }

    /// Requests one page of results. Storage reports the total count of
    /// matching rows for every paged specification.
    #[must_use]
    pub fn paginate(mut self, page: Page) -> Self {
        self.page = Some(page);
        self
    }

    /// Forces split-query execution.
    #[must_use]
    pub fn split_query(mut self) -> Self {
        self.split_query = true;
        self
    }

    /// Returns the conjuncts in declaration order.
    #[must_use]
    pub fn criteria(&self) -> &[Criterion<E::Field>] {
        &self.criteria
    }

    /// Returns the eager-load paths.
    #[must_use]
    pub fn includes(&self) -> &[IncludePath] {
        &self.includes
    }

    /// Returns whether an include rooted at `relation` was requested.
    #[must_use]
    pub fn has_include(&self, relation: &str) -> bool {
        self.includes
            .iter()
            .any(|include| include.root() == relation)
    }

    /// Returns the ordering exactly as declared.
    #[must_use]
    pub fn declared_ordering(&self) -> &[SortKey<E::Field>] {
        &self.ordering
    }

    /// Returns the ordering storage must apply. Paged specifications get the
    /// key field appended ascending unless it is already ordered on, which
    /// makes every page deterministic.
    #[must_use]
    pub fn ordering(&self) -> Vec<SortKey<E::Field>> {
        let mut ordering = self.ordering.clone();
        let key_field = E::key_field();
        if self.page.is_some() && !ordering.iter().any(|key| key.field == key_field) {
            ordering.push(SortKey {
                field: key_field,
                direction: SortDirection::Ascending,
            });
        }
        ordering
    }

    /// Returns the requested page, if any.
    #[must_use]
    pub fn page(&self) -> Option<Page> {
        self.page
    }

    /// Returns how storage should fetch the includes.
    #[must_use]
    pub fn execution(&self) -> QueryExecution {
        let collection_includes = self
            .includes
            .iter()
            .filter(|include| include.is_collection())
            .count();

        if self.split_query || collection_includes > 1 {
            QueryExecution::SplitQuery
        } else {
            QueryExecution::SingleQuery
        }
    }
}

impl<E: QueryEntity> Default for Specification<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: QueryEntity> Clone for Specification<E> {
    fn clone(&self) -> Self {
        Self {
            criteria: self.criteria.clone(),
            includes: self.includes.clone(),
            ordering: self.ordering.clone(),
            page: self.page,
            split_query: self.split_query,
            entity: PhantomData,
        }
    }
}

impl<E: QueryEntity> Debug for Specification<E> {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Specification")
            .field("criteria", &self.criteria)
            .field("includes", &self.includes)
            .field("ordering", &self.ordering)
            .field("page", &self.page)
            .field("split_query", &self.split_query)
            .finish()
    }
}
