use dubox_core::{AppError, AppResult};

/// Cardinality of an eager-loaded relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncludeKind {
    /// Many-to-one or one-to-one relation.
    Reference,
    /// One-to-many relation. Each one multiplies rows in a joined query.
    Collection,
}

/// Dotted path to related data loaded together with the root entity, such as
/// `Members` or `Members.User`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludePath {
    path: String,
    kind: IncludeKind,
}

impl IncludePath {
    /// Creates a reference include.
    pub fn reference(path: impl Into<String>) -> AppResult<Self> {
        Self::new(path.into(), IncludeKind::Reference)
    }

    /// Creates a collection include.
    pub fn collection(path: impl Into<String>) -> AppResult<Self> {
        Self::new(path.into(), IncludeKind::Collection)
    }

    fn new(path: String, kind: IncludeKind) -> AppResult<Self> {
        let path = path.trim().to_owned();
        if path.is_empty() {
            return Err(AppError::Validation(
                "include path must not be empty".to_owned(),
            ));
        }

        let valid_segments = path.split('.').all(|segment| {
            !segment.is_empty()
                && segment
                    .chars()
                    .all(|character| character.is_ascii_alphanumeric() || character == '_')
        });
        if !valid_segments {
            return Err(AppError::Validation(format!(
                "include path '{path}' must be dot-separated identifiers"
            )));
        }

        Ok(Self { path, kind })
    }

    /// Returns the dotted path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.path.as_str()
    }

    /// Returns whether the include loads a collection.
    #[must_use]
    pub fn is_collection(&self) -> bool {
        self.kind == IncludeKind::Collection
    }

    /// Returns the first path segment, the relation on the root entity.
    #[must_use]
    pub fn root(&self) -> &str {
        self.path.split('.').next().unwrap_or(self.path.as_str())
    }
}

/// How storage should fetch the root rows and their includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryExecution {
    /// One joined round trip.
    SingleQuery,
    /// One round trip for the root rows, then one per collection include.
    SplitQuery,
}
