use serde::{Deserialize, Serialize};

/// Identity of the caller attached to one request.
///
/// The user id is kept exactly as the authentication layer delivered it.
/// Parsing happens in the resolvers, which treat anything unparsable as an
/// anonymous caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    user_id: Option<String>,
    is_authenticated: bool,
}

impl CurrentUser {
    /// Creates a context for an authenticated caller.
    #[must_use]
    pub fn authenticated(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            is_authenticated: true,
        }
    }

    /// Creates a context for a request without identity.
    #[must_use]
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            is_authenticated: false,
        }
    }

    /// Creates a context from raw claim values.
    #[must_use]
    pub fn from_claims(user_id: Option<String>, is_authenticated: bool) -> Self {
        Self {
            user_id,
            is_authenticated,
        }
    }

    /// Returns the raw user id claim, if one is present and non-blank.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    /// Returns whether the authentication layer accepted the caller.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }
}
