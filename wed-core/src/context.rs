//! Identity-scoped context for remote calls.

use std::fmt;

/// Identifier issued by the identity provider for a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub String);

impl UserId {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Context carried with every call that touches user-owned remote state.
///
/// Storage paths and document filters are derived from `user_id`, so a
/// component never reaches for an ambient "current user".
#[derive(Debug, Clone)]
pub struct UserContext {
    pub user_id: UserId,
}

impl UserContext {
    pub fn new<S: Into<String>>(user: S) -> Self {
        Self {
            user_id: UserId(user.into()),
        }
    }

    pub fn uid(&self) -> &str {
        self.user_id.as_str()
    }
}
