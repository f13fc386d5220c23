//! Data models for role authorities.

use std::collections::BTreeSet;

use serde::Serialize;
use sqlx::FromRow;

/// A single (authority, role) assignment.
///
/// The pair is the identity; rows are only ever inserted or deleted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, FromRow, Serialize)]
pub struct RoleAuthority {
    pub authority: String,
    pub role_name: String,
}

impl RoleAuthority {
    pub fn new(authority: impl Into<String>, role_name: impl Into<String>) -> Self {
        Self {
            authority: authority.into(),
            role_name: role_name.into(),
        }
    }
}

/// The calling actor and the authorities it holds for this request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    /// Login, used only to attribute denials.
    pub login: String,

    /// Authorities currently held.
    pub authorities: BTreeSet<String>,
}

impl Actor {
    pub fn new<I, A>(login: impl Into<String>, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self {
            login: login.into(),
            authorities: authorities.into_iter().map(Into::into).collect(),
        }
    }

    /// Check if the actor holds the given authority.
    #[must_use]
    pub fn holds(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Authorities from `authorities` that the actor does not hold.
    ///
    /// Empty means the actor's set is a superset.
    pub fn missing<'a, I>(&self, authorities: I) -> BTreeSet<String>
    where
        I: IntoIterator<Item = &'a String>,
    {
        authorities
            .into_iter()
            .filter(|a| !self.authorities.contains(a.as_str()))
            .cloned()
            .collect()
    }

    /// Narrow `authorities` to the ones the actor holds.
    #[must_use]
    pub fn mask(&self, authorities: BTreeSet<String>) -> BTreeSet<String> {
        authorities
            .into_iter()
            .filter(|a| self.authorities.contains(a))
            .collect()
    }
}
