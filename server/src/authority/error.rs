//! Authority error types.
//!
//! Denials and storage faults are kept apart so callers can answer a denial
//! with a bare "forbidden" while treating a storage fault as operational.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

/// Why a role update was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// The target is the reserved administrator role.
    ReservedRole,

    /// The role currently holds authorities the actor lacks.
    RoleExceedsActor(BTreeSet<String>),

    /// The request grants authorities the actor lacks.
    CannotEscalate(BTreeSet<String>),
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReservedRole => write!(f, "the administrator role cannot be modified"),
            Self::RoleExceedsActor(missing) => {
                write!(f, "role holds authorities the actor lacks: {missing:?}")
            }
            Self::CannotEscalate(missing) => {
                write!(f, "cannot grant authorities the actor lacks: {missing:?}")
            }
        }
    }
}

/// A refused role update.
///
/// Carries everything an audit log line needs. The engine never logs a
/// denial itself; the caller decides where it goes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{actor} may not update role {role}: {reason}")]
pub struct AccessDenied {
    /// Login of the actor that made the request.
    pub actor: String,

    /// Target role name.
    pub role: String,

    /// Authorities the actor asked to assign, as sent.
    pub requested: Vec<String>,

    /// Authorities the actor held when the request was evaluated.
    pub actor_authorities: BTreeSet<String>,

    /// Which rule refused the update.
    pub reason: DenialReason,
}

/// Backing store failure.
///
/// A failed operation leaves stored state unchanged.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a guarded mutation.
#[derive(Debug, Error)]
pub enum AuthorityError {
    #[error(transparent)]
    AccessDenied(#[from] AccessDenied),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for AuthorityError {
    fn from(err: sqlx::Error) -> Self {
        Self::Storage(StorageError::Database(err))
    }
}

impl AuthorityError {
    /// The denial, if this error is one.
    #[must_use]
    pub const fn as_denial(&self) -> Option<&AccessDenied> {
        match self {
            Self::AccessDenied(denied) => Some(denied),
            Self::Storage(_) => None,
        }
    }
}
