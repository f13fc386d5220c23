//! Role authority storage interface.

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::error::{AccessDenied, AuthorityError, StorageError};
use super::models::RoleAuthority;

/// Gate run against a role's current authorities before they are replaced.
pub type RoleCheck<'a> = &'a (dyn Fn(&BTreeSet<String>) -> Result<(), AccessDenied> + Send + Sync);

/// Durable mapping from (authority, role) pairs to assignments.
///
/// Every mutation of a single role is atomic: readers never observe a role
/// with half of a replace applied, and a failed mutation changes nothing.
/// Mutations of the same role are serialized; different roles are
/// independent.
#[async_trait]
pub trait AuthorityStore: Send + Sync {
    /// Distinct union of the authorities granted to `role_names`.
    async fn find_authorities_for_roles(
        &self,
        role_names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, StorageError>;

    /// Authorities granted to one role. Unknown roles yield an empty set.
    async fn find_authorities_for_role(
        &self,
        role_name: &str,
    ) -> Result<BTreeSet<String>, StorageError> {
        let roles = BTreeSet::from([role_name.to_owned()]);
        self.find_authorities_for_roles(&roles).await
    }

    /// Replace the role's authorities, creating the role if absent.
    async fn replace_authorities_for_role(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
    ) -> Result<(), StorageError>;

    /// Remove every assignment of the role. Returns the number removed.
    async fn delete_authorities_for_role(&self, role_name: &str) -> Result<u64, StorageError>;

    /// Assignments of the role, ordered by authority.
    async fn list_assignments_for_role(
        &self,
        role_name: &str,
    ) -> Result<Vec<RoleAuthority>, StorageError>;

    /// Read the role's current authorities, run `check` on them, and replace
    /// them with `authorities` only if the check passes.
    ///
    /// The read, the check and the write happen inside one per-role
    /// exclusion scope, so no other mutation of the role can land between
    /// them.
    async fn replace_authorities_for_role_checked(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
        check: RoleCheck<'_>,
    ) -> Result<(), AuthorityError>;
}
