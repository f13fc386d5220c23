//! Role authority policy.
//!
//! Decides whether an actor may replace a role's authorities and filters
//! every read down to what the actor itself holds.
//!
//! Update rules, in order:
//! 1. The administrator role is never updated, before anything is read.
//! 2. The actor must hold every authority the role currently has.
//! 3. The actor must hold every authority it asks to assign.
//!
//! Rules 2 and 3 are evaluated against the role as read inside the store's
//! per-role exclusion scope, so a concurrent update cannot slip in between
//! the check and the write.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use super::constants::ADMIN_ROLE;
use super::error::{AccessDenied, AuthorityError, DenialReason, StorageError};
use super::models::{Actor, RoleAuthority};
use super::store::AuthorityStore;
use super::tree::AuthorityDependencyTree;

/// Stateless policy layer over an [`AuthorityStore`].
#[derive(Clone)]
pub struct AuthorizationEngine {
    store: Arc<dyn AuthorityStore>,
    tree: Arc<AuthorityDependencyTree>,
}

impl std::fmt::Debug for AuthorizationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationEngine")
            .field("tree", &self.tree)
            .finish_non_exhaustive()
    }
}

impl AuthorizationEngine {
    #[must_use]
    pub fn new(store: Arc<dyn AuthorityStore>, tree: AuthorityDependencyTree) -> Self {
        Self {
            store,
            tree: Arc::new(tree),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn AuthorityStore {
        self.store.as_ref()
    }

    #[must_use]
    pub fn dependency_tree(&self) -> &AuthorityDependencyTree {
        &self.tree
    }

    /// Build the actor for `login` from the authorities of its roles.
    pub async fn resolve_actor(
        &self,
        login: impl Into<String>,
        roles: &BTreeSet<String>,
    ) -> Result<Actor, StorageError> {
        let authorities = self.store.find_authorities_for_roles(roles).await?;
        Ok(Actor {
            login: login.into(),
            authorities,
        })
    }

    /// Replace the authorities of `role_name` with `requested`.
    ///
    /// Fails with [`AuthorityError::AccessDenied`] and leaves the role
    /// untouched if any update rule refuses.
    pub async fn update_role_authorities(
        &self,
        actor: &Actor,
        role_name: &str,
        requested: &[String],
    ) -> Result<(), AuthorityError> {
        let deny = |reason: DenialReason| AccessDenied {
            actor: actor.login.clone(),
            role: role_name.to_owned(),
            requested: requested.to_vec(),
            actor_authorities: actor.authorities.clone(),
            reason,
        };

        if role_name == ADMIN_ROLE {
            return Err(deny(DenialReason::ReservedRole).into());
        }

        let check = |current: &BTreeSet<String>| -> Result<(), AccessDenied> {
            let exceeded = actor.missing(current);
            if !exceeded.is_empty() {
                return Err(deny(DenialReason::RoleExceedsActor(exceeded)));
            }

            let escalation = actor.missing(requested);
            if !escalation.is_empty() {
                return Err(deny(DenialReason::CannotEscalate(escalation)));
            }

            Ok(())
        };

        let authorities: BTreeSet<String> = requested.iter().cloned().collect();
        self.store
            .replace_authorities_for_role_checked(role_name, &authorities, &check)
            .await
    }

    /// Dependency tree restricted to the actor's authorities.
    #[must_use]
    pub fn get_authorities_dependencies(&self, actor: &Actor) -> BTreeMap<String, Vec<String>> {
        self.tree.filtered_for(&actor.authorities)
    }

    /// Authorities of `role_name` that the actor also holds.
    pub async fn find_authorities_visible_for_role(
        &self,
        actor: &Actor,
        role_name: &str,
    ) -> Result<BTreeSet<String>, StorageError> {
        let authorities = self.store.find_authorities_for_role(role_name).await?;
        Ok(actor.mask(authorities))
    }

    /// Assignments of `role_name` whose authority the actor holds.
    pub async fn list_visible_assignments(
        &self,
        actor: &Actor,
        role_name: &str,
    ) -> Result<Vec<RoleAuthority>, StorageError> {
        let mut assignments = self.store.list_assignments_for_role(role_name).await?;
        assignments.retain(|assignment| actor.holds(&assignment.authority));
        Ok(assignments)
    }
}
