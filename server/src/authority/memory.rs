//! In-memory role authority store.
//!
//! Same contract as the `PostgreSQL` store, kept in process. Per-role
//! exclusion uses one async mutex per role name, registered on first use and
//! dropped again once no task holds or waits on it.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use super::error::{AuthorityError, StorageError};
use super::models::RoleAuthority;
use super::store::{AuthorityStore, RoleCheck};

/// Role authority store held in memory.
#[derive(Debug, Default)]
pub struct InMemoryAuthorityStore {
    /// Role name to granted authorities. A role with an empty set exists.
    roles: RwLock<BTreeMap<String, BTreeSet<String>>>,

    /// Per-role mutation locks.
    role_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl InMemoryAuthorityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `(role, authorities)` pairs.
    pub fn with_roles<I, R, D, A>(roles: I) -> Self
    where
        I: IntoIterator<Item = (R, D)>,
        R: Into<String>,
        D: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let roles: BTreeMap<String, BTreeSet<String>> = roles
            .into_iter()
            .map(|(role, authorities)| {
                (
                    role.into(),
                    authorities.into_iter().map(Into::into).collect(),
                )
            })
            .collect();

        Self {
            roles: RwLock::new(roles),
            role_locks: DashMap::new(),
        }
    }

    /// Names of every role known to the store.
    pub async fn role_names(&self) -> Vec<String> {
        self.roles.read().await.keys().cloned().collect()
    }

    async fn lock_role(&self, role_name: &str) -> RoleLockGuard<'_> {
        // Clone the Arc out so the shard guard is released before awaiting.
        let lock = self
            .role_locks
            .entry(role_name.to_owned())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;

        RoleLockGuard {
            locks: &self.role_locks,
            role_name: role_name.to_owned(),
            guard: Some(guard),
        }
    }

    async fn write_role(&self, role_name: &str, authorities: &BTreeSet<String>) {
        self.roles
            .write()
            .await
            .insert(role_name.to_owned(), authorities.clone());
    }
}

/// Held role lock. Unregisters the role's mutex on release when it is the
/// last reference.
struct RoleLockGuard<'a> {
    locks: &'a DashMap<String, Arc<Mutex<()>>>,
    role_name: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for RoleLockGuard<'_> {
    fn drop(&mut self) {
        // The owned guard holds its own Arc; release it before counting.
        drop(self.guard.take());
        // Waiters clone the Arc under the same shard lock, so a count of one
        // means nobody else can reach this mutex.
        self.locks
            .remove_if(&self.role_name, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[async_trait]
impl AuthorityStore for InMemoryAuthorityStore {
    async fn find_authorities_for_roles(
        &self,
        role_names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, StorageError> {
        let roles = self.roles.read().await;
        Ok(role_names
            .iter()
            .filter_map(|name| roles.get(name))
            .flatten()
            .cloned()
            .collect())
    }

    async fn replace_authorities_for_role(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let _guard = self.lock_role(role_name).await;
        self.write_role(role_name, authorities).await;
        Ok(())
    }

    async fn delete_authorities_for_role(&self, role_name: &str) -> Result<u64, StorageError> {
        let _guard = self.lock_role(role_name).await;
        let mut roles = self.roles.write().await;
        let removed = roles
            .get_mut(role_name)
            .map(|authorities| std::mem::take(authorities).len() as u64)
            .unwrap_or(0);
        Ok(removed)
    }

    async fn list_assignments_for_role(
        &self,
        role_name: &str,
    ) -> Result<Vec<RoleAuthority>, StorageError> {
        let roles = self.roles.read().await;
        Ok(roles
            .get(role_name)
            .map(|authorities| {
                authorities
                    .iter()
                    .map(|authority| RoleAuthority::new(authority.clone(), role_name))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace_authorities_for_role_checked(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
        check: RoleCheck<'_>,
    ) -> Result<(), AuthorityError> {
        let _guard = self.lock_role(role_name).await;

        let current = self.find_authorities_for_role(role_name).await?;
        check(&current)?;

        self.write_role(role_name, authorities).await;
        Ok(())
    }
}
