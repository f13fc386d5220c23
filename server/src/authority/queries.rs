//! `PostgreSQL` role authority store.
//!
//! Every mutation runs in one transaction that first takes the role's
//! advisory lock (seed 61, see `crate::db`), so mutations of the same role
//! are serialized and a failure rolls the whole change back.

use std::collections::BTreeSet;

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::error::{AuthorityError, StorageError};
use super::models::RoleAuthority;
use super::store::{AuthorityStore, RoleCheck};

/// Role authority store backed by the `roles` and `role_authorities` tables.
#[derive(Debug, Clone)]
pub struct PgAuthorityStore {
    pool: PgPool,
}

impl PgAuthorityStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub const fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Serialize mutations of one role until the surrounding transaction ends.
async fn lock_role(conn: &mut PgConnection, role_name: &str) -> sqlx::Result<()> {
    sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text, 61))")
        .bind(role_name)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn select_role_authorities(
    conn: &mut PgConnection,
    role_name: &str,
) -> sqlx::Result<BTreeSet<String>> {
    let authorities: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT authority FROM role_authorities WHERE role_name = $1",
    )
    .bind(role_name)
    .fetch_all(&mut *conn)
    .await?;

    Ok(authorities.into_iter().collect())
}

/// Delete the role's assignments and insert `authorities` in their place.
///
/// Must run inside a transaction holding the role lock.
async fn write_role_authorities(
    conn: &mut PgConnection,
    role_name: &str,
    authorities: &BTreeSet<String>,
) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM role_authorities WHERE role_name = $1")
        .bind(role_name)
        .execute(&mut *conn)
        .await?;

    sqlx::query("INSERT INTO roles (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
        .bind(role_name)
        .execute(&mut *conn)
        .await?;

    if authorities.is_empty() {
        return Ok(());
    }

    let authorities: Vec<String> = authorities.iter().cloned().collect();
    sqlx::query(
        r"
        INSERT INTO role_authorities (authority, role_name)
        SELECT authority, $2 FROM UNNEST($1::text[]) AS authority
        ",
    )
    .bind(authorities)
    .bind(role_name)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

#[async_trait]
impl AuthorityStore for PgAuthorityStore {
    #[tracing::instrument(skip(self))]
    async fn find_authorities_for_roles(
        &self,
        role_names: &BTreeSet<String>,
    ) -> Result<BTreeSet<String>, StorageError> {
        if role_names.is_empty() {
            return Ok(BTreeSet::new());
        }

        let role_names: Vec<String> = role_names.iter().cloned().collect();
        let authorities: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT authority FROM role_authorities WHERE role_name = ANY($1)",
        )
        .bind(role_names)
        .fetch_all(&self.pool)
        .await?;

        Ok(authorities.into_iter().collect())
    }

    #[tracing::instrument(skip(self))]
    async fn find_authorities_for_role(
        &self,
        role_name: &str,
    ) -> Result<BTreeSet<String>, StorageError> {
        let mut conn = self.pool.acquire().await?;
        Ok(select_role_authorities(&mut conn, role_name).await?)
    }

    #[tracing::instrument(skip(self))]
    async fn replace_authorities_for_role(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await?;
        lock_role(&mut tx, role_name).await?;
        write_role_authorities(&mut tx, role_name, authorities).await?;
        tx.commit().await?;
        Ok(())
    }

    #[tracing::instrument(skip(self))]
    async fn delete_authorities_for_role(&self, role_name: &str) -> Result<u64, StorageError> {
        let mut tx = self.pool.begin().await?;
        lock_role(&mut tx, role_name).await?;

        let result = sqlx::query("DELETE FROM role_authorities WHERE role_name = $1")
            .bind(role_name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }

    #[tracing::instrument(skip(self))]
    async fn list_assignments_for_role(
        &self,
        role_name: &str,
    ) -> Result<Vec<RoleAuthority>, StorageError> {
        let assignments = sqlx::query_as::<_, RoleAuthority>(
            r"
            SELECT authority, role_name
            FROM role_authorities
            WHERE role_name = $1
            ORDER BY authority ASC
            ",
        )
        .bind(role_name)
        .fetch_all(&self.pool)
        .await?;

        Ok(assignments)
    }

    #[tracing::instrument(skip(self, check))]
    async fn replace_authorities_for_role_checked(
        &self,
        role_name: &str,
        authorities: &BTreeSet<String>,
        check: RoleCheck<'_>,
    ) -> Result<(), AuthorityError> {
        let mut tx = self.pool.begin().await?;
        lock_role(&mut tx, role_name).await?;

        // Dropping `tx` on a refused check rolls back and releases the lock.
        let current = select_role_authorities(&mut tx, role_name).await?;
        check(&current)?;

        write_role_authorities(&mut tx, role_name, authorities).await?;
        tx.commit().await?;
        Ok(())
    }
}
