//! Role authority handlers.

use std::collections::{BTreeMap, BTreeSet};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use thiserror::Error;
use tracing::warn;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::authority::{
    AccessDenied, AuthorityError, RoleAuthority, StorageError, ROLE_AUTHORITY_READ,
    ROLE_AUTHORITY_UPDATE,
};

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum RoleAuthorityError {
    #[error("Missing authority: {0}")]
    MissingAuthority(&'static str),

    #[error("Forbidden")]
    AccessDenied(#[from] AccessDenied),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error")]
    Storage(#[from] StorageError),
}

impl From<AuthorityError> for RoleAuthorityError {
    fn from(err: AuthorityError) -> Self {
        match err {
            AuthorityError::AccessDenied(denied) => Self::AccessDenied(denied),
            AuthorityError::Storage(e) => Self::Storage(e),
        }
    }
}

impl IntoResponse for RoleAuthorityError {
    fn into_response(self) -> Response {
        // Denials never echo which authorities were involved.
        let (status, body) = match &self {
            Self::MissingAuthority(required) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({
                    "error": "missing_authority",
                    "required": required,
                    "message": self.to_string()
                }),
            ),
            Self::AccessDenied(_) => (
                StatusCode::FORBIDDEN,
                serde_json::json!({"error": "access_denied", "message": "Forbidden"}),
            ),
            Self::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                serde_json::json!({"error": "validation", "message": msg}),
            ),
            Self::Storage(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                serde_json::json!({"error": "database", "message": "Database error"}),
            ),
        };
        (status, Json(body)).into_response()
    }
}

fn require_authority(
    auth: &AuthUser,
    authority: &'static str,
) -> Result<(), RoleAuthorityError> {
    if auth.actor.holds(authority) {
        Ok(())
    } else {
        Err(RoleAuthorityError::MissingAuthority(authority))
    }
}

fn validate_role_name(role_name: &str) -> Result<(), RoleAuthorityError> {
    if role_name.trim().is_empty() {
        return Err(RoleAuthorityError::Validation(
            "Role name must not be blank".to_string(),
        ));
    }
    Ok(())
}

fn validate_authorities(authorities: &[String]) -> Result<(), RoleAuthorityError> {
    if let Some(bad) = authorities.iter().find(|a| a.trim().is_empty()) {
        return Err(RoleAuthorityError::Validation(format!(
            "Authority names must not be blank (got {bad:?})"
        )));
    }
    Ok(())
}

// ============================================================================
// Router
// ============================================================================

/// Static path segment of the dependency view. Also a legal role name.
const DEPENDENCIES_SEGMENT: &str = "authorities-dependencies";

/// Role authority routes, nested under `/api/role-authorities`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/authorities-dependencies",
            get(get_authorities_dependencies).put(update_dependencies_named_role),
        )
        .route(
            "/{role_name}",
            get(get_role_authorities).put(update_role_authorities),
        )
        .route("/{role_name}/assignments", get(list_role_assignments))
}

// ============================================================================
// Handlers
// ============================================================================

/// Authority dependency tree, restricted to the caller's authorities.
///
/// `GET /api/role-authorities/authorities-dependencies`
#[tracing::instrument(skip(state, auth), fields(login = %auth.login()))]
pub async fn get_authorities_dependencies(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<BTreeMap<String, Vec<String>>>, RoleAuthorityError> {
    require_authority(&auth, ROLE_AUTHORITY_READ)?;

    Ok(Json(state.engine.get_authorities_dependencies(&auth.actor)))
}

/// Authorities of a role that the caller also holds.
///
/// `GET /api/role-authorities/:role_name`
#[tracing::instrument(skip(state, auth), fields(login = %auth.login()))]
pub async fn get_role_authorities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_name): Path<String>,
) -> Result<Json<BTreeSet<String>>, RoleAuthorityError> {
    require_authority(&auth, ROLE_AUTHORITY_READ)?;

    let authorities = state
        .engine
        .find_authorities_visible_for_role(&auth.actor, &role_name)
        .await?;

    Ok(Json(authorities))
}

/// Assignment records of a role that the caller can see.
///
/// `GET /api/role-authorities/:role_name/assignments`
#[tracing::instrument(skip(state, auth), fields(login = %auth.login()))]
pub async fn list_role_assignments(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_name): Path<String>,
) -> Result<Json<Vec<RoleAuthority>>, RoleAuthorityError> {
    require_authority(&auth, ROLE_AUTHORITY_READ)?;

    let assignments = state
        .engine
        .list_visible_assignments(&auth.actor, &role_name)
        .await?;

    Ok(Json(assignments))
}

/// Replace the authorities of a role.
///
/// `PUT /api/role-authorities/:role_name`
///
/// Body: JSON array of authority names. Responds with the role's new
/// authority set.
#[tracing::instrument(skip(state, auth, authorities), fields(login = %auth.login()))]
pub async fn update_role_authorities(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(role_name): Path<String>,
    Json(authorities): Json<Vec<String>>,
) -> Result<Json<BTreeSet<String>>, RoleAuthorityError> {
    replace_role_authorities(&state, &auth, &role_name, authorities).await
}

/// `PUT /api/role-authorities/authorities-dependencies`
///
/// The static dependency route shadows `/:role_name`; writes to the role of
/// that name land here.
#[tracing::instrument(skip(state, auth, authorities), fields(login = %auth.login()))]
pub async fn update_dependencies_named_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(authorities): Json<Vec<String>>,
) -> Result<Json<BTreeSet<String>>, RoleAuthorityError> {
    replace_role_authorities(&state, &auth, DEPENDENCIES_SEGMENT, authorities).await
}

async fn replace_role_authorities(
    state: &AppState,
    auth: &AuthUser,
    role_name: &str,
    authorities: Vec<String>,
) -> Result<Json<BTreeSet<String>>, RoleAuthorityError> {
    require_authority(auth, ROLE_AUTHORITY_UPDATE)?;
    validate_role_name(role_name)?;
    validate_authorities(&authorities)?;

    if let Err(err) = state
        .engine
        .update_role_authorities(&auth.actor, role_name, &authorities)
        .await
    {
        if let Some(denied) = err.as_denial() {
            warn!(
                actor = %denied.actor,
                roles = ?auth.roles,
                role = %denied.role,
                requested = ?denied.requested,
                actor_authorities = ?denied.actor_authorities,
                reason = %denied.reason,
                "Role authority update denied"
            );
        }
        return Err(err.into());
    }

    tracing::info!(role = %role_name, count = authorities.len(), "Role authorities replaced");

    Ok(Json(authorities.into_iter().collect()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_authority_rejected() {
        let result = validate_authorities(&["read".to_string(), "  ".to_string()]);
        assert!(matches!(result, Err(RoleAuthorityError::Validation(_))));
    }

    #[test]
    fn test_blank_role_name_rejected() {
        assert!(matches!(
            validate_role_name(" "),
            Err(RoleAuthorityError::Validation(_))
        ));
        assert!(validate_role_name("ROLE_EDITOR").is_ok());
    }

    #[test]
    fn test_empty_request_is_valid() {
        assert!(validate_authorities(&[]).is_ok());
    }

    #[test]
    fn test_denial_response_is_forbidden_without_detail() {
        use crate::authority::DenialReason;

        let err = RoleAuthorityError::from(AuthorityError::AccessDenied(AccessDenied {
            actor: "alice".into(),
            role: "ROLE_EDITOR".into(),
            requested: vec!["secret+read".into()],
            actor_authorities: BTreeSet::new(),
            reason: DenialReason::CannotEscalate(BTreeSet::from(["secret+read".to_string()])),
        }));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_storage_error_is_server_error() {
        let err = RoleAuthorityError::from(AuthorityError::from(sqlx::Error::PoolTimedOut));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
