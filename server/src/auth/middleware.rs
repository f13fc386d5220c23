//! Authentication Middleware

use std::collections::BTreeSet;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;
use crate::authority::Actor;

use super::error::AuthError;
use super::jwt::validate_access_token;

/// Authenticated caller injected into request extensions.
///
/// The actor's authorities are resolved from its roles once per request and
/// are the only authority set handlers may consult.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Roles named in the token.
    pub roles: BTreeSet<String>,
    /// Login and resolved authorities.
    pub actor: Actor,
}

impl AuthUser {
    #[must_use]
    pub fn login(&self) -> &str {
        &self.actor.login
    }
}

/// Middleware to require authentication.
///
/// Extracts Bearer token from Authorization header, validates JWT,
/// resolves the actor's authorities from its roles, and injects `AuthUser`
/// into request extensions.
///
/// # Usage
///
/// ```ignore
/// Router::new()
///     .route("/protected", get(handler))
///     .layer(axum::middleware::from_fn_with_state(state, require_auth))
/// ```
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingAuthHeader)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidAuthHeader)?;

    let claims = validate_access_token(token, &state.config.jwt_secret)?;

    let roles: BTreeSet<String> = claims.roles.into_iter().collect();
    let actor = state.engine.resolve_actor(claims.sub, &roles).await?;

    tracing::debug!(
        login = %actor.login,
        authorities = actor.authorities.len(),
        "Resolved actor"
    );

    request.extensions_mut().insert(AuthUser { roles, actor });

    Ok(next.run(request).await)
}

/// Extractor for the authenticated caller in handlers.
///
/// ```ignore
/// async fn protected_handler(auth: AuthUser) -> impl IntoResponse {
///     format!("Hello, {}!", auth.login())
/// }
/// ```
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or(AuthError::MissingAuthHeader)
    }
}
