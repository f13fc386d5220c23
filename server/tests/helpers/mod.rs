//! Reusable test helpers for HTTP integration tests.
//!
//! Provides `TestApp` for building and sending requests through the full axum
//! router over an in-memory role authority store, plus token generation.
#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{self, Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use rolegate_server::api::{create_router, AppState};
use rolegate_server::auth::jwt;
use rolegate_server::authority::{
    AuthorityDependencyTree, AuthorityStore, AuthorizationEngine, InMemoryAuthorityStore,
};
use rolegate_server::config::Config;
use tower::ServiceExt;

/// A test application wrapping the full axum router.
pub struct TestApp {
    pub router: Router,
    pub store: Arc<InMemoryAuthorityStore>,
    pub config: Arc<Config>,
}

impl TestApp {
    /// Create a test app over a store seeded with `(role, authorities)` pairs.
    pub fn with_roles<I, R, D, A>(roles: I) -> Self
    where
        I: IntoIterator<Item = (R, D)>,
        R: Into<String>,
        D: IntoIterator<Item = A>,
        A: Into<String>,
    {
        Self::with_tree(roles, AuthorityDependencyTree::default())
    }

    /// Same as [`TestApp::with_roles`] with a custom dependency tree.
    pub fn with_tree<I, R, D, A>(roles: I, tree: AuthorityDependencyTree) -> Self
    where
        I: IntoIterator<Item = (R, D)>,
        R: Into<String>,
        D: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let store = Arc::new(InMemoryAuthorityStore::with_roles(roles));
        let config = Config::default_for_test();
        let engine = AuthorizationEngine::new(store.clone(), tree);
        let router = create_router(AppState::new(engine, config.clone()));

        Self {
            router,
            store,
            config: Arc::new(config),
        }
    }

    /// Create a test app over an arbitrary store.
    pub fn with_store(store: Arc<dyn AuthorityStore>) -> Self {
        let config = Config::default_for_test();
        let engine = AuthorizationEngine::new(store, AuthorityDependencyTree::default());
        let router = create_router(AppState::new(engine, config.clone()));

        Self {
            router,
            store: Arc::new(InMemoryAuthorityStore::new()),
            config: Arc::new(config),
        }
    }

    /// Sign an access token for `login` holding `roles`.
    pub fn token(&self, login: &str, roles: &[&str]) -> String {
        let roles: Vec<String> = roles.iter().map(|r| (*r).to_string()).collect();
        jwt::generate_access_token(login, &roles, &self.config.jwt_secret, 900)
            .expect("Failed to generate access token")
    }

    /// Build an HTTP request with the given method and URI.
    pub fn request(method: Method, uri: &str) -> http::request::Builder {
        Request::builder().method(method).uri(uri)
    }

    /// Authenticated GET.
    pub fn get(uri: &str, token: &str) -> Request<Body> {
        Self::request(Method::GET, uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    /// Authenticated PUT with a JSON array of authorities.
    pub fn put_authorities(uri: &str, token: &str, authorities: &[&str]) -> Request<Body> {
        Self::request(Method::PUT, uri)
            .header("Authorization", format!("Bearer {token}"))
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_string(authorities).unwrap()))
            .unwrap()
    }

    /// Send a request through the router via `tower::ServiceExt::oneshot`.
    pub async fn oneshot(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot request failed")
    }
}

/// Read a response body as JSON.
pub async fn body_to_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to collect response body")
        .to_bytes();
    serde_json::from_slice(&bytes).unwrap_or_else(|e| {
        let preview = String::from_utf8_lossy(&bytes);
        panic!("Failed to parse response as JSON: {e}\nBody: {preview}")
    })
}
