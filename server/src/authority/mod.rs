//! Role authority assignment.
//!
//! - Store: durable (authority, role) assignments, `PostgreSQL` or in-memory
//! - Engine: escalation-safe updates and actor-filtered views
//! - Tree: static authority dependency configuration

pub mod constants;
pub mod engine;
pub mod error;
pub mod memory;
pub mod models;
pub mod queries;
pub mod store;
pub mod tree;

pub use constants::{ADMIN_ROLE, ROLE_AUTHORITY_READ, ROLE_AUTHORITY_UPDATE};
pub use engine::AuthorizationEngine;
pub use error::{AccessDenied, AuthorityError, DenialReason, StorageError};
pub use memory::InMemoryAuthorityStore;
pub use models::{Actor, RoleAuthority};
pub use queries::PgAuthorityStore;
pub use store::{AuthorityStore, RoleCheck};
pub use tree::AuthorityDependencyTree;
