//! Built-in role and authority names.

/// The administrator role. Its authorities cannot be changed through
/// role-authority updates, whoever asks.
pub const ADMIN_ROLE: &str = "ROLE_ADMIN";

/// View role authorities and the authority dependency tree.
pub const ROLE_AUTHORITY_READ: &str = "role-authority+read";

/// Replace the authorities of a role.
pub const ROLE_AUTHORITY_UPDATE: &str = "role-authority+update";
