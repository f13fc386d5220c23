//! Rolegate Server
//!
//! Role authority management. An actor can only grant or view authorities it
//! holds itself.

pub mod api;
pub mod auth;
pub mod authority;
pub mod config;
pub mod db;
