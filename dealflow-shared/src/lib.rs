//! # Dealflow Shared Library
//!
//! This crate contains the domain model, access-control rules, and
//! persistence layer behind the Dealflow API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing and JWT tokens
//! - `services`: Domain operations with their access rules applied
//! - `store`: Repository traits, Postgres and in-memory backends
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Dealflow shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
