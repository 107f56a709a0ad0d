//! Authentication primitives.
//!
//! - [`jwt`]: signed, time-limited access/refresh tokens (HS256)
//! - [`password`]: Argon2id password hashing and verification
//!
//! Both modules expose recoverable errors only; nothing here panics on bad
//! input. Token validation deliberately collapses every failure mode into
//! one opaque error so callers cannot distinguish an expired token from a
//! forged one.

pub mod jwt;
pub mod password;
