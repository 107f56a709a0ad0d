//! API route handlers.
//!
//! Handlers stay thin: parse the request, call the matching service, map
//! the result to a response. Access decisions live in the service layer.

pub mod activities;
pub mod analytics;
pub mod auth;
pub mod contacts;
pub mod deals;
pub mod health;
pub mod organizations;
pub mod tasks;
