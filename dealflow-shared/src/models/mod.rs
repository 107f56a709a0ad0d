//! Domain models for dealflow.
//!
//! Each tenant-scoped entity carries an `organization_id` foreign key; the
//! organization is the authorization boundary for everything it owns.
//!
//! # Models
//!
//! - `user`: accounts and credentials
//! - `organization`: the tenant boundary
//! - `membership`: (organization, user, role) relation for RBAC
//! - `contact`: people and companies tracked per organization
//! - `deal`: sales opportunities tied to a contact
//! - `task`: work items, optionally tied to a deal/contact/assignee
//! - `activity`: append-only log of domain events

pub mod activity;
pub mod contact;
pub mod deal;
pub mod membership;
pub mod organization;
pub mod task;
pub mod user;
