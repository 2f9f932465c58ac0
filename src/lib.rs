//! Tool crib inventory service.
//!
//! An admin-facing API for a workshop tool crib: categories, employees, and
//! tool definitions with individually tracked physical units. Units are
//! issued to employees ("outward"), returned ("inward"), and every completed
//! loan lands in an append-only history ledger. A dashboard summarises stock
//! levels and a server-sent event feed pushes every mutation to connected
//! admin screens.
//!
//! Crate layout:
//! - [`crib_store`] (workspace member) holds the records, storage traits, and
//!   the in-memory backend.
//! - [`crib_auth`] (workspace member) holds sessions, step-up confirmation,
//!   and their middleware.
//! - This crate holds the domain services ([`registry`], [`workflow`],
//!   [`ledger`], [`catalog`], [`dashboard`]) and the [`http`] surface.

pub mod catalog;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod http;
pub mod ledger;
pub mod registry;
pub mod workflow;

pub use config::Config;
pub use error::{CribError, CribResult};
pub use http::{build_router, AppState};
