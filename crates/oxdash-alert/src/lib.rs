//! Tenant-scoped alert management.
//!
//! [`service::AlertService`] is the entry point used by the API layer. It
//! combines:
//!
//! - [`guard::AccessGuard`]: resolves an alert and checks that the caller's
//!   organization owns it.
//! - [`transition::StateTransitionService`]: commits state changes and their
//!   log entries atomically, one request at a time per alert.
//! - [`decorate`]: enriches alert listings with dashboard URIs through a
//!   single batched [`decorate::DashboardResolver`] call.

pub mod decorate;
pub mod error;
pub mod guard;
pub mod locks;
pub mod service;
pub mod transition;

#[cfg(test)]
mod tests;

pub use error::{AlertError, Result};
pub use service::{AlertService, AlertServiceOptions};
