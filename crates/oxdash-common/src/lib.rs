//! Shared data model for the oxdash alert management workspace.

pub mod types;
