//! Shared library surface for the route planner server, its binaries and tests.

pub mod api;
pub mod catalog_loader;
pub mod config;
pub mod elevation;
pub mod state;
