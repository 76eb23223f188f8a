//! VFR CLI - command line access to the route planner server.
//!
//! Binaries:
//! - plan_route: plan a route and print the itinerary

pub mod client;
pub mod itinerary;

pub use client::PlannerClient;
pub use itinerary::format_itinerary;
