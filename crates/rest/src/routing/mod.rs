//! Route configuration for the registry API.
//!
//! This module maps HTTP paths to handlers.

pub mod registry_routes;

pub use registry_routes::create_routes;
