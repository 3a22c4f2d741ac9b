/// namegate - tiered name resolution
///
/// An edge cache in front of a stateless resolution service in front of an
/// authoritative registry. Each hop can run in-process or as its own
/// process; see [`config::Role`].

pub mod api;
pub mod clock;
pub mod config;
pub mod context;
pub mod edge;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod rate_limit;
pub mod registry;
pub mod resolution;
pub mod server;
