//! # Costsync Infrastructure
//!
//! Adapters behind the core port traits: the GitHub billing API
//! client, the persistent cost-center mapping cache, configuration
//! loading, and run-state tracking.

pub mod cache;
pub mod config;
pub mod github;
pub mod http;
pub mod state;

pub use cache::CostCenterCache;
pub use github::GitHubBillingClient;
pub use http::HttpClient;
pub use state::RunState;
