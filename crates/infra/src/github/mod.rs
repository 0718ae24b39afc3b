//! GitHub billing API adapter

mod client;

pub use client::GitHubBillingClient;
