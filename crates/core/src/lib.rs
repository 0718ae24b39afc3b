//! # Costsync Core
//!
//! The reconciliation engine: rule and team resolvers, desired-state
//! construction, the plan/apply converger, cost-center provisioning,
//! and run reporting.
//!
//! All I/O happens behind the port traits in [`ports`]; the infra crate
//! provides the implementations. Everything here is deterministic given
//! the port responses, which keeps the engine unit-testable without a
//! network.

pub mod desired;
pub mod ports;
pub mod provision;
pub mod pru;
pub mod reconcile;
pub mod report;
pub mod teams;

#[cfg(test)]
mod test_support;

// Re-export the seams most callers need
pub use ports::{BillingApi, MappingCache, NoopCache};
pub use provision::Provisioner;
pub use pru::PruResolver;
pub use reconcile::{Reconciler, SyncOptions, SyncTarget};
pub use report::SyncReport;
pub use teams::TeamResolver;
