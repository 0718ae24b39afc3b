//! # Costsync Domain
//!
//! Business domain types and models for costsync.
//!
//! This crate contains:
//! - Domain data types (CopilotUser, Team, CostCenter, etc.)
//! - Domain error types and Result definitions
//! - Configuration structures and their validation
//!
//! ## Architecture
//! - No dependencies on other costsync crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod errors;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
