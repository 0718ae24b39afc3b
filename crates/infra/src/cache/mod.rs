//! Persistent cost-center mapping cache

mod clock;
mod store;

pub use clock::{Clock, MockClock, SystemClock};
pub use store::{CacheStats, CostCenterCache};
