//! In-process memoization of calculator results
//!
//! Keys are a pure function of (calculator name, canonical parameters), so
//! identical requests are served without recomputation. Entries live until
//! evicted by size or dropped by an explicit clear; the cache is never shared
//! across processes. Concurrent requests for the same key are serialized so
//! only the first one computes.

mod in_flight;
mod key;
mod store;

pub use in_flight::{Claim, InFlight};
pub use key::CacheKey;
pub use store::{CacheStats, CachedResult, ResultCache};
