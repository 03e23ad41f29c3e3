//! Collection cache.
//!
//! Holds the entries produced by each source, keyed by source and optional
//! scope. Nothing expires on a clock: a slot stays valid until something
//! invalidates it (a successful remediation or a manual refresh).

pub mod key;
pub mod store;

pub use key::CacheKey;
pub use store::{CacheStats, CollectionCache};
