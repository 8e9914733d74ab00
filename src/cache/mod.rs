//! Time-expiring cache of condition results.
//!
//! Keys are normalized expression text. Two conditions authored differently
//! but normalizing to the same text share an entry, since a condition is a
//! pure function of its resolved text and the process-wide context.
//!
//! The TTL is controlled via `condeval.toml`:
//!
//! ```toml
//! [evaluator]
//! result_ttl_seconds = 300
//! ```

mod store;

pub use store::ResultCache;
pub(crate) use store::{
    METRIC_RESULT_CACHE_EXPIRED, METRIC_RESULT_CACHE_HIT, METRIC_RESULT_CACHE_MISS,
};
