//! Bounded statement cache
//!
//! [`StatementCache`] maps exact SQL text to a parsed statement shared behind
//! an `Arc`.
//!
//! # Partitioning
//!
//! Keys are hashed onto a power-of-two number of segments derived from the
//! configured concurrency level. A segment never holds fewer than 20 slots,
//! so small caches collapse to a single segment with exact LRU ordering.
//!
//! # Loading
//!
//! A miss claims an in-flight slot under the segment lock, then parses with
//! the lock released. Callers arriving for the same SQL meanwhile wait on
//! that slot. The outcome, success or failure, is handed to all of them;
//! only successes are stored.

mod key;
mod loading;
mod segment;
mod statement_cache;
mod stats;


pub use key::CacheKey;
pub use statement_cache::StatementCache;
pub use stats::CacheStats;
