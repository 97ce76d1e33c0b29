//! Concurrent, bounded cache of parsed SQL statements
//!
//! A [`StatementCache`] maps exact SQL text to the statement produced by a
//! [`SqlParser`], so repeated SQL is parsed once. Each cache is bound to one
//! [`DatabaseType`] and one comment-handling mode.
//!
//! # Example
//!
//! ```
//! use sql_statement_cache::{Config, DatabaseType, FnParser, ParseError, StatementCache};
//!
//! let config = Config::builder()
//!     .database_type(DatabaseType::PostgreSql)
//!     .maximum_size(1024)
//!     .build()?;
//!
//! let parser = FnParser::new(|_: DatabaseType, sql: &str, _: bool| {
//!     if sql.is_empty() {
//!         Err(ParseError::new("empty statement"))
//!     } else {
//!         Ok(sql.split_whitespace().count())
//!     }
//! });
//!
//! let cache = StatementCache::new(&config, parser)?;
//! assert_eq!(*cache.get("SELECT id FROM users")?, 4);
//! assert!(cache.contains("SELECT id FROM users"));
//! # Ok::<(), sql_statement_cache::Error>(())
//! ```
//!
//! # Features
//!
//! - `metrics`: publish hit, miss, load and eviction metrics through the
//!   [`metrics`](https://docs.rs/metrics) facade

pub mod cache;
pub mod config;
mod dialect;
mod engine;
mod error;
#[cfg(feature = "metrics")]
pub mod observability;
mod parser;

pub use cache::{CacheKey, CacheStats, StatementCache};
pub use config::{CacheOption, Config, ConfigBuilder, load_config, load_config_from_path};
pub use dialect::DatabaseType;
pub use engine::StatementParserEngine;
pub use error::{Error, ParseError, Result};
pub use parser::{FnParser, SqlParser};
