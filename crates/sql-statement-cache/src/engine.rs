//! Per-dialect parsing entry point

use std::sync::Arc;

use crate::Result;
use crate::cache::StatementCache;
use crate::config::Config;
use crate::parser::SqlParser;

/// Parses SQL for one dialect, going through a [`StatementCache`] unless the
/// caller opts out.
#[derive(Debug)]
pub struct StatementParserEngine<P: SqlParser> {
    cache: StatementCache<P>,
}

impl<P: SqlParser> StatementParserEngine<P> {
    pub fn new(config: &Config, parser: P) -> Result<Self> {
        Ok(Self {
            cache: StatementCache::new(config, parser)?,
        })
    }

    /// Parse `sql`. With `use_cache` false the parser is invoked directly
    /// and the result is neither read from nor written to the cache.
    pub fn parse(&self, sql: &str, use_cache: bool) -> Result<Arc<P::Statement>> {
        if use_cache {
            return self.cache.get(sql);
        }

        tracing::trace!(sql.len = sql.len(), "Parsing statement without cache");
        let statement = self.cache.parser().parse(
            self.cache.database_type(),
            sql,
            self.cache.sql_comment_parse_enabled(),
        )?;
        Ok(Arc::new(statement))
    }

    pub const fn cache(&self) -> &StatementCache<P> {
        &self.cache
    }
}
