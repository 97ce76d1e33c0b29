//! Environment variable loading for configuration

use std::env;
use std::str::FromStr;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::dialect::DatabaseType;

/// Environment variable names
mod vars {
    pub const SQL_DATABASE_TYPE: &str = "SQL_DATABASE_TYPE";
    pub const SQL_COMMENT_PARSE_ENABLED: &str = "SQL_COMMENT_PARSE_ENABLED";
    pub const SQL_CACHE_INITIAL_CAPACITY: &str = "SQL_CACHE_INITIAL_CAPACITY";
    pub const SQL_CACHE_MAXIMUM_SIZE: &str = "SQL_CACHE_MAXIMUM_SIZE";
    pub const SQL_CACHE_CONCURRENCY_LEVEL: &str = "SQL_CACHE_CONCURRENCY_LEVEL";
    pub const SQL_CACHE_MEMORY_BUDGET_BYTES: &str = "SQL_CACHE_MEMORY_BUDGET_BYTES";
}

/// Load configuration from environment variables
pub fn load_from_env(mut builder: ConfigBuilder) -> Result<ConfigBuilder> {
    if let Ok(name) = env::var(vars::SQL_DATABASE_TYPE) {
        builder = builder.database_type(name.parse::<DatabaseType>()?);
    }

    if let Ok(val) = env::var(vars::SQL_COMMENT_PARSE_ENABLED) {
        builder = builder.sql_comment_parse_enabled(parse_bool(&val));
    }

    if let Some(capacity) = parse_var::<usize>(vars::SQL_CACHE_INITIAL_CAPACITY)? {
        builder = builder.initial_capacity(capacity);
    }

    if let Some(size) = parse_var::<u64>(vars::SQL_CACHE_MAXIMUM_SIZE)? {
        builder = builder.maximum_size(size);
    }

    if let Some(level) = parse_var::<usize>(vars::SQL_CACHE_CONCURRENCY_LEVEL)? {
        builder = builder.concurrency_level(level);
    }

    if let Some(budget) = parse_var::<usize>(vars::SQL_CACHE_MEMORY_BUDGET_BYTES)? {
        builder = builder.memory_budget(Some(budget));
    }

    Ok(builder)
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>> {
    let Ok(raw) = env::var(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| crate::Error::Config(format!("Invalid {name}: {raw}")))
}

fn parse_bool(s: &str) -> bool {
    matches!(s.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}
