//! TOML configuration file loading

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::builder::ConfigBuilder;
use crate::Result;
use crate::dialect::DatabaseType;

/// Configuration file locations checked in order
const CONFIG_PATHS: &[&str] = &[
    "./sql-statement-cache.toml",
    "~/.config/sql-statement-cache/config.toml",
    "/etc/sql-statement-cache/config.toml",
];

/// Find the first existing configuration file
pub fn find_config_file() -> Option<PathBuf> {
    for path_str in CONFIG_PATHS {
        let path = if path_str.starts_with('~') {
            if let Ok(home) = std::env::var("HOME") {
                PathBuf::from(path_str.replacen('~', &home, 1))
            } else {
                continue;
            }
        } else {
            PathBuf::from(path_str)
        };

        if path.exists() {
            return Some(path);
        }
    }
    None
}

/// Load configuration from a TOML file
pub fn load_from_file(path: &Path, builder: ConfigBuilder) -> Result<ConfigBuilder> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let file_config: FileConfig = toml::from_str(&content).map_err(|e| {
        crate::Error::Config(format!(
            "Failed to parse config file {}: {}",
            path.display(),
            e
        ))
    })?;

    apply_file_config(builder, file_config)
}

fn apply_file_config(mut builder: ConfigBuilder, config: FileConfig) -> Result<ConfigBuilder> {
    if let Some(parser) = config.parser {
        if let Some(name) = parser.database_type {
            builder = builder.database_type(name.parse::<DatabaseType>()?);
        }

        if let Some(enabled) = parser.sql_comment_parse_enabled {
            builder = builder.sql_comment_parse_enabled(enabled);
        }
    }

    if let Some(cache) = config.sql_statement_cache {
        if let Some(capacity) = cache.initial_capacity {
            builder = builder.initial_capacity(capacity);
        }

        if let Some(size) = cache.maximum_size {
            builder = builder.maximum_size(size);
        }

        if let Some(level) = cache.concurrency_level {
            builder = builder.concurrency_level(level);
        }

        if let Some(budget) = cache.memory_budget_bytes {
            builder = builder.memory_budget(Some(budget));
        }
    }

    Ok(builder)
}

/// Root configuration file structure
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    parser: Option<ParserFileConfig>,
    sql_statement_cache: Option<CacheFileConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ParserFileConfig {
    database_type: Option<String>,
    sql_comment_parse_enabled: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct CacheFileConfig {
    initial_capacity: Option<usize>,
    maximum_size: Option<u64>,
    concurrency_level: Option<usize>,
    memory_budget_bytes: Option<usize>,
}
