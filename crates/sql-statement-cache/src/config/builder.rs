//! Configuration builder

use crate::Error;
use crate::dialect::DatabaseType;

pub const DEFAULT_INITIAL_CAPACITY: usize = 2000;
pub const DEFAULT_MAXIMUM_SIZE: u64 = 65535;
pub const DEFAULT_CONCURRENCY_LEVEL: usize = 4;

/// Sizing of a statement cache instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOption {
    /// Pre-sized bucket count; a performance hint, never a limit
    pub initial_capacity: usize,
    /// Hard upper bound on live entries
    pub maximum_size: u64,
    /// Number of independently locked partitions to aim for
    pub concurrency_level: usize,
    /// Total entry weight allowed before least-recently-used entries are evicted
    pub memory_budget: Option<usize>,
}

impl Default for CacheOption {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheOption {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            maximum_size: DEFAULT_MAXIMUM_SIZE,
            concurrency_level: DEFAULT_CONCURRENCY_LEVEL,
            memory_budget: None,
        }
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.initial_capacity == 0 {
            return Err(Error::config("initial_capacity must be positive"));
        }
        if self.maximum_size == 0 {
            return Err(Error::config("maximum_size must be positive"));
        }
        if usize::try_from(self.maximum_size).is_err() {
            return Err(Error::config(format!(
                "maximum_size {} exceeds addressable entries",
                self.maximum_size
            )));
        }
        if self.concurrency_level == 0 {
            return Err(Error::config("concurrency_level must be positive"));
        }
        if self.memory_budget == Some(0) {
            return Err(Error::config("memory_budget must be positive when set"));
        }
        Ok(())
    }
}

/// Statement cache configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub database_type: DatabaseType,
    pub sql_comment_parse_enabled: bool,
    pub cache: CacheOption,
}

impl Config {
    #[must_use]
    pub const fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    #[must_use]
    pub const fn database_type(&self) -> DatabaseType {
        self.database_type
    }

    #[must_use]
    pub const fn sql_comment_parse_enabled(&self) -> bool {
        self.sql_comment_parse_enabled
    }

    #[must_use]
    pub const fn cache(&self) -> &CacheOption {
        &self.cache
    }

    pub fn validate(&self) -> crate::Result<()> {
        self.cache.validate()
    }
}

/// Configuration builder with fluent API
#[derive(Debug)]
pub struct ConfigBuilder {
    database_type: DatabaseType,
    sql_comment_parse_enabled: bool,
    cache: CacheOption,
}

impl ConfigBuilder {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            database_type: DatabaseType::MySql,
            sql_comment_parse_enabled: false,
            cache: CacheOption::new(),
        }
    }

    #[must_use]
    pub const fn database_type(mut self, database_type: DatabaseType) -> Self {
        self.database_type = database_type;
        self
    }

    /// Hand comment text to the parser instead of stripping it
    #[must_use]
    pub const fn sql_comment_parse_enabled(mut self, enabled: bool) -> Self {
        self.sql_comment_parse_enabled = enabled;
        self
    }

    #[must_use]
    pub const fn cache_option(mut self, option: CacheOption) -> Self {
        self.cache = option;
        self
    }

    #[must_use]
    pub const fn initial_capacity(mut self, capacity: usize) -> Self {
        self.cache.initial_capacity = capacity;
        self
    }

    #[must_use]
    pub const fn maximum_size(mut self, size: u64) -> Self {
        self.cache.maximum_size = size;
        self
    }

    #[must_use]
    pub const fn concurrency_level(mut self, level: usize) -> Self {
        self.cache.concurrency_level = level;
        self
    }

    #[must_use]
    pub const fn memory_budget(mut self, budget: Option<usize>) -> Self {
        self.cache.memory_budget = budget;
        self
    }

    /// Build the configuration
    pub fn build(self) -> crate::Result<Config> {
        let config = Config {
            database_type: self.database_type,
            sql_comment_parse_enabled: self.sql_comment_parse_enabled,
            cache: self.cache,
        };
        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = ConfigBuilder::new().build().unwrap();

        assert_eq!(config.database_type, DatabaseType::MySql);
        assert!(!config.sql_comment_parse_enabled);
        assert_eq!(config.cache.initial_capacity, 2000);
        assert_eq!(config.cache.maximum_size, 65535);
        assert_eq!(config.cache.concurrency_level, 4);
        assert!(config.cache.memory_budget.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = ConfigBuilder::new()
            .database_type(DatabaseType::PostgreSql)
            .sql_comment_parse_enabled(true)
            .initial_capacity(16)
            .maximum_size(2)
            .concurrency_level(8)
            .memory_budget(Some(4096))
            .build()
            .unwrap();

        assert_eq!(config.database_type(), DatabaseType::PostgreSql);
        assert!(config.sql_comment_parse_enabled());
        assert_eq!(config.cache().initial_capacity, 16);
        assert_eq!(config.cache().maximum_size, 2);
        assert_eq!(config.cache().concurrency_level, 8);
        assert_eq!(config.cache().memory_budget, Some(4096));
    }

    #[test]
    fn test_builder_cache_option() {
        let option = CacheOption {
            initial_capacity: 128,
            maximum_size: 1024,
            concurrency_level: 2,
            memory_budget: None,
        };
        let config = ConfigBuilder::new().cache_option(option).build().unwrap();
        assert_eq!(config.cache, option);
    }

    #[test]
    fn test_builder_rejects_zero_maximum_size() {
        let err = ConfigBuilder::new().maximum_size(0).build().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("maximum_size"));
    }

    #[test]
    fn test_builder_rejects_zero_initial_capacity() {
        let err = ConfigBuilder::new().initial_capacity(0).build().unwrap_err();
        assert!(err.to_string().contains("initial_capacity"));
    }

    #[test]
    fn test_builder_rejects_zero_concurrency_level() {
        let err = ConfigBuilder::new().concurrency_level(0).build().unwrap_err();
        assert!(err.to_string().contains("concurrency_level"));
    }

    #[test]
    fn test_builder_rejects_zero_memory_budget() {
        let err = ConfigBuilder::new()
            .memory_budget(Some(0))
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("memory_budget"));
    }

    #[test]
    fn test_initial_capacity_may_exceed_maximum_size() {
        let config = ConfigBuilder::new()
            .initial_capacity(100)
            .maximum_size(10)
            .build();
        assert!(config.is_ok());
    }

    #[test]
    fn test_config_default_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config, Config::builder().build().unwrap());
    }

    #[test]
    fn test_builder_debug() {
        let builder = ConfigBuilder::default();
        assert!(format!("{builder:?}").contains("ConfigBuilder"));
    }
}
