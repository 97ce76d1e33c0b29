//! SQL dialect identifiers

use std::fmt;
use std::str::FromStr;

use crate::Error;

/// Database dialect whose grammar a cache instance parses with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DatabaseType {
    #[default]
    MySql,
    MariaDb,
    PostgreSql,
    OpenGauss,
    Oracle,
    SqlServer,
    H2,
    Sql92,
}

impl DatabaseType {
    pub const ALL: [Self; 8] = [
        Self::MySql,
        Self::MariaDb,
        Self::PostgreSql,
        Self::OpenGauss,
        Self::Oracle,
        Self::SqlServer,
        Self::H2,
        Self::Sql92,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "MySQL",
            Self::MariaDb => "MariaDB",
            Self::PostgreSql => "PostgreSQL",
            Self::OpenGauss => "openGauss",
            Self::Oracle => "Oracle",
            Self::SqlServer => "SQLServer",
            Self::H2 => "H2",
            Self::Sql92 => "SQL92",
        }
    }
}

impl fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DatabaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_lowercase().as_str() {
            "mysql" => Self::MySql,
            "mariadb" => Self::MariaDb,
            "postgresql" | "postgres" => Self::PostgreSql,
            "opengauss" => Self::OpenGauss,
            "oracle" => Self::Oracle,
            "sqlserver" | "mssql" => Self::SqlServer,
            "h2" => Self::H2,
            "sql92" => Self::Sql92,
            _ => return Err(Error::config(format!("Unknown database type: {s}"))),
        })
    }
}
