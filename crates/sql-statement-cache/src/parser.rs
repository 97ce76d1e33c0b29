//! Miss-handler seam between the cache and a SQL grammar

use std::fmt;
use std::marker::PhantomData;

use crate::dialect::DatabaseType;
use crate::error::ParseError;

/// Parser invoked by the cache when a SQL text has no live entry.
///
/// Implementations must be callable from many threads at once. A call may be
/// slow or fail; the cache guarantees it is made at most once concurrently
/// for any given SQL text.
pub trait SqlParser: Send + Sync {
    /// Parsed representation shared between callers behind an `Arc`
    type Statement: Send + Sync + 'static;

    fn parse(
        &self,
        database_type: DatabaseType,
        sql: &str,
        parse_comments: bool,
    ) -> Result<Self::Statement, ParseError>;

    /// Footprint of a parsed statement, counted against the memory budget.
    ///
    /// The default only accounts for the inline size of the value; parsers
    /// producing heap-heavy trees should override it.
    fn statement_weight(&self, _statement: &Self::Statement) -> usize {
        size_of::<Self::Statement>()
    }
}

/// Adapter turning a closure into a [`SqlParser`]
pub struct FnParser<F, S> {
    parse: F,
    _statement: PhantomData<fn() -> S>,
}

impl<F, S> FnParser<F, S>
where
    F: Fn(DatabaseType, &str, bool) -> Result<S, ParseError> + Send + Sync,
    S: Send + Sync + 'static,
{
    pub const fn new(parse: F) -> Self {
        Self {
            parse,
            _statement: PhantomData,
        }
    }
}

impl<F, S> fmt::Debug for FnParser<F, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnParser").finish_non_exhaustive()
    }
}

impl<F, S> SqlParser for FnParser<F, S>
where
    F: Fn(DatabaseType, &str, bool) -> Result<S, ParseError> + Send + Sync,
    S: Send + Sync + 'static,
{
    type Statement = S;

    fn parse(
        &self,
        database_type: DatabaseType,
        sql: &str,
        parse_comments: bool,
    ) -> Result<S, ParseError> {
        (self.parse)(database_type, sql, parse_comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_parser_forwards_arguments() {
        let parser = FnParser::new(|database_type: DatabaseType, sql: &str, comments: bool| {
            Ok(format!("{database_type}|{sql}|{comments}"))
        });

        let parsed = parser
            .parse(DatabaseType::PostgreSql, "SELECT 1", true)
            .unwrap();
        assert_eq!(parsed, "PostgreSQL|SELECT 1|true");
    }

    #[test]
    fn test_fn_parser_propagates_error() {
        let parser = FnParser::new(|_: DatabaseType, sql: &str, _: bool| -> Result<(), _> {
            Err(ParseError::new(format!("cannot parse {sql}")).at(0))
        });

        let err = parser.parse(DatabaseType::MySql, "SELEC", false).unwrap_err();
        assert_eq!(err.message(), "cannot parse SELEC");
        assert_eq!(err.position(), Some(0));
    }

    #[test]
    fn test_default_statement_weight() {
        let parser = FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(0u64));
        assert_eq!(parser.statement_weight(&7), 8);
    }

    #[test]
    fn test_fn_parser_debug() {
        let parser = FnParser::new(|_: DatabaseType, _: &str, _: bool| Ok(()));
        assert!(format!("{parser:?}").contains("FnParser"));
    }
}
