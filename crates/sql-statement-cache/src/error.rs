use std::time::Duration;

use thiserror::Error;

/// Failure reported by a [`SqlParser`](crate::SqlParser) for a SQL text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ParseError {
    message: String,
    position: Option<usize>,
}

impl ParseError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    /// Attach the character offset where parsing stopped.
    #[must_use]
    pub const fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub const fn position(&self) -> Option<usize> {
        self.position
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timed out after {0:?} waiting for statement to be parsed")]
    Timeout(Duration),

    #[error("Statement load abandoned before completion")]
    LoadAbandoned,
}

impl Error {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    #[must_use]
    pub const fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    #[must_use]
    pub const fn is_load_abandoned(&self) -> bool {
        matches!(self, Self::LoadAbandoned)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
