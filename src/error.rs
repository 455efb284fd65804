use std::collections::TryReserveError;

use thiserror::Error;

/// Failure while producing the canonical argument string for a request.
#[derive(Debug, Error)]
pub enum CanonicalizeError {
    #[error("out of memory while canonicalizing query arguments: {0}")]
    OutOfMemory(#[from] TryReserveError),
}

/// Errors raised while assembling per-scope configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// `sorted_args_filter` given more than once for the same scope
    #[error("\"sorted_args_filter\" directive is duplicate in scope {0}")]
    Duplicate(String),

    /// `sorted_args_filter` given without any parameter names
    #[error("\"sorted_args_filter\" directive needs at least one parameter name in scope {0}")]
    Empty(String),

    #[error("location prefix {0:?} must start with '/'")]
    InvalidPrefix(String),

    #[error("location prefix {0:?} is declared twice")]
    DuplicateLocation(String),
}
