//! Pool persistence error types

/// Errors from loading and persisting the pool document.
///
/// Selection exhaustion is deliberately not an error: `select` returns
/// `None` and the caller degrades to its default configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("pool file I/O: {0}")]
    Io(String),

    #[error("pool file parse: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, Error>;
