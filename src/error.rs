//! Unified error type for all store operations.

/// Things that can go wrong when using the store.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Operation attempted before a successful `connect()`.
    NotReady,
    /// Failure raised by the database collaborator (network, auth, bad query).
    /// Propagated unchanged; nothing is retried.
    Upstream(String),
    /// A dotted path that doesn't fit the shape of the value it was applied
    /// to — indexing into a scalar, an empty path, or a missing document
    /// where one is required.
    InvalidPath(String),
    /// Bad configuration (empty address, database, or collection name).
    Config(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::NotReady => write!(f, "store is not connected; call connect() first"),
            Error::Upstream(msg) => write!(f, "upstream database error: {msg}"),
            Error::InvalidPath(msg) => write!(f, "invalid path: {msg}"),
            Error::Config(msg) => write!(f, "config error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Result alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;
