//! Error types for the proxy's internal plumbing.
//!
//! All errors are non-panicking and propagate via `Result`; the handler
//! is the only place that turns them into the externally observable
//! outcomes (a 503 page, or a silent close).

use thiserror::Error;

/// Internal proxy errors.
#[derive(Error, Debug)]
pub enum ProxyError {
    /// `uri` did not parse into a usable `(host, path, port)` triple.
    #[error("could not parse uri: {0}")]
    UriParse(String),

    /// Resolving or connecting to the origin failed.
    #[error("origin unreachable: {0}")]
    OriginUnreachable(#[source] std::io::Error),

    /// A read or write on the client socket failed mid-handler.
    #[error("client io error: {0}")]
    ClientIo(#[source] std::io::Error),
}

/// Result type alias using [`ProxyError`].
pub type Result<T> = std::result::Result<T, ProxyError>;
