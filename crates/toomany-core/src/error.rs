//! Error types for toomany-core

use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias for toomany operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the stub server
#[derive(Debug, Error)]
pub enum Error {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Host and port do not form a socket address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Invalid HTTP method
    #[error("Invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_error_message() {
        let err = Error::Bind {
            addr: "0.0.0.0:8000".parse().unwrap(),
            source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
        };
        let msg = err.to_string();
        assert!(msg.starts_with("failed to bind 0.0.0.0:8000: "));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_conversion() {
        let err: Error = std::io::Error::other("boom").into();
        assert_eq!(err.to_string(), "IO error: boom");
    }
}
