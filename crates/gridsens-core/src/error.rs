//! Error types shared by the gridsens crates.
//!
//! [`GridError`] is the error returned at every library boundary. Narrower
//! error enums (network table mutations, linear backends) convert into it so
//! callers can use `?` across layers.
//!
//! # Example
//!
//! ```
//! use gridsens_core::{GridError, GridResult};
//!
//! fn require_branches(ids: &[String]) -> GridResult<()> {
//!     if ids.is_empty() {
//!         return Err(GridError::Validation("no monitored branch in the network".into()));
//!     }
//!     Ok(())
//! }
//!
//! assert!(require_branches(&[]).is_err());
//! ```

use thiserror::Error;

use crate::network::NetworkError;

/// Unified error type for gridsens operations.
#[derive(Error, Debug)]
pub enum GridError {
    /// I/O errors (file access)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Input data that cannot be processed (empty selections, unknown ids)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Power-flow or sensitivity backend failures
    #[error("Solver error: {0}")]
    Solver(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Element table errors (duplicate or unknown ids)
    #[error("Network error: {0}")]
    Network(String),

    /// Connection point could not be resolved (bus-breaker or busbar view)
    #[error("Topology error: {0}")]
    Topology(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using GridError.
pub type GridResult<T> = Result<T, GridError>;

impl From<NetworkError> for GridError {
    fn from(err: NetworkError) -> Self {
        match err {
            NetworkError::NodeBreakerTopology { .. }
            | NetworkError::BusBreakerTopology { .. }
            | NetworkError::NoBusbarSection { .. }
            | NetworkError::UnresolvedBus { .. } => GridError::Topology(err.to_string()),
            other => GridError::Network(other.to_string()),
        }
    }
}

impl From<anyhow::Error> for GridError {
    fn from(err: anyhow::Error) -> Self {
        GridError::Other(err.to_string())
    }
}

impl From<String> for GridError {
    fn from(s: String) -> Self {
        GridError::Other(s)
    }
}

impl From<&str> for GridError {
    fn from(s: &str) -> Self {
        GridError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for GridError {
    fn from(err: serde_json::Error) -> Self {
        GridError::Parse(err.to_string())
    }
}
