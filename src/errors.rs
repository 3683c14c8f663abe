//! MiniCluster Error Hierarchy
//!
//! Recoverable failures surfaced by cluster lifecycle and convergence-wait
//! operations. Accessor index violations are not represented here: they are
//! test-author bugs and abort via `panic!` instead.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Caller violated an operation precondition (cluster not running,
    /// negative sizing, double start)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Root or per-component directory could not be allocated
    #[error("Failed to allocate path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Socket level failures of the bundled loopback services
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// A master or tablet-server instance failed to initiate
    #[error("{component} failed to start: {reason}")]
    StartupFailure { component: String, reason: String },

    /// A convergence wait reached its deadline
    #[error("Timed out after {waited:?} waiting for {what} (last observed: {observed})")]
    TimedOut {
        what: String,
        waited: Duration,
        observed: usize,
    },

    /// Cluster configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Loopback protocol failures between tablet servers and the master
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Tablet-server metadata store failures
    #[error("Metadata store error: {0}")]
    Storage(String),
}

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("Frame of {0} bytes exceeds the maximum frame size")]
    FrameTooLarge(usize),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error(transparent)]
    Bincode(#[from] bincode::Error),
}

impl Error {
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Error::TimedOut { .. })
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Error::InvalidArgument(_))
    }

    pub fn is_startup_failure(&self) -> bool {
        matches!(self, Error::StartupFailure { .. })
    }

    pub(crate) fn startup(
        component: impl Into<String>,
        reason: impl ToString,
    ) -> Self {
        Error::StartupFailure {
            component: component.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<sled::Error> for Error {
    fn from(err: sled::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<bincode::Error> for Error {
    fn from(err: bincode::Error) -> Self {
        WireError::Bincode(err).into()
    }
}
