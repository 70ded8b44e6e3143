//! Error and service-identity types shared by both service clients.

use std::fmt;

use jobgate_core::CoreError;

/// Which backend service an exchange was addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    /// Runs containerized plugin jobs.
    Execution,
    /// Moves zipped data sets in and out of job directories.
    DataTransfer,
}

impl ServiceKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Execution => "execution",
            Self::DataTransfer => "data-transfer",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Errors surfaced by the service clients.
///
/// Nothing is retried or recovered; every failure reaches the caller as
/// one of these variants.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The exchange itself failed (connection refused, DNS, timeout, protocol).
    #[error("Error in talking to {service} service: {source}")]
    Transport {
        service: ServiceKind,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-2xx status code.
    #[error("{service} service returned HTTP {status}: {body}")]
    Status {
        service: ServiceKind,
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The response body could not be interpreted, or the request could
    /// not be encoded.
    #[error("Malformed exchange with {service} service: {message}")]
    Protocol {
        service: ServiceKind,
        message: String,
    },

    /// The operation has no remote counterpart.
    #[error("{operation} is not supported by the {service} service")]
    Unsupported {
        service: ServiceKind,
        operation: &'static str,
    },

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),

    /// A domain error raised before anything was sent.
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl ServiceError {
    /// The service involved, when the error came from a remote exchange.
    pub fn service(&self) -> Option<ServiceKind> {
        match self {
            Self::Transport { service, .. }
            | Self::Status { service, .. }
            | Self::Protocol { service, .. }
            | Self::Unsupported { service, .. } => Some(*service),
            Self::ClientBuild(_) | Self::Core(_) => None,
        }
    }
}
