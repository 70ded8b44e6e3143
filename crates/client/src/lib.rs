//! Clients for the two backend services a job depends on.
//!
//! - [`JobExecutionClient`] submits jobs to, and queries, the execution
//!   service.
//! - [`DataTransferClient`] pushes input archives to, and pulls output
//!   archives from, the data-transfer service.
//!
//! Both send through a [`Transport`]; [`HttpTransport`] is the production
//! implementation. [`ServiceClients`] builds the pair from a
//! [`ServiceConfig`] so callers can hold them in their own state instead of
//! reaching for globals.

pub mod config;
pub mod data;
pub mod error;
pub mod execution;
pub mod literal;
pub mod transport;

pub use config::{ConfigError, ServiceConfig};
pub use data::{DataRequest, DataTransferClient};
pub use error::{ServiceError, ServiceKind};
pub use execution::{ExecutionRequest, JobExecutionClient};
pub use transport::{HttpTransport, RawResponse, RequestBody, ServiceRequest, Transport};

/// Parsed JSON object returned by run, status, and push.
pub type ServiceResponse = serde_json::Map<String, serde_json::Value>;

/// Both service clients, sharing one transport.
pub struct ServiceClients<T = HttpTransport> {
    pub execution: JobExecutionClient<T>,
    pub data: DataTransferClient<T>,
}

impl ServiceClients<HttpTransport> {
    /// Build HTTP-backed clients for the endpoints in `config`.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, ServiceError> {
        let transport = HttpTransport::new(config.connect_timeout)?;
        Ok(Self {
            execution: JobExecutionClient::with_transport(
                transport.clone(),
                config.execution_url.as_str(),
            ),
            data: DataTransferClient::with_transport(transport, config.data_url.as_str()),
        })
    }
}
