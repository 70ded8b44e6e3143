use std::time::Duration;

use crate::transport::DEFAULT_CONNECT_TIMEOUT;

/// Endpoints and connection settings for the backend services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Base URL of the execution service.
    pub execution_url: String,
    /// Base URL of the data-transfer service.
    pub data_url: String,
    /// Maximum time to wait while establishing a connection.
    pub connect_timeout: Duration,
}

/// Errors from loading [`ServiceConfig`] out of the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

impl ServiceConfig {
    pub fn new(execution_url: impl Into<String>, data_url: impl Into<String>) -> Self {
        Self {
            execution_url: execution_url.into(),
            data_url: data_url.into(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                        | Default |
    /// |--------------------------------|---------|
    /// | `COMPUTE_SERVICE_URL`          | --      |
    /// | `DATA_SERVICE_URL`             | --      |
    /// | `SERVICE_CONNECT_TIMEOUT_SECS` | `1000`  |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let execution_url = required("COMPUTE_SERVICE_URL")?;
        let data_url = required("DATA_SERVICE_URL")?;

        let connect_timeout = match lookup("SERVICE_CONNECT_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::Invalid {
                    name: "SERVICE_CONNECT_TIMEOUT_SECS",
                    expected: "a whole number of seconds",
                    value: raw.clone(),
                })?;
                Duration::from_secs(secs)
            }
            None => DEFAULT_CONNECT_TIMEOUT,
        };

        Ok(Self {
            execution_url,
            data_url,
            connect_timeout,
        })
    }
}
