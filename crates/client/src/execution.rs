//! Client for the job-execution service.
//!
//! The service expects every request as a JSON document `{"payload": ...}`
//! posted with a form-urlencoded content type but *not* urlencoded, so the
//! body goes out as [`RequestBody::Form`] holding raw JSON text.

use jobgate_core::{build_command, CoreError, JobDescriptor, MountPaths};
use reqwest::Method;
use serde::Serialize;

use crate::error::{ServiceError, ServiceKind};
use crate::transport::{HttpTransport, RequestBody, ServiceRequest, Transport};
use crate::ServiceResponse;

/// Orchestration image that manages the plugin container.
pub const MANAGER_IMAGE: &str = "fnndsc/swarm";
/// Entry point inside [`MANAGER_IMAGE`].
pub const MANAGER_APP: &str = "swarm.py";
const MANAGER_META_STORE: &str = "key";
const MANAGER_SERVICE_TYPE: &str = "docker";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A request understood by the execution service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "meta", rename_all = "lowercase")]
pub enum ExecutionRequest {
    Run(RunMeta),
    Status(StatusMeta),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    pub cmd: String,
    pub threaded: bool,
    pub auid: String,
    pub jid: String,
    pub number_of_workers: u32,
    pub cpu_limit: u32,
    pub memory_limit: u32,
    pub gpu_limit: u32,
    pub container: ContainerSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerSpec {
    pub target: TargetSpec,
    pub manager: ManagerSpec,
}

/// The plugin image and how to execute it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetSpec {
    pub image: String,
    #[serde(rename = "cmdParse")]
    pub cmd_parse: bool,
    #[serde(rename = "selfexec")]
    pub exec_name: String,
    #[serde(rename = "selfpath")]
    pub exec_path: String,
    #[serde(rename = "execshell")]
    pub exec_shell: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerSpec {
    pub image: String,
    pub app: String,
    pub env: ManagerEnv,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManagerEnv {
    #[serde(rename = "meta-store")]
    pub meta_store: String,
    #[serde(rename = "serviceType")]
    pub service_type: String,
    #[serde(rename = "shareDir")]
    pub share_dir: String,
    #[serde(rename = "serviceName")]
    pub service_name: String,
}

/// Key/value lookup of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMeta {
    pub key: String,
    pub value: String,
}

impl ExecutionRequest {
    /// Build a run request; fails if the command cannot be built.
    pub fn run(
        job_id: &str,
        descriptor: &JobDescriptor,
        share_dir: &str,
        mounts: &MountPaths,
    ) -> Result<Self, CoreError> {
        let cmd = build_command(descriptor, mounts)?;

        Ok(Self::Run(RunMeta {
            cmd,
            threaded: true,
            auid: descriptor.owner_id.clone(),
            jid: job_id.to_string(),
            number_of_workers: descriptor.worker_count,
            cpu_limit: descriptor.limits.cpu,
            memory_limit: descriptor.limits.memory,
            gpu_limit: descriptor.limits.gpu,
            container: ContainerSpec {
                target: TargetSpec {
                    image: descriptor.image.clone(),
                    cmd_parse: false,
                    exec_name: descriptor.exec_name.clone(),
                    exec_path: descriptor.exec_path.clone(),
                    exec_shell: descriptor.exec_shell.clone(),
                },
                manager: ManagerSpec {
                    image: MANAGER_IMAGE.to_string(),
                    app: MANAGER_APP.to_string(),
                    env: ManagerEnv {
                        meta_store: MANAGER_META_STORE.to_string(),
                        service_type: MANAGER_SERVICE_TYPE.to_string(),
                        share_dir: share_dir.to_string(),
                        service_name: job_id.to_string(),
                    },
                },
            },
        }))
    }

    pub fn status(job_id: &str) -> Self {
        Self::Status(StatusMeta {
            key: "jid".to_string(),
            value: job_id.to_string(),
        })
    }
}

#[derive(Serialize)]
struct Envelope<'a> {
    payload: &'a ExecutionRequest,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one execution-service endpoint.
pub struct JobExecutionClient<T = HttpTransport> {
    transport: T,
    base_url: String,
    mounts: MountPaths,
}

impl<T: Transport> JobExecutionClient<T> {
    /// Create a client that sends through `transport` to `base_url`,
    /// using the default container mount paths.
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            mounts: MountPaths::default(),
        }
    }

    /// Replace the container mount paths used for every job of this client.
    pub fn with_mounts(mut self, mounts: MountPaths) -> Self {
        self.mounts = mounts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn mounts(&self) -> &MountPaths {
        &self.mounts
    }

    /// Ask the execution service to run `descriptor` as job `job_id`.
    ///
    /// The descriptor is validated and its command built before anything is
    /// sent; an invalid descriptor or unsupported plugin type never reaches
    /// the network.
    pub async fn run(
        &self,
        job_id: &str,
        descriptor: &JobDescriptor,
        share_dir: &str,
    ) -> Result<ServiceResponse, ServiceError> {
        descriptor.validate()?;
        let request = ExecutionRequest::run(job_id, descriptor, share_dir, &self.mounts)?;
        tracing::info!(job_id, "Submitting job to execution service");
        self.post(&request).await
    }

    /// Query the execution service for the state of job `job_id`.
    pub async fn status(&self, job_id: &str) -> Result<ServiceResponse, ServiceError> {
        tracing::info!(job_id, "Querying job status");
        self.post(&ExecutionRequest::status(job_id)).await
    }

    /// Job deletion has no counterpart on the execution service.
    ///
    /// Always fails with [`ServiceError::Unsupported`] without sending anything.
    pub async fn delete(&self, job_id: &str) -> Result<(), ServiceError> {
        tracing::warn!(job_id, "Job deletion requested but not supported");
        Err(ServiceError::Unsupported {
            service: ServiceKind::Execution,
            operation: "delete",
        })
    }

    async fn post(&self, request: &ExecutionRequest) -> Result<ServiceResponse, ServiceError> {
        let body = serde_json::to_string(&Envelope { payload: request }).map_err(|e| {
            ServiceError::Protocol {
                service: ServiceKind::Execution,
                message: format!("could not encode request: {e}"),
            }
        })?;
        tracing::debug!(url = %self.base_url, payload = %body, "Execution payload");

        let request = ServiceRequest::new(ServiceKind::Execution, Method::POST, &self.base_url)
            .body(RequestBody::Form(body));
        let response: ServiceResponse = self.transport.execute(request).await?.json()?;

        tracing::debug!(response = ?response, "Execution service response");
        Ok(response)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
