//! Client for the data-transfer service.
//!
//! Pushes go out as a multipart POST (`d_msg`, `filename`, and the file
//! itself under `local`) flagged with a `Mode: file` header. Pulls flatten
//! the request into query parameters on a GET, with `meta` written as a
//! Python dict literal, and return the raw archive bytes. Unpacking is the
//! service's job, not ours.

use jobgate_core::sanitize_filename;
use reqwest::Method;
use serde::Serialize;

use crate::error::{ServiceError, ServiceKind};
use crate::literal::python_literal;
use crate::transport::{HttpTransport, MultipartField, RequestBody, ServiceRequest, Transport};
use crate::ServiceResponse;

const FILE_MODE_HEADER: (&str, &str) = ("Mode", "file");

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A request understood by the data-transfer service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "meta")]
pub enum DataRequest {
    #[serde(rename = "pushPath")]
    PushPath(PathMeta),
    #[serde(rename = "pullPath")]
    PullPath(PathMeta),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathMeta {
    pub remote: RemoteSpec,
    pub local: LocalSpec,
    #[serde(rename = "specialHandling")]
    pub special_handling: SpecialHandling,
    pub transport: TransportSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoteSpec {
    pub key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalSpec {
    pub path: String,
    #[serde(rename = "createDir", skip_serializing_if = "Option::is_none")]
    pub create_dir: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecialHandling {
    pub op: String,
    pub cleanup: bool,
}

impl SpecialHandling {
    fn plugin() -> Self {
        Self {
            op: "plugin".to_string(),
            cleanup: true,
        }
    }
}

/// How the data set travels: always a zip archive, unpacked and cleaned up
/// on arrival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransportSpec {
    pub mechanism: String,
    pub compress: CompressSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompressSpec {
    pub archive: String,
    pub unpack: bool,
    pub cleanup: bool,
}

impl TransportSpec {
    fn zip() -> Self {
        Self {
            mechanism: "compress".to_string(),
            compress: CompressSpec {
                archive: "zip".to_string(),
                unpack: true,
                cleanup: true,
            },
        }
    }
}

impl DataRequest {
    /// `local_path` must already be sanitized.
    pub fn push(job_id: &str, local_path: &str) -> Self {
        Self::PushPath(PathMeta {
            remote: RemoteSpec {
                key: job_id.to_string(),
            },
            local: LocalSpec {
                path: local_path.to_string(),
                create_dir: None,
            },
            special_handling: SpecialHandling::plugin(),
            transport: TransportSpec::zip(),
        })
    }

    pub fn pull(job_id: &str) -> Self {
        Self::PullPath(PathMeta {
            remote: RemoteSpec {
                key: job_id.to_string(),
            },
            local: LocalSpec {
                path: job_id.to_string(),
                create_dir: Some(true),
            },
            special_handling: SpecialHandling::plugin(),
            transport: TransportSpec::zip(),
        })
    }

    pub fn action(&self) -> &'static str {
        match self {
            Self::PushPath(_) => "pushPath",
            Self::PullPath(_) => "pullPath",
        }
    }

    pub fn meta(&self) -> &PathMeta {
        match self {
            Self::PushPath(meta) | Self::PullPath(meta) => meta,
        }
    }

    /// Flatten into `action` and `meta` query parameters, `meta` rendered
    /// as a Python dict literal.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, serde_json::Error> {
        let meta = serde_json::to_value(self.meta())?;
        Ok(vec![
            ("action".to_string(), self.action().to_string()),
            ("meta".to_string(), python_literal(&meta)),
        ])
    }
}

fn encode_error(e: serde_json::Error) -> ServiceError {
    ServiceError::Protocol {
        service: ServiceKind::DataTransfer,
        message: format!("could not encode request: {e}"),
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Client for one data-transfer-service endpoint.
pub struct DataTransferClient<T = HttpTransport> {
    transport: T,
    base_url: String,
}

impl<T: Transport> DataTransferClient<T> {
    pub fn with_transport(transport: T, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Upload a zipped data set into job `job_id`'s input directory.
    ///
    /// `filename` is reduced to a bare, safe name before it is used anywhere
    /// in the request.
    pub async fn push(
        &self,
        job_id: &str,
        filename: &str,
        content: Vec<u8>,
    ) -> Result<ServiceResponse, ServiceError> {
        let fname = sanitize_filename(filename)?;
        let d_msg = serde_json::to_string(&DataRequest::push(job_id, &fname)).map_err(encode_error)?;

        tracing::info!(job_id, filename = %fname, bytes = content.len(), "Pushing data");
        tracing::debug!(url = %self.base_url, payload = %d_msg, "Push payload");

        let request = ServiceRequest::new(ServiceKind::DataTransfer, Method::POST, &self.base_url)
            .header(FILE_MODE_HEADER.0, FILE_MODE_HEADER.1)
            .body(RequestBody::Multipart(vec![
                MultipartField::Text {
                    name: "d_msg".to_string(),
                    value: d_msg,
                },
                MultipartField::Text {
                    name: "filename".to_string(),
                    value: fname.clone(),
                },
                MultipartField::File {
                    name: "local".to_string(),
                    filename: fname,
                    content,
                },
            ]));

        let response: ServiceResponse = self.transport.execute(request).await?.json()?;
        tracing::debug!(response = ?response, "Data-transfer service response");
        Ok(response)
    }

    /// Download job `job_id`'s output directory as the raw archive bytes.
    pub async fn pull(&self, job_id: &str) -> Result<Vec<u8>, ServiceError> {
        let query = DataRequest::pull(job_id)
            .query_pairs()
            .map_err(encode_error)?;

        tracing::info!(job_id, "Pulling data");
        tracing::debug!(url = %self.base_url, query = ?query, "Pull query");

        let request = ServiceRequest::new(ServiceKind::DataTransfer, Method::GET, &self.base_url)
            .query(query);
        let content = self.transport.execute(request).await?.into_bytes()?;

        tracing::info!(job_id, bytes = content.len(), "Pulled data");
        Ok(content)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
