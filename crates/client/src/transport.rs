//! Request/response execution shared by every service client.
//!
//! Clients describe an exchange as a [`ServiceRequest`] and hand it to a
//! [`Transport`]. [`HttpTransport`] performs it with [`reqwest`], reads the
//! whole body, and turns any transport failure into
//! [`ServiceError::Transport`] tagged with the originating service.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::error::{ServiceError, ServiceKind};

/// Default connect timeout for backend services. There is no read timeout.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(1000);

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ---------------------------------------------------------------------------
// Request description
// ---------------------------------------------------------------------------

/// One field of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        filename: String,
        content: Vec<u8>,
    },
}

/// Body of an outbound exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestBody {
    Empty,
    /// Raw text sent with a form-urlencoded content type.
    Form(String),
    Multipart(Vec<MultipartField>),
}

/// Transport-neutral description of a single exchange.
#[derive(Debug, Clone)]
pub struct ServiceRequest {
    pub service: ServiceKind,
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub query: Vec<(String, String)>,
    pub body: RequestBody,
}

impl ServiceRequest {
    pub fn new(service: ServiceKind, method: Method, url: impl Into<String>) -> Self {
        Self {
            service,
            method,
            url: url.into(),
            headers: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, pairs: Vec<(String, String)>) -> Self {
        self.query.extend(pairs);
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// Status and fully-read body of a completed exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub service: ServiceKind,
    pub status: u16,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the response unchanged on a 2xx status, or
    /// [`ServiceError::Status`] carrying the body text otherwise.
    pub fn ensure_success(self) -> Result<Self, ServiceError> {
        if !self.is_success() {
            return Err(ServiceError::Status {
                service: self.service,
                status: self.status,
                body: String::from_utf8_lossy(&self.body).into_owned(),
            });
        }
        Ok(self)
    }

    /// Parse a successful JSON body into the expected type.
    pub fn json<T: DeserializeOwned>(self) -> Result<T, ServiceError> {
        let response = self.ensure_success()?;
        serde_json::from_slice(&response.body).map_err(|e| ServiceError::Protocol {
            service: response.service,
            message: format!("invalid JSON response body: {e}"),
        })
    }

    /// The raw body of a successful response, untouched.
    pub fn into_bytes(self) -> Result<Vec<u8>, ServiceError> {
        Ok(self.ensure_success()?.body)
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Performs exactly one exchange per call. Implementations never retry.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        request: ServiceRequest,
    ) -> impl Future<Output = Result<RawResponse, ServiceError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: ServiceRequest,
    ) -> impl Future<Output = Result<RawResponse, ServiceError>> + Send {
        (**self).execute(request)
    }
}

/// [`Transport`] backed by a [`reqwest::Client`].
///
/// Idle connections are not pooled, so every exchange opens its own
/// connection and releases it once the body has been read or the exchange
/// has failed.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(connect_timeout: Duration) -> Result<Self, ServiceError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(ServiceError::ClientBuild)?;
        Ok(Self { client })
    }

    fn build(&self, request: ServiceRequest) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(request.method, request.url.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(text) => builder.header(CONTENT_TYPE, FORM_CONTENT_TYPE).body(text),
            RequestBody::Multipart(fields) => builder.multipart(multipart_form(fields)),
        }
    }
}

impl Transport for HttpTransport {
    async fn execute(&self, request: ServiceRequest) -> Result<RawResponse, ServiceError> {
        let service = request.service;
        tracing::info!(
            service = %service,
            method = %request.method,
            url = %request.url,
            "Sending request",
        );

        let builder = self.build(request);
        let exchange = async {
            let response = builder.send().await?;
            let status = response.status().as_u16();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        };

        match exchange.await {
            Ok((status, body)) => {
                tracing::info!(service = %service, status, bytes = body.len(), "Received response");
                Ok(RawResponse {
                    service,
                    status,
                    body,
                })
            }
            Err(source) => {
                tracing::error!(service = %service, error = %source, "Exchange failed");
                Err(ServiceError::Transport { service, source })
            }
        }
    }
}

fn multipart_form(fields: Vec<MultipartField>) -> Form {
    fields.into_iter().fold(Form::new(), |form, field| match field {
        MultipartField::Text { name, value } => form.text(name, value),
        MultipartField::File {
            name,
            filename,
            content,
        } => form.part(name, Part::bytes(content).file_name(filename)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
