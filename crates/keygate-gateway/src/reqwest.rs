//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use crate::{HttpRequest, HttpResponse, Method, Transport, TransportError};

/// A [`Transport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Creates a transport with reqwest's defaults (no request timeout).
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport whose requests time out after `timeout`.
    ///
    /// # Errors
    /// Returns [`TransportError::Other`] if the client cannot be built
    /// (for example, no TLS backend could be initialised).
    pub fn with_timeout(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Other(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wraps an existing client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), &request.url);
        for (name, value) in request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(map_error)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(map_error)?;
        tracing::trace!(status, bytes = body.len(), "response received");

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

fn map_error(error: reqwest::Error) -> TransportError {
    let message = error.to_string();
    if error.is_builder() {
        TransportError::InvalidRequest(message)
    } else if error.is_timeout() {
        TransportError::Timeout(message)
    } else if error.is_connect() {
        TransportError::Connect(message)
    } else if error.is_body() || error.is_decode() {
        TransportError::Body(message)
    } else {
        TransportError::Other(message)
    }
}
