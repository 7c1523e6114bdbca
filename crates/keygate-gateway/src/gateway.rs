//! The request gateway: one place where every outbound call is assembled
//! and every outcome is folded into an [`Envelope`].

use std::sync::Arc;

use keygate_protocol::{Credential, Envelope};
use keygate_store::{SessionStore, Slot};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{HttpRequest, Method, Transport};

/// Fields checked, in order, for a provider-supplied error message.
const MESSAGE_FIELDS: [&str; 4] = ["message", "msg", "error_description", "error"];

/// Where a gateway sends requests and how it identifies itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    /// Prefix for every request path, e.g. `https://x.example/rest/v1`.
    pub base_url: String,
    /// Sent as the `apikey` header on every request.
    pub api_key: String,
    /// Sent as the `Prefer` header when set.
    pub prefer: Option<String>,
}

impl GatewayConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            prefer: None,
        }
    }

    /// Sets the `Prefer` header value.
    pub fn prefer(mut self, prefer: impl Into<String>) -> Self {
        self.prefer = Some(prefer.into());
        self
    }
}

/// How a gateway authenticates its requests.
#[derive(Clone)]
pub enum Credentials {
    /// No `Authorization` header.
    Anonymous,
    /// Bearer token read from the store's credential slot on every call,
    /// so a token written after construction is picked up immediately.
    FromStore(Arc<dyn SessionStore>),
}

impl Credentials {
    fn current(&self) -> Option<Credential> {
        match self {
            Self::Anonymous => None,
            Self::FromStore(store) => store
                .get_slot(Slot::Credential)
                .filter(|token| !token.is_empty())
                .map(Credential::new),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Anonymous => write!(f, "Anonymous"),
            Self::FromStore(_) => write!(f, "FromStore"),
        }
    }
}

/// Per-call options: verb, JSON body and header overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    /// Replace defaults with the same name (compared case-insensitively).
    pub headers: Vec<(String, String)>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::get()
    }
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::new(Method::Get, None)
    }

    pub fn post(body: Value) -> Self {
        Self::new(Method::Post, Some(body))
    }

    pub fn patch(body: Value) -> Self {
        Self::new(Method::Patch, Some(body))
    }

    pub fn delete() -> Self {
        Self::new(Method::Delete, None)
    }

    fn new(method: Method, body: Option<Value>) -> Self {
        Self {
            method,
            body,
            headers: Vec::new(),
        }
    }

    /// Adds a header override.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Issues requests against one base URL.
///
/// Never returns `Err` and never panics: transport failures, non-2xx
/// statuses and unparseable bodies all come back as
/// [`Envelope::Failure`].
pub struct Gateway<T> {
    config: GatewayConfig,
    credentials: Credentials,
    transport: Arc<T>,
}

impl<T> Clone for Gateway<T> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            credentials: self.credentials.clone(),
            transport: Arc::clone(&self.transport),
        }
    }
}

impl<T> std::fmt::Debug for Gateway<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("base_url", &self.config.base_url)
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> Gateway<T> {
    pub fn new(config: GatewayConfig, credentials: Credentials, transport: Arc<T>) -> Self {
        Self {
            config,
            credentials,
            transport,
        }
    }

    /// A gateway that never sends `Authorization`.
    pub fn anonymous(config: GatewayConfig, transport: Arc<T>) -> Self {
        Self::new(config, Credentials::Anonymous, transport)
    }

    /// A gateway that reads its bearer token from `store` on every call.
    pub fn credentialed(
        config: GatewayConfig,
        store: Arc<dyn SessionStore>,
        transport: Arc<T>,
    ) -> Self {
        Self::new(config, Credentials::FromStore(store), transport)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Sends `options` to `base_url + path` and returns the parsed body.
    ///
    /// An empty body parses as `null`. On a non-2xx status the failure
    /// message is the first of `message`, `msg`, `error_description` or
    /// `error` found in the body, otherwise `HTTP error: <status>`.
    pub async fn request(&self, path: &str, options: RequestOptions) -> Envelope<Value> {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), path);
        let method = options.method;

        let body = match options.body.as_ref().map(serde_json::to_vec).transpose() {
            Ok(body) => body,
            Err(e) => return Envelope::malformed(format!("request body not encodable: {e}")),
        };
        let request = HttpRequest {
            method,
            url,
            headers: self.headers(options.headers),
            body,
        };

        tracing::debug!(%method, url = %request.url, "sending request");
        let url = request.url.clone();
        let response = match self.transport.execute(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "request failed");
                return Envelope::transport(e.to_string());
            }
        };

        let parsed = parse_body(&response.body);
        if !response.is_success() {
            let message = parsed
                .as_ref()
                .ok()
                .and_then(provider_message)
                .unwrap_or_else(|| format!("HTTP error: {}", response.status));
            tracing::warn!(%method, %url, status = response.status, %message, "request rejected");
            return Envelope::rejected(response.status, message);
        }

        match parsed {
            Ok(data) => {
                tracing::debug!(%method, %url, status = response.status, "request succeeded");
                Envelope::success(data)
            }
            Err(e) => {
                tracing::warn!(%method, %url, error = %e, "response body is not JSON");
                Envelope::malformed(format!("invalid JSON in response: {e}"))
            }
        }
    }

    /// Like [`request`](Self::request), then deserializes the payload as
    /// `R`. A payload that does not fit becomes a malformed failure.
    pub async fn request_json<R: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Envelope<R> {
        self.request(path, options).await.and_then(decode)
    }

    fn headers(&self, overrides: Vec<(String, String)>) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_owned(), "application/json".to_owned()),
            ("apikey".to_owned(), self.config.api_key.clone()),
        ];
        if let Some(prefer) = &self.config.prefer {
            headers.push(("Prefer".to_owned(), prefer.clone()));
        }
        if let Some(credential) = self.credentials.current() {
            headers.push(("Authorization".to_owned(), credential.bearer()));
        }

        for (name, value) in overrides {
            headers.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
            headers.push((name, value));
        }
        headers
    }
}

/// Deserializes a JSON payload, mapping a mismatch to a malformed failure.
pub(crate) fn decode<R: DeserializeOwned>(value: Value) -> Envelope<R> {
    match serde_json::from_value(value) {
        Ok(data) => Envelope::success(data),
        Err(e) => {
            tracing::warn!(error = %e, "response does not match expected shape");
            Envelope::malformed(format!("unexpected response shape: {e}"))
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Value, serde_json::Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body)
}

fn provider_message(body: &Value) -> Option<String> {
    MESSAGE_FIELDS
        .iter()
        .find_map(|field| body.get(field)?.as_str())
        .filter(|message| !message.is_empty())
        .map(str::to_owned)
}
