//! Request gateway for Keygate.
//!
//! Every domain API client issues its calls through a [`Gateway`], which
//! attaches the standard headers, injects the bearer credential, and folds
//! whatever happens into an [`Envelope`](keygate_protocol::Envelope).
//! The network itself sits behind the [`Transport`] trait.
//!
//! # Feature Flags
//!
//! - `reqwest` (default): [`ReqwestTransport`], HTTP over `reqwest`

mod clients;
mod error;
mod gateway;
#[cfg(feature = "reqwest")]
mod reqwest;

pub use clients::{AuthClient, BondClient, FlowClient};
pub use error::TransportError;
pub use gateway::{Credentials, Gateway, GatewayConfig, RequestOptions};
#[cfg(feature = "reqwest")]
pub use reqwest::ReqwestTransport;

use std::fmt;
use std::future::Future;

/// HTTP verbs the gateway issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Patch => write!(f, "PATCH"),
            Self::Delete => write!(f, "DELETE"),
        }
    }
}

/// A fully-assembled outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl HttpRequest {
    /// Returns the first header named `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// What came back: a status code and the raw body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends requests and returns responses.
///
/// An implementation only reports failures where no response arrived at
/// all; any status code, including 4xx and 5xx, is a successful
/// [`HttpResponse`].
pub trait Transport: Send + Sync + 'static {
    /// Executes one request.
    fn execute(
        &self,
        request: HttpRequest,
    ) -> impl Future<Output = Result<HttpResponse, TransportError>> + Send;
}
