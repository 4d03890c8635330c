//! Request/response types shared by every transport.
//!
//! The authentication flow only ever needs "send this JSON, give me back a
//! status and a JSON body", so the HTTP stack sits behind [`Transport`] and
//! the state machine can be driven by an in-memory fake in tests.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Default timeout for a single request
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Network-layer address family a request is forced onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    pub fn as_u8(self) -> u8 {
        match self {
            IpFamily::V4 => 4,
            IpFamily::V6 => 6,
        }
    }
}

impl std::fmt::Display for IpFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "IPv{}", self.as_u8())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// A single outbound request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
    /// Extra headers as `(name, value)` pairs
    pub headers: Vec<(String, String)>,
    /// Force the connection onto this family; `None` lets the resolver choose
    pub family: Option<IpFamily>,
    pub timeout: Duration,
}

impl HttpRequest {
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: None,
            headers: Vec::new(),
            family: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn family(mut self, family: Option<IpFamily>) -> Self {
        self.family = family;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Status code plus the decoded body. Bodies that are not JSON come back as
/// `Value::Null`.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Value,
}

impl HttpResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lenient view of the fields the auth flow cares about.
    pub fn verify_body(&self) -> VerifyBody {
        VerifyBody::from_value(&self.body)
    }
}

/// Fields of a verification response body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyBody {
    /// The issued API key; present only once the browser login completed
    #[serde(default)]
    pub api: Option<String>,
    #[serde(default)]
    pub user_message: Option<String>,
}

impl VerifyBody {
    /// Decode from any JSON value. Anything that is not an object with the
    /// expected field types yields the empty body.
    pub fn from_value(value: &Value) -> Self {
        serde_json::from_value(value.clone()).unwrap_or_default()
    }

    /// The credential, if the field is present and non-empty
    pub fn credential(&self) -> Option<&str> {
        self.api.as_deref().filter(|k| !k.is_empty())
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("could not connect to {url}: {reason}")]
    Connect { url: String, reason: String },
    #[error("request to {url} failed: {reason}")]
    Other { url: String, reason: String },
}

/// Sends one request and reports what came back.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
