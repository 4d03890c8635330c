use super::config::EndpointConfig;
use super::transport::{
    HttpRequest, HttpResponse, IpFamily, Method, Transport, TransportError,
};
use crate::auth::TokenVerifier;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

/// User-Agent string for HTTP requests
const USER_AGENT: &str = concat!("authlink-cli/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the authlink API.
///
/// Holds one connection pool per address family so a pinned family never
/// shares sockets with the resolver's default choice.
#[derive(Debug, Clone)]
pub struct ApiClient {
    config: EndpointConfig,
    default_client: reqwest::Client,
    v4_client: reqwest::Client,
    v6_client: reqwest::Client,
}

fn build_client(local_address: Option<IpAddr>) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .local_address(local_address)
        .build()
        .context("Failed to build HTTP client")
}

impl ApiClient {
    pub fn new(config: EndpointConfig) -> Result<Self> {
        Ok(Self {
            config,
            default_client: build_client(None)?,
            // Binding to the unspecified address of a family restricts
            // connects to that family.
            v4_client: build_client(Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))?,
            v6_client: build_client(Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)))?,
        })
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    fn client_for(&self, family: Option<IpFamily>) -> &reqwest::Client {
        match family {
            None => &self.default_client,
            Some(IpFamily::V4) => &self.v4_client,
            Some(IpFamily::V6) => &self.v6_client,
        }
    }
}

fn map_error(url: &str, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
        }
    } else if e.is_connect() {
        TransportError::Connect {
            url: url.to_string(),
            reason: e.to_string(),
        }
    } else {
        TransportError::Other {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl Transport for ApiClient {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(request.family);
        let mut builder = match request.method {
            Method::Get => client.get(&request.url),
            Method::Post => client.post(&request.url),
        }
        .timeout(request.timeout);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| map_error(&request.url, e))?;
        let status = resp.status().as_u16();
        let text = resp
            .text()
            .await
            .map_err(|e| map_error(&request.url, e))?;

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or_else(|_| {
                tracing::debug!("Non-JSON response body from {} ({} bytes)", request.url, text.len());
                serde_json::Value::Null
            })
        };

        Ok(HttpResponse { status, body })
    }
}

#[async_trait]
impl TokenVerifier for ApiClient {
    async fn verify_token(&self, token: &str) -> Result<HttpResponse, TransportError> {
        let request = HttpRequest::post(self.config.verify_token_url())
            .header("Authorization", format!("token {}", token));
        self.send(request).await
    }
}
