//! API access module.
//!
//! Provides the request abstraction the auth flow is written against, the
//! reqwest-backed client, and endpoint configuration.

mod client;
pub mod config;
pub mod transport;

pub use client::ApiClient;
pub use config::{load_endpoint_config, ConfigSource, EndpointConfig};
pub use transport::{
    HttpRequest, HttpResponse, IpFamily, Method, Transport, TransportError, VerifyBody,
};
