//! authlink Core Library
//!
//! This crate provides the login handshake used by the `authlink` CLI:
//! - Browser login (correlation token, login URL, verification polling)
//! - Manual token login
//! - Environment detection (CI, containers) and IPv6 capability probing
//! - Credential storage (keyring with file fallback)
//!
//! # Features
//!
//! - `keyring-storage` (default): Use platform keyring for credential storage
//! - `file-storage`: Use file-based credential storage (for headless Linux)
//! - `browser` (default): Automatically open the login page in a browser
//!
//! # Example
//!
//! ```no_run
//! use authlink_core::{api, auth, store};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = api::ApiClient::new(api::load_endpoint_config())?;
//!     let authenticator = auth::Authenticator::with_client(client, store::default_store()?);
//!
//!     let message = authenticator
//!         .authenticate(None, |prompt| println!("{}", prompt.message()), &CancellationToken::new())
//!         .await?;
//!     println!("{}", message);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod store;

// Re-export commonly used types
pub use api::{ApiClient, ConfigSource, EndpointConfig};
pub use auth::{AuthError, Authenticator, Environment, LoginPrompt};
pub use store::{ConfigStore, FileConfigStore};
