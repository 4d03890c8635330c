//! Authentication module for authlink.
//!
//! Provides the browser-mediated login handshake and manual token login.

mod browser;
mod budget;
mod environment;
mod error;
mod login_url;
mod orchestrator;
mod poller;
mod probe;
mod session;
mod token;

#[cfg(test)]
pub(crate) mod testing;

pub use browser::{BrowserLauncher, NoBrowser, SystemBrowser};
pub use budget::{AttemptBudget, CONTAINER_ATTEMPTS, DEFAULT_ATTEMPTS, POLL_INTERVAL};
pub use environment::{detect_environment, Environment, EnvironmentSignals};
pub use error::{classify, AuthError};
pub use login_url::{build_login_url, web_host, AnalyticsParams};
pub use orchestrator::{Authenticator, LoginPrompt, TokenVerifier, CONFIRMATION_MESSAGE};
pub use poller::{PollingAuthenticator, VerificationOutcome};
pub use probe::probe_ipv6;
pub use session::AuthSession;
pub use token::generate_token;
