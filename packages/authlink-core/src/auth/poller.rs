//! Polling of the verification endpoint until the browser login completes.

use super::budget::POLL_INTERVAL;
use super::error::{classify, AuthError};
use super::session::AuthSession;
use crate::api::{HttpRequest, HttpResponse, Transport, TransportError, VerifyBody};
use serde_json::json;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// What a single poll found out.
#[derive(Debug)]
pub enum VerificationOutcome {
    /// Login not finished yet
    Pending,
    /// The API key issued for the session
    Success(String),
    HttpFailure { status: u16, body: VerifyBody },
    TransportFailure(TransportError),
}

impl VerificationOutcome {
    pub fn from_result(result: Result<HttpResponse, TransportError>) -> Self {
        let resp = match result {
            Ok(resp) => resp,
            Err(e) => return VerificationOutcome::TransportFailure(e),
        };
        let body = resp.verify_body();

        if resp.status != 200 {
            return VerificationOutcome::HttpFailure {
                status: resp.status,
                body,
            };
        }

        match body.credential() {
            Some(key) => VerificationOutcome::Success(key.to_string()),
            None => VerificationOutcome::Pending,
        }
    }
}

/// Drives the `Waiting -> {Waiting, Success, Failed}` state machine for one
/// session.
pub struct PollingAuthenticator<'a> {
    transport: &'a dyn Transport,
    verify_url: &'a str,
}

impl<'a> PollingAuthenticator<'a> {
    pub fn new(transport: &'a dyn Transport, verify_url: &'a str) -> Self {
        Self {
            transport,
            verify_url,
        }
    }

    /// Submit the session token once.
    pub async fn poll_once(&self, session: &AuthSession) -> VerificationOutcome {
        let request = HttpRequest::post(self.verify_url)
            .json(json!({ "token": session.token.to_string() }))
            .family(session.ip_family);

        let result = self.transport.send(request).await;
        match &result {
            Ok(resp) => tracing::debug!("Verification poll returned status {}", resp.status),
            Err(e) => tracing::debug!("Verification poll failed: {}", e),
        }
        VerificationOutcome::from_result(result)
    }

    /// Poll until the login completes, the budget runs out, a request fails,
    /// or `cancel` fires. Returns the issued API key.
    ///
    /// Every pending answer costs one attempt, charged after the one-second
    /// wait, so the number of polls never exceeds the budget's ceiling.
    pub async fn run(
        &self,
        session: &mut AuthSession,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        loop {
            if cancel.is_cancelled() {
                return Err(AuthError::Cancelled);
            }

            match self.poll_once(session).await {
                VerificationOutcome::Success(key) => return Ok(key),
                VerificationOutcome::HttpFailure { status, body } => {
                    return Err(classify(status, &body));
                }
                VerificationOutcome::TransportFailure(e) => return Err(e.into()),
                VerificationOutcome::Pending => {}
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::info!("Authentication cancelled while waiting for login");
                    return Err(AuthError::Cancelled);
                }
                _ = sleep(POLL_INTERVAL) => {}
            }

            if !session.budget.consume() {
                tracing::info!("Login was not completed in time");
                return Err(AuthError::TokenExpired);
            }
        }
    }
}
