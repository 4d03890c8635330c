//! Entry point of the login flow.
//!
//! Either trusts a token handed over on the command line (after asking the
//! server about it) or runs the browser handshake: show a login URL, wait for
//! the browser side to finish, store the issued API key.

use super::browser::{BrowserLauncher, SystemBrowser};
use super::environment::{detect_environment, Environment};
use super::error::{classify, AuthError};
use super::login_url::{build_login_url, AnalyticsParams};
use super::poller::PollingAuthenticator;
use super::probe::probe_ipv6;
use super::session::AuthSession;
use crate::api::{ApiClient, EndpointConfig, HttpResponse, Transport, TransportError};
use crate::store::{ConfigStore, API_KEY};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Returned when the credential has been stored
pub const CONFIRMATION_MESSAGE: &str =
    "\nYour account has been authenticated. You are now ready to use authlink.\n";

/// Checks a user-supplied token with the server.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    async fn verify_token(&self, token: &str) -> Result<HttpResponse, TransportError>;
}

/// Event payload for login URL notification
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginPrompt {
    pub login_url: Url,
    pub environment: Environment,
}

impl LoginPrompt {
    /// Text to print before waiting. Containers usually have no browser to
    /// redirect to, so they only get the URL.
    pub fn message(&self) -> String {
        match self.environment {
            Environment::Container => format!(
                "\nTo authenticate your account, open the below URL in your browser.\n\
                 After your authentication is complete, return to this prompt to \
                 start using authlink.\n\n{}\n",
                self.login_url
            ),
            _ => format!(
                "\nNow redirecting you to our auth page, go ahead and log in,\n\
                 and once the auth is complete, return to this prompt and you'll\n\
                 be ready to start using authlink.\n\n\
                 If you can't wait use this url:\n{}\n",
                self.login_url
            ),
        }
    }
}

pub struct Authenticator {
    config: EndpointConfig,
    transport: Arc<dyn Transport>,
    verifier: Arc<dyn TokenVerifier>,
    store: Arc<dyn ConfigStore>,
    browser: Arc<dyn BrowserLauncher>,
    /// Fixed classification; detected per call when unset
    environment: Option<Environment>,
}

impl Authenticator {
    pub fn new(
        config: EndpointConfig,
        transport: Arc<dyn Transport>,
        verifier: Arc<dyn TokenVerifier>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            config,
            transport,
            verifier,
            store,
            browser: Arc::new(SystemBrowser),
            environment: None,
        }
    }

    /// Use one HTTP client for both polling and manual verification.
    pub fn with_client(client: ApiClient, store: Arc<dyn ConfigStore>) -> Self {
        let config = client.config().clone();
        let client = Arc::new(client);
        Self::new(config, client.clone(), client, store)
    }

    pub fn with_browser(mut self, browser: Arc<dyn BrowserLauncher>) -> Self {
        self.browser = browser;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Authenticate and store the resulting API key.
    ///
    /// With `manual_token` the browser flow is skipped. Otherwise `on_prompt`
    /// receives the login URL before polling starts. Returns the confirmation
    /// message to show the user.
    pub async fn authenticate<F>(
        &self,
        manual_token: Option<&str>,
        on_prompt: F,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError>
    where
        F: Fn(&LoginPrompt) + Send + Sync,
    {
        let api_key = match manual_token {
            Some(token) => self.verify_manual_token(token, cancel).await?,
            None => self.web_auth(on_prompt, cancel).await?,
        };

        self.store
            .set(API_KEY, &api_key)
            .map_err(AuthError::Storage)?;
        tracing::info!("Credential saved ({})", self.store.describe());

        Ok(CONFIRMATION_MESSAGE.to_string())
    }

    async fn verify_manual_token(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<String, AuthError> {
        tracing::debug!("Verifying manually supplied token");

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            resp = self.verifier.verify_token(token) => resp?,
        };
        let body = resp.verify_body();

        match resp.status {
            // The user handed us this token; keep it when the server does
            // not echo a replacement.
            200 | 201 => Ok(body.credential().unwrap_or(token).to_string()),
            status => Err(classify(status, &body)),
        }
    }

    async fn web_auth<F>(&self, on_prompt: F, cancel: &CancellationToken) -> Result<String, AuthError>
    where
        F: Fn(&LoginPrompt) + Send + Sync,
    {
        let environment = self.environment.unwrap_or_else(detect_environment);
        if environment == Environment::ContinuousIntegration {
            return Err(AuthError::MisconfiguredAuthInCi);
        }
        if cancel.is_cancelled() {
            return Err(AuthError::Cancelled);
        }

        let mut session = AuthSession::new(environment.is_container());

        let analytics = (!self.config.disable_analytics).then(|| {
            AnalyticsParams::new(
                self.config.integration_name.as_deref(),
                environment.is_container(),
            )
        });
        let login_url = build_login_url(&self.config, &session.token, analytics.as_ref())
            .map_err(AuthError::InvalidApiUrl)?;

        tracing::info!(
            "Login URL generated ({} environment, up to {}s to complete)",
            environment,
            session.budget.max_wait().as_secs()
        );

        on_prompt(&LoginPrompt {
            login_url: login_url.clone(),
            environment,
        });

        if !environment.is_container() {
            if let Err(e) = self.browser.open(&login_url) {
                tracing::warn!(
                    "Failed to open browser automatically: {}. User can use the manual link.",
                    e
                );
            }
        }

        let verify_url = self.config.verify_callback_url();
        session.ip_family = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AuthError::Cancelled),
            family = probe_ipv6(self.transport.as_ref(), &verify_url) => family,
        };

        PollingAuthenticator::new(self.transport.as_ref(), &verify_url)
            .run(&mut session, cancel)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::IpFamily;
    use crate::auth::testing::{MemoryStore, RecordingBrowser, ScriptedTransport};
    use serde_json::json;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Harness {
        transport: Arc<ScriptedTransport>,
        store: Arc<MemoryStore>,
        browser: Arc<RecordingBrowser>,
    }

    impl Harness {
        fn new(transport: ScriptedTransport) -> Self {
            Self {
                transport: Arc::new(transport),
                store: Arc::new(MemoryStore::default()),
                browser: Arc::new(RecordingBrowser::default()),
            }
        }

        fn authenticator(&self, environment: Environment) -> Authenticator {
            Authenticator::new(
                EndpointConfig::new("https://api.example.com"),
                self.transport.clone(),
                self.transport.clone(),
                self.store.clone(),
            )
            .with_browser(self.browser.clone())
            .with_environment(environment)
        }

        fn stored_key(&self) -> Option<String> {
            self.store.get(API_KEY).unwrap()
        }
    }

    fn no_prompt(_: &LoginPrompt) {}

    #[tokio::test(start_paused = true)]
    async fn test_interactive_flow_stores_key() {
        let harness = Harness::new(
            ScriptedTransport::new()
                .respond(200, json!({}))
                .pending(2)
                .respond(200, json!({ "api": "key-abc" })),
        );
        let prompts = Mutex::new(Vec::new());

        let message = harness
            .authenticator(Environment::Interactive)
            .authenticate(
                None,
                |p: &LoginPrompt| prompts.lock().unwrap().push(p.clone()),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        assert_eq!(message, CONFIRMATION_MESSAGE);
        assert_eq!(harness.stored_key().as_deref(), Some("key-abc"));

        let prompts = prompts.into_inner().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].message().contains("Now redirecting you"));
        assert_eq!(prompts[0].login_url.host_str(), Some("app.example.com"));
        assert_eq!(harness.browser.opened(), vec![prompts[0].login_url.clone()]);

        // probe + 3 polls, all polls pinned to the probed family
        let requests = harness.transport.requests();
        assert_eq!(requests.len(), 4);
        assert!(requests[0].body.is_none());
        assert!(requests[1..].iter().all(|r| r.family == Some(IpFamily::V6)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ci_fails_before_any_request() {
        let harness = Harness::new(ScriptedTransport::new());
        let prompted = Mutex::new(false);

        let err = harness
            .authenticator(Environment::ContinuousIntegration)
            .authenticate(
                None,
                |_: &LoginPrompt| *prompted.lock().unwrap() = true,
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::MisconfiguredAuthInCi));
        assert_eq!(harness.transport.calls(), 0);
        assert!(!*prompted.lock().unwrap());
        assert!(harness.browser.opened().is_empty());
        assert_eq!(harness.stored_key(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_container_skips_browser_and_has_short_budget() {
        let harness = Harness::new(ScriptedTransport::new().always(200, json!({})));
        let prompts = Mutex::new(Vec::new());

        let err = harness
            .authenticator(Environment::Container)
            .authenticate(
                None,
                |p: &LoginPrompt| prompts.lock().unwrap().push(p.message()),
                &CancellationToken::new(),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::TokenExpired));
        assert!(harness.browser.opened().is_empty());
        assert!(prompts.lock().unwrap()[0].starts_with("\nTo authenticate your account"));
        // probe + 60 polls
        assert_eq!(harness.transport.calls(), 61);
        assert_eq!(harness.stored_key(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_probe_failure_falls_back_to_default_transport() {
        let harness = Harness::new(
            ScriptedTransport::new()
                .fail_connect()
                .pending(1)
                .respond(200, json!({ "api": "key-v4" })),
        );

        harness
            .authenticator(Environment::Interactive)
            .authenticate(None, no_prompt, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(harness.stored_key().as_deref(), Some("key-v4"));
        let requests = harness.transport.requests();
        assert_eq!(requests[0].family, Some(IpFamily::V6));
        assert!(requests[1..].iter().all(|r| r.family.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_browser_failure_is_not_fatal() {
        let mut harness = Harness::new(
            ScriptedTransport::new()
                .respond(500, json!({}))
                .respond(200, json!({ "api": "k" })),
        );
        harness.browser = Arc::new(RecordingBrowser::failing());

        let result = harness
            .authenticator(Environment::Interactive)
            .authenticate(None, no_prompt, &CancellationToken::new())
            .await;

        assert!(result.is_ok());
        assert_eq!(harness.browser.opened().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_login_url_without_analytics() {
        let harness = Harness::new(
            ScriptedTransport::new()
                .respond(500, json!({}))
                .respond(200, json!({ "api": "k" })),
        );
        let mut config = EndpointConfig::new("https://api.example.com");
        config.disable_analytics = true;
        let urls = Mutex::new(Vec::new());

        Authenticator::new(
            config,
            harness.transport.clone(),
            harness.transport.clone(),
            harness.store.clone(),
        )
        .with_browser(harness.browser.clone())
        .with_environment(Environment::Interactive)
        .authenticate(
            None,
            |p: &LoginPrompt| urls.lock().unwrap().push(p.login_url.clone()),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        let url = urls.lock().unwrap()[0].clone();
        assert_eq!(url.query_pairs().count(), 1);
        assert_eq!(url.path(), "/login");
    }

    #[tokio::test]
    async fn test_manual_token_uses_server_key() {
        let harness = Harness::new(ScriptedTransport::new().respond(200, json!({ "api": "server-key" })));

        harness
            .authenticator(Environment::ContinuousIntegration)
            .authenticate(Some("user-token"), no_prompt, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(harness.stored_key().as_deref(), Some("server-key"));
        let requests = harness.transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers,
            vec![("Authorization".to_string(), "token user-token".to_string())]
        );
    }

    #[tokio::test]
    async fn test_manual_token_kept_when_not_echoed() {
        let harness = Harness::new(ScriptedTransport::new().respond(201, json!({ "ok": true })));

        harness
            .authenticator(Environment::Interactive)
            .authenticate(Some("user-token"), no_prompt, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(harness.stored_key().as_deref(), Some("user-token"));
        assert!(harness.browser.opened().is_empty());
    }

    #[tokio::test]
    async fn test_manual_token_rejected() {
        let harness = Harness::new(
            ScriptedTransport::new()
                .respond(401, json!({ "userMessage": "Invalid token" }))
                .respond(502, serde_json::Value::Null),
        );
        let auth = harness.authenticator(Environment::Interactive);

        let err = auth
            .authenticate(Some("bad"), no_prompt, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AuthFailed { status: 401, .. }));
        assert_eq!(err.user_message(), "Invalid token");

        let err = auth
            .authenticate(Some("bad"), no_prompt, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.user_message().contains("request has timed out"));
        assert_eq!(harness.stored_key(), None);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces() {
        let mut harness = Harness::new(ScriptedTransport::new().respond(200, json!({ "api": "k" })));
        harness.store = Arc::new(MemoryStore::failing());

        let err = harness
            .authenticator(Environment::Interactive)
            .authenticate(Some("t"), no_prompt, &CancellationToken::new())
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Storage(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sessions_are_independent() {
        let transport = Arc::new(ScriptedTransport::new().always(200, json!({})));
        let container = Harness {
            transport: transport.clone(),
            store: Arc::new(MemoryStore::default()),
            browser: Arc::new(RecordingBrowser::default()),
        };
        let desktop = Harness {
            transport: transport.clone(),
            store: Arc::new(MemoryStore::default()),
            browser: Arc::new(RecordingBrowser::default()),
        };
        let cancel = CancellationToken::new();
        let container_auth = container.authenticator(Environment::Container);
        let desktop_auth = desktop.authenticator(Environment::Interactive);

        let (a, b) = tokio::join!(
            container_auth.authenticate(None, no_prompt, &cancel),
            desktop_auth.authenticate(None, no_prompt, &cancel),
        );

        assert!(matches!(a, Err(AuthError::TokenExpired)));
        assert!(matches!(b, Err(AuthError::TokenExpired)));

        let mut polls_per_token: HashMap<String, usize> = HashMap::new();
        for request in transport.requests() {
            if let Some(body) = request.body {
                *polls_per_token
                    .entry(body["token"].as_str().unwrap().to_string())
                    .or_default() += 1;
            }
        }
        let mut counts: Vec<usize> = polls_per_token.into_values().collect();
        counts.sort();
        assert_eq!(counts, vec![60, 180]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start() {
        let harness = Harness::new(ScriptedTransport::new().always(200, json!({})));
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = harness
            .authenticator(Environment::Interactive)
            .authenticate(None, no_prompt, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert_eq!(harness.transport.calls(), 0);
        assert!(harness.browser.opened().is_empty());
        assert_eq!(harness.stored_key(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_stalled_ipv6_check() {
        let harness = Harness::new(
            ScriptedTransport::new()
                .stall(Duration::from_secs(5))
                .always(200, json!({})),
        );
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            trigger.cancel();
        });

        let start = tokio::time::Instant::now();
        let err = harness
            .authenticator(Environment::Interactive)
            .authenticate(None, no_prompt, &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, AuthError::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
        // The IPv6 check went out; no poll followed it.
        assert_eq!(harness.transport.calls(), 1);
        assert_eq!(harness.transport.requests()[0].family, Some(IpFamily::V6));
    }
}
