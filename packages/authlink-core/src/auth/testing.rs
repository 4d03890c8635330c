//! In-memory collaborators for driving the auth flow in tests.

use crate::api::{HttpRequest, HttpResponse, Transport, TransportError};
use crate::auth::{BrowserLauncher, TokenVerifier};
use crate::store::ConfigStore;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

#[derive(Debug, Clone)]
enum Step {
    Respond(HttpResponse),
    Fail(TransportError),
    /// Hangs for the given time, then times out.
    Stall(Duration),
}

impl Step {
    async fn run(self) -> Result<HttpResponse, TransportError> {
        match self {
            Step::Respond(resp) => Ok(resp),
            Step::Fail(e) => Err(e),
            Step::Stall(delay) => {
                tokio::time::sleep(delay).await;
                Err(TransportError::Timeout {
                    url: "scripted".to_string(),
                })
            }
        }
    }
}

/// Replays a fixed script of responses and records every request.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    steps: Mutex<VecDeque<Step>>,
    fallback: Option<Step>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: Value) -> Self {
        self.push(Step::Respond(HttpResponse::new(status, body)))
    }

    /// `count` consecutive "still waiting" responses
    pub fn pending(mut self, count: usize) -> Self {
        for _ in 0..count {
            self = self.respond(200, Value::Object(Default::default()));
        }
        self
    }

    pub fn fail_connect(self) -> Self {
        self.push(Step::Fail(TransportError::Connect {
            url: "scripted".to_string(),
            reason: "connection refused".to_string(),
        }))
    }

    pub fn stall(self, delay: Duration) -> Self {
        self.push(Step::Stall(delay))
    }

    /// Response for every request after the script runs out
    pub fn always(mut self, status: u16, body: Value) -> Self {
        self.fallback = Some(Step::Respond(HttpResponse::new(status, body)));
        self
    }

    fn push(self, step: Step) -> Self {
        self.steps.lock().unwrap().push_back(step);
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn next(&self, request: HttpRequest) -> Step {
        self.requests.lock().unwrap().push(request.clone());
        let step = self
            .steps
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| panic!("unscripted request to {}", request.url));
        step
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        self.next(request).run().await
    }
}

#[async_trait]
impl TokenVerifier for ScriptedTransport {
    async fn verify_token(&self, token: &str) -> Result<HttpResponse, TransportError> {
        self.next(
            HttpRequest::post("scripted://verify/token")
                .header("Authorization", format!("token {}", token)),
        )
        .run()
        .await
    }
}

/// Map-backed store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    fail_writes: bool,
}

impl MemoryStore {
    pub fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }
}

impl ConfigStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.values.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> anyhow::Result<()> {
        if self.fail_writes {
            anyhow::bail!("disk full");
        }
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.values.lock().unwrap().remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "in-memory".to_string()
    }
}

/// Records opened URLs instead of launching anything.
#[derive(Debug, Default)]
pub struct RecordingBrowser {
    opened: Mutex<Vec<Url>>,
    fail: bool,
}

impl RecordingBrowser {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn opened(&self) -> Vec<Url> {
        self.opened.lock().unwrap().clone()
    }
}

impl BrowserLauncher for RecordingBrowser {
    fn open(&self, url: &Url) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(url.clone());
        if self.fail {
            anyhow::bail!("no display");
        }
        Ok(())
    }
}
