//! Detection of where the CLI is running.
//!
//! Browser login needs a human at a desktop. In CI nobody will ever complete
//! it, and inside a container there is usually no browser to launch.

use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;

/// Environment variables whose presence marks a CI run
const CI_ENV_VARS: &[&str] = &[
    "CI",
    "CONTINUOUS_INTEGRATION",
    "BUILD_ID",
    "BUILD_NUMBER",
    "RUN_ID",
    "TEAMCITY_VERSION",
    "TRAVIS",
    "CIRCLECI",
    "JENKINS_URL",
    "HUDSON_URL",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "TF_BUILD",
    "SYSTEM_TEAMFOUNDATIONSERVERURI",
    "CODEBUILD_BUILD_ID",
    "BITBUCKET_BUILD_NUMBER",
    "GOCD_SERVER_HOST",
    "PHPCI",
];

/// Files created by container runtimes (Docker, Podman)
const CONTAINER_MARKERS: &[&str] = &["/.dockerenv", "/run/.containerenv"];

/// cgroup path fragments written by container runtimes
const CGROUP_MARKERS: &[&str] = &["docker", "containerd", "kubepods", "libpod"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    Interactive,
    Container,
    ContinuousIntegration,
}

impl Environment {
    pub fn is_container(self) -> bool {
        self == Environment::Container
    }
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Interactive => write!(f, "interactive"),
            Environment::Container => write!(f, "container"),
            Environment::ContinuousIntegration => write!(f, "continuous integration"),
        }
    }
}

/// Snapshot of the process signals used for classification.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentSignals {
    /// Names of the environment variables that are set
    pub env_vars: HashSet<String>,
    pub container_marker: bool,
    /// Contents of `/proc/self/cgroup`, when readable
    pub cgroup: Option<String>,
}

impl EnvironmentSignals {
    /// Capture the signals of the running process.
    pub fn from_process() -> Self {
        Self {
            env_vars: std::env::vars_os()
                .filter_map(|(k, _)| k.into_string().ok())
                .collect(),
            container_marker: CONTAINER_MARKERS.iter().any(|p| Path::new(p).exists()),
            cgroup: std::fs::read_to_string("/proc/self/cgroup").ok(),
        }
    }

    pub fn with_env_var(mut self, name: &str) -> Self {
        self.env_vars.insert(name.to_string());
        self
    }

    pub fn is_ci(&self) -> bool {
        CI_ENV_VARS.iter().any(|v| self.env_vars.contains(*v))
    }

    pub fn is_container(&self) -> bool {
        self.container_marker
            || self
                .cgroup
                .as_deref()
                .is_some_and(|c| CGROUP_MARKERS.iter().any(|m| c.contains(m)))
    }

    /// CI wins over container: a containerised CI job is still unattended.
    pub fn classify(&self) -> Environment {
        if self.is_ci() {
            Environment::ContinuousIntegration
        } else if self.is_container() {
            Environment::Container
        } else {
            Environment::Interactive
        }
    }
}

/// Classify the running process.
pub fn detect_environment() -> Environment {
    let env = EnvironmentSignals::from_process().classify();
    tracing::debug!("Detected {} environment", env);
    env
}
