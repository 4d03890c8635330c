//! Construction of the browser login URL.

use crate::api::EndpointConfig;
use uuid::Uuid;
use url::Url;

/// Path of the login page on the web host
const LOGIN_PATH: &str = "/login";

/// Analytics query parameters appended to the login URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsParams {
    pub campaign: String,
    pub os: String,
    pub docker: bool,
}

impl AnalyticsParams {
    pub fn new(integration_name: Option<&str>, docker: bool) -> Self {
        Self {
            campaign: integration_name.unwrap_or("cli").to_string(),
            os: std::env::consts::OS.to_string(),
            docker,
        }
    }

    fn pairs(&self) -> [(&'static str, String); 5] {
        [
            ("utm_medium", "cli".to_string()),
            ("utm_source", "cli".to_string()),
            ("utm_campaign", self.campaign.clone()),
            ("os", self.os.clone()),
            ("docker", self.docker.to_string()),
        ]
    }
}

/// Derive the user-facing web host from the API URL.
///
/// The API host does not serve the login page, so an `api.` subdomain is
/// rewritten to `app.`. The path is dropped.
pub fn web_host(api_url: &Url) -> Url {
    let mut url = api_url.clone();
    if let Some(rest) = api_url.host_str().and_then(|h| h.strip_prefix("api.")) {
        let app_host = format!("app.{}", rest);
        if url.set_host(Some(&app_host)).is_err() {
            tracing::warn!("Could not rewrite API host {} to {}", api_url, app_host);
        }
    }
    url.set_path("/");
    url.set_query(None);
    url.set_fragment(None);
    url
}

/// Build `<web-host>/login?token=<token>[&<analytics>]`.
pub fn build_login_url(
    config: &EndpointConfig,
    token: &Uuid,
    analytics: Option<&AnalyticsParams>,
) -> Result<Url, url::ParseError> {
    let api_url = Url::parse(&config.api_url)?;
    let mut url = web_host(&api_url);
    url.set_path(LOGIN_PATH);
    {
        let mut query = url.query_pairs_mut();
        query.append_pair("token", &token.to_string());
        if let Some(params) = analytics {
            for (key, value) in params.pairs() {
                query.append_pair(key, &value);
            }
        }
    }
    Ok(url)
}
