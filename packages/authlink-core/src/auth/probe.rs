use crate::api::{HttpRequest, IpFamily, Transport};
use std::time::Duration;

/// The probe only answers "does IPv6 work here", so it gives up quickly
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Check whether outbound IPv6 reaches the verification endpoint.
///
/// Sends one bodiless request forced onto IPv6. Returns the family to pin for
/// the rest of the session, or `None` on any failure; errors never escape.
pub async fn probe_ipv6(transport: &dyn Transport, verify_url: &str) -> Option<IpFamily> {
    let request = HttpRequest::post(verify_url)
        .family(Some(IpFamily::V6))
        .timeout(PROBE_TIMEOUT);

    match transport.send(request).await {
        Ok(resp) if resp.is_success() => {
            tracing::debug!("IPv6 probe succeeded, pinning session to IPv6");
            Some(IpFamily::V6)
        }
        Ok(resp) => {
            tracing::debug!("IPv6 probe returned status {}, using default transport", resp.status);
            None
        }
        Err(e) => {
            tracing::debug!("IPv6 probe failed ({}), using default transport", e);
            None
        }
    }
}
