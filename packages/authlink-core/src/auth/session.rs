use super::budget::AttemptBudget;
use super::token::generate_token;
use crate::api::IpFamily;
use uuid::Uuid;

/// State of one interactive login attempt.
///
/// Created per `authenticate` call and dropped when it returns, so two
/// attempts never share a token or a countdown.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: Uuid,
    /// Family pinned by the capability probe, reused for every poll
    pub ip_family: Option<IpFamily>,
    pub budget: AttemptBudget,
}

impl AuthSession {
    pub fn new(is_container: bool) -> Self {
        Self {
            token: generate_token(),
            ip_family: None,
            budget: AttemptBudget::for_environment(is_container),
        }
    }
}
