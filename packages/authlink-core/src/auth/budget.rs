use std::time::Duration;

/// Wait between two polls of the verification endpoint
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Poll attempts allowed inside a container (about one minute)
pub const CONTAINER_ATTEMPTS: u32 = 60;

/// Poll attempts allowed everywhere else (about three minutes)
pub const DEFAULT_ATTEMPTS: u32 = 3 * 60;

/// Countdown of "still pending" polls an attempt may consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    remaining: u32,
}

impl AttemptBudget {
    pub fn for_environment(is_container: bool) -> Self {
        let mut budget = Self { remaining: 0 };
        budget.reset(is_container);
        budget
    }

    pub fn reset(&mut self, is_container: bool) {
        self.remaining = if is_container {
            CONTAINER_ATTEMPTS
        } else {
            DEFAULT_ATTEMPTS
        };
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Spend one attempt. Returns `false` once the budget is exhausted.
    pub fn consume(&mut self) -> bool {
        self.remaining = self.remaining.saturating_sub(1);
        self.remaining > 0
    }

    /// Upper bound on the time spent waiting between polls.
    pub fn max_wait(&self) -> Duration {
        POLL_INTERVAL * self.remaining
    }
}
