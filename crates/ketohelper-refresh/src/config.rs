//! Refresh timing configuration.

use std::time::Duration;

use tracing::warn;

/// When proactive refreshes fire relative to token expiry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    /// How long before `exp` the refresh is attempted. Default: 60 s.
    pub lead_time: Duration,
    /// Lower bound on the computed delay. Default: zero, meaning a token
    /// already inside the lead window refreshes immediately.
    pub min_delay: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            lead_time: Duration::from_secs(60),
            min_delay: Duration::ZERO,
        }
    }
}

impl RefreshConfig {
    /// Longest lead time accepted. Anything larger would refresh a
    /// typical short-lived access token the moment it is issued.
    pub const MAX_LEAD_TIME: Duration = Duration::from_secs(60 * 60);

    /// A config with `lead_time` and the default minimum delay.
    pub fn with_lead_time(lead_time: Duration) -> Self {
        Self {
            lead_time,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values. Rules:
    /// - `lead_time` capped to [`Self::MAX_LEAD_TIME`].
    /// - `min_delay` capped to `lead_time`.
    pub fn validated(mut self) -> Self {
        if self.lead_time > Self::MAX_LEAD_TIME {
            warn!(
                lead_secs = self.lead_time.as_secs(),
                max_secs = Self::MAX_LEAD_TIME.as_secs(),
                "refresh lead_time exceeds maximum, clamping"
            );
            self.lead_time = Self::MAX_LEAD_TIME;
        }
        if self.min_delay > self.lead_time {
            warn!(
                min_delay_secs = self.min_delay.as_secs(),
                lead_secs = self.lead_time.as_secs(),
                "refresh min_delay exceeds lead_time, clamping"
            );
            self.min_delay = self.lead_time;
        }
        self
    }

    /// Delay before refreshing a token that expires at `exp_secs`, seen
    /// at wall-clock `now_secs`: `max(exp - lead - now, 0)`, then floored
    /// at `min_delay`.
    pub fn delay_until(&self, exp_secs: i64, now_secs: i64) -> Duration {
        let lead = i64::try_from(self.lead_time.as_secs()).unwrap_or(i64::MAX);
        let secs = exp_secs.saturating_sub(lead).saturating_sub(now_secs).max(0);
        let delay = Duration::from_secs(secs.unsigned_abs());
        delay.max(self.min_delay)
    }
}
