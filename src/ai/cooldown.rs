use std::time::{Duration, Instant};

/// Client-side throttle between user-triggered analyses. Advisory only.
#[derive(Debug, Clone)]
pub struct RequestCooldown {
    period: Duration,
    last_start: Option<Instant>,
}

impl RequestCooldown {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            last_start: None,
        }
    }

    pub fn remaining_at(&self, now: Instant) -> Duration {
        match self.last_start {
            Some(t) => self.period.saturating_sub(now.saturating_duration_since(t)),
            None => Duration::ZERO,
        }
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }

    /// Start a new request at `now`, or report how long is left to wait.
    pub fn try_start_at(&mut self, now: Instant) -> Result<(), Duration> {
        let left = self.remaining_at(now);
        if !left.is_zero() {
            return Err(left);
        }
        self.last_start = Some(now);
        Ok(())
    }

    pub fn try_start(&mut self) -> Result<(), Duration> {
        self.try_start_at(Instant::now())
    }
}
