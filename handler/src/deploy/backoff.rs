//! Backoff policy shared by every retrying call site

use std::time::Duration;

/// Retry/backoff parameters for one call site
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffPolicy {
    /// First wait interval
    pub base: Duration,

    /// Growth factor per attempt; values below 1.0 are treated as 1.0
    pub multiplier: f64,

    /// Upper bound on any single wait
    pub ceiling: Option<Duration>,

    /// Total attempts allowed, `None` for unbounded (deadline-driven) loops
    pub max_attempts: Option<u32>,
}

impl BackoffPolicy {
    /// Deployment submission: 2s doubling, three attempts, no ceiling
    pub fn submission() -> Self {
        Self {
            base: Duration::from_secs(2),
            multiplier: 2.0,
            ceiling: None,
            max_attempts: Some(3),
        }
    }

    /// Status polling between non-terminal observations: 2s doubling up to 30s
    pub fn status_poll() -> Self {
        Self {
            base: Duration::from_secs(2),
            multiplier: 2.0,
            ceiling: Some(Duration::from_secs(30)),
            max_attempts: None,
        }
    }

    /// Retrying a failed status query: fixed 2s, three attempts
    pub fn status_query_retry() -> Self {
        Self::fixed(Duration::from_secs(2), 3)
    }

    /// Application health checks: fixed 5s, three attempts
    pub fn health_retry() -> Self {
        Self::fixed(Duration::from_secs(5), 3)
    }

    /// Constant interval with a bounded number of attempts
    pub fn fixed(interval: Duration, max_attempts: u32) -> Self {
        Self {
            base: interval,
            multiplier: 1.0,
            ceiling: Some(interval),
            max_attempts: Some(max_attempts),
        }
    }

    /// Start a fresh backoff sequence
    pub fn start(&self) -> BackoffState {
        let base = match self.ceiling {
            Some(ceiling) => self.base.min(ceiling),
            None => self.base,
        };

        BackoffState {
            current: base,
            attempt: 0,
            multiplier: self.multiplier.max(1.0),
            ceiling: self.ceiling,
            max_attempts: self.max_attempts,
        }
    }
}

/// Progress through one backoff sequence.
///
/// Intervals never decrease and never exceed the ceiling.
#[derive(Debug, Clone)]
pub struct BackoffState {
    current: Duration,
    attempt: u32,
    multiplier: f64,
    ceiling: Option<Duration>,
    max_attempts: Option<u32>,
}

impl BackoffState {
    /// Interval the next call to `next_delay` will return
    pub fn current(&self) -> Duration {
        self.current
    }

    /// Number of delays handed out so far
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn ceiling(&self) -> Option<Duration> {
        self.ceiling
    }

    /// Whether the attempt budget is used up
    pub fn exhausted(&self) -> bool {
        self.max_attempts.is_some_and(|max| self.attempt >= max)
    }

    /// Return the current interval and advance to the next one
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.attempt = self.attempt.saturating_add(1);
        self.current = self.grow(delay);
        delay
    }

    fn grow(&self, delay: Duration) -> Duration {
        let next_secs = delay.as_secs_f64() * self.multiplier;
        let next = match self.ceiling {
            Some(ceiling) if next_secs >= ceiling.as_secs_f64() => ceiling,
            _ => Duration::try_from_secs_f64(next_secs).unwrap_or(Duration::MAX),
        };
        next.max(delay)
    }
}
