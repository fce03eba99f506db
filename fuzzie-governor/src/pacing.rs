//! Throttle and debounce gates for high-frequency browser events
//!
//! Both are clock-driven: the caller passes the current time in
//! milliseconds, so the same gates work against `performance.now()` in the
//! browser and against a test clock.

/// Lets one call through per `limit_ms`, dropping the rest
#[derive(Debug, Clone)]
pub struct Throttle {
    limit_ms: f64,
    last_fired_ms: Option<f64>,
}

impl Throttle {
    pub fn new(limit_ms: f64) -> Self {
        Self {
            limit_ms: limit_ms.max(0.0),
            last_fired_ms: None,
        }
    }

    /// Whether a call arriving at `now_ms` should run
    pub fn try_acquire(&mut self, now_ms: f64) -> bool {
        match self.last_fired_ms {
            Some(last) if now_ms - last < self.limit_ms => false,
            _ => {
                self.last_fired_ms = Some(now_ms);
                true
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_fired_ms = None;
    }
}

/// Fires once, `wait_ms` after the last trigger
#[derive(Debug, Clone)]
pub struct Debounce {
    wait_ms: f64,
    deadline_ms: Option<f64>,
}

impl Debounce {
    pub fn new(wait_ms: f64) -> Self {
        Self {
            wait_ms: wait_ms.max(0.0),
            deadline_ms: None,
        }
    }

    /// Record an event, pushing the deadline out
    pub fn trigger(&mut self, now_ms: f64) {
        self.deadline_ms = Some(now_ms + self.wait_ms);
    }

    /// Returns `true` exactly once when the quiet period has elapsed
    pub fn poll(&mut self, now_ms: f64) -> bool {
        match self.deadline_ms {
            Some(deadline) if now_ms >= deadline => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }
}
