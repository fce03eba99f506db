//! Data models for governor samples and metric snapshots
//!
//! Samples are single readings taken by a [`crate::SignalHost`]; [`Metrics`]
//! is the aggregate snapshot rebuilt once per sampling interval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Heap usage in bytes, as exposed by the host runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryUsage {
    pub used: u64,
    pub total: u64,
    pub limit: u64,
}

impl MemoryUsage {
    pub fn new(used: u64, total: u64, limit: u64) -> Self {
        Self { used, total, limit }
    }

    /// Fraction of the heap limit in use (0.0 when the limit is unknown)
    pub fn pressure(&self) -> f64 {
        if self.limit > 0 {
            self.used as f64 / self.limit as f64
        } else {
            0.0
        }
    }

    /// Same as [`pressure`](Self::pressure), as a percentage
    pub fn percent_used(&self) -> f64 {
        self.pressure() * 100.0
    }
}

/// Result of a heap sampler read
///
/// Not every platform exposes heap introspection; that case is a value,
/// not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum MemorySample {
    Available(MemoryUsage),
    Unavailable,
}

impl MemorySample {
    pub fn usage(&self) -> Option<MemoryUsage> {
        match self {
            MemorySample::Available(usage) => Some(*usage),
            MemorySample::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, MemorySample::Available(_))
    }
}

/// Navigation and paint timestamps in milliseconds
///
/// All fields are zero until the corresponding event has fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TimingSnapshot {
    pub navigation_start: f64,
    pub load_event_end: f64,
    pub dom_complete: f64,
    pub first_paint: f64,
    pub first_contentful_paint: f64,
}

impl TimingSnapshot {
    /// Page load duration, or `None` before the load event
    pub fn load_time_ms(&self) -> Option<f64> {
        if self.load_event_end > 0.0 && self.load_event_end >= self.navigation_start {
            Some(self.load_event_end - self.navigation_start)
        } else {
            None
        }
    }
}

/// One immutable reading from a sampler
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Sample {
    Frame { timestamp_ms: f64 },
    Memory(MemorySample),
    Timing(TimingSnapshot),
}

/// Aggregate snapshot delivered once per sampling interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Moving-average FPS (0.0 until the first one-second sample exists)
    pub fps: f64,
    pub memory: Option<MemoryUsage>,
    pub timing: TimingSnapshot,
    pub sampled_at: DateTime<Utc>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            fps: 0.0,
            memory: None,
            timing: TimingSnapshot::default(),
            sampled_at: Utc::now(),
        }
    }
}

impl Metrics {
    pub fn with_fps(fps: f64) -> Self {
        Self {
            fps,
            ..Self::default()
        }
    }

    /// Fold a sample into this snapshot. Frame samples carry no aggregate
    /// value on their own and are ignored here; they go through the frame
    /// counter instead.
    pub fn fold(&mut self, sample: Sample) {
        match sample {
            Sample::Frame { .. } => {}
            Sample::Memory(memory) => self.memory = memory.usage(),
            Sample::Timing(timing) => self.timing = timing,
        }
    }

    /// Heap pressure, or `None` when heap usage was not sampled
    pub fn memory_pressure(&self) -> Option<f64> {
        self.memory.map(|m| m.pressure())
    }
}
