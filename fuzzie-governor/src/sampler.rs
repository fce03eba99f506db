//! Signal samplers
//!
//! A [`SignalHost`] is the runtime the governor runs inside (a browser tab,
//! a native window). Every read is synchronous and infallible: a signal the
//! host cannot provide comes back as an explicit unavailable/default value.

use serde::{Deserialize, Serialize};

use crate::models::{MemorySample, MemoryUsage, TimingSnapshot};

/// Static capability set, read once when a monitor is constructed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Logical core count, `None` when the platform hides it
    pub logical_cores: Option<usize>,
    /// Whether heap usage can be sampled at all
    pub heap_introspection: bool,
    /// Whether paint timing entries are reported
    pub paint_timing: bool,
}

/// Platform-agnostic source of runtime signals
pub trait SignalHost: Send {
    /// Monotonic timestamp (ms) for the current animation tick
    fn sample_frame(&mut self) -> f64;

    /// Current heap usage
    fn sample_memory(&mut self) -> MemorySample;

    /// Navigation/paint timing, zeroed before the load event
    fn sample_timing(&mut self) -> TimingSnapshot;

    /// Capabilities this host exposes
    fn capabilities(&self) -> Capabilities;

    /// User motion preference (`prefers-reduced-motion: reduce`)
    fn prefers_reduced_motion(&self) -> bool {
        false
    }
}

/// Host whose signals are pushed in by an embedder
///
/// Used by the wasm surface (where JavaScript reads the browser APIs),
/// by trace replay, and by tests.
#[derive(Debug, Clone, Default)]
pub struct ManualHost {
    now_ms: f64,
    memory: Option<MemoryUsage>,
    timing: TimingSnapshot,
    capabilities: Capabilities,
    reduced_motion: bool,
}

impl ManualHost {
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Self::default()
        }
    }

    /// Host reporting the given core count and nothing else
    pub fn with_cores(logical_cores: usize) -> Self {
        Self::new(Capabilities {
            logical_cores: Some(logical_cores),
            ..Capabilities::default()
        })
    }

    pub fn set_now(&mut self, now_ms: f64) {
        self.now_ms = now_ms;
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.now_ms += delta_ms;
    }

    pub fn now(&self) -> f64 {
        self.now_ms
    }

    /// Report heap usage and mark heap introspection as available
    ///
    /// Monitors read capabilities once at construction, so the flag only
    /// matters for monitors built after this call.
    pub fn set_memory(&mut self, usage: MemoryUsage) {
        self.capabilities.heap_introspection = true;
        self.memory = Some(usage);
    }

    pub fn clear_memory(&mut self) {
        self.memory = None;
    }

    pub fn set_timing(&mut self, timing: TimingSnapshot) {
        if timing.first_paint > 0.0 || timing.first_contentful_paint > 0.0 {
            self.capabilities.paint_timing = true;
        }
        self.timing = timing;
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }
}

impl SignalHost for ManualHost {
    fn sample_frame(&mut self) -> f64 {
        self.now_ms
    }

    fn sample_memory(&mut self) -> MemorySample {
        match self.memory {
            Some(usage) => MemorySample::Available(usage),
            None => MemorySample::Unavailable,
        }
    }

    fn sample_timing(&mut self) -> TimingSnapshot {
        self.timing
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_host_defaults_to_unavailable() {
        let mut host = ManualHost::default();
        assert_eq!(host.sample_memory(), MemorySample::Unavailable);
        assert_eq!(host.sample_timing(), TimingSnapshot::default());
        assert_eq!(host.capabilities().logical_cores, None);
        assert!(!host.prefers_reduced_motion());
    }

    #[test]
    fn test_manual_host_pushed_signals() {
        let mut host = ManualHost::with_cores(8);
        host.set_now(16.7);
        host.advance(16.7);
        host.set_memory(MemoryUsage::new(10, 20, 100));

        assert!((host.sample_frame() - 33.4).abs() < 1e-9);
        assert!(host.capabilities().heap_introspection);
        assert_eq!(
            host.sample_memory(),
            MemorySample::Available(MemoryUsage::new(10, 20, 100))
        );
        assert_eq!(host.capabilities().logical_cores, Some(8));
    }
}
