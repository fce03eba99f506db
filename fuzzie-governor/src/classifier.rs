//! Heuristic device classification and FPS aggregation

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::models::Metrics;

/// Devices at or below this many logical cores are low-end
pub const LOW_END_CORE_THRESHOLD: usize = 4;

/// Core count assumed when the platform hides it
pub const DEFAULT_LOGICAL_CORES: usize = 4;

/// Number of one-second FPS samples kept for the moving average
pub const FPS_WINDOW_SIZE: usize = 5;

/// Frame counter emits one FPS sample per this many milliseconds
pub const FPS_SAMPLE_PERIOD_MS: f64 = 1000.0;

/// FPS treated as "full speed" by the performance score
const TARGET_FPS: f64 = 60.0;

/// Static device classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceClass {
    pub low_end: bool,
    pub logical_cores: usize,
}

/// Classify from the reported logical core count
pub fn classify_device(logical_cores: Option<usize>) -> DeviceClass {
    let logical_cores = match logical_cores {
        Some(n) if n > 0 => n,
        _ => DEFAULT_LOGICAL_CORES,
    };

    DeviceClass {
        low_end: logical_cores <= LOW_END_CORE_THRESHOLD,
        logical_cores,
    }
}

/// Fixed-size FIFO of one-second FPS samples
#[derive(Debug, Clone)]
pub struct FpsWindow {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for FpsWindow {
    fn default() -> Self {
        Self::new(FPS_WINDOW_SIZE)
    }
}

impl FpsWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, evicting the oldest once full
    pub fn push(&mut self, fps: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(fps);
    }

    /// Arithmetic mean of the window, 0.0 when empty
    pub fn mean(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let (front, back) = self.samples.as_slices();
        if back.is_empty() {
            statistical::mean(front)
        } else {
            statistical::mean(&self.values())
        }
    }

    pub fn values(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Counts animation frames and emits one FPS reading per elapsed second
#[derive(Debug, Clone, Default)]
pub struct FrameCounter {
    last_emit_ms: f64,
    frames: u32,
}

impl FrameCounter {
    /// Restart counting from `now_ms`
    pub fn reset(&mut self, now_ms: f64) {
        self.last_emit_ms = now_ms;
        self.frames = 0;
    }

    /// Record one frame; returns an FPS reading once a full period elapsed
    pub fn on_frame(&mut self, now_ms: f64) -> Option<f64> {
        self.frames = self.frames.saturating_add(1);

        let elapsed = now_ms - self.last_emit_ms;
        if elapsed >= FPS_SAMPLE_PERIOD_MS {
            let fps = ((self.frames as f64 * 1000.0) / elapsed).round();
            self.reset(now_ms);
            Some(fps)
        } else {
            None
        }
    }

    pub fn pending_frames(&self) -> u32 {
        self.frames
    }
}

/// Continuous score in `[0, 1]`; higher means more headroom
///
/// 60% weight on FPS relative to 60, 40% on free heap. Unknown FPS counts
/// as full speed, unknown memory as no pressure. Low-end devices are scaled
/// by 0.8.
pub fn performance_score(metrics: &Metrics, device: &DeviceClass) -> f64 {
    let fps_component = if metrics.fps > 0.0 {
        (metrics.fps / TARGET_FPS).min(1.0)
    } else {
        1.0
    };
    let memory_component = 1.0 - metrics.memory_pressure().unwrap_or(0.0).clamp(0.0, 1.0);

    let mut score = 0.6 * fps_component + 0.4 * memory_component;
    if device.low_end {
        score *= 0.8;
    }
    score.clamp(0.0, 1.0)
}
