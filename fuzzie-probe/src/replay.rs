//! Trace replay
//!
//! A trace is a recorded (or hand-written) sequence of one-second readings.
//! Replaying it through a [`ManualHost`] reproduces the policy decisions a
//! live session would have made, without timers or a real display.

use std::io::Write;
use std::path::Path;

use fuzzie_governor::{
    Capabilities, GovernorError, ManualHost, MemoryUsage, MonitorOptions, PerformanceMonitor,
    PolicyThresholds, PolicyUpdate, TimingSnapshot,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Recorded session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Trace {
    pub hardware_concurrency: Option<usize>,
    pub prefers_reduced_motion: bool,
    pub ticks: Vec<TraceTick>,
}

/// One sampling interval of a trace
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceTick {
    /// Aggregated one-second FPS reading taken during this interval
    pub fps: Option<f64>,
    pub memory: Option<MemoryUsage>,
    pub timing: Option<TimingSnapshot>,
    /// Motion preference change observed before this tick
    pub reduced_motion: Option<bool>,
}

impl Trace {
    pub fn load(path: &Path) -> Result<Self, GovernorError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            logical_cores: self.hardware_concurrency,
            heap_introspection: self.ticks.iter().any(|tick| tick.memory.is_some()),
            paint_timing: false,
        }
    }
}

/// Replay `trace` and collect every update a subscriber would have seen
pub fn replay(trace: &Trace, thresholds: PolicyThresholds) -> Vec<PolicyUpdate> {
    let capabilities = trace.capabilities();
    let mut host = ManualHost::new(capabilities);
    host.set_reduced_motion(trace.prefers_reduced_motion);

    let options = MonitorOptions {
        enable_memory_monitoring: capabilities.heap_introspection,
        ..MonitorOptions::default()
    };
    let mut monitor = PerformanceMonitor::new(host, options, thresholds);
    let mut reduced_motion = trace.prefers_reduced_motion;
    let mut updates = Vec::with_capacity(trace.ticks.len());

    info!("Replaying {} ticks", trace.ticks.len());
    monitor.start();

    for tick in &trace.ticks {
        if let Some(reduced) = tick.reduced_motion {
            if reduced != reduced_motion {
                reduced_motion = reduced;
                monitor.host_mut().set_reduced_motion(reduced);
                updates.push(monitor.set_reduced_motion(reduced));
            }
        }

        match tick.memory {
            Some(usage) => monitor.host_mut().set_memory(usage),
            None => monitor.host_mut().clear_memory(),
        }
        if let Some(timing) = tick.timing {
            monitor.host_mut().set_timing(timing);
        }
        if let Some(fps) = tick.fps {
            monitor.record_fps_sample(fps);
        }

        if let Some(update) = monitor.tick() {
            debug!(
                sequence = update.sequence,
                budget = update.policy.particle_budget,
                "Replayed tick"
            );
            updates.push(update);
        }
    }

    monitor.stop();
    updates
}

/// Write updates as JSON lines
pub fn write_json_lines<W: Write>(
    updates: &[PolicyUpdate],
    mut writer: W,
) -> Result<(), GovernorError> {
    for update in updates {
        writer.write_all(update.to_json_line()?.as_bytes())?;
    }
    writer.flush()?;
    Ok(())
}
