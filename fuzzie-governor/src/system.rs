//! Native signal host backed by `sysinfo`
//!
//! Heap figures are process-level: `used` is the resident set of this
//! process, `total` the memory in use system-wide, and `limit` either the
//! configured heap budget or the physical memory of the machine.

use std::time::Instant;

use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::models::{MemorySample, MemoryUsage, TimingSnapshot};
use crate::sampler::{Capabilities, SignalHost};

/// Signal host for native builds
pub struct SystemHost {
    system: System,
    current_pid: Pid,
    origin: Instant,
    heap_budget: Option<u64>,
    capabilities: Capabilities,
    reduced_motion: bool,
}

impl SystemHost {
    /// Create a host and read its capabilities once
    pub fn new() -> Self {
        let mut system = System::new();
        system.refresh_cpu_all();
        system.refresh_memory();

        let logical_cores = match system.cpus().len() {
            0 => None,
            n => Some(n),
        };
        let heap_introspection = system.total_memory() > 0;

        if logical_cores.is_none() {
            tracing::warn!("Logical core count unavailable - classifier will assume the default");
        }
        if !heap_introspection {
            tracing::warn!("Heap introspection unavailable - memory rules disabled");
        }

        Self {
            system,
            current_pid: Pid::from_u32(std::process::id()),
            origin: Instant::now(),
            heap_budget: None,
            capabilities: Capabilities {
                logical_cores,
                heap_introspection,
                paint_timing: false,
            },
            reduced_motion: false,
        }
    }

    /// Use a fixed heap budget (bytes) as the pressure denominator
    pub fn with_heap_budget(mut self, budget_bytes: Option<u64>) -> Self {
        self.heap_budget = budget_bytes.filter(|b| *b > 0);
        self
    }

    pub fn with_reduced_motion(mut self, reduced: bool) -> Self {
        self.reduced_motion = reduced;
        self
    }

    pub fn set_reduced_motion(&mut self, reduced: bool) {
        self.reduced_motion = reduced;
    }

    fn process_start_ms(&mut self) -> f64 {
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.current_pid]), false);
        self.system
            .process(self.current_pid)
            .map(|p| p.start_time() as f64 * 1000.0)
            .unwrap_or(0.0)
    }
}

impl Default for SystemHost {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHost for SystemHost {
    fn sample_frame(&mut self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }

    fn sample_memory(&mut self) -> MemorySample {
        if !self.capabilities.heap_introspection {
            return MemorySample::Unavailable;
        }

        self.system.refresh_memory();
        self.system
            .refresh_processes(ProcessesToUpdate::Some(&[self.current_pid]), false);

        let used = match self.system.process(self.current_pid) {
            Some(process) => process.memory(),
            None => return MemorySample::Unavailable,
        };
        let total = self.system.used_memory();
        let limit = self
            .heap_budget
            .unwrap_or_else(|| self.system.total_memory());

        MemorySample::Available(MemoryUsage { used, total, limit })
    }

    fn sample_timing(&mut self) -> TimingSnapshot {
        // No paint pipeline natively; only the navigation origin is known.
        TimingSnapshot {
            navigation_start: self.process_start_ms(),
            ..TimingSnapshot::default()
        }
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn prefers_reduced_motion(&self) -> bool {
        self.reduced_motion
    }
}
