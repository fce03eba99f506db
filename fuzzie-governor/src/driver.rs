//! Async driver for [`PerformanceMonitor`]
//!
//! Spawns the sampling timer (and optionally a frame pump standing in for the
//! display refresh callback) on the tokio runtime. Every access to the
//! monitor goes through one mutex, so ticks and callbacks are serialised in
//! timer order.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::monitor::{PerformanceMonitor, PolicyUpdate};
use crate::policy::Policy;
use crate::sampler::SignalHost;

pub struct MonitorDriver<H: SignalHost + 'static> {
    monitor: Arc<Mutex<PerformanceMonitor<H>>>,
    /// Bumped by `stop()` under the monitor lock; tasks from an earlier
    /// start see a newer value and exit without touching the monitor
    generation: Arc<AtomicU64>,
    frame_interval: Option<Duration>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<H: SignalHost + 'static> MonitorDriver<H> {
    pub fn new(monitor: PerformanceMonitor<H>) -> Self {
        Self {
            monitor: Arc::new(Mutex::new(monitor)),
            generation: Arc::new(AtomicU64::new(0)),
            frame_interval: None,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// Pump `on_frame` at a fixed rate (for hosts without a refresh callback)
    pub fn with_frame_rate(mut self, frames_per_second: u32) -> Self {
        self.frame_interval = match frames_per_second {
            0 => None,
            fps => Some(Duration::from_secs_f64(1.0 / fps as f64)),
        };
        self
    }

    /// Start the monitor and its timers. No-op while running.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.tasks.lock();

        let (sample_interval, fps_enabled, generation) = {
            let mut monitor = self.monitor.lock();
            if monitor.is_running() {
                return;
            }
            monitor.start();
            (
                monitor.options().sample_interval(),
                monitor.options().enable_fps_monitoring,
                self.generation.load(Ordering::SeqCst),
            )
        };

        let monitor = Arc::clone(&self.monitor);
        let current = Arc::clone(&self.generation);
        tasks.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sample_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick completes immediately; sampling starts one interval in
            ticker.tick().await;

            loop {
                ticker.tick().await;
                if !tick_if_current(&monitor, &current, generation) {
                    break;
                }
            }
            tracing::debug!("Sampling timer stopped");
        }));

        if let (Some(frame_interval), true) = (self.frame_interval, fps_enabled) {
            let monitor = Arc::clone(&self.monitor);
            let current = Arc::clone(&self.generation);
            tasks.push(tokio::spawn(async move {
                let mut pump = tokio::time::interval(frame_interval);
                pump.set_missed_tick_behavior(MissedTickBehavior::Skip);

                loop {
                    pump.tick().await;
                    let running = {
                        let mut monitor = monitor.lock();
                        if current.load(Ordering::SeqCst) != generation {
                            break;
                        }
                        monitor.on_frame();
                        monitor.is_running()
                    };
                    if !running {
                        break;
                    }
                }
                tracing::debug!("Frame pump stopped");
            }));
        }
    }

    /// Stop sampling. Once this returns no further callback fires.
    pub fn stop(&self) {
        let mut tasks = self.tasks.lock();
        // Flip state under the monitor lock first: an in-flight tick either
        // finished before this point or will observe the new generation.
        {
            let mut monitor = self.monitor.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            monitor.stop();
        }
        for task in tasks.drain(..) {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.monitor.lock().is_running()
    }

    pub fn policy(&self) -> Policy {
        self.monitor.lock().policy()
    }

    pub fn fps(&self) -> f64 {
        self.monitor.lock().fps()
    }

    pub fn on_metrics<F>(&self, callback: F)
    where
        F: FnMut(&PolicyUpdate) + Send + 'static,
    {
        self.monitor.lock().on_metrics(callback);
    }

    pub fn set_reduced_motion(&self, prefers_reduced_motion: bool) -> PolicyUpdate {
        self.monitor.lock().set_reduced_motion(prefers_reduced_motion)
    }

    /// Latest-value channel of policies
    ///
    /// Occupies the single subscriber slot; a later `on_metrics` or
    /// `watch_policy` call replaces it and this receiver stops updating.
    pub fn watch_policy(&self) -> watch::Receiver<Policy> {
        let mut monitor = self.monitor.lock();
        let (tx, rx) = watch::channel(monitor.policy());
        monitor.on_metrics(move |update| {
            // Receiver dropped: nothing to deliver to
            let _ = tx.send(update.policy);
        });
        rx
    }

    /// Shared handle to the monitor for direct queries
    pub fn monitor(&self) -> Arc<Mutex<PerformanceMonitor<H>>> {
        Arc::clone(&self.monitor)
    }
}

/// Run one tick unless the task belongs to an earlier start; returns
/// whether the task should keep going
fn tick_if_current<H: SignalHost>(
    monitor: &Mutex<PerformanceMonitor<H>>,
    current: &AtomicU64,
    generation: u64,
) -> bool {
    let mut monitor = monitor.lock();
    if current.load(Ordering::SeqCst) != generation {
        return false;
    }
    monitor.tick().is_some()
}

impl<H: SignalHost + 'static> Drop for MonitorDriver<H> {
    fn drop(&mut self) {
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}
