//! Monitor lifecycle and single-slot subscription
//!
//! [`PerformanceMonitor`] owns the sampling state for one session: the
//! cached device class, the FPS window, the frame counter, the policy engine
//! and at most one subscriber. It is a plain state machine; something else
//! (the async [`crate::MonitorDriver`], a browser `setInterval`, a replay
//! loop) calls [`tick`](PerformanceMonitor::tick) on the sampling cadence and
//! [`on_frame`](PerformanceMonitor::on_frame) from the display refresh.

use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::classifier::{
    classify_device, performance_score, DeviceClass, FpsWindow, FrameCounter,
};
use crate::error::{GovernorError, Result};
use crate::models::{Metrics, Sample};
use crate::policy::{Policy, PolicyEngine, PolicyThresholds};
use crate::report::report_issues;
use crate::sampler::{Capabilities, SignalHost};

/// Shortest sampling interval accepted by [`MonitorOptions::validate`]
pub const MIN_SAMPLE_INTERVAL_MS: u64 = 100;

/// Monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorOptions {
    pub enable_memory_monitoring: bool,
    pub enable_fps_monitoring: bool,
    /// Log every snapshot and any detected performance issue
    pub log_metrics: bool,
    pub sample_interval_ms: u64,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            enable_memory_monitoring: false,
            enable_fps_monitoring: true,
            log_metrics: false,
            sample_interval_ms: 1000,
        }
    }
}

impl MonitorOptions {
    /// Sampling period, never shorter than [`MIN_SAMPLE_INTERVAL_MS`]
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.max(MIN_SAMPLE_INTERVAL_MS))
    }

    pub fn validate(&self) -> Result<()> {
        if self.sample_interval_ms < MIN_SAMPLE_INTERVAL_MS {
            return Err(GovernorError::InvalidOption(format!(
                "sample_interval_ms must be at least {} (got {})",
                MIN_SAMPLE_INTERVAL_MS, self.sample_interval_ms
            )));
        }
        Ok(())
    }
}

/// Lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Stopped,
    Running,
}

impl std::fmt::Display for MonitorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MonitorState::Stopped => write!(f, "stopped"),
            MonitorState::Running => write!(f, "running"),
        }
    }
}

/// Why an update was delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateReason {
    Tick,
    MotionPreferenceChanged,
}

/// What subscribers receive
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyUpdate {
    pub sequence: u64,
    pub reason: UpdateReason,
    pub policy: Policy,
    pub metrics: Metrics,
    pub performance_score: f64,
}

impl PolicyUpdate {
    /// Serialize as one newline-terminated JSON line
    pub fn to_json_line(&self) -> std::result::Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

type Subscriber = Box<dyn FnMut(&PolicyUpdate) + Send>;

/// Session-scoped rendering governor
pub struct PerformanceMonitor<H: SignalHost> {
    host: H,
    options: MonitorOptions,
    capabilities: Capabilities,
    device: DeviceClass,
    state: MonitorState,
    fps_window: FpsWindow,
    frame_counter: FrameCounter,
    engine: PolicyEngine,
    subscriber: Option<Subscriber>,
    last_metrics: Option<Metrics>,
    sequence: u64,
}

impl<H: SignalHost> PerformanceMonitor<H> {
    /// Read capabilities, classify the device and build the baseline policy
    pub fn new(host: H, options: MonitorOptions, thresholds: PolicyThresholds) -> Self {
        let capabilities = host.capabilities();
        let device = classify_device(capabilities.logical_cores);
        let engine = PolicyEngine::new(device, host.prefers_reduced_motion(), thresholds);

        if let Err(e) = options.validate() {
            warn!(
                "{} - sampling every {}ms instead",
                e,
                options.sample_interval().as_millis()
            );
        }

        info!(
            "Device classified: {} logical cores ({})",
            device.logical_cores,
            if device.low_end { "low-end" } else { "standard" }
        );

        Self {
            host,
            options,
            capabilities,
            device,
            state: MonitorState::Stopped,
            fps_window: FpsWindow::default(),
            frame_counter: FrameCounter::default(),
            engine,
            subscriber: None,
            last_metrics: None,
            sequence: 0,
        }
    }

    pub fn with_defaults(host: H) -> Self {
        Self::new(host, MonitorOptions::default(), PolicyThresholds::default())
    }

    /// Begin sampling. No-op while already running.
    pub fn start(&mut self) {
        if self.state == MonitorState::Running {
            return;
        }
        self.state = MonitorState::Running;

        if self.options.enable_fps_monitoring {
            let now = self.host.sample_frame();
            self.frame_counter.reset(now);
        }

        info!(
            "Performance monitor started (interval: {}ms, fps: {}, memory: {})",
            self.options.sample_interval_ms,
            self.options.enable_fps_monitoring,
            self.memory_sampling_enabled()
        );
    }

    /// Stop sampling and drop the FPS buffer. Safe to call repeatedly.
    pub fn stop(&mut self) {
        if self.state == MonitorState::Stopped {
            return;
        }
        self.state = MonitorState::Stopped;
        self.fps_window.clear();
        self.frame_counter = FrameCounter::default();
        info!("Performance monitor stopped");
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == MonitorState::Running
    }

    /// Register the subscriber; replaces any previous one
    pub fn on_metrics<F>(&mut self, callback: F)
    where
        F: FnMut(&PolicyUpdate) + Send + 'static,
    {
        if self.subscriber.is_some() {
            debug!("Replacing existing metrics subscriber");
        }
        self.subscriber = Some(Box::new(callback));
    }

    pub fn clear_subscriber(&mut self) {
        self.subscriber = None;
    }

    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Per-frame hook. Only counts frames; policy changes happen on ticks.
    pub fn on_frame(&mut self) {
        if !self.is_running() || !self.options.enable_fps_monitoring {
            return;
        }
        let now = self.host.sample_frame();
        if let Some(fps) = self.frame_counter.on_frame(now) {
            self.fps_window.push(fps);
        }
    }

    /// One sampling interval: collect, re-evaluate, deliver
    ///
    /// Returns `None` while stopped.
    pub fn tick(&mut self) -> Option<PolicyUpdate> {
        if !self.is_running() {
            return None;
        }

        let metrics = self.collect_metrics();
        if self.options.log_metrics {
            debug!(
                fps = metrics.fps,
                memory_percent = metrics.memory.map(|m| m.percent_used()),
                "Performance metrics"
            );
            report_issues(&metrics);
        }

        self.engine.evaluate(&metrics);
        Some(self.publish(UpdateReason::Tick, metrics))
    }

    /// Motion preference changed: re-derive immediately
    ///
    /// The update is delivered to the subscriber only while running; a
    /// stopped monitor just keeps `policy()` current.
    pub fn set_reduced_motion(&mut self, prefers_reduced_motion: bool) -> PolicyUpdate {
        info!(
            "Motion preference changed (reduced: {})",
            prefers_reduced_motion
        );
        self.engine.set_reduced_motion(prefers_reduced_motion);

        let metrics = self
            .last_metrics
            .clone()
            .unwrap_or_else(|| self.collect_metrics());
        self.publish(UpdateReason::MotionPreferenceChanged, metrics)
    }

    /// Re-read host capabilities and classify again
    pub fn reclassify(&mut self) -> DeviceClass {
        self.capabilities = self.host.capabilities();
        let device = classify_device(self.capabilities.logical_cores);
        if device != self.device {
            info!(
                "Device reclassified: {} logical cores (low-end: {})",
                device.logical_cores, device.low_end
            );
            self.device = device;
            self.engine.set_device(device);
        }
        self.device
    }

    /// Current policy (one-shot query)
    pub fn policy(&self) -> Policy {
        self.engine.policy()
    }

    /// Current moving-average FPS
    pub fn fps(&self) -> f64 {
        self.fps_window.mean()
    }

    /// Feed an already-aggregated one-second FPS reading
    pub fn record_fps_sample(&mut self, fps: f64) {
        if self.is_running() {
            self.fps_window.push(fps);
        }
    }

    pub fn fps_window(&self) -> &FpsWindow {
        &self.fps_window
    }

    pub fn device_class(&self) -> DeviceClass {
        self.device
    }

    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    pub fn options(&self) -> &MonitorOptions {
        &self.options
    }

    pub fn last_metrics(&self) -> Option<&Metrics> {
        self.last_metrics.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    fn memory_sampling_enabled(&self) -> bool {
        self.options.enable_memory_monitoring && self.capabilities.heap_introspection
    }

    fn collect_metrics(&mut self) -> Metrics {
        let mut metrics = Metrics {
            fps: self.fps_window.mean(),
            memory: None,
            timing: Default::default(),
            sampled_at: Utc::now(),
        };

        metrics.fold(Sample::Timing(self.host.sample_timing()));
        if self.memory_sampling_enabled() {
            metrics.fold(Sample::Memory(self.host.sample_memory()));
        }

        metrics
    }

    fn publish(&mut self, reason: UpdateReason, metrics: Metrics) -> PolicyUpdate {
        self.sequence += 1;
        let update = PolicyUpdate {
            sequence: self.sequence,
            reason,
            policy: self.engine.policy(),
            performance_score: performance_score(&metrics, &self.device),
            metrics: metrics.clone(),
        };
        self.last_metrics = Some(metrics);

        if self.is_running() {
            if let Some(subscriber) = self.subscriber.as_mut() {
                subscriber(&update);
            }
        }

        update
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MemoryUsage;
    use crate::sampler::ManualHost;
    use std::sync::{Arc, Mutex};

    fn memory_options() -> MonitorOptions {
        MonitorOptions {
            enable_memory_monitoring: true,
            ..MonitorOptions::default()
        }
    }

    /// Drive `seconds` worth of frames at `fps` through the monitor
    fn run_frames(monitor: &mut PerformanceMonitor<ManualHost>, fps: u32, seconds: u32) {
        let start = monitor.host().now();
        for k in 1..=(fps * seconds) {
            monitor
                .host_mut()
                .set_now(start + (1000.0 * k as f64) / fps as f64);
            monitor.on_frame();
        }
    }

    #[test]
    fn test_tick_requires_running() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        assert_eq!(monitor.state(), MonitorState::Stopped);
        assert!(monitor.tick().is_none());

        monitor.start();
        assert!(monitor.tick().is_some());
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        monitor.start();
        run_frames(&mut monitor, 60, 1);
        monitor.start();
        assert_eq!(monitor.fps_window().len(), 1);
    }

    #[test]
    fn test_frames_feed_fps_window() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        monitor.start();
        run_frames(&mut monitor, 60, 3);
        assert_eq!(monitor.fps_window().values(), vec![60.0, 60.0, 60.0]);

        run_frames(&mut monitor, 20, 2);
        // Window mean of [60, 60, 60, 20, 20]
        assert!((monitor.fps() - 44.0).abs() < 1e-9);

        let update = monitor.tick().unwrap();
        assert!((update.metrics.fps - 44.0).abs() < 1e-9);
    }

    #[test]
    fn test_frames_ignored_when_fps_disabled() {
        let options = MonitorOptions {
            enable_fps_monitoring: false,
            ..MonitorOptions::default()
        };
        let mut monitor =
            PerformanceMonitor::new(ManualHost::with_cores(8), options, PolicyThresholds::default());
        monitor.start();
        run_frames(&mut monitor, 60, 2);
        assert!(monitor.fps_window().is_empty());

        let update = monitor.tick().unwrap();
        assert_eq!(update.metrics.fps, 0.0);
        assert_eq!(update.policy.particle_budget, 100);
    }

    #[test]
    fn test_end_to_end_low_fps() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        monitor.start();

        let baseline = monitor.policy();
        assert_eq!(baseline.particle_budget, 100);
        assert!(!baseline.disable_parallax);

        monitor.record_fps_sample(20.0);
        monitor.tick();
        monitor.record_fps_sample(20.0);
        let update = monitor.tick().unwrap();

        assert_eq!(update.policy.particle_budget, 80);
        assert!(update.policy.disable_parallax);
        assert!(update.policy.enable_animations);
        assert_eq!(update.sequence, 2);
    }

    #[test]
    fn test_memory_only_sampled_when_enabled() {
        let mut host = ManualHost::with_cores(8);
        host.set_memory(MemoryUsage::new(80, 90, 100));

        let mut disabled = PerformanceMonitor::with_defaults(host.clone());
        disabled.start();
        let update = disabled.tick().unwrap();
        assert!(update.metrics.memory.is_none());
        assert_eq!(update.policy.particle_budget, 100);

        let mut enabled =
            PerformanceMonitor::new(host, memory_options(), PolicyThresholds::default());
        enabled.start();
        let update = enabled.tick().unwrap();
        assert_eq!(update.policy.particle_budget, 80);
        assert!(update.policy.optimize_images);
    }

    #[test]
    fn test_memory_skipped_without_heap_introspection() {
        let mut monitor = PerformanceMonitor::new(
            ManualHost::with_cores(8),
            memory_options(),
            PolicyThresholds::default(),
        );
        monitor.start();
        let update = monitor.tick().unwrap();
        assert!(update.metrics.memory.is_none());
    }

    #[test]
    fn test_single_subscriber_last_wins() {
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        let first_count = Arc::clone(&first);
        monitor.on_metrics(move |_| *first_count.lock().unwrap() += 1);
        let second_count = Arc::clone(&second);
        monitor.on_metrics(move |_| *second_count.lock().unwrap() += 1);

        monitor.start();
        monitor.tick();
        monitor.tick();

        assert_eq!(*first.lock().unwrap(), 0);
        assert_eq!(*second.lock().unwrap(), 2);

        monitor.clear_subscriber();
        monitor.tick();
        assert_eq!(*second.lock().unwrap(), 2);
    }

    #[test]
    fn test_stop_twice_and_no_further_callbacks() {
        let calls = Arc::new(Mutex::new(0u32));
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        let counter = Arc::clone(&calls);
        monitor.on_metrics(move |_| *counter.lock().unwrap() += 1);

        monitor.start();
        run_frames(&mut monitor, 60, 2);
        monitor.tick();
        assert_eq!(*calls.lock().unwrap(), 1);

        monitor.stop();
        assert!(monitor.fps_window().is_empty());
        monitor.stop();
        assert_eq!(monitor.state(), MonitorState::Stopped);

        assert!(monitor.tick().is_none());
        monitor.on_frame();
        assert!(monitor.fps_window().is_empty());
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_motion_change_delivers_immediately() {
        let reasons = Arc::new(Mutex::new(Vec::new()));
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        let sink = Arc::clone(&reasons);
        monitor.on_metrics(move |update| sink.lock().unwrap().push(update.reason));
        monitor.start();

        let update = monitor.set_reduced_motion(true);
        assert!(update.policy.reduced_motion);
        assert!(!update.policy.enable_animations);
        assert!(update.policy.disable_parallax);
        assert_eq!(
            *reasons.lock().unwrap(),
            vec![UpdateReason::MotionPreferenceChanged]
        );
    }

    #[test]
    fn test_motion_change_after_stop_is_not_delivered() {
        let calls = Arc::new(Mutex::new(0u32));
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        let counter = Arc::clone(&calls);
        monitor.on_metrics(move |_| *counter.lock().unwrap() += 1);

        monitor.start();
        monitor.stop();
        monitor.stop();
        let update = monitor.set_reduced_motion(true);

        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(update.policy.reduced_motion);
        assert!(!monitor.policy().enable_animations);
    }

    #[test]
    fn test_heap_capability_is_fixed_at_construction() {
        let mut monitor = PerformanceMonitor::new(
            ManualHost::with_cores(8),
            memory_options(),
            PolicyThresholds::default(),
        );
        monitor.start();
        monitor.host_mut().set_memory(MemoryUsage::new(90, 95, 100));

        let update = monitor.tick().unwrap();
        assert!(update.metrics.memory.is_none());
        assert_eq!(update.policy.particle_budget, 100);
    }

    #[test]
    fn test_host_motion_preference_seeds_baseline() {
        let mut host = ManualHost::with_cores(16);
        host.set_reduced_motion(true);
        let monitor = PerformanceMonitor::with_defaults(host);
        assert!(!monitor.policy().enable_animations);
        assert!(monitor.policy().reduced_motion);
    }

    #[test]
    fn test_reclassify_is_idempotent() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        let first = monitor.device_class();
        assert_eq!(monitor.reclassify(), first);
        assert_eq!(monitor.reclassify(), first);
        assert_eq!(monitor.policy().particle_budget, 100);
    }

    #[test]
    fn test_options_validation() {
        assert!(MonitorOptions::default().validate().is_ok());
        let too_fast = MonitorOptions {
            sample_interval_ms: 10,
            ..MonitorOptions::default()
        };
        assert!(too_fast.validate().is_err());
        assert_eq!(
            too_fast.sample_interval(),
            Duration::from_millis(MIN_SAMPLE_INTERVAL_MS)
        );

        let zero = MonitorOptions {
            sample_interval_ms: 0,
            ..MonitorOptions::default()
        };
        assert_eq!(zero.sample_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_update_json_line() {
        let mut monitor = PerformanceMonitor::with_defaults(ManualHost::with_cores(8));
        monitor.start();
        let line = monitor.tick().unwrap().to_json_line().unwrap();
        assert!(line.contains("\"reason\":\"tick\""));
        assert!(line.contains("\"particle_budget\":100"));
        assert!(line.ends_with('\n'));
    }
}
