//! WebAssembly bindings for the Fuzzie rendering governor
//!
//! The page reads the browser APIs (animation frame timestamps,
//! `performance.memory`, navigation timing, `matchMedia`) and pushes them in;
//! policy and metrics come back as JSON strings.
//!
//! No timers run on the Rust side - the page drives `tick()` from its own
//! `setInterval` and `frame()` from `requestAnimationFrame`.

use fuzzie_governor::classifier;
use fuzzie_governor::report::detect_issues;
use fuzzie_governor::scroll;
use fuzzie_governor::{
    AnimationPreset, Capabilities, GovernorError, ManualHost, MemoryUsage, Metrics,
    MonitorOptions, PerformanceMonitor, PolicyThresholds, PolicyUpdate, TimingSnapshot,
};
use serde::Deserialize;
use thiserror::Error;
use wasm_bindgen::prelude::*;

// Initialize panic hook for better error messages
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

#[derive(Debug, Error)]
pub enum BindingError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Governor(#[from] GovernorError),

    #[error("Unknown animation preset: {0}")]
    UnknownPreset(String),

    #[error("Policy listener threw: {0}")]
    Listener(String),
}

impl From<BindingError> for JsValue {
    fn from(e: BindingError) -> Self {
        JsValue::from_str(&e.to_string())
    }
}

// ============================================================================
// SECTION 1: Governor session
// ============================================================================

/// Optional settings accepted by the `RenderingGovernor` constructor
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    pub monitor: MonitorOptions,
    pub thresholds: PolicyThresholds,
}

/// Browser-side governor state, independent of the JS boundary
pub struct GovernorSession {
    monitor: PerformanceMonitor<ManualHost>,
}

impl GovernorSession {
    pub fn new(
        hardware_concurrency: Option<u32>,
        heap_introspection: bool,
        prefers_reduced_motion: bool,
        options_json: Option<&str>,
    ) -> Result<Self, BindingError> {
        let options: SessionOptions = match options_json {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(json)?,
            _ => SessionOptions::default(),
        };
        options.monitor.validate()?;

        let mut host = ManualHost::new(Capabilities {
            logical_cores: hardware_concurrency.map(|n| n as usize),
            heap_introspection,
            paint_timing: false,
        });
        host.set_reduced_motion(prefers_reduced_motion);

        Ok(Self {
            monitor: PerformanceMonitor::new(host, options.monitor, options.thresholds),
        })
    }

    pub fn start(&mut self, now_ms: f64) {
        self.monitor.host_mut().set_now(now_ms);
        self.monitor.start();
    }

    pub fn stop(&mut self) {
        self.monitor.stop();
    }

    pub fn is_running(&self) -> bool {
        self.monitor.is_running()
    }

    pub fn frame(&mut self, timestamp_ms: f64) {
        self.monitor.host_mut().set_now(timestamp_ms);
        self.monitor.on_frame();
    }

    pub fn set_memory(&mut self, used: f64, total: f64, limit: f64) {
        self.monitor
            .host_mut()
            .set_memory(MemoryUsage::new(used as u64, total as u64, limit as u64));
    }

    pub fn clear_memory(&mut self) {
        self.monitor.host_mut().clear_memory();
    }

    pub fn set_timing(&mut self, timing_json: &str) -> Result<(), BindingError> {
        let timing: TimingSnapshot = serde_json::from_str(timing_json)?;
        self.monitor.host_mut().set_timing(timing);
        Ok(())
    }

    /// `None` while stopped
    pub fn tick(&mut self) -> Result<Option<String>, BindingError> {
        self.monitor
            .tick()
            .map(|update| update_json(&update))
            .transpose()
    }

    pub fn set_reduced_motion(&mut self, prefers_reduced_motion: bool) -> Result<String, BindingError> {
        self.monitor.host_mut().set_reduced_motion(prefers_reduced_motion);
        let update = self.monitor.set_reduced_motion(prefers_reduced_motion);
        update_json(&update)
    }

    pub fn policy_json(&self) -> Result<String, BindingError> {
        Ok(serde_json::to_string(&self.monitor.policy())?)
    }

    pub fn animation_settings_json(&self) -> Result<String, BindingError> {
        let settings = self
            .monitor
            .policy()
            .animation_settings(&self.monitor.device_class());
        Ok(serde_json::to_string(&settings)?)
    }

    /// Entrance animation for `preset` ("fade", "slide", "scale"); JSON
    /// `null` when animations are disabled
    pub fn animation_props_json(&self, preset: &str) -> Result<String, BindingError> {
        let preset: AnimationPreset =
            serde_json::from_value(serde_json::Value::String(preset.to_string()))
                .map_err(|_| BindingError::UnknownPreset(preset.to_string()))?;
        Ok(serde_json::to_string(&self.monitor.policy().animation_props(preset))?)
    }

    pub fn fps(&self) -> f64 {
        self.monitor.fps()
    }

    pub fn is_low_end(&self) -> bool {
        self.monitor.device_class().low_end
    }

    pub fn clamp_particles(&self, requested: u32) -> u32 {
        self.monitor.policy().clamp_particles(requested)
    }

    pub fn image_quality(&self) -> u8 {
        self.monitor.policy().image_quality().quality()
    }
}

fn update_json(update: &PolicyUpdate) -> Result<String, BindingError> {
    Ok(serde_json::to_string(update)?)
}

// ============================================================================
// SECTION 2: JS class
// ============================================================================

/// Rendering governor exposed to the page
///
/// One listener slot: `on_policy` replaces any previous listener.
#[wasm_bindgen]
pub struct RenderingGovernor {
    session: GovernorSession,
    listener: Option<js_sys::Function>,
}

#[wasm_bindgen]
impl RenderingGovernor {
    /// # Arguments
    /// * `hardware_concurrency` - `navigator.hardwareConcurrency`, if exposed
    /// * `heap_introspection` - whether `performance.memory` exists; fixed for
    ///   the governor's lifetime, `set_memory` is ignored when this is false
    /// * `prefers_reduced_motion` - `matchMedia('(prefers-reduced-motion: reduce)').matches`
    /// * `options_json` - optional `{ monitor: {...}, thresholds: {...} }`
    #[wasm_bindgen(constructor)]
    pub fn new(
        hardware_concurrency: Option<u32>,
        heap_introspection: bool,
        prefers_reduced_motion: bool,
        options_json: Option<String>,
    ) -> Result<RenderingGovernor, JsValue> {
        let session = GovernorSession::new(
            hardware_concurrency,
            heap_introspection,
            prefers_reduced_motion,
            options_json.as_deref(),
        )?;
        Ok(RenderingGovernor {
            session,
            listener: None,
        })
    }

    pub fn start(&mut self, now_ms: f64) {
        self.session.start(now_ms);
    }

    pub fn stop(&mut self) {
        self.session.stop();
    }

    pub fn is_running(&self) -> bool {
        self.session.is_running()
    }

    /// Call from `requestAnimationFrame` with its timestamp
    pub fn frame(&mut self, timestamp_ms: f64) {
        self.session.frame(timestamp_ms);
    }

    pub fn set_memory(&mut self, used: f64, total: f64, limit: f64) {
        self.session.set_memory(used, total, limit);
    }

    pub fn clear_memory(&mut self) {
        self.session.clear_memory();
    }

    pub fn set_timing(&mut self, timing_json: &str) -> Result<(), JsValue> {
        Ok(self.session.set_timing(timing_json)?)
    }

    /// One sampling interval. Returns the update JSON (also passed to the
    /// listener), or `undefined` while stopped.
    pub fn tick(&mut self) -> Result<Option<String>, JsValue> {
        let update = self.session.tick()?;
        if let Some(json) = &update {
            self.notify(json)?;
        }
        Ok(update)
    }

    /// Re-derive the policy; the listener hears about it only while running
    pub fn set_reduced_motion(&mut self, prefers_reduced_motion: bool) -> Result<String, JsValue> {
        let update = self.session.set_reduced_motion(prefers_reduced_motion)?;
        if self.session.is_running() {
            self.notify(&update)?;
        }
        Ok(update)
    }

    pub fn on_policy(&mut self, listener: js_sys::Function) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    pub fn policy(&self) -> Result<String, JsValue> {
        Ok(self.session.policy_json()?)
    }

    pub fn animation_settings(&self) -> Result<String, JsValue> {
        Ok(self.session.animation_settings_json()?)
    }

    pub fn animation_props(&self, preset: &str) -> Result<String, JsValue> {
        Ok(self.session.animation_props_json(preset)?)
    }

    pub fn fps(&self) -> f64 {
        self.session.fps()
    }

    pub fn is_low_end(&self) -> bool {
        self.session.is_low_end()
    }

    pub fn clamp_particles(&self, requested: u32) -> u32 {
        self.session.clamp_particles(requested)
    }

    pub fn image_quality(&self) -> u8 {
        self.session.image_quality()
    }

    fn notify(&self, json: &str) -> Result<(), BindingError> {
        if let Some(listener) = &self.listener {
            listener
                .call1(&JsValue::NULL, &JsValue::from_str(json))
                .map_err(|e| BindingError::Listener(format!("{:?}", e)))?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION 3: Stateless helpers
// ============================================================================

/// Device class for a `navigator.hardwareConcurrency` value
///
/// # Returns
/// JSON `{ low_end: bool, logical_cores: number }`
#[wasm_bindgen]
pub fn classify_device(hardware_concurrency: Option<u32>) -> Result<String, JsValue> {
    let device = classifier::classify_device(hardware_concurrency.map(|n| n as usize));
    serde_json::to_string(&device)
        .map_err(|e| JsValue::from_str(&format!("JSON serialize error: {}", e)))
}

/// Performance issues in a metrics snapshot (as delivered in `tick()` output)
///
/// # Returns
/// JSON array of `{ issue: "low_fps" | "high_memory" | "slow_load", ... }`
#[wasm_bindgen]
pub fn detect_performance_issues(metrics_json: &str) -> Result<String, JsValue> {
    Ok(issues_json(metrics_json)?)
}

fn issues_json(metrics_json: &str) -> Result<String, BindingError> {
    let metrics: Metrics = serde_json::from_str(metrics_json)?;
    Ok(serde_json::to_string(&detect_issues(&metrics))?)
}

#[wasm_bindgen]
pub fn scroll_percentage(scroll_top: f64, scroll_height: f64, client_height: f64) -> f64 {
    scroll::scroll_percentage(scroll_top, scroll_height, client_height)
}

/// Parallax offset in pixels, `undefined` when the element is far off-screen
#[wasm_bindgen]
pub fn parallax_offset(
    scroll_y: f64,
    element_top: f64,
    element_height: f64,
    viewport_height: f64,
    speed: f64,
) -> Option<f64> {
    scroll::parallax_offset(scroll_y, element_top, element_height, viewport_height, speed)
}
