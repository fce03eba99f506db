//! Adaptive rendering policy
//!
//! The [`PolicyEngine`] folds each metrics snapshot into a [`Policy`].
//! Degradation is one-way within a session: the particle budget only ever
//! goes down, and once parallax or image optimisation has been forced on by
//! a live signal it stays on.

use serde::{Deserialize, Serialize};

use crate::classifier::DeviceClass;
use crate::models::Metrics;

/// Rendering settings advised to UI consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    pub enable_animations: bool,
    pub reduced_motion: bool,
    pub particle_budget: u32,
    pub optimize_images: bool,
    pub disable_parallax: bool,
}

/// Image quality tier for image-loading consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Standard,
    Optimized,
}

impl ImageQuality {
    /// Encoder quality passed to the image pipeline
    pub fn quality(&self) -> u8 {
        match self {
            ImageQuality::Standard => 90,
            ImageQuality::Optimized => 80,
        }
    }
}

/// Derived animation tuning for decorative components
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationSettings {
    pub particle_size: f32,
    pub animation_duration_s: f32,
    pub use_simple_animations: bool,
}

/// Entrance animation presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnimationPreset {
    Fade,
    Slide,
    Scale,
}

/// Cubic-bezier easing shared by every preset
pub const ENTRANCE_EASING: [f32; 4] = [0.25, 0.1, 0.25, 1.0];

/// Initial values for an entrance animation; targets are opacity 1,
/// offset 0 and scale 1
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnimationProps {
    pub initial_opacity: f32,
    pub initial_offset_y: f32,
    pub initial_scale: f32,
    pub duration_s: f32,
    pub easing: [f32; 4],
}

impl Policy {
    /// Starting policy before any live metrics have been seen
    pub fn baseline(
        device: &DeviceClass,
        prefers_reduced_motion: bool,
        thresholds: &PolicyThresholds,
    ) -> Self {
        let particle_budget = if device.low_end {
            thresholds.low_end_particle_budget
        } else {
            thresholds.particle_budget
        };

        Self {
            enable_animations: !prefers_reduced_motion,
            reduced_motion: prefers_reduced_motion,
            particle_budget,
            optimize_images: device.low_end,
            disable_parallax: device.low_end || prefers_reduced_motion,
        }
    }

    pub fn image_quality(&self) -> ImageQuality {
        if self.optimize_images {
            ImageQuality::Optimized
        } else {
            ImageQuality::Standard
        }
    }

    pub fn animation_settings(&self, device: &DeviceClass) -> AnimationSettings {
        let simple = device.low_end || self.reduced_motion;
        AnimationSettings {
            particle_size: if simple { 1.0 } else { 2.0 },
            animation_duration_s: if simple { 0.3 } else { 0.5 },
            use_simple_animations: simple,
        }
    }

    /// Entrance animation for `preset`, or `None` when animations are off
    pub fn animation_props(&self, preset: AnimationPreset) -> Option<AnimationProps> {
        if !self.enable_animations {
            return None;
        }

        let duration_s = if self.reduced_motion { 0.3 } else { 0.5 };
        let mut props = AnimationProps {
            initial_opacity: 0.0,
            initial_offset_y: 0.0,
            initial_scale: 1.0,
            duration_s,
            easing: ENTRANCE_EASING,
        };

        match preset {
            AnimationPreset::Fade => {}
            AnimationPreset::Slide => {
                props.initial_offset_y = if self.reduced_motion { 10.0 } else { 20.0 };
            }
            AnimationPreset::Scale => props.initial_scale = 0.95,
        }

        Some(props)
    }

    /// Clamp a consumer's requested particle count to the advised budget
    pub fn clamp_particles(&self, requested: u32) -> u32 {
        requested.min(self.particle_budget)
    }
}

/// Thresholds and budgets driving policy derivation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyThresholds {
    /// Baseline particle budget for capable devices
    pub particle_budget: u32,
    /// Baseline particle budget for low-end devices
    pub low_end_particle_budget: u32,
    /// FPS below this triggers the low-FPS rule
    pub low_fps: f64,
    pub low_fps_step: u32,
    pub low_fps_floor: u32,
    /// Heap pressure (used / limit) above this triggers the memory rule
    pub memory_pressure: f64,
    pub memory_step: u32,
    pub memory_floor: u32,
}

impl Default for PolicyThresholds {
    fn default() -> Self {
        Self {
            particle_budget: 100,
            low_end_particle_budget: 30,
            low_fps: 30.0,
            low_fps_step: 10,
            low_fps_floor: 20,
            memory_pressure: 0.7,
            memory_step: 20,
            memory_floor: 10,
        }
    }
}

/// Lower `budget` by `step` without going under `floor`, and never raise it
fn degrade(budget: u32, step: u32, floor: u32) -> u32 {
    budget.min(budget.saturating_sub(step).max(floor))
}

/// Stateful policy derivation for one session
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    device: DeviceClass,
    thresholds: PolicyThresholds,
    policy: Policy,
    fps_degraded: bool,
    memory_degraded: bool,
}

impl PolicyEngine {
    pub fn new(
        device: DeviceClass,
        prefers_reduced_motion: bool,
        thresholds: PolicyThresholds,
    ) -> Self {
        let policy = Policy::baseline(&device, prefers_reduced_motion, &thresholds);
        Self {
            device,
            thresholds,
            policy,
            fps_degraded: false,
            memory_degraded: false,
        }
    }

    /// Fold one sampling tick into the policy
    ///
    /// An FPS of zero means no aggregated reading exists yet and is not
    /// treated as a slow frame rate.
    pub fn evaluate(&mut self, metrics: &Metrics) -> Policy {
        if metrics.fps > 0.0 && metrics.fps < self.thresholds.low_fps {
            self.policy.particle_budget = degrade(
                self.policy.particle_budget,
                self.thresholds.low_fps_step,
                self.thresholds.low_fps_floor,
            );
            if !self.fps_degraded {
                tracing::info!(fps = metrics.fps, "Low frame rate - disabling parallax");
            }
            self.fps_degraded = true;
        }

        if let Some(pressure) = metrics.memory_pressure() {
            if pressure > self.thresholds.memory_pressure {
                self.policy.particle_budget = degrade(
                    self.policy.particle_budget,
                    self.thresholds.memory_step,
                    self.thresholds.memory_floor,
                );
                if !self.memory_degraded {
                    tracing::info!(
                        pressure_percent = pressure * 100.0,
                        "Heap pressure - optimizing images"
                    );
                }
                self.memory_degraded = true;
            }
        }

        self.recompute_flags();
        self.policy
    }

    /// Apply a motion preference change immediately
    pub fn set_reduced_motion(&mut self, prefers_reduced_motion: bool) -> Policy {
        self.policy.reduced_motion = prefers_reduced_motion;
        self.recompute_flags();
        self.policy
    }

    /// Rebase on a new device classification. Budgets already spent stay spent.
    pub fn set_device(&mut self, device: DeviceClass) {
        self.device = device;
        if device.low_end {
            self.policy.particle_budget = self
                .policy
                .particle_budget
                .min(self.thresholds.low_end_particle_budget);
        }
        self.recompute_flags();
    }

    pub fn policy(&self) -> Policy {
        self.policy
    }

    pub fn device(&self) -> DeviceClass {
        self.device
    }

    pub fn thresholds(&self) -> &PolicyThresholds {
        &self.thresholds
    }

    fn recompute_flags(&mut self) {
        let reduced = self.policy.reduced_motion;
        self.policy.enable_animations = !reduced;
        self.policy.disable_parallax = self.device.low_end || reduced || self.fps_degraded;
        self.policy.optimize_images = self.device.low_end || self.memory_degraded;
    }
}

/// Single derivation from the baseline policy
pub fn derive_policy(
    metrics: &Metrics,
    device: &DeviceClass,
    prefers_reduced_motion: bool,
) -> Policy {
    PolicyEngine::new(*device, prefers_reduced_motion, PolicyThresholds::default())
        .evaluate(metrics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::classify_device;
    use crate::models::MemoryUsage;

    fn high_end() -> DeviceClass {
        classify_device(Some(8))
    }

    fn with_pressure(fps: f64, used: u64) -> Metrics {
        let mut metrics = Metrics::with_fps(fps);
        metrics.memory = Some(MemoryUsage::new(used, used, 100));
        metrics
    }

    #[test]
    fn test_high_end_baseline() {
        let engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        assert_eq!(
            engine.policy(),
            Policy {
                enable_animations: true,
                reduced_motion: false,
                particle_budget: 100,
                optimize_images: false,
                disable_parallax: false,
            }
        );
    }

    #[test]
    fn test_low_end_baseline() {
        let engine =
            PolicyEngine::new(classify_device(Some(2)), false, PolicyThresholds::default());
        let policy = engine.policy();
        assert_eq!(policy.particle_budget, 30);
        assert!(policy.optimize_images);
        assert!(policy.disable_parallax);
        assert!(policy.enable_animations);
    }

    #[test]
    fn test_two_low_fps_ticks() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        engine.evaluate(&Metrics::with_fps(20.0));
        let policy = engine.evaluate(&Metrics::with_fps(20.0));

        assert_eq!(policy.particle_budget, 80);
        assert!(policy.disable_parallax);
        assert!(policy.enable_animations);
        assert!(!policy.optimize_images);
    }

    #[test]
    fn test_low_fps_floor() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        for _ in 0..20 {
            engine.evaluate(&Metrics::with_fps(10.0));
        }
        assert_eq!(engine.policy().particle_budget, 20);
    }

    #[test]
    fn test_memory_pressure_single_tick() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());

        let policy = engine.evaluate(&with_pressure(60.0, 75));
        assert_eq!(policy.particle_budget, 80);
        assert!(policy.optimize_images);

        // Pressure relieved: no further decrease, image optimisation stays latched
        let policy = engine.evaluate(&with_pressure(60.0, 40));
        assert_eq!(policy.particle_budget, 80);
        assert!(policy.optimize_images);
    }

    #[test]
    fn test_memory_pressure_at_threshold_is_not_pressure() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        let policy = engine.evaluate(&with_pressure(60.0, 70));
        assert_eq!(policy.particle_budget, 100);
        assert!(!policy.optimize_images);
    }

    #[test]
    fn test_low_fps_never_raises_budget_below_its_floor() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        for _ in 0..10 {
            engine.evaluate(&with_pressure(60.0, 90));
        }
        assert_eq!(engine.policy().particle_budget, 10);

        // The low-FPS floor (20) is above the current budget; it must not lift it
        let policy = engine.evaluate(&Metrics::with_fps(15.0));
        assert_eq!(policy.particle_budget, 10);
    }

    #[test]
    fn test_budget_is_monotonic() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        let trace = [
            with_pressure(60.0, 10),
            Metrics::with_fps(25.0),
            with_pressure(58.0, 80),
            Metrics::with_fps(60.0),
            with_pressure(12.0, 95),
            Metrics::with_fps(0.0),
            Metrics::with_fps(59.0),
        ];

        let mut previous = engine.policy().particle_budget;
        for metrics in &trace {
            let budget = engine.evaluate(metrics).particle_budget;
            assert!(budget <= previous, "budget rose from {} to {}", previous, budget);
            previous = budget;
        }
    }

    #[test]
    fn test_unknown_fps_does_not_degrade() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        let policy = engine.evaluate(&Metrics::with_fps(0.0));
        assert_eq!(policy.particle_budget, 100);
        assert!(!policy.disable_parallax);
    }

    #[test]
    fn test_reduced_motion_disables_animations() {
        let mut engine = PolicyEngine::new(high_end(), true, PolicyThresholds::default());
        let policy = engine.evaluate(&Metrics::with_fps(60.0));
        assert!(policy.reduced_motion);
        assert!(!policy.enable_animations);
        assert!(policy.disable_parallax);

        let policy = engine.set_reduced_motion(false);
        assert!(policy.enable_animations);
        assert!(!policy.disable_parallax);
    }

    #[test]
    fn test_motion_change_keeps_fps_degradation() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        engine.evaluate(&Metrics::with_fps(20.0));
        engine.set_reduced_motion(true);
        let policy = engine.set_reduced_motion(false);
        assert!(policy.disable_parallax);
        assert_eq!(policy.particle_budget, 90);
    }

    #[test]
    fn test_set_device_never_raises_budget() {
        let mut engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        engine.set_device(classify_device(Some(2)));
        assert_eq!(engine.policy().particle_budget, 30);
        assert!(engine.policy().optimize_images);

        engine.set_device(high_end());
        assert_eq!(engine.policy().particle_budget, 30);
    }

    #[test]
    fn test_derive_policy() {
        let policy = derive_policy(&Metrics::with_fps(20.0), &high_end(), false);
        assert_eq!(policy.particle_budget, 90);
        assert!(policy.disable_parallax);

        let policy = derive_policy(&Metrics::with_fps(60.0), &high_end(), true);
        assert!(!policy.enable_animations);
    }

    #[test]
    fn test_image_quality_and_settings() {
        let engine = PolicyEngine::new(high_end(), false, PolicyThresholds::default());
        let policy = engine.policy();
        assert_eq!(policy.image_quality().quality(), 90);
        assert!(!policy.animation_settings(&high_end()).use_simple_animations);

        let low_end = classify_device(Some(4));
        let low_policy = Policy::baseline(&low_end, false, &PolicyThresholds::default());
        assert_eq!(low_policy.image_quality(), ImageQuality::Optimized);
        assert_eq!(low_policy.image_quality().quality(), 80);
        assert_eq!(low_policy.animation_settings(&low_end).particle_size, 1.0);
        assert_eq!(low_policy.clamp_particles(60), 30);
    }

    #[test]
    fn test_animation_props() {
        let policy = Policy::baseline(&high_end(), false, &PolicyThresholds::default());
        let slide = policy.animation_props(AnimationPreset::Slide).unwrap();
        assert_eq!(slide.initial_offset_y, 20.0);
        assert_eq!(slide.duration_s, 0.5);

        let scale = policy.animation_props(AnimationPreset::Scale).unwrap();
        assert_eq!(scale.initial_scale, 0.95);

        let reduced = Policy::baseline(&high_end(), true, &PolicyThresholds::default());
        assert!(reduced.animation_props(AnimationPreset::Fade).is_none());
    }
}
