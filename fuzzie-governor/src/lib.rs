//! Fuzzie Rendering Governor
//!
//! Watches frame rate, heap usage and page timing, classifies the device, and
//! derives a rendering policy (animations, particle budget, image quality,
//! parallax) that decorative UI layers consult before doing expensive work.
//!
//! ## Features
//!
//! - **native**: [`SystemHost`] signal source backed by `sysinfo`
//! - **tokio**: [`MonitorDriver`] running the sampling timer on a tokio runtime
//!
//! Without default features the crate is pure computation and builds for
//! `wasm32-unknown-unknown`.

pub mod classifier;
pub mod error;
pub mod fallback;
pub mod models;
pub mod monitor;
pub mod pacing;
pub mod policy;
pub mod report;
pub mod sampler;
pub mod scroll;

#[cfg(feature = "native")]
pub mod system;

#[cfg(feature = "tokio")]
pub mod driver;

// Re-export main types
pub use classifier::{classify_device, performance_score, DeviceClass, FpsWindow, FrameCounter};
pub use error::{GovernorError, Result};
pub use fallback::{FeatureGate, FeatureStatus};
pub use models::{MemorySample, MemoryUsage, Metrics, Sample, TimingSnapshot};
pub use monitor::{MonitorOptions, MonitorState, PerformanceMonitor, PolicyUpdate, UpdateReason};
pub use policy::{
    derive_policy, AnimationPreset, AnimationProps, AnimationSettings, ImageQuality, Policy,
    PolicyEngine, PolicyThresholds,
};
pub use report::PerformanceIssue;
pub use sampler::{Capabilities, ManualHost, SignalHost};

#[cfg(feature = "native")]
pub use system::SystemHost;

#[cfg(feature = "tokio")]
pub use driver::MonitorDriver;

/// Cargo features this build of the governor was compiled with
pub fn compiled_features() -> Vec<&'static str> {
    let mut features = Vec::new();
    if cfg!(feature = "native") {
        features.push("native");
    }
    if cfg!(feature = "tokio") {
        features.push("tokio");
    }
    features
}
