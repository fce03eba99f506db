//! What this binary was built with: governor features and the
//! default rule table it applies when no config file overrides it

use std::fmt;

use serde::Serialize;

use fuzzie_governor::{MonitorOptions, PolicyThresholds};

#[derive(Debug, Clone, Serialize)]
pub struct BuildInfo {
    pub version: &'static str,
    /// Short commit hash, `-dirty` suffixed for uncommitted changes
    pub revision: Option<&'static str>,
    pub build_date: &'static str,
    pub release: bool,
    pub governor_features: Vec<&'static str>,
    pub monitor: MonitorOptions,
    pub thresholds: PolicyThresholds,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            revision: option_env!("FUZZIE_REVISION"),
            build_date: env!("FUZZIE_BUILD_DATE"),
            release: !cfg!(debug_assertions),
            governor_features: fuzzie_governor::compiled_features(),
            monitor: MonitorOptions::default(),
            thresholds: PolicyThresholds::default(),
        }
    }

    /// One-line banner logged when `watch` starts
    pub fn banner(&self) -> String {
        match self.revision {
            Some(revision) => format!("fuzzie-probe {} ({})", self.version, revision),
            None => format!("fuzzie-probe {}", self.version),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.banner())?;
        writeln!(
            f,
            "built {} ({})",
            self.build_date,
            if self.release { "release" } else { "debug" }
        )?;
        writeln!(f, "governor features: {}", self.governor_features.join(", "))?;

        let t = &self.thresholds;
        writeln!(f)?;
        writeln!(f, "Default rules:")?;
        writeln!(
            f,
            "  sampling        every {}ms, fps {}, memory {}",
            self.monitor.sample_interval_ms,
            on_off(self.monitor.enable_fps_monitoring),
            on_off(self.monitor.enable_memory_monitoring)
        )?;
        writeln!(
            f,
            "  particles       {} ({} on low-end devices)",
            t.particle_budget, t.low_end_particle_budget
        )?;
        writeln!(
            f,
            "  fps < {}       -{} per tick, floor {}",
            t.low_fps, t.low_fps_step, t.low_fps_floor
        )?;
        writeln!(
            f,
            "  heap > {:.0}%     -{} per tick, floor {}",
            t.memory_pressure * 100.0,
            t.memory_step,
            t.memory_floor
        )
    }
}

fn on_off(enabled: bool) -> &'static str {
    if enabled {
        "on"
    } else {
        "off"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reports_default_features() {
        let info = BuildInfo::current();
        assert!(info.governor_features.contains(&"native"));
        assert!(info.governor_features.contains(&"tokio"));
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_text_lists_default_rules() {
        let text = BuildInfo::current().to_string();
        assert!(text.starts_with("fuzzie-probe "));
        assert!(text.contains("every 1000ms"));
        assert!(text.contains("fps < 30"));
        assert!(text.contains("heap > 70%"));
        assert!(text.contains("floor 10"));
    }

    #[test]
    fn test_json_carries_thresholds() {
        let json = serde_json::to_value(BuildInfo::current()).unwrap();
        assert_eq!(json["thresholds"]["particle_budget"], 100);
        assert_eq!(json["thresholds"]["low_end_particle_budget"], 30);
        assert_eq!(json["monitor"]["sample_interval_ms"], 1000);
        assert!(json["governor_features"].is_array());
    }
}
