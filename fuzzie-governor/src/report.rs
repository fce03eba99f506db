//! Performance issue detection for development logging

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::models::Metrics;

/// Thresholds for issue reports (independent of the policy thresholds)
pub const ISSUE_LOW_FPS: f64 = 30.0;
pub const ISSUE_HIGH_MEMORY_PERCENT: f64 = 80.0;
pub const ISSUE_SLOW_LOAD_MS: f64 = 3000.0;

/// A detected performance problem
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum PerformanceIssue {
    LowFps { fps: f64 },
    HighMemory { percent_used: f64 },
    SlowLoad { load_time_ms: f64 },
}

impl fmt::Display for PerformanceIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PerformanceIssue::LowFps { fps } => write!(f, "Low FPS detected: {:.1} FPS", fps),
            PerformanceIssue::HighMemory { percent_used } => write!(
                f,
                "High memory usage: {:.1}% of available heap",
                percent_used
            ),
            PerformanceIssue::SlowLoad { load_time_ms } => {
                write!(f, "Slow page load: {:.1}s", load_time_ms / 1000.0)
            }
        }
    }
}

/// Check a snapshot against the issue thresholds
pub fn detect_issues(metrics: &Metrics) -> Vec<PerformanceIssue> {
    let mut issues = Vec::new();

    // fps == 0 means nothing measured yet
    if metrics.fps > 0.0 && metrics.fps < ISSUE_LOW_FPS {
        issues.push(PerformanceIssue::LowFps { fps: metrics.fps });
    }

    if let Some(memory) = metrics.memory {
        let percent_used = memory.percent_used();
        if percent_used > ISSUE_HIGH_MEMORY_PERCENT {
            issues.push(PerformanceIssue::HighMemory { percent_used });
        }
    }

    if let Some(load_time_ms) = metrics.timing.load_time_ms() {
        if load_time_ms > ISSUE_SLOW_LOAD_MS {
            issues.push(PerformanceIssue::SlowLoad { load_time_ms });
        }
    }

    issues
}

/// Detect and log issues; returns what was found
pub fn report_issues(metrics: &Metrics) -> Vec<PerformanceIssue> {
    let issues = detect_issues(metrics);
    for issue in &issues {
        tracing::warn!("⚠️  {}", issue);
    }
    issues
}

/// Run `f` and log how long it took
pub fn measure_execution_time<T, F: FnOnce() -> T>(label: &str, f: F) -> T {
    let start = Instant::now();
    let result = f();
    tracing::debug!(
        "{} execution time: {:.2}ms",
        label,
        start.elapsed().as_secs_f64() * 1000.0
    );
    result
}
