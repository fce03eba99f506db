//! Scroll-linked animation math
//!
//! Pure functions over scroll geometry; consumers apply the results as CSS
//! transforms. Parallax consumers should check
//! [`Policy::disable_parallax`](crate::Policy) first.

use serde::{Deserialize, Serialize};

use crate::pacing::Throttle;

/// Throttle applied to scroll handlers
pub const SCROLL_THROTTLE_MS: f64 = 10.0;

/// Parallax is computed only within this distance of the viewport
pub const PARALLAX_MARGIN_PX: f64 = 300.0;

/// Initial translation for reveal-on-scroll animations
pub const REVEAL_DISTANCE_PX: f64 = 40.0;

/// How far down the document the viewport is, in percent
pub fn scroll_percentage(scroll_top: f64, scroll_height: f64, client_height: f64) -> f64 {
    let scrollable = scroll_height - client_height;
    if scrollable > 0.0 {
        (scroll_top / scrollable * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

/// Linearly maps a scroll range onto a property range
#[derive(Debug, Clone)]
pub struct ScrollLinkedAnimation {
    start_percent: f64,
    end_percent: f64,
    start_value: f64,
    end_value: f64,
    throttle: Throttle,
}

impl ScrollLinkedAnimation {
    pub fn new(start_percent: f64, end_percent: f64, start_value: f64, end_value: f64) -> Self {
        Self {
            start_percent,
            end_percent,
            start_value,
            end_value,
            throttle: Throttle::new(SCROLL_THROTTLE_MS),
        }
    }

    /// Value at `scroll_percent`, or `None` outside the active range
    pub fn value_at(&self, scroll_percent: f64) -> Option<f64> {
        if scroll_percent < self.start_percent || scroll_percent > self.end_percent {
            return None;
        }
        let span = self.end_percent - self.start_percent;
        if span <= 0.0 {
            return Some(self.end_value);
        }
        let ratio = (scroll_percent - self.start_percent) / span;
        Some(self.start_value + (self.end_value - self.start_value) * ratio)
    }

    /// Throttled scroll handler: `None` when throttled or out of range
    pub fn on_scroll(&mut self, now_ms: f64, scroll_percent: f64) -> Option<f64> {
        if !self.throttle.try_acquire(now_ms) {
            return None;
        }
        self.value_at(scroll_percent)
    }
}

/// Vertical parallax offset for an element, or `None` when it is far
/// outside the viewport
pub fn parallax_offset(
    scroll_y: f64,
    element_top: f64,
    element_height: f64,
    viewport_height: f64,
    speed: f64,
) -> Option<f64> {
    let viewport_bottom = scroll_y + viewport_height;
    let near_viewport = element_top < viewport_bottom + PARALLAX_MARGIN_PX
        && element_top + element_height > scroll_y - PARALLAX_MARGIN_PX;

    if near_viewport {
        Some((scroll_y - (element_top - viewport_height)) * speed)
    } else {
        None
    }
}

/// Direction an element slides in from when revealed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RevealDirection {
    Up,
    Down,
    Left,
    Right,
}

impl RevealDirection {
    /// Initial `(x, y)` translation in pixels; the element animates to `(0, 0)`
    pub fn initial_translation(&self) -> (f64, f64) {
        match self {
            RevealDirection::Up => (0.0, REVEAL_DISTANCE_PX),
            RevealDirection::Down => (0.0, -REVEAL_DISTANCE_PX),
            RevealDirection::Left => (REVEAL_DISTANCE_PX, 0.0),
            RevealDirection::Right => (-REVEAL_DISTANCE_PX, 0.0),
        }
    }
}
