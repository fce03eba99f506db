//! Initialization gates for decorative rendering subsystems
//!
//! A particle engine or scroll-effect backend that fails to initialize must
//! never take the host application down with it. [`FeatureGate`] runs the
//! initializer once, logs a failure, and pins the feature to
//! [`FeatureStatus::Unavailable`] for the rest of the session.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::GovernorError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum FeatureStatus {
    Pending,
    Ready,
    Unavailable { reason: String },
}

#[derive(Debug, Clone)]
pub struct FeatureGate {
    name: String,
    status: FeatureStatus,
}

impl FeatureGate {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: FeatureStatus::Pending,
        }
    }

    /// Run `init` if the gate is still pending; returns whether the
    /// feature is usable afterwards. Failures are not retried.
    pub fn initialize<F, E>(&mut self, init: F) -> bool
    where
        F: FnOnce() -> Result<(), E>,
        E: Display,
    {
        if self.status != FeatureStatus::Pending {
            return self.is_ready();
        }

        match init() {
            Ok(()) => {
                tracing::info!("{} initialized", self.name);
                self.status = FeatureStatus::Ready;
            }
            Err(e) => {
                let error = GovernorError::SubsystemInit {
                    subsystem: self.name.clone(),
                    reason: e.to_string(),
                };
                tracing::error!("{} - feature disabled for this session", error);
                self.status = FeatureStatus::Unavailable {
                    reason: e.to_string(),
                };
            }
        }

        self.is_ready()
    }

    pub fn is_ready(&self) -> bool {
        self.status == FeatureStatus::Ready
    }

    pub fn status(&self) -> &FeatureStatus {
        &self.status
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}
