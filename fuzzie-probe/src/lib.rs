//! Fuzzie probe library
//!
//! This module re-exports the probe's modules for integration testing.

pub mod config;
pub mod replay;
