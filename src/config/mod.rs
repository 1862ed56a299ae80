//! Configuration module for TrainPanel
//!
//! Provides CLI arguments with environment fallbacks and the resolved
//! runtime configuration.

mod settings;

pub use settings::*;
