//! Configuration management module for the observable engine.
//!
//! Provides hierarchical configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Optional config file
//! 3. Environment variables (highest priority)

mod coordination;
mod notification;
mod retry;
pub use coordination::*;
pub use notification::*;
pub use retry::*;

#[cfg(test)]
mod config_test;

//---
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Coordination-service session parameters
    #[serde(default)]
    pub coordination: CoordinationConfig,
    /// Notification protocol timeouts
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Retry policies for coordination operations
    #[serde(default)]
    pub retry: RetryPolicies,
}

impl Settings {
    /// Load configuration from an optional file path plus environment
    /// variables.
    ///
    /// # Arguments
    /// * `path` - Optional path to a TOML config file
    ///
    /// # Returns
    /// Merged configuration with proper priority ordering
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = path {
            config = config.add_source(File::with_name(path).required(true));
        }

        // Environment variables (highest priority)
        config = config.add_source(
            Environment::with_prefix("OENGINE")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        Ok(config.build()?.try_deserialize()?)
    }
}
