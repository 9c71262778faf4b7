//! Pipeline Configuration Module
//!
//! Provides the shared `params.toml` configuration for every pipeline stage,
//! the prediction service and the dashboard.
//!
//! ## Loading Order
//!
//! 1. `--config <path>` on the command line
//! 2. `NPV_CONFIG` environment variable (path to TOML file)
//! 3. `params.toml` in the current working directory
//! 4. Built-in defaults
//!
//! The loaded config is passed by reference into each stage; nothing here is
//! global.

mod pipeline_config;
pub mod defaults;
pub mod validation;

pub use pipeline_config::*;
