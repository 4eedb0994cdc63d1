// src/config/mod.rs

//! `cfngin.toml` configuration.
//!
//! - [`model`] holds the serde types.
//! - [`validate`] turns a [`model::RawConfigFile`] into a checked
//!   [`model::ConfigFile`].
//! - [`loader`] reads and validates a file from disk.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{ConfigFile, ConfigSection, RawConfigFile, StackConfig};
