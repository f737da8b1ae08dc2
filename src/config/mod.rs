// src/config/mod.rs

//! Configuration for bistro.
//!
//! Responsibilities:
//! - Define the programmatic task model and the TOML-backed file model
//!   (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate patterns and the task graph (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BistroOptions, ConfigFile, ConfigSection, FileTaskConfig, FinishCallback, RawConfigFile,
    TaskConfig, TaskSet,
};
pub use validate::validate_task_set;
