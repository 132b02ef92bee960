//! # Worklog Common Library
//!
//! Shared code for the voice work-log tracker:
//! - Database schema initialization and row models
//! - Configuration loading (CLI/env/TOML/defaults)
//! - Error types
//! - Timestamp utilities

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
