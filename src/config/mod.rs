//! # Configuration Module
//!
//! This module provides the client configuration shared by the CLI and the
//! library entry points.

pub mod config;

pub use config::{ClientConfig, default_storage_path};
