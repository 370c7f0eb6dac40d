//! # Core Utilities
//!
//! Low-level building blocks shared by capture, processing and export.

pub mod handles;

pub use handles::{HandleRegistry, ObjectHandle, ScopedHandle};
