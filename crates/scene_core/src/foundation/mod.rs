//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the scene core:
//! - Math types and operations
//! - Fixed-capacity object pools
//! - Frame time management
//! - Logging utilities

pub mod math;
pub mod pool;
pub mod time;
pub mod logging;
