//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Integer vector types for window geometry
//! - Frame timing and FPS averaging
//! - Logging setup

pub mod math;
pub mod time;
pub mod logging;
