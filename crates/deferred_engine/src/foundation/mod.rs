//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the engine:
//! - Math types and operations
//! - Spline curves and easing functions for cameras
//! - Logging utilities

pub mod math;
pub mod curve;
pub mod easing;
pub mod logging;
