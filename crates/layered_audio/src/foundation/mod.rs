//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math aliases and volume helpers
//! - Tick-driven time utilities
//! - Logging utilities

pub mod math;
pub mod time;
pub mod logging;
