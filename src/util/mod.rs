//! Utility types and functions for swf-scene.
//!
//! This module contains fundamental types used throughout the library:
//! - [`Error`] / [`Result`] - Error handling
//! - [`Rgba`], [`Rect`], [`Matrix`], [`ColorTransform`] - SWF value types
//! - Twip conversions and math re-exports from glam

mod error;
mod math;

pub use error::*;
pub use math::*;
