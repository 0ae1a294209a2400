//! # Constants and type definitions for sdconv
//!
//! This module centralizes the **unit conversions** and **common type
//! aliases** used throughout the crate.
//!
//! ## Overview
//!
//! - Angular conversions (degrees ↔ radians, local-time hours ↔ degrees)
//! - Semantic aliases for the physical quantities carried by samples
//! - Container aliases shared by the pipeline stages

use std::collections::HashMap;

use ahash::RandomState;

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// One hour of local time expressed in degrees (24 h ↔ 360°)
pub const DEGREES_PER_HOUR: f64 = 15.0;

/// Number of seconds in one minute, as used for relative-time arithmetic
pub const SECONDS_PER_MINUTE: f64 = 60.0;

// -------------------------------------------------------------------------------------------------
// Semantic aliases
// -------------------------------------------------------------------------------------------------

/// An angle in degrees
pub type Degree = f64;

/// A velocity in meters per second (signed; sign encodes toward/away the radar)
pub type Mps = f64;

/// A signed offset in whole minutes relative to an event's response time
pub type Minutes = i32;

/// Three-letter SuperDARN radar code (e.g. `"bks"`, `"cvw"`)
pub type RadarId = String;

// -------------------------------------------------------------------------------------------------
// Container aliases
// -------------------------------------------------------------------------------------------------

/// Hash map with the crate-wide default hasher (`ahash::RandomState`).
pub type AHashMap<K, V> = HashMap<K, V, RandomState>;
