//! Tolerance constants for audio and transport assertions.

/// Floating point rounding errors (passthrough, exact gain).
pub const FLOAT_EPSILON: f32 = 1e-6;

/// Tempo values survive an `f64 -> f32` round trip through the atom.
pub const TEMPO_EPSILON: f32 = 1e-4;
