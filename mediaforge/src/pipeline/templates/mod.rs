//! Graph templates, one function per operation.

pub(super) mod captioned;
pub(super) mod concat;
pub(super) mod delivery;
pub(super) mod image;
pub(super) mod video;

use super::compiler::ResolvedInput;

/// Probed duration of the first input.
fn primary_duration(inputs: &[ResolvedInput]) -> Option<f64> {
    inputs.first().and_then(|input| input.duration)
}

/// Round a derived value to microseconds so float noise never reaches the
/// argument vector.
fn tidy(value: f64) -> f64 {
    (value * 1e6).round() / 1e6
}
