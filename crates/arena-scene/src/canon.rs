// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Float canonicalization for content signatures.
//!
//! Decoders routinely emit `-0.0` where `0.0` is meant, and NaN payloads are
//! not meaningful. These helpers fold both onto one representative; every
//! other value keeps its exact bits, so signatures stay sensitive at any
//! scale.

/// Canonicalize a float for comparison and hashing.
///
/// `-0.0` folds to `0.0` and every NaN collapses to the quiet NaN. All other
/// values, infinities included, pass through unchanged.
pub fn canonicalize_f32(x: f32) -> f32 {
    if x.is_nan() {
        f32::NAN
    } else if x == 0.0 {
        0.0
    } else {
        x
    }
}

/// Bit pattern of [`canonicalize_f32`], for feeding into a hasher.
pub fn canonical_bits(x: f32) -> u32 {
    canonicalize_f32(x).to_bits()
}
