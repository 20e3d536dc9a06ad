// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical one-shot camera views.

use std::fmt;
use std::str::FromStr;

use glam::Vec3;

use crate::framing::{effective_max_dimension, fit_distance, orbit_position, Projection};

/// Cardinal views sit this many max-dimensions away from the origin.
pub const CARDINAL_DISTANCE_FACTOR: f32 = 2.5;

/// A named camera view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewPreset {
    /// Looking down -Z from +Z.
    Front,
    /// Looking down +Z from -Z.
    Back,
    /// From -X.
    Left,
    /// From +X.
    Right,
    /// From +Y, front edge at the bottom of the screen.
    Top,
    /// From -Y.
    Bottom,
    /// The initial framed view; also resumes auto-rotation.
    Reset,
}

impl ViewPreset {
    /// Every preset, in menu order.
    pub const ALL: [Self; 7] = [
        Self::Front,
        Self::Back,
        Self::Left,
        Self::Right,
        Self::Top,
        Self::Bottom,
        Self::Reset,
    ];

    /// Lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Front => "front",
            Self::Back => "back",
            Self::Left => "left",
            Self::Right => "right",
            Self::Top => "top",
            Self::Bottom => "bottom",
            Self::Reset => "reset",
        }
    }
}

impl fmt::Display for ViewPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown preset name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("[VIEW_PRESET_UNKNOWN] {0}")]
pub struct UnknownPreset(pub String);

impl FromStr for ViewPreset {
    type Err = UnknownPreset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| UnknownPreset(s.to_owned()))
    }
}

/// Whether a preset is waiting to be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    /// User-controlled orbit, possibly auto-rotating.
    #[default]
    Free,
    /// A preset will be applied on the next tick, then the mode returns to
    /// [`ViewMode::Free`].
    Directed(ViewPreset),
}

/// Camera position and up vector for a preset, looking at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    /// Camera position.
    pub position: Vec3,
    /// Up vector.
    pub up: Vec3,
}

/// Pose for `preset` on a model of `max_dimension`.
///
/// Cardinal views use `max_dimension × 2.5`; [`ViewPreset::Reset`] uses the
/// same fitted distance and orbit angles as initial framing.
pub fn pose(
    preset: ViewPreset,
    max_dimension: f32,
    projection: Projection,
    offset_factor: f32,
) -> CameraPose {
    let d = effective_max_dimension(max_dimension) * CARDINAL_DISTANCE_FACTOR;
    let (position, up) = match preset {
        ViewPreset::Front => (Vec3::new(0.0, 0.0, d), Vec3::Y),
        ViewPreset::Back => (Vec3::new(0.0, 0.0, -d), Vec3::Y),
        ViewPreset::Left => (Vec3::new(-d, 0.0, 0.0), Vec3::Y),
        ViewPreset::Right => (Vec3::new(d, 0.0, 0.0), Vec3::Y),
        ViewPreset::Top => (Vec3::new(0.0, d, 0.0), Vec3::NEG_Z),
        ViewPreset::Bottom => (Vec3::new(0.0, -d, 0.0), Vec3::Z),
        ViewPreset::Reset => (
            orbit_position(fit_distance(max_dimension, projection, offset_factor)),
            Vec3::Y,
        ),
    };
    CameraPose { position, up }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::framing::DEFAULT_OFFSET_FACTOR;

    #[test]
    fn cardinal_views_sit_at_two_and_a_half_max_dimensions() {
        for preset in ViewPreset::ALL.into_iter().filter(|p| *p != ViewPreset::Reset) {
            let p = pose(preset, 4.0, Projection::DEFAULT, DEFAULT_OFFSET_FACTOR);
            assert!((p.position.length() - 10.0).abs() < 1e-5, "{preset}");
            // Up must not be parallel to the view direction.
            assert!(p.position.normalize().cross(p.up).length() > 0.99, "{preset}");
        }
    }

    #[test]
    fn reset_matches_initial_framing_distance() {
        let p = pose(ViewPreset::Reset, 4.0, Projection::DEFAULT, DEFAULT_OFFSET_FACTOR);
        let d = fit_distance(4.0, Projection::DEFAULT, DEFAULT_OFFSET_FACTOR);
        assert!((p.position.length() - d).abs() < 1e-4);
    }

    #[test]
    fn names_round_trip_case_insensitively() {
        for preset in ViewPreset::ALL {
            assert_eq!(preset.as_str().to_uppercase().parse::<ViewPreset>(), Ok(preset));
        }
        assert_eq!(
            "diagonal".parse::<ViewPreset>(),
            Err(UnknownPreset("diagonal".into()))
        );
    }
}
