// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Auto-rotate state machine gated by user input and an inactivity timer.
//!
//! The controller never reads a clock: every call takes `now`. Hosts call
//! [`InteractionController::tick`] once per frame; tests step time by hand.

use std::time::{Duration, Instant};

use arena_app_core::prefs::InteractionPrefs;
use tracing::debug;

/// Seconds per orbit at speed 1.0.
const SECONDS_PER_ORBIT_AT_UNIT_SPEED: f32 = 60.0;

/// Max-dimension that rotates at speed 2.0.
const REFERENCE_DIMENSION: f32 = 16.0;

/// Pointer and touch input the controller cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    /// Mouse or pen pressed on the canvas.
    PointerDown,
    /// Pointer moved.
    PointerMove,
    /// Pointer released.
    PointerUp,
    /// Scroll / pinch zoom.
    Wheel,
    /// Finger touched the canvas.
    TouchStart,
    /// Finger moved.
    TouchMove,
    /// Finger lifted.
    TouchEnd,
}

impl InteractionEvent {
    /// Events that stop rotation and (re)start the inactivity timer.
    fn engages(self) -> bool {
        matches!(self, Self::PointerDown | Self::Wheel | Self::TouchStart)
    }

    /// Events that only push back an already running timer.
    fn continues(self) -> bool {
        matches!(self, Self::PointerMove | Self::TouchMove)
    }
}

/// Auto-rotate speed for a model, in orbit-control units (2.0 = one orbit per
/// 30 s).
///
/// Grows with the logarithm of max-dimension, so a 4-block hut and a
/// 400-block castle turn at comparable apparent rates, then clamps to
/// `[min, max]`.
pub fn speed_for(max_dimension: f32, min: f32, max: f32) -> f32 {
    let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
    if !max_dimension.is_finite() || max_dimension <= 0.0 {
        return 2.0_f32.clamp(lo, hi);
    }
    let speed = 2.0 + 0.5 * (max_dimension / REFERENCE_DIMENSION).log2();
    speed.clamp(lo, hi)
}

/// Angular velocity (radians per second) for an orbit-control speed.
pub fn radians_per_second(speed: f32) -> f32 {
    speed * core::f32::consts::TAU / SECONDS_PER_ORBIT_AT_UNIT_SPEED
}

/// Per-session auto-rotate controller.
#[derive(Debug, Clone)]
pub struct InteractionController {
    enabled: bool,
    rotating: bool,
    inactivity: Duration,
    deadline: Option<Instant>,
    last_interaction: Option<Instant>,
    min_speed: f32,
    max_speed: f32,
    speed: f32,
}

impl InteractionController {
    /// Create a controller. Rotation starts on if auto-rotate is configured.
    pub fn new(prefs: &InteractionPrefs) -> Self {
        let (min_speed, max_speed) = (prefs.min_speed, prefs.max_speed);
        Self {
            enabled: prefs.auto_rotate,
            rotating: prefs.auto_rotate,
            inactivity: Duration::from_millis(prefs.inactivity_ms),
            deadline: None,
            last_interaction: None,
            min_speed,
            max_speed,
            speed: speed_for(2.0, min_speed, max_speed),
        }
    }

    /// Returns `true` while the camera should auto-rotate.
    pub fn is_rotating(&self) -> bool {
        self.rotating
    }

    /// Returns `true` if auto-rotate is configured at all.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Current speed in orbit-control units.
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// When rotation resumes if nothing else happens.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time of the last engaging or continuing interaction.
    pub fn last_interaction(&self) -> Option<Instant> {
        self.last_interaction
    }

    /// Re-derive the speed from a newly loaded model's size.
    pub fn set_max_dimension(&mut self, max_dimension: f32) {
        self.speed = speed_for(max_dimension, self.min_speed, self.max_speed);
    }

    /// Feed one input event. Returns `true` if rotation was stopped by it.
    pub fn on_event(&mut self, event: InteractionEvent, now: Instant) -> bool {
        if event.engages() {
            let stopped = self.rotating;
            self.rotating = false;
            self.restart_timer(now);
            if stopped {
                debug!(?event, "auto-rotate paused by interaction");
            }
            return stopped;
        }
        if event.continues() && self.deadline.is_some() {
            self.restart_timer(now);
        }
        false
    }

    /// Advance time. Returns `true` if rotation resumed on this call.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                if self.enabled && !self.rotating {
                    self.rotating = true;
                    debug!("auto-rotate resumed after inactivity");
                    return true;
                }
                false
            }
            _ => false,
        }
    }

    /// Resume rotation immediately (the reset view does this). No-op when
    /// auto-rotate is not configured.
    pub fn resume(&mut self) {
        self.deadline = None;
        if self.enabled {
            self.rotating = true;
        }
    }

    fn restart_timer(&mut self, now: Instant) {
        self.last_interaction = Some(now);
        // An unrepresentable deadline means rotation never resumes on its own.
        self.deadline = now.checked_add(self.inactivity);
    }
}
