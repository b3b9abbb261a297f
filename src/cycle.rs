//! Auto-cycle and transition control
//!
//! Counts frames toward a randomized switch interval (3-7 seconds at the
//! 30 fps reference rate). When the interval elapses the controller reports
//! an advance and starts a 30-frame transition whose alpha ramps 0 to 1;
//! the engine crossfades the outgoing and incoming effects with it. While a
//! transition is running the interval counter is paused.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::effects::{Effect, SystemMode};

/// Frames a crossfade lasts.
pub const TRANSITION_FRAMES: u32 = 30;
const FPS: u32 = 30;
const MIN_CYCLE_SECONDS: u32 = 3;
const MAX_CYCLE_SECONDS: u32 = 7;

pub struct AutoCycle {
    enabled: bool,
    frame_counter: u32,
    frames_until_next: u32,
    transition_frames_remaining: u32,
    transition_alpha: f32,
    rng: SmallRng,
}

impl AutoCycle {
    pub fn new(enabled: bool) -> Self {
        Self::with_rng(enabled, SmallRng::from_os_rng())
    }

    pub fn with_rng(enabled: bool, rng: SmallRng) -> Self {
        Self {
            enabled,
            frame_counter: 0,
            frames_until_next: 0,
            transition_frames_remaining: 0,
            transition_alpha: 0.0,
            rng,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable or disable cycling. Enabling resets the counters and cancels
    /// any in-flight transition; disabling freezes everything in place.
    pub fn set_enabled(&mut self, enabled: bool) {
        if enabled && !self.enabled {
            self.frame_counter = 0;
            self.frames_until_next = 0;
            self.transition_frames_remaining = 0;
            self.transition_alpha = 0.0;
        }
        self.enabled = enabled;
    }

    pub fn in_transition(&self) -> bool {
        self.transition_frames_remaining > 0
    }

    /// Crossfade weight of the incoming effect, 0..=1.
    pub fn transition_alpha(&self) -> f32 {
        self.transition_alpha
    }

    /// Frames left until the next switch fires (0 before the first roll).
    pub fn frames_until_next(&self) -> u32 {
        self.frames_until_next
    }

    fn roll_interval(&mut self) -> u32 {
        self.rng
            .random_range(MIN_CYCLE_SECONDS * FPS..=MAX_CYCLE_SECONDS * FPS)
    }

    /// Advance one frame. Returns true when the effect should switch now;
    /// the transition begins on the same frame with alpha 0.
    pub fn tick(&mut self) -> bool {
        if !self.enabled {
            return false;
        }

        if self.transition_frames_remaining > 0 {
            self.transition_frames_remaining -= 1;
            self.transition_alpha =
                1.0 - self.transition_frames_remaining as f32 / TRANSITION_FRAMES as f32;
            return false;
        }
        self.frame_counter += 1;

        if self.frames_until_next == 0 {
            self.frames_until_next = self.roll_interval();
        }

        if self.frame_counter >= self.frames_until_next {
            self.transition_frames_remaining = TRANSITION_FRAMES;
            self.transition_alpha = 0.0;
            self.frame_counter = 0;
            self.frames_until_next = self.roll_interval();
            return true;
        }
        false
    }
}

/// The effect following `current` in the mode's valid list, wrapping. An
/// effect not in the list (Debug, or a leftover from another mode) restarts
/// the rotation at the list head's successor.
pub fn next_in_cycle(mode: SystemMode, current: Effect) -> Effect {
    let valid = mode.valid_effects();
    let index = valid.iter().position(|&e| e == current).unwrap_or(0);
    valid[(index + 1) % valid.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(enabled: bool) -> AutoCycle {
        AutoCycle::with_rng(enabled, SmallRng::seed_from_u64(3))
    }

    #[test]
    fn disabled_controller_never_fires() {
        let mut c = seeded(false);
        for _ in 0..1000 {
            assert!(!c.tick());
        }
        assert!(!c.in_transition());
    }

    #[test]
    fn fires_after_exactly_the_rolled_interval() {
        let mut c = seeded(true);
        // first tick rolls the interval
        assert!(!c.tick());
        let interval = c.frames_until_next();
        assert!((3 * 30..=7 * 30).contains(&interval));
        for _ in 1..interval - 1 {
            assert!(!c.tick());
        }
        assert!(c.tick());
    }

    #[test]
    fn transition_alpha_ramps_monotonically_over_thirty_frames() {
        let mut c = seeded(true);
        while !c.tick() {}
        assert_eq!(c.transition_alpha(), 0.0);
        let mut last = 0.0;
        for _ in 0..TRANSITION_FRAMES {
            assert!(!c.tick(), "no switch may fire mid-transition");
            assert!(c.transition_alpha() > last);
            last = c.transition_alpha();
        }
        assert_eq!(last, 1.0);
        assert!(!c.in_transition());
    }

    #[test]
    fn interval_counter_pauses_during_transition() {
        let mut c = seeded(true);
        while !c.tick() {}
        let interval = c.frames_until_next();
        for _ in 0..TRANSITION_FRAMES {
            c.tick();
        }
        // a fresh interval starts counting only after the transition
        let mut ticks = 0;
        while !c.tick() {
            ticks += 1;
            assert!(ticks < 10_000);
        }
        assert_eq!(ticks + 1, interval);
    }

    #[test]
    fn reenabling_resets_state() {
        let mut c = seeded(true);
        while !c.tick() {}
        assert!(c.in_transition());
        c.set_enabled(false);
        c.set_enabled(true);
        assert!(!c.in_transition());
        assert_eq!(c.frames_until_next(), 0);
    }

    #[test]
    fn cycle_rotation_stays_within_mode() {
        let mut e = SystemMode::Ambient.default_effect();
        for _ in 0..10 {
            e = next_in_cycle(SystemMode::Ambient, e);
            assert!(SystemMode::Ambient.valid_effects().contains(&e));
        }
        // Debug restarts the rotation
        let next = next_in_cycle(SystemMode::Active, Effect::Debug);
        assert_eq!(next, SystemMode::Active.valid_effects()[1]);
    }
}
