//! Effect taxonomy and per-stream state
//!
//! - `Effect`, `SystemMode`, `PanelMode`: the closed control vocabulary,
//!   with the mode validity lists and defaults.
//! - `context`: per-stream persistent buffers (`EffectContext`).
//! - `motion_fx`: the six motion-driven frame processors.
//! - `ambient`: the procedural generators (no camera input).

pub mod ambient;
pub mod context;
pub mod motion_fx;

pub use context::EffectContext;

use serde::{Deserialize, Serialize};

/// The closed set of visual effects. Discriminants are the wire/control
/// numbering, shared by global and per-panel selection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Effect {
    /// Camera pass-through, for lining up the physical install.
    Debug = 0,
    #[default]
    FilledSilhouette = 1,
    Outline = 2,
    MotionTrails = 3,
    RainbowTrails = 4,
    DoubleExposure = 5,
    ProceduralShapes = 6,
    WavePatterns = 7,
    MandelbrotVeins = 8,
    GeometricAbstraction = 9,
}

impl Effect {
    pub const COUNT: usize = 10;

    /// Decode a control byte. Unknown values map to `None`.
    pub fn from_index(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Debug),
            1 => Some(Self::FilledSilhouette),
            2 => Some(Self::Outline),
            3 => Some(Self::MotionTrails),
            4 => Some(Self::RainbowTrails),
            5 => Some(Self::DoubleExposure),
            6 => Some(Self::ProceduralShapes),
            7 => Some(Self::WavePatterns),
            8 => Some(Self::MandelbrotVeins),
            9 => Some(Self::GeometricAbstraction),
            _ => None,
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Self::Debug => "Debug",
            Self::FilledSilhouette => "Filled Silhouette",
            Self::Outline => "Outline",
            Self::MotionTrails => "Motion Trails",
            Self::RainbowTrails => "Rainbow Trails",
            Self::DoubleExposure => "Double Exposure",
            Self::ProceduralShapes => "Procedural Shapes",
            Self::WavePatterns => "Wave Patterns",
            Self::MandelbrotVeins => "Mandelbrot Veins",
            Self::GeometricAbstraction => "Geometric Abstraction",
        }
    }

    /// True for the generators that ignore camera input.
    pub fn is_procedural(self) -> bool {
        matches!(
            self,
            Self::ProceduralShapes | Self::WavePatterns | Self::MandelbrotVeins
        )
    }
}

/// Top-level behavioral mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum SystemMode {
    /// Procedural content; no one is interacting.
    #[default]
    Ambient = 0,
    /// Motion-driven content; someone is in front of the display.
    Active = 1,
}

impl SystemMode {
    pub fn from_index(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Ambient),
            1 => Some(Self::Active),
            _ => None,
        }
    }

    /// Effects selectable (and auto-cycled) in this mode.
    pub fn valid_effects(self) -> &'static [Effect] {
        match self {
            Self::Ambient => &[
                Effect::ProceduralShapes,
                Effect::WavePatterns,
                Effect::MandelbrotVeins,
            ],
            Self::Active => &[
                Effect::FilledSilhouette,
                Effect::Outline,
                Effect::MotionTrails,
                Effect::RainbowTrails,
                Effect::DoubleExposure,
                Effect::GeometricAbstraction,
            ],
        }
    }

    pub fn default_effect(self) -> Effect {
        match self {
            Self::Ambient => Effect::ProceduralShapes,
            Self::Active => Effect::FilledSilhouette,
        }
    }

    /// Whether the effect may run in this mode. `Debug` is a pass-through
    /// escape hatch accepted in either mode (but never auto-cycled).
    pub fn accepts(self, effect: Effect) -> bool {
        effect == Effect::Debug || self.valid_effects().contains(&effect)
    }
}

/// Multi-panel composition strategy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum PanelMode {
    /// Slice the input into vertical strips, one per panel.
    #[default]
    Extend = 0,
    /// Give every panel the full input, resized.
    Repeat = 1,
}

impl PanelMode {
    pub fn from_index(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Extend),
            1 => Some(Self::Repeat),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_indices_roundtrip() {
        for i in 0..Effect::COUNT as u8 {
            let e = Effect::from_index(i).unwrap();
            assert_eq!(e.index(), i);
        }
        assert!(Effect::from_index(10).is_none());
        assert!(Effect::from_index(255).is_none());
    }

    #[test]
    fn mode_validity_lists_are_disjoint() {
        for e in SystemMode::Ambient.valid_effects() {
            assert!(!SystemMode::Active.valid_effects().contains(e));
        }
    }

    #[test]
    fn defaults_are_valid_for_their_mode() {
        for mode in [SystemMode::Ambient, SystemMode::Active] {
            assert!(mode.accepts(mode.default_effect()));
        }
    }

    #[test]
    fn debug_accepted_everywhere_but_never_cycled() {
        for mode in [SystemMode::Ambient, SystemMode::Active] {
            assert!(mode.accepts(Effect::Debug));
            assert!(!mode.valid_effects().contains(&Effect::Debug));
        }
    }

    #[test]
    fn procedural_flag_matches_ambient_list() {
        for e in SystemMode::Ambient.valid_effects() {
            assert!(e.is_procedural());
        }
        for e in SystemMode::Active.valid_effects() {
            assert!(!e.is_procedural());
        }
    }
}
