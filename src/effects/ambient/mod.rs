//! Procedural generators for Ambient mode
//!
//! Each generator owns its timers and particle/segment storage and renders
//! into a caller-provided frame at an explicit target size. None of them
//! read camera input.

pub mod oval_chain;
pub mod root_veins;
pub mod shape_field;
pub mod wave_patterns;

pub use oval_chain::OvalChain;
pub use root_veins::RootVeins;
pub use shape_field::ShapeField;
pub use wave_patterns::WavePatterns;

/// All generators bundled, so the dispatcher and the panel compositor can
/// borrow them independently of per-stream contexts.
pub struct Generators {
    pub shapes: ShapeField,
    pub waves: WavePatterns,
    pub veins: RootVeins,
    pub chain: OvalChain,
}

impl Generators {
    pub fn new() -> Self {
        Self {
            shapes: ShapeField::new(),
            waves: WavePatterns::new(),
            veins: RootVeins::new(),
            chain: OvalChain::new(),
        }
    }
}

impl Default for Generators {
    fn default() -> Self {
        Self::new()
    }
}
