//! Per-frame engine
//!
//! `Engine::process_frame` is the whole pipeline for one frame: read the
//! control surface, advance the auto-cycle controller, validate the active
//! effect against the system mode, then either run the multi-panel
//! compositor or dispatch the single-stream effect, crossfading with the
//! previous effect while a transition is running.
//!
//! Control state lives in `EngineControls`, a bundle of atomics shared with
//! whatever drives the install (network handler, keyboard shim, test). The
//! engine reads each control once per frame; writers never block the frame
//! thread.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::cycle::{next_in_cycle, AutoCycle};
use crate::effects::ambient::Generators;
use crate::effects::motion_fx::{self, MIN_CONTOUR_AREA_FULL};
use crate::effects::{Effect, EffectContext, PanelMode, SystemMode};
use crate::frame::Frame;
use crate::panels::PanelCompositor;

/// Shared control surface. All fields are plain atomics so a control
/// thread can flip them while the frame loop is running.
pub struct EngineControls {
    effect: AtomicU8,
    system_mode: AtomicU8,
    panel_mode: AtomicU8,
    multi_panel: AtomicBool,
    auto_cycle: AtomicBool,
    panel_effects: Vec<AtomicU8>,
}

impl EngineControls {
    fn new(config: &EngineConfig) -> Self {
        let mode = config.system_mode;
        let valid = mode.valid_effects();
        Self {
            effect: AtomicU8::new(mode.default_effect().index()),
            system_mode: AtomicU8::new(mode as u8),
            panel_mode: AtomicU8::new(config.panel_mode as u8),
            multi_panel: AtomicBool::new(false),
            auto_cycle: AtomicBool::new(config.auto_cycle),
            // round-robin seed so repeat panels start on different effects
            panel_effects: (0..config.num_panels.max(1))
                .map(|i| AtomicU8::new(valid[i % valid.len()].index()))
                .collect(),
        }
    }

    pub fn effect(&self) -> Effect {
        Effect::from_index(self.effect.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_effect(&self, effect: Effect) {
        self.effect.store(effect.index(), Ordering::Relaxed);
    }

    pub fn system_mode(&self) -> SystemMode {
        SystemMode::from_index(self.system_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Switch mode and snap the active effect to the mode's default when the
    /// current one doesn't carry over.
    pub fn set_system_mode(&self, mode: SystemMode) {
        self.system_mode.store(mode as u8, Ordering::Relaxed);
        if !mode.accepts(self.effect()) {
            self.set_effect(mode.default_effect());
        }
        log::info!("system mode -> {mode:?}");
    }

    pub fn panel_mode(&self) -> PanelMode {
        PanelMode::from_index(self.panel_mode.load(Ordering::Relaxed)).unwrap_or_default()
    }

    pub fn set_panel_mode(&self, mode: PanelMode) {
        self.panel_mode.store(mode as u8, Ordering::Relaxed);
    }

    pub fn multi_panel_enabled(&self) -> bool {
        self.multi_panel.load(Ordering::Relaxed)
    }

    /// Enable per-panel effect overrides in Extend mode.
    pub fn set_multi_panel_enabled(&self, enabled: bool) {
        self.multi_panel.store(enabled, Ordering::Relaxed);
    }

    pub fn auto_cycle_enabled(&self) -> bool {
        self.auto_cycle.load(Ordering::Relaxed)
    }

    pub fn set_auto_cycle_enabled(&self, enabled: bool) {
        self.auto_cycle.store(enabled, Ordering::Relaxed);
        log::info!(
            "auto-cycle {}",
            if enabled { "enabled" } else { "disabled" }
        );
    }

    pub fn panel_count(&self) -> usize {
        self.panel_effects.len()
    }

    pub fn panel_effect(&self, panel: usize) -> Effect {
        self.panel_effects
            .get(panel)
            .and_then(|a| Effect::from_index(a.load(Ordering::Relaxed)))
            .unwrap_or_default()
    }

    pub fn set_panel_effect(&self, panel: usize, effect: Effect) {
        if let Some(slot) = self.panel_effects.get(panel) {
            slot.store(effect.index(), Ordering::Relaxed);
        }
    }
}

/// Snapshot of the engine's externally visible state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineStatus {
    pub effect: Effect,
    pub system_mode: SystemMode,
    pub panel_mode: PanelMode,
    pub multi_panel: bool,
    pub auto_cycle: bool,
    pub panel_effects: Vec<Effect>,
}

pub struct Engine {
    width: u32,
    height: u32,
    controls: Arc<EngineControls>,
    ctx: EffectContext,
    generators: Generators,
    compositor: PanelCompositor,
    cycle: AutoCycle,
    /// Outgoing effect while a transition crossfade is running.
    prev_effect: Option<Effect>,
    scratch: Frame,
    frame_no: u64,
}

impl Engine {
    pub fn new(config: &EngineConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            width: config.width,
            height: config.height,
            controls: Arc::new(EngineControls::new(config)),
            ctx: EffectContext::new(config.width, config.height),
            generators: Generators::new(),
            compositor: PanelCompositor::new(config.num_panels),
            cycle: AutoCycle::new(config.auto_cycle),
            prev_effect: None,
            scratch: Frame::zeros(0, 0),
            frame_no: 0,
        })
    }

    /// Handle to the shared control surface.
    pub fn controls(&self) -> Arc<EngineControls> {
        Arc::clone(&self.controls)
    }

    pub fn status(&self) -> EngineStatus {
        let c = &self.controls;
        EngineStatus {
            effect: c.effect(),
            system_mode: c.system_mode(),
            panel_mode: c.panel_mode(),
            multi_panel: c.multi_panel_enabled(),
            auto_cycle: c.auto_cycle_enabled(),
            panel_effects: (0..c.panel_count()).map(|i| c.panel_effect(i)).collect(),
        }
    }

    fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            log::info!("engine resize {}x{} -> {width}x{height}", self.width, self.height);
            self.width = width;
            self.height = height;
        }
        self.ctx.ensure_size(width, height);
    }

    /// True when the frame goes through the panel compositor.
    fn use_compositor(&self) -> bool {
        self.controls.multi_panel_enabled() || self.compositor.panel_count() > 1
    }

    /// Apply an auto-cycle advance to the right selector(s).
    fn advance_cycle(&mut self) {
        let mode = self.controls.system_mode();
        if self.compositor.panel_count() > 1 && self.controls.panel_mode() == PanelMode::Repeat {
            for i in 0..self.controls.panel_count() {
                let next = next_in_cycle(mode, self.controls.panel_effect(i));
                self.controls.set_panel_effect(i, next);
            }
            log::info!("auto-cycle: advanced all {} panels", self.controls.panel_count());
        } else {
            let current = self.controls.effect();
            let next = next_in_cycle(mode, current);
            self.prev_effect = Some(current);
            self.controls.set_effect(next);
            log::info!(
                "auto-cycle: {} -> {}",
                current.display_name(),
                next.display_name()
            );
        }
    }

    /// Effect for each panel this frame, corrected to the current mode.
    fn resolve_panel_effects(&self) -> Vec<Effect> {
        let mode = self.controls.system_mode();
        let valid = mode.valid_effects();
        (0..self.controls.panel_count())
            .map(|i| {
                let e = self.controls.panel_effect(i);
                if mode.accepts(e) {
                    e
                } else {
                    let fallback = valid[i % valid.len()];
                    self.controls.set_panel_effect(i, fallback);
                    fallback
                }
            })
            .collect()
    }

    /// Process one frame. `out` is resized to match `input`.
    pub fn process_frame(&mut self, input: &Frame, out: &mut Frame) {
        if !input.is_valid() {
            log::warn!("dropping invalid input frame");
            if self.width > 0 && self.height > 0 {
                out.ensure_size(self.width, self.height);
                out.clear();
            }
            return;
        }
        self.ensure_size(input.width(), input.height());
        self.frame_no += 1;
        let frame_no = self.frame_no;

        self.cycle.set_enabled(self.controls.auto_cycle_enabled());
        if self.cycle.tick() {
            self.advance_cycle();
        }
        if !self.cycle.in_transition() {
            self.prev_effect = None;
        }

        if self.use_compositor() {
            let panel_effects = self.resolve_panel_effects();
            // Extend without per-panel overrides shows one effect everywhere;
            // Repeat and override mode route each panel's own selection.
            let shared = if self.controls.panel_mode() == PanelMode::Extend
                && !self.controls.multi_panel_enabled()
            {
                Some(self.validated_effect())
            } else {
                None
            };
            self.compositor.compose(
                input,
                out,
                self.controls.panel_mode(),
                &panel_effects,
                shared,
                &mut self.ctx,
                &mut self.generators,
                frame_no,
            );
            // the shared-effect stream crossfades like the single stream;
            // per-panel Repeat advances are independent and cut hard
            if let (Some(current), Some(prev)) = (shared, self.prev_effect) {
                if prev != current && self.cycle.in_transition() {
                    let mut outgoing = std::mem::replace(&mut self.scratch, Frame::zeros(0, 0));
                    self.compositor.compose(
                        input,
                        &mut outgoing,
                        self.controls.panel_mode(),
                        &panel_effects,
                        Some(prev),
                        &mut self.ctx,
                        &mut self.generators,
                        frame_no,
                    );
                    out.lerp_toward(&outgoing, 1.0 - self.cycle.transition_alpha());
                    self.scratch = outgoing;
                }
            }
            return;
        }

        let effect = self.validated_effect();

        match self.prev_effect {
            Some(prev) if prev != effect && self.cycle.in_transition() => {
                // render both streams off the same motion mask and crossfade
                run_effect(
                    effect,
                    input,
                    out,
                    &mut self.ctx,
                    &mut self.generators,
                    MIN_CONTOUR_AREA_FULL,
                    frame_no,
                );
                let mut outgoing = std::mem::replace(&mut self.scratch, Frame::zeros(0, 0));
                run_effect(
                    prev,
                    input,
                    &mut outgoing,
                    &mut self.ctx,
                    &mut self.generators,
                    MIN_CONTOUR_AREA_FULL,
                    frame_no,
                );
                out.lerp_toward(&outgoing, 1.0 - self.cycle.transition_alpha());
                self.scratch = outgoing;
            }
            _ => {
                run_effect(
                    effect,
                    input,
                    out,
                    &mut self.ctx,
                    &mut self.generators,
                    MIN_CONTOUR_AREA_FULL,
                    frame_no,
                );
            }
        }
    }

    /// Active effect, snapped to the mode default when out of range.
    fn validated_effect(&self) -> Effect {
        let mode = self.controls.system_mode();
        let effect = self.controls.effect();
        if mode.accepts(effect) {
            effect
        } else {
            let fallback = mode.default_effect();
            log::debug!(
                "effect {} invalid in {mode:?}, falling back to {}",
                effect.display_name(),
                fallback.display_name()
            );
            self.controls.set_effect(fallback);
            fallback
        }
    }
}

/// Dispatch one effect over one stream. Shared by the engine (global
/// context) and the panel compositor (panel contexts).
pub(crate) fn run_effect(
    effect: Effect,
    input: &Frame,
    out: &mut Frame,
    ctx: &mut EffectContext,
    generators: &mut Generators,
    min_area: f64,
    frame_no: u64,
) {
    match effect {
        Effect::Debug => {
            out.clone_from(input);
        }
        Effect::FilledSilhouette => {
            motion_fx::filled_silhouette(ctx, input, out, min_area, frame_no)
        }
        Effect::Outline => motion_fx::outline(ctx, input, out, min_area, frame_no),
        Effect::MotionTrails => motion_fx::motion_trails(ctx, input, out, min_area, frame_no),
        Effect::RainbowTrails => motion_fx::rainbow_trails(ctx, input, out, frame_no),
        Effect::DoubleExposure => motion_fx::double_exposure(ctx, input, out, frame_no),
        Effect::GeometricAbstraction => {
            motion_fx::geometric_abstraction(ctx, input, out, min_area, frame_no)
        }
        Effect::ProceduralShapes => generators.shapes.process(out, input.width(), input.height()),
        Effect::WavePatterns => generators.waves.process(out, input.width(), input.height()),
        Effect::MandelbrotVeins => generators.veins.process(out, input.width(), input.height()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::TRANSITION_FRAMES;

    fn config(w: u32, h: u32, panels: usize) -> EngineConfig {
        EngineConfig {
            width: w,
            height: h,
            num_panels: panels,
            ..EngineConfig::default()
        }
    }

    fn white_square_frame(w: u32, h: u32) -> Frame {
        let mut f = Frame::zeros(w, h);
        // ~2000 px^2 block
        for y in 8..53u32.min(h) {
            for x in 8..53u32.min(w) {
                f.set_pixel(x, y, [255, 255, 255]);
            }
        }
        f
    }

    #[test]
    fn output_always_matches_input_size() {
        let cfg = config(64, 64, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        engine.controls().set_auto_cycle_enabled(false);
        let input = Frame::zeros(64, 64);
        let mut out = Frame::zeros(1, 1);
        for mode in [SystemMode::Ambient, SystemMode::Active] {
            engine.controls().set_system_mode(mode);
            for _ in 0..3 {
                engine.process_frame(&input, &mut out);
                assert_eq!(out.width(), 64);
                assert_eq!(out.height(), 64);
            }
        }
    }

    #[test]
    fn active_effect_always_valid_for_mode() {
        let cfg = config(32, 32, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        let controls = engine.controls();
        controls.set_auto_cycle_enabled(false);
        let input = Frame::zeros(32, 32);
        let mut out = Frame::zeros(1, 1);

        controls.set_system_mode(SystemMode::Ambient);
        // force an Active-only effect into Ambient mode behind the setter
        controls.effect.store(Effect::MotionTrails.index(), Ordering::Relaxed);
        engine.process_frame(&input, &mut out);
        let status = engine.status();
        assert!(status.system_mode.accepts(status.effect));
        assert_eq!(status.effect, SystemMode::Ambient.default_effect());
    }

    #[test]
    fn filled_silhouette_scenario_two_frames() {
        let cfg = config(64, 64, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        let controls = engine.controls();
        controls.set_auto_cycle_enabled(false);
        controls.set_system_mode(SystemMode::Active);
        controls.set_effect(Effect::FilledSilhouette);

        let mut out = Frame::zeros(1, 1);
        engine.process_frame(&Frame::zeros(64, 64), &mut out);
        // first frame: model just seeded, blank output is acceptable

        engine.process_frame(&white_square_frame(64, 64), &mut out);
        let white = out
            .data()
            .chunks_exact(3)
            .filter(|p| p == &[255u8, 255, 255])
            .count();
        assert!(white > 1000, "expected >1000 filled pixels, got {white}");
        assert_eq!(out.pixel(30, 30), [255, 255, 255]);
        assert_eq!(out.pixel(60, 60), [0, 0, 0]);
    }

    #[test]
    fn auto_cycle_rotates_within_ambient_list() {
        let cfg = config(32, 32, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        engine.controls().set_auto_cycle_enabled(true);
        let input = Frame::zeros(32, 32);
        let mut out = Frame::zeros(1, 1);
        let mut seen = Vec::new();
        // 7s max interval * 30fps * 4 switches, plus transitions
        for _ in 0..(7 * 30 * 4 + 4 * 30 + 10) {
            engine.process_frame(&input, &mut out);
            let e = engine.status().effect;
            if seen.last() != Some(&e) {
                seen.push(e);
            }
        }
        assert!(seen.len() >= 3, "expected several switches, saw {seen:?}");
        for e in &seen {
            assert!(SystemMode::Ambient.valid_effects().contains(e));
        }
    }

    #[test]
    fn repeat_mode_panels_cycle_independently_valid() {
        let cfg = EngineConfig {
            width: 192,
            height: 64,
            num_panels: 3,
            panel_mode: PanelMode::Repeat,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(&cfg).unwrap();
        engine.controls().set_auto_cycle_enabled(true);
        let input = Frame::zeros(192, 64);
        let mut out = Frame::zeros(1, 1);
        for _ in 0..(7 * 30 + 40) {
            engine.process_frame(&input, &mut out);
            let status = engine.status();
            for e in &status.panel_effects {
                assert!(status.system_mode.accepts(*e));
            }
        }
        // seeded round-robin keeps panels on distinct effects
        let status = engine.status();
        assert_ne!(status.panel_effects[0], status.panel_effects[1]);
    }

    #[test]
    fn extend_shared_transition_blends_outgoing_effect() {
        let cfg = EngineConfig {
            width: 192,
            height: 64,
            num_panels: 3,
            panel_mode: PanelMode::Extend,
            ..EngineConfig::default()
        };
        let mut engine = Engine::new(&cfg).unwrap();
        engine.controls().set_auto_cycle_enabled(true);
        let input = Frame::zeros(192, 64);
        let mut out = Frame::zeros(1, 1);

        // run up to the first auto-cycle switch
        let mut switched = false;
        let start = engine.status().effect;
        for _ in 0..(7 * 30 + 5) {
            engine.process_frame(&input, &mut out);
            if engine.status().effect != start {
                switched = true;
                break;
            }
        }
        assert!(switched, "no auto-cycle switch within the max interval");

        // the outgoing shared effect is rendered and blended while the
        // transition runs, even though the compositor owns the frame
        assert!(engine.cycle.in_transition());
        assert_eq!(engine.scratch.width(), 192);
        assert_eq!(engine.scratch.height(), 64);
        for _ in 0..TRANSITION_FRAMES {
            engine.process_frame(&input, &mut out);
            assert_eq!(out.width(), 192);
        }
        assert!(!engine.cycle.in_transition());
    }

    #[test]
    fn invalid_input_frame_is_dropped() {
        let cfg = config(32, 32, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        engine.controls().set_auto_cycle_enabled(false);
        let mut out = Frame::zeros(1, 1);
        engine.process_frame(&Frame::zeros(0, 0), &mut out);
        assert_eq!(out.width(), 32);
        assert!(out.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn debug_effect_passes_through() {
        let cfg = config(48, 48, 1);
        let mut engine = Engine::new(&cfg).unwrap();
        let controls = engine.controls();
        controls.set_auto_cycle_enabled(false);
        controls.set_effect(Effect::Debug);
        let input = white_square_frame(48, 48);
        let mut out = Frame::zeros(1, 1);
        engine.process_frame(&input, &mut out);
        assert_eq!(out.data(), input.data());
    }

    #[test]
    fn status_roundtrips_through_json() {
        let cfg = config(64, 64, 2);
        let engine = Engine::new(&cfg).unwrap();
        let status = engine.status();
        let json = serde_json::to_string(&status).unwrap();
        let back: EngineStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back.effect, status.effect);
        assert_eq!(back.panel_effects, status.panel_effects);
    }
}
