//! Multi-panel compositor
//!
//! Splits one logical frame across N chained panels. Extend mode slices the
//! input into vertical strips (the last strip absorbs any remainder
//! columns) and runs each strip through its panel's own context; Repeat
//! mode resizes the whole input per panel instead. Every panel keeps its
//! own `EffectContext` so background-model drift stays panel-local; the
//! contexts are sized lazily to whatever region they end up processing.

use crate::effects::ambient::Generators;
use crate::effects::motion_fx::MIN_CONTOUR_AREA_PANEL;
use crate::effects::{Effect, EffectContext, PanelMode};
use crate::engine::run_effect;
use crate::frame::Frame;

pub struct PanelCompositor {
    panels: Vec<EffectContext>,
}

impl PanelCompositor {
    pub fn new(num_panels: usize) -> Self {
        Self {
            panels: (0..num_panels.max(1))
                .map(|_| EffectContext::new(0, 0))
                .collect(),
        }
    }

    pub fn panel_count(&self) -> usize {
        self.panels.len()
    }

    /// Column range of panel `i` for a given input width.
    pub fn panel_span(&self, i: usize, width: u32) -> (u32, u32) {
        let n = self.panels.len() as u32;
        let panel_w = width / n;
        let start = i as u32 * panel_w;
        let end = if i == self.panels.len() - 1 {
            width
        } else {
            (i as u32 + 1) * panel_w
        };
        (start, end)
    }

    /// Render all panels into `out` (same size as `input`).
    ///
    /// `effects` holds the resolved effect per panel. When `shared_effect`
    /// is `Some`, every panel shows that one effect; a shared Double
    /// Exposure in Extend mode is computed once on the full frame with
    /// `global_ctx` and sliced, so the ring buffer isn't duplicated N ways.
    #[allow(clippy::too_many_arguments)]
    pub fn compose(
        &mut self,
        input: &Frame,
        out: &mut Frame,
        panel_mode: PanelMode,
        effects: &[Effect],
        shared_effect: Option<Effect>,
        global_ctx: &mut EffectContext,
        generators: &mut Generators,
        frame_no: u64,
    ) {
        out.ensure_size(input.width(), input.height());
        let n = self.panels.len();

        let full_double_exposure = match (panel_mode, shared_effect) {
            (PanelMode::Extend, Some(Effect::DoubleExposure)) => {
                let mut full = Frame::zeros(input.width(), input.height());
                global_ctx.ensure_size(input.width(), input.height());
                run_effect(
                    Effect::DoubleExposure,
                    input,
                    &mut full,
                    global_ctx,
                    generators,
                    MIN_CONTOUR_AREA_PANEL,
                    frame_no,
                );
                Some(full)
            }
            _ => None,
        };

        for i in 0..n {
            let (x_start, x_end) = self.panel_span(i, input.width());
            let strip_w = x_end - x_start;
            let effect = shared_effect.unwrap_or_else(|| effects[i]);

            let rendered = match panel_mode {
                PanelMode::Extend => {
                    if let (Effect::DoubleExposure, Some(full)) =
                        (effect, full_double_exposure.as_ref())
                    {
                        full.region(x_start, 0, strip_w, input.height())
                    } else {
                        let strip = input.region(x_start, 0, strip_w, input.height());
                        let ctx = &mut self.panels[i];
                        ctx.ensure_size(strip.width(), strip.height());
                        let mut panel_out = Frame::zeros(strip.width(), strip.height());
                        run_effect(
                            effect,
                            &strip,
                            &mut panel_out,
                            ctx,
                            generators,
                            MIN_CONTOUR_AREA_PANEL,
                            frame_no,
                        );
                        panel_out
                    }
                }
                PanelMode::Repeat => {
                    let resized = input.resize_bilinear(strip_w, input.height());
                    let ctx = &mut self.panels[i];
                    ctx.ensure_size(resized.width(), resized.height());
                    let mut panel_out = Frame::zeros(resized.width(), resized.height());
                    run_effect(
                        effect,
                        &resized,
                        &mut panel_out,
                        ctx,
                        generators,
                        MIN_CONTOUR_AREA_PANEL,
                        frame_no,
                    );
                    panel_out
                }
            };
            out.blit(&rendered, x_start, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::ambient::Generators;

    fn striped_input(w: u32, h: u32) -> Frame {
        // each 64-wide band gets a distinct solid color
        let mut f = Frame::zeros(w, h);
        for y in 0..h {
            for x in 0..w {
                let band = (x / 64) as u8;
                f.set_pixel(x, y, [band * 40 + 20, band * 40 + 20, band * 40 + 20]);
            }
        }
        f
    }

    #[test]
    fn extend_spans_cover_input_exactly() {
        let c = PanelCompositor::new(3);
        assert_eq!(c.panel_span(0, 192), (0, 64));
        assert_eq!(c.panel_span(1, 192), (64, 128));
        assert_eq!(c.panel_span(2, 192), (128, 192));
    }

    #[test]
    fn last_panel_absorbs_remainder() {
        let c = PanelCompositor::new(3);
        assert_eq!(c.panel_span(0, 200), (0, 66));
        assert_eq!(c.panel_span(1, 200), (66, 132));
        assert_eq!(c.panel_span(2, 200), (132, 200));
    }

    #[test]
    fn extend_debug_slices_the_input_verbatim() {
        let mut c = PanelCompositor::new(3);
        let mut gens = Generators::new();
        let mut global = EffectContext::new(0, 0);
        let input = striped_input(192, 64);
        let mut out = Frame::zeros(1, 1);
        c.compose(
            &input,
            &mut out,
            PanelMode::Extend,
            &[Effect::Debug; 3],
            None,
            &mut global,
            &mut gens,
            0,
        );
        // Debug is pass-through, so slicing and re-blitting reproduces the input
        assert_eq!(out.width(), 192);
        assert_eq!(out.height(), 64);
        assert_eq!(out.data(), input.data());
    }

    #[test]
    fn repeat_gives_every_panel_the_whole_image() {
        let mut c = PanelCompositor::new(2);
        let mut gens = Generators::new();
        let mut global = EffectContext::new(0, 0);
        // left half dark, right half bright
        let mut input = Frame::zeros(128, 32);
        for y in 0..32 {
            for x in 64..128 {
                input.set_pixel(x, y, [200, 200, 200]);
            }
        }
        let mut out = Frame::zeros(1, 1);
        c.compose(
            &input,
            &mut out,
            PanelMode::Repeat,
            &[Effect::Debug; 2],
            None,
            &mut global,
            &mut gens,
            0,
        );
        // each 64-wide panel shows the full image squeezed: dark left, bright right
        for x_base in [0u32, 64] {
            assert!(out.pixel(x_base + 8, 16)[0] < 100);
            assert!(out.pixel(x_base + 56, 16)[0] > 100);
        }
    }

    #[test]
    fn output_size_matches_input_for_procedural_panels() {
        let mut c = PanelCompositor::new(3);
        let mut gens = Generators::new();
        let mut global = EffectContext::new(0, 0);
        let input = Frame::zeros(192, 64);
        let mut out = Frame::zeros(1, 1);
        c.compose(
            &input,
            &mut out,
            PanelMode::Extend,
            &[
                Effect::ProceduralShapes,
                Effect::WavePatterns,
                Effect::MandelbrotVeins,
            ],
            None,
            &mut global,
            &mut gens,
            0,
        );
        assert_eq!(out.width(), 192);
        assert_eq!(out.height(), 64);
    }

    #[test]
    fn shared_double_exposure_is_computed_on_the_full_frame() {
        let mut c = PanelCompositor::new(3);
        let mut gens = Generators::new();
        let mut global = EffectContext::new(0, 0);
        let input = striped_input(192, 64);
        let mut out = Frame::zeros(1, 1);
        for frame_no in 0..5 {
            c.compose(
                &input,
                &mut out,
                PanelMode::Extend,
                &[Effect::DoubleExposure; 3],
                Some(Effect::DoubleExposure),
                &mut global,
                &mut gens,
                frame_no,
            );
        }
        // the global ring took the writes; panel contexts stayed untouched
        assert_eq!(global.history.frames_written(), 5);
        for panel in &c.panels {
            assert_eq!(panel.history.frames_written(), 0);
        }
    }
}
