//! Motion-driven frame processors
//!
//! Each processor turns one input frame into one output frame using the
//! per-stream state in `EffectContext`. Contour area floors are passed in by
//! the caller: 1000 px for full-frame processing, 500 px for a single panel
//! region (Rainbow Trails keeps its own higher floor).

use crate::contour::{self, Contour};
use crate::draw;
use crate::effects::EffectContext;
use crate::frame::{Frame, GrayBuffer};
use crate::motion::{morph_close, morph_open};

/// Contour area floor when processing the full frame.
pub const MIN_CONTOUR_AREA_FULL: f64 = 1000.0;
/// Contour area floor when processing a single panel region.
pub const MIN_CONTOUR_AREA_PANEL: f64 = 500.0;
/// Rainbow Trails rejects smaller blobs than the other effects.
pub const MIN_CONTOUR_AREA_RAINBOW: f64 = 1500.0;

/// Silhouette accumulator decay per frame (Motion Trails).
pub const TRAIL_DECAY: f32 = 0.7;
/// Trail-age decay per frame (Rainbow Trails).
pub const RAINBOW_DECAY: f32 = 0.93;
/// Trail intensities at or below this are treated as gone.
const RAINBOW_INTENSITY_FLOOR: f32 = 20.0;

const WHITE: [u8; 3] = [255, 255, 255];

fn person_contours(mask: &GrayBuffer, min_area: f64) -> Vec<Contour> {
    contour::find_contours(mask, min_area)
}

/// Solid white blobs on black.
pub fn filled_silhouette(
    ctx: &mut EffectContext,
    input: &Frame,
    out: &mut Frame,
    min_area: f64,
    frame_no: u64,
) {
    let mask = ctx.update_motion(input, frame_no);
    let contours = person_contours(mask, min_area);
    out.ensure_size(input.width(), input.height());
    out.clear();
    for c in &contours {
        contour::fill_contour(out, c, WHITE);
    }
}

/// White 2 px contour strokes on black.
pub fn outline(
    ctx: &mut EffectContext,
    input: &Frame,
    out: &mut Frame,
    min_area: f64,
    frame_no: u64,
) {
    let mask = ctx.update_motion(input, frame_no);
    let contours = person_contours(mask, min_area);
    out.ensure_size(input.width(), input.height());
    out.clear();
    for c in &contours {
        contour::draw_contour(out, c, WHITE, 2);
    }
}

/// Decaying silhouette accumulator: old silhouettes fade, the newest is
/// stamped at full brightness.
pub fn motion_trails(
    ctx: &mut EffectContext,
    input: &Frame,
    out: &mut Frame,
    min_area: f64,
    frame_no: u64,
) {
    let mask = ctx.update_motion(input, frame_no);
    let contours = person_contours(mask, min_area);
    ctx.accumulator.decay(TRAIL_DECAY);
    for c in &contours {
        contour::fill_contour(&mut ctx.accumulator, c, WHITE);
    }
    out.clone_from(&ctx.accumulator);
}

/// Rainbow-colored ghost trails over the live feed. The raw mask is cleaned
/// with an open+close before contour extraction; trails never draw over the
/// current silhouette.
pub fn rainbow_trails(ctx: &mut EffectContext, input: &Frame, out: &mut Frame, frame_no: u64) {
    let mask = ctx.update_motion(input, frame_no).clone();
    let cleaned = morph_close(&morph_open(&mask, 2), 2);
    let contours = person_contours(&cleaned, MIN_CONTOUR_AREA_RAINBOW);

    let mut current_fg = GrayBuffer::zeros(input.width(), input.height());
    for c in &contours {
        contour::fill_contour_mask(&mut current_fg, c);
    }

    for age in ctx.trail_age.iter_mut() {
        *age *= RAINBOW_DECAY;
    }
    for (age, &fg) in ctx.trail_age.iter_mut().zip(current_fg.data().iter()) {
        if fg != 0 {
            *age = 255.0;
        }
    }

    out.clone_from(input);
    let w = input.width() as usize;
    for (i, &age) in ctx.trail_age.iter().enumerate() {
        if current_fg.data()[i] != 0 || age <= RAINBOW_INTENSITY_FLOOR {
            continue;
        }
        let alpha = age / 255.0;
        if alpha <= 0.08 {
            continue;
        }
        let (x, y) = ((i % w) as u32, (i / w) as u32);
        // spatial hue ramp, animated by the scrolling offset; gamma-boosted
        // brightness so fading trails stay visible
        let hue = (x as f32 * 0.5 + y as f32 * 0.4 + ctx.hue_offset).rem_euclid(180.0) * 2.0;
        let value = alpha.powf(0.7);
        let color = draw::hsv_to_bgr(hue, 1.0, value);
        let boosted = (alpha * 1.2).min(1.0);
        out.blend_pixel(x, y, color, boosted);
    }
    ctx.hue_offset = (ctx.hue_offset + 3.0).rem_euclid(180.0);
}

/// Ghost a randomly delayed past frame into the moving regions of the
/// current one. Pass-through until the ring has enough history.
pub fn double_exposure(ctx: &mut EffectContext, input: &Frame, out: &mut Frame, frame_no: u64) {
    let mask = ctx.update_motion(input, frame_no).clone();
    ctx.history.push(input);

    let Some(past) = ctx.history.read_delayed() else {
        out.clone_from(input);
        return;
    };

    // soft-edged motion mask
    let soft = draw::blur_gray(&morph_close(&mask, 1), 7);

    let mut blended = input.clone();
    blended.add_weighted(0.25, past, 0.75);

    out.clone_from(input);
    for (i, &m) in soft.data().iter().enumerate() {
        if m > 0 {
            let o = i * 3;
            out.data_mut()[o..o + 3].copy_from_slice(&blended.data()[o..o + 3]);
        }
    }
}

/// Simplified polygons, filled with an area-keyed hue and outlined white.
pub fn geometric_abstraction(
    ctx: &mut EffectContext,
    input: &Frame,
    out: &mut Frame,
    min_area: f64,
    frame_no: u64,
) {
    let mask = ctx.update_motion(input, frame_no);
    let cleaned = morph_close(&morph_open(mask, 2), 2);
    let contours = person_contours(&cleaned, min_area);
    out.ensure_size(input.width(), input.height());
    out.clear();
    for c in &contours {
        let approx = contour::approx_poly_dp(&c.points, 15.0);
        if approx.len() < 3 {
            continue;
        }
        let hue = ((c.area * 0.1) % 360.0) as f32;
        let color = draw::hsv_to_bgr(hue, 1.0, 1.0);
        let pts: Vec<(f32, f32)> = approx.iter().map(|&(x, y)| (x as f32, y as f32)).collect();
        draw::fill_polygon(out, &pts, color);
        draw::draw_polyline(out, &approx, true, WHITE, 2);
    }
}
