//! Tessellating morphing-shape field
//!
//! A grid of shapes that continuously morphs through
//! circle -> triangle -> square -> hexagon -> star, per-vertex interpolated
//! so identity changes smoothly rather than crossfading. The grid scrolls
//! diagonally with wraparound, the fill/outline balance breathes on a slow
//! sine, and hue drifts with time plus a per-cell offset.

use crate::draw;
use crate::frame::Frame;

const SHAPE_COUNT: usize = 5;
/// Morph progress added per frame.
const MORPH_STEP: f32 = 0.0075;
/// Diagonal scroll, pixels per frame.
const SCROLL_SPEED: f32 = 0.8;

/// (cell size relative to min dimension, hexagonal row offset)
const TESSELLATION: [(f32, bool); SHAPE_COUNT] = [
    (0.12, true),  // circle
    (0.14, true),  // triangle
    (0.11, false), // square
    (0.13, true),  // hexagon
    (0.12, false), // star
];

fn shape_points(shape: usize, cx: f32, cy: f32, radius: f32) -> Vec<(f32, f32)> {
    use std::f32::consts::PI;
    let vertex = |angle: f32, r: f32| (cx + r * angle.cos(), cy + r * angle.sin());
    match shape {
        0 => (0..32)
            .map(|i| vertex(i as f32 * 2.0 * PI / 32.0, radius))
            .collect(),
        1 => (0..3)
            .map(|i| vertex(i as f32 * 2.0 * PI / 3.0 - PI / 2.0, radius))
            .collect(),
        2 => (0..4)
            .map(|i| vertex(i as f32 * 2.0 * PI / 4.0 - PI / 4.0, radius))
            .collect(),
        3 => (0..6)
            .map(|i| vertex(i as f32 * 2.0 * PI / 6.0 - PI / 2.0, radius))
            .collect(),
        _ => (0..10)
            .map(|i| {
                let r = if i % 2 == 0 { radius } else { radius / 2.0 };
                vertex(i as f32 * 2.0 * PI / 10.0 - PI / 2.0, r)
            })
            .collect(),
    }
}

pub struct ShapeField {
    frame_counter: u64,
    time: f32,
    current_shape: usize,
    morph_progress: f32,
    fill_mode: f32,
    color_morph: f32,
}

impl ShapeField {
    pub fn new() -> Self {
        Self {
            frame_counter: 0,
            time: 0.0,
            current_shape: 0,
            morph_progress: 0.0,
            fill_mode: 0.0,
            color_morph: 0.0,
        }
    }

    pub fn current_shape(&self) -> usize {
        self.current_shape
    }

    pub fn morph_progress(&self) -> f32 {
        self.morph_progress
    }

    /// Advance one frame and render into `out` at the requested size.
    pub fn process(&mut self, out: &mut Frame, target_width: u32, target_height: u32) {
        if target_width == 0 || target_height == 0 {
            log::warn!("shape field: degenerate target {target_width}x{target_height}");
            out.ensure_size(64, 64);
            out.clear();
            return;
        }
        out.ensure_size(target_width, target_height);
        out.clear();

        let (w, h) = (target_width as f32, target_height as f32);
        let min_dim = w.min(h);

        self.frame_counter += 1;
        self.time = self.frame_counter as f32 * 0.016;

        self.color_morph = (self.time * 0.25).fract();
        let base_hue = (self.time * 5.0).rem_euclid(360.0);

        if self.morph_progress >= 1.0 {
            self.current_shape = (self.current_shape + 1) % SHAPE_COUNT;
            self.morph_progress = 0.0;
        }
        self.morph_progress = (self.morph_progress + MORPH_STEP).min(1.0);

        self.fill_mode = 0.5 + 0.5 * (self.time * 0.15).sin();

        let scroll_x = (self.time * SCROLL_SPEED * 30.0).rem_euclid(w);
        let scroll_y = (self.time * SCROLL_SPEED * 30.0).rem_euclid(h);

        let next_shape = (self.current_shape + 1) % SHAPE_COUNT;
        let (cur_size, cur_hex) = TESSELLATION[self.current_shape];
        let (next_size, next_hex) = TESSELLATION[next_shape];

        let size_factor = cur_size + (next_size - cur_size) * self.morph_progress;
        let shape_size = min_dim * size_factor;
        let radius = (shape_size - 1.0) * 0.5;
        if radius < 1.0 {
            return;
        }

        let cols = (w / shape_size) as i32 + 4;
        let hex_factor = match (cur_hex, next_hex) {
            (true, true) => 1.0,
            (false, false) => 0.0,
            (true, false) => 1.0 - self.morph_progress,
            (false, true) => self.morph_progress,
        };
        let row_spacing = if hex_factor > 0.5 {
            shape_size * 0.866
        } else {
            shape_size
        };
        let base_rows = (h / row_spacing) as i32;
        let extra_rows = (((h - base_rows as f32 * row_spacing) / row_spacing) as i32 + 2).max(2);
        let rows = base_rows + extra_rows + 4;

        for row in -1..rows {
            for col in -1..cols {
                // cell centers for both tessellations, blended by morph
                let cur_cell = min_dim * cur_size;
                let next_cell = min_dim * next_size;
                let mut cur_x = col as f32 * cur_cell + cur_cell / 2.0;
                let cur_y = row as f32 * cur_cell + cur_cell / 2.0;
                if cur_hex && row.rem_euclid(2) == 1 {
                    cur_x += cur_cell * 0.5;
                }
                let mut next_x = col as f32 * next_cell + next_cell / 2.0;
                let next_y = row as f32 * next_cell + next_cell / 2.0;
                if next_hex && row.rem_euclid(2) == 1 {
                    next_x += next_cell * 0.5;
                }
                let base_x = cur_x + (next_x - cur_x) * self.morph_progress;
                let base_y = cur_y + (next_y - cur_y) * self.morph_progress;

                let mut cx = base_x - scroll_x;
                let mut cy = base_y - scroll_y;

                let wrap = shape_size * 2.0;
                while cx < -wrap {
                    cx += w + wrap * 2.0;
                }
                while cx > w + wrap {
                    cx -= w + wrap * 2.0;
                }
                while cy < -wrap {
                    cy += h + wrap * 2.0;
                }
                while cy > h + wrap {
                    cy -= h + wrap * 2.0;
                }

                if cx + radius < 0.0 || cx - radius > w || cy + radius < 0.0 || cy - radius > h {
                    continue;
                }

                let hue1 = (base_hue + row as f32 * 25.0 + col as f32 * 18.0).rem_euclid(360.0);
                let hue2 = (hue1 + 120.0).rem_euclid(360.0);
                let hue = (hue1 + (hue2 - hue1) * self.color_morph).rem_euclid(360.0);
                let sat = 0.85 + 0.1 * (self.time * 0.4 + (row + col) as f32).sin();
                let val = 0.9 + 0.1 * (self.time * 0.3 + (row - col) as f32).cos();
                let color = draw::hsv_to_bgr(hue, sat, val);

                self.draw_morphing_shape(out, cx, cy, radius, color);
            }
        }
    }

    fn draw_morphing_shape(&self, out: &mut Frame, cx: f32, cy: f32, radius: f32, color: [u8; 3]) {
        let next = (self.current_shape + 1) % SHAPE_COUNT;
        let cur_pts = shape_points(self.current_shape, cx, cy, radius);
        let next_pts = shape_points(next, cx, cy, radius);

        let n = cur_pts.len().max(next_pts.len());
        let points: Vec<(f32, f32)> = (0..n)
            .map(|i| {
                let p1 = cur_pts[i % cur_pts.len()];
                let p2 = next_pts[i % next_pts.len()];
                (
                    p1.0 + (p2.0 - p1.0) * self.morph_progress,
                    p1.1 + (p2.1 - p1.1) * self.morph_progress,
                )
            })
            .collect();
        if points.len() < 3 {
            return;
        }

        if self.fill_mode > 0.3 {
            draw::fill_polygon(out, &points, color);
        }
        let thickness = if self.fill_mode < 0.5 { 3 } else { 2 };
        let ipts: Vec<(i32, i32)> = points.iter().map(|&(x, y)| (x as i32, y as i32)).collect();
        draw::draw_polyline(out, &ipts, true, color, thickness);
    }
}

impl Default for ShapeField {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_matches_requested_size() {
        let mut fx = ShapeField::new();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 192, 64);
        assert_eq!(out.width(), 192);
        assert_eq!(out.height(), 64);
    }

    #[test]
    fn field_is_not_blank() {
        let mut fx = ShapeField::new();
        let mut out = Frame::zeros(64, 64);
        fx.process(&mut out, 64, 64);
        assert!(out.data().iter().any(|&b| b > 0));
    }

    #[test]
    fn shape_cycles_through_all_five() {
        let mut fx = ShapeField::new();
        let mut out = Frame::zeros(32, 32);
        let mut seen = [false; SHAPE_COUNT];
        // 5 shapes * (1/0.0075 ≈ 134 frames each), with headroom
        for _ in 0..800 {
            fx.process(&mut out, 32, 32);
            seen[fx.current_shape()] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn morph_progress_stays_in_unit_interval() {
        let mut fx = ShapeField::new();
        let mut out = Frame::zeros(32, 32);
        for _ in 0..400 {
            fx.process(&mut out, 32, 32);
            assert!((0.0..=1.0).contains(&fx.morph_progress()));
        }
    }

    #[test]
    fn shape_tables_agree() {
        for (i, _) in TESSELLATION.iter().enumerate() {
            assert!(shape_points(i, 0.0, 0.0, 10.0).len() >= 3);
        }
    }

    #[test]
    fn degenerate_target_yields_black_fallback() {
        let mut fx = ShapeField::new();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 0, 0);
        assert_eq!(out.width(), 64);
        assert!(out.data().iter().all(|&b| b == 0));
    }
}
