//! Root-vein growth generator
//!
//! Branching vein segments grow from the four corners toward the center in
//! normalized [0,1] space, steered by the escape angle of a short Mandelbrot
//! iteration at the tip position. Near the segment cap the oldest interior
//! segments start wilting; when nothing is growing the whole structure
//! reseeds after a short pause.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::draw;
use crate::frame::Frame;

pub const MAX_SEGMENTS: usize = 800;
pub const MAX_GENERATION: u32 = 8;
const BRANCH_ANGLE_SPREAD: f32 = 0.45;
/// Wilt progress per frame at the 30 fps reference rate.
const WILT_SPEED: f32 = 0.02;
/// Tips stop growing inside this radius around the center.
const CENTER_STOP_RADIUS: f32 = 0.06;
/// Interior segments start wilting once the arena is this full.
const WILT_PRESSURE: f32 = 0.85;
/// Fully wilted segments are swept out this often (frames).
const CLEANUP_INTERVAL: u32 = 90;
/// Seconds without any active tip before the structure reseeds.
const RESEED_AFTER: f32 = 2.0;

#[derive(Clone, Debug)]
struct VeinSegment {
    start: (f32, f32),
    end: (f32, f32),
    direction: f32,
    age: f32,
    generation: u32,
    phase: f32,
    is_tip: bool,
    is_wilting: bool,
    wilt_progress: f32,
}

pub struct RootVeins {
    segments: Vec<VeinSegment>,
    time: f32,
    no_tips_time: f32,
    cleanup_counter: u32,
    rng: SmallRng,
}

impl RootVeins {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        let mut fx = Self {
            segments: Vec::with_capacity(MAX_SEGMENTS),
            time: 0.0,
            no_tips_time: 0.0,
            cleanup_counter: 0,
            rng,
        };
        fx.seed_roots();
        fx
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    pub fn active_tip_count(&self) -> usize {
        self.segments
            .iter()
            .filter(|s| s.is_tip && !s.is_wilting)
            .count()
    }

    fn reset(&mut self) {
        self.segments.clear();
        self.time = 0.0;
        self.seed_roots();
    }

    /// Three roots per corner, fanned around the direction toward center.
    fn seed_roots(&mut self) {
        const CORNERS: [(f32, f32); 4] = [(0.0, 0.0), (1.0, 0.0), (0.0, 1.0), (1.0, 1.0)];
        const INSET: f32 = 0.02;
        for &(cx, cy) in &CORNERS {
            let sx = cx + if cx < 0.5 { INSET } else { -INSET };
            let sy = cy + if cy < 0.5 { INSET } else { -INSET };
            let to_center = (0.5 - cy).atan2(0.5 - cx);
            for vein in 0..3i32 {
                let spread = (vein - 1) as f32 * 0.25;
                self.segments.push(VeinSegment {
                    start: (sx, sy),
                    end: (sx, sy),
                    direction: to_center + spread,
                    age: 0.0,
                    generation: 0,
                    phase: self.rng.random::<f32>() * std::f32::consts::TAU,
                    is_tip: true,
                    is_wilting: false,
                    wilt_progress: 0.0,
                });
            }
        }
    }

    /// Bend the heading by the Mandelbrot escape angle at the tip position.
    fn mandelbrot_direction(&self, x: f32, y: f32, base_angle: f32) -> f32 {
        let mx = x * 4.0 - 2.0;
        let my = y * 4.0 - 2.0;
        let (mut zx, mut zy) = (0.0f32, 0.0f32);
        for _ in 0..10 {
            let nzx = zx * zx - zy * zy + mx;
            let nzy = 2.0 * zx * zy + my;
            zx = nzx;
            zy = nzy;
            if zx * zx + zy * zy > 4.0 {
                break;
            }
        }
        let escape_angle = zy.atan2(zx);
        base_angle + 0.15 * (escape_angle + self.time * 0.5).sin()
    }

    fn grow(&mut self, dt: f32) {
        let mut spawned: Vec<VeinSegment> = Vec::new();
        for i in 0..self.segments.len() {
            if !self.segments[i].is_tip || self.segments[i].is_wilting {
                continue;
            }
            let seg = self.segments[i].clone();
            let (ex, ey) = seg.end;

            // persistent heading, gently pulled toward center
            let to_center = (0.5 - ey).atan2(0.5 - ex);
            let base = seg.direction * 0.85 + to_center * 0.15;
            let mut dir = self.mandelbrot_direction(ex, ey, base);
            dir += 0.15 * (self.time * 2.0 + seg.phase * 3.0 + ex * 15.0).sin();
            dir += 0.08 * (self.time * 1.2 + seg.phase * 2.0 + ey * 12.0).cos();

            let growth = 0.005 / (1.0 + seg.generation as f32 * 0.25);
            let nx = ex + growth * dir.cos();
            let ny = ey + growth * dir.sin();

            let dist_center = ((nx - 0.5).powi(2) + (ny - 0.5).powi(2)).sqrt();
            if dist_center < CENTER_STOP_RADIUS
                || !(-0.02..=1.02).contains(&nx)
                || !(-0.02..=1.02).contains(&ny)
            {
                self.segments[i].is_tip = false;
                continue;
            }

            let seg = &mut self.segments[i];
            seg.age += dt;
            seg.end = (nx, ny);
            seg.direction = dir;

            let len = ((nx - seg.start.0).powi(2) + (ny - seg.start.1).powi(2)).sqrt();
            let branch_length = 0.02 + seg.generation as f32 * 0.008;
            if len <= branch_length || self.segments.len() + spawned.len() >= MAX_SEGMENTS {
                continue;
            }

            let seg = self.segments[i].clone();
            let branch_prob = (0.7 - seg.generation as f32 * 0.08).max(0.15);
            let should_branch =
                self.rng.random::<f32>() < branch_prob && seg.generation < MAX_GENERATION;

            if should_branch {
                // Y-split: two child tips, the parent stops
                for b in 0..2 {
                    let variance = (self.rng.random::<f32>() - 0.5) * 0.3;
                    let angle = if b == 0 {
                        BRANCH_ANGLE_SPREAD * 0.7 + variance
                    } else {
                        -BRANCH_ANGLE_SPREAD * 0.7 + variance
                    };
                    spawned.push(VeinSegment {
                        start: seg.end,
                        end: seg.end,
                        direction: seg.direction + angle,
                        age: 0.0,
                        generation: seg.generation + 1,
                        phase: self.rng.random::<f32>() * std::f32::consts::TAU,
                        is_tip: true,
                        is_wilting: false,
                        wilt_progress: 0.0,
                    });
                }
            } else {
                // continuation keeps the generation, wanders slightly
                spawned.push(VeinSegment {
                    start: seg.end,
                    end: seg.end,
                    direction: seg.direction + (self.rng.random::<f32>() - 0.5) * 0.2,
                    age: 0.0,
                    generation: seg.generation,
                    phase: seg.phase + 0.05,
                    is_tip: true,
                    is_wilting: false,
                    wilt_progress: 0.0,
                });
            }
            self.segments[i].is_tip = false;
        }

        for s in spawned {
            if self.segments.len() < MAX_SEGMENTS {
                self.segments.push(s);
            }
        }
    }

    fn update_wilting(&mut self, dt: f32) {
        if self.segments.len() as f32 > MAX_SEGMENTS as f32 * WILT_PRESSURE {
            if let Some(seg) = self
                .segments
                .iter_mut()
                .find(|s| !s.is_tip && !s.is_wilting && s.generation > 2 && s.age > 2.0)
            {
                seg.is_wilting = true;
            }
        }
        for seg in &mut self.segments {
            if seg.is_wilting {
                seg.wilt_progress += WILT_SPEED * dt * 30.0;
            }
        }
        self.cleanup_counter += 1;
        if self.cleanup_counter >= CLEANUP_INTERVAL {
            self.cleanup_counter = 0;
            let mut i = 0;
            while i < self.segments.len() {
                if self.segments[i].wilt_progress >= 1.0 && self.segments[i].generation > 0 {
                    self.segments.swap_remove(i);
                } else {
                    i += 1;
                }
            }
        }
    }

    fn segment_brightness(&self, seg: &VeinSegment) -> f32 {
        let pulse = 0.9 + 0.1 * (seg.age * 3.0 + seg.phase).sin();
        let gen_fade = (1.0 - seg.generation as f32 * 0.1).max(0.4);
        pulse * gen_fade * (1.0 - seg.wilt_progress)
    }

    fn render(&self, out: &mut Frame) {
        let (w, h) = (out.width() as f32, out.height() as f32);
        for seg in &self.segments {
            if seg.wilt_progress >= 1.0 {
                continue;
            }
            let len = ((seg.end.0 - seg.start.0).powi(2) + (seg.end.1 - seg.start.1).powi(2)).sqrt();
            if len < 0.001 {
                continue;
            }
            let brightness = self.segment_brightness(seg);
            // electric blue at the roots shading to magenta at deep tips
            let t = seg.generation as f32 / MAX_GENERATION as f32;
            let color = [
                ((255.0 - t * 100.0) * brightness) as u8,
                ((50.0 + t * 50.0) * brightness) as u8,
                ((100.0 + t * 155.0) * brightness) as u8,
            ];
            draw::draw_line_aa(
                out,
                seg.start.0 * w,
                seg.start.1 * h,
                seg.end.0 * w,
                seg.end.1 * h,
                color,
            );
        }
        for seg in &self.segments {
            if seg.is_tip && !seg.is_wilting {
                let brightness = self.segment_brightness(seg);
                let glow = [
                    (255.0 * brightness) as u8,
                    (200.0 * brightness) as u8,
                    (255.0 * brightness) as u8,
                ];
                draw::fill_circle(out, seg.end.0 * w, seg.end.1 * h, 2.0, glow);
            }
        }
    }

    /// Advance one frame and render into `out` at the requested size.
    pub fn process(&mut self, out: &mut Frame, target_width: u32, target_height: u32) {
        if target_width == 0 || target_height == 0 {
            log::warn!("root veins: degenerate target {target_width}x{target_height}");
            out.ensure_size(64, 64);
            out.clear();
            return;
        }
        let dt = 1.0 / 30.0;
        self.time += dt;

        self.grow(dt);
        self.update_wilting(dt);

        if self.active_tip_count() == 0 {
            self.no_tips_time += dt;
            if self.no_tips_time > RESEED_AFTER {
                self.reset();
                self.no_tips_time = 0.0;
            }
        } else {
            self.no_tips_time = 0.0;
        }

        out.ensure_size(target_width, target_height);
        out.clear();
        self.render(out);

        // soft glow pass
        let glow = draw::blur_frame(out, 1);
        out.add_weighted(0.8, &glow, 0.4);
    }
}

impl Default for RootVeins {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> RootVeins {
        RootVeins::with_rng(SmallRng::seed_from_u64(42))
    }

    #[test]
    fn starts_with_twelve_roots() {
        let fx = seeded();
        assert_eq!(fx.segment_count(), 12);
        assert_eq!(fx.active_tip_count(), 12);
    }

    #[test]
    fn segment_count_never_exceeds_cap() {
        let mut fx = seeded();
        let mut out = Frame::zeros(64, 64);
        for _ in 0..2000 {
            fx.process(&mut out, 64, 64);
            assert!(fx.segment_count() <= MAX_SEGMENTS);
        }
    }

    #[test]
    fn generation_never_exceeds_limit() {
        let mut fx = seeded();
        let mut out = Frame::zeros(64, 64);
        for _ in 0..500 {
            fx.process(&mut out, 64, 64);
        }
        assert!(fx.segments.iter().all(|s| s.generation <= MAX_GENERATION));
    }

    #[test]
    fn output_matches_requested_size() {
        let mut fx = seeded();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 192, 64);
        assert_eq!(out.width(), 192);
        assert_eq!(out.height(), 64);
    }

    #[test]
    fn degenerate_target_yields_black_fallback() {
        let mut fx = seeded();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 0, 64);
        assert_eq!(out.width(), 64);
        assert_eq!(out.height(), 64);
        assert!(out.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn regenerates_within_two_seconds_after_tips_vanish() {
        let mut fx = seeded();
        let mut out = Frame::zeros(64, 64);
        for _ in 0..10 {
            fx.process(&mut out, 64, 64);
        }
        for seg in &mut fx.segments {
            seg.is_tip = false;
        }
        assert_eq!(fx.active_tip_count(), 0);

        // 2 simulated seconds = 60 ticks at 30 fps; the reset fires on the
        // first tick past that
        let mut ticks = 0;
        while fx.active_tip_count() == 0 {
            fx.process(&mut out, 64, 64);
            ticks += 1;
            assert!(ticks <= 61, "structure failed to reseed within 2s");
        }
        // fresh corner roots, nothing carried over
        assert_eq!(fx.segment_count(), 12);
        assert_eq!(fx.active_tip_count(), 12);
    }

    #[test]
    fn veins_produce_visible_pixels() {
        let mut fx = seeded();
        let mut out = Frame::zeros(64, 64);
        for _ in 0..30 {
            fx.process(&mut out, 64, 64);
        }
        assert!(out.data().iter().any(|&b| b > 0));
    }
}
