//! Wave-interference generator
//!
//! Three sine fields summed per pixel, hue keyed to position and time.
//! Rendered at half resolution and upscaled bilinearly; the pattern is
//! smooth enough that the upscale is invisible and the render cost drops
//! fourfold.

use crate::draw;
use crate::frame::Frame;

pub struct WavePatterns {
    time: f32,
    phase: f32,
}

impl WavePatterns {
    pub fn new() -> Self {
        Self {
            time: 0.0,
            phase: 0.0,
        }
    }

    /// Advance one frame and render into `out` at the requested size.
    pub fn process(&mut self, out: &mut Frame, target_width: u32, target_height: u32) {
        if target_width == 0 || target_height == 0 {
            log::warn!("wave patterns: degenerate target {target_width}x{target_height}");
            out.ensure_size(64, 64);
            out.clear();
            return;
        }
        self.time += 0.05;
        self.phase += 0.02;

        let proc_w = (target_width / 2).max(1);
        let proc_h = (target_height / 2).max(1);
        let mut low = Frame::zeros(proc_w, proc_h);

        for y in 0..proc_h {
            for x in 0..proc_w {
                // coordinates in full-resolution space
                let fx = (x * 2) as f32 * 0.1;
                let fy = (y * 2) as f32 * 0.1;

                let wave1 = (fx + self.time).sin();
                let wave2 = (fy + self.time * 1.3).sin();
                let wave3 = ((fx + fy) * 0.07 + self.phase).sin();
                let combined = (wave1 + wave2 + wave3) / 3.0;

                let hue = ((fx + fy) * 10.0 + self.time * 20.0).rem_euclid(360.0);
                let brightness = (combined + 1.0) * 0.5;
                low.set_pixel(x, y, draw::hsv_to_bgr(hue, 1.0, brightness));
            }
        }

        *out = low.resize_bilinear(target_width, target_height);
    }
}

impl Default for WavePatterns {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_matches_requested_size() {
        let mut fx = WavePatterns::new();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 192, 64);
        assert_eq!(out.width(), 192);
        assert_eq!(out.height(), 64);
    }

    #[test]
    fn pattern_animates_over_time() {
        let mut fx = WavePatterns::new();
        let mut a = Frame::zeros(1, 1);
        let mut b = Frame::zeros(1, 1);
        fx.process(&mut a, 64, 64);
        fx.process(&mut b, 64, 64);
        assert_ne!(a.data(), b.data());
    }

    #[test]
    fn handles_tiny_targets() {
        let mut fx = WavePatterns::new();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 1, 1);
        assert_eq!(out.width(), 1);
        assert_eq!(out.height(), 1);
    }

    #[test]
    fn degenerate_target_yields_black_fallback() {
        let mut fx = WavePatterns::new();
        let mut out = Frame::zeros(1, 1);
        fx.process(&mut out, 0, 5);
        assert_eq!(out.width(), 64);
        assert!(out.data().iter().all(|&b| b == 0));
    }
}
