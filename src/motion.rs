//! Background subtraction
//!
//! A per-pixel running mean/variance estimator over luminance. A pixel is
//! foreground when its squared deviation from the running mean exceeds
//! `VAR_THRESHOLD` times the running variance. The model adapts with an
//! exponential learning rate equivalent to a history of ~500 frames, ramping
//! faster while the history is still filling.

use crate::frame::{Frame, GrayBuffer};

/// Frames of history the exponential average is equivalent to.
pub const HISTORY: f32 = 500.0;
/// Squared-deviation multiplier for the foreground decision.
pub const VAR_THRESHOLD: f32 = 16.0;

const VAR_MIN: f32 = 4.0;
const VAR_MAX: f32 = 5000.0;

pub struct MotionModel {
    mean: Vec<f32>,
    variance: Vec<f32>,
    width: u32,
    height: u32,
    frames_seen: u64,
}

impl MotionModel {
    pub fn new(width: u32, height: u32) -> Self {
        let n = width as usize * height as usize;
        Self {
            mean: vec![0.0; n],
            variance: vec![VAR_MIN; n],
            width,
            height,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// Drop all history and restart from scratch at the given size.
    pub fn reset(&mut self, width: u32, height: u32) {
        *self = Self::new(width, height);
    }

    /// Update the model with one frame and return the 0/255 foreground mask.
    pub fn apply(&mut self, frame: &Frame) -> GrayBuffer {
        if frame.width() != self.width || frame.height() != self.height {
            self.reset(frame.width(), frame.height());
        }
        let mut mask = GrayBuffer::zeros(self.width, self.height);
        let alpha = (1.0 / (self.frames_seen as f32 + 1.0)).max(1.0 / HISTORY);
        let data = frame.data();
        for i in 0..self.mean.len() {
            let b = data[i * 3] as f32;
            let g = data[i * 3 + 1] as f32;
            let r = data[i * 3 + 2] as f32;
            let lum = (b + g + r) / 3.0;
            let d = lum - self.mean[i];
            let d2 = d * d;
            if self.frames_seen > 0 && d2 > VAR_THRESHOLD * self.variance[i] {
                mask.data_mut()[i] = 255;
            }
            self.mean[i] += alpha * d;
            self.variance[i] = (self.variance[i] + alpha * (d2 - self.variance[i]))
                .clamp(VAR_MIN, VAR_MAX);
        }
        self.frames_seen += 1;
        mask
    }
}

/// Disc structuring-element erosion.
pub fn erode(mask: &GrayBuffer, radius: i32) -> GrayBuffer {
    morph(mask, radius, true)
}

/// Disc structuring-element dilation.
pub fn dilate(mask: &GrayBuffer, radius: i32) -> GrayBuffer {
    morph(mask, radius, false)
}

/// Erosion then dilation: removes speckle smaller than the disc.
pub fn morph_open(mask: &GrayBuffer, radius: i32) -> GrayBuffer {
    dilate(&erode(mask, radius), radius)
}

/// Dilation then erosion: closes holes smaller than the disc.
pub fn morph_close(mask: &GrayBuffer, radius: i32) -> GrayBuffer {
    erode(&dilate(mask, radius), radius)
}

fn morph(mask: &GrayBuffer, radius: i32, erode: bool) -> GrayBuffer {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    let mut out = GrayBuffer::zeros(mask.width(), mask.height());
    // precompute the disc offsets once
    let mut disc = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy <= radius * radius {
                disc.push((dx, dy));
            }
        }
    }
    for y in 0..h {
        for x in 0..w {
            let mut hit = erode;
            for &(dx, dy) in &disc {
                let (nx, ny) = (x + dx, y + dy);
                let v = if nx < 0 || ny < 0 || nx >= w || ny >= h {
                    0
                } else {
                    mask.get(nx as u32, ny as u32)
                };
                if erode {
                    if v == 0 {
                        hit = false;
                        break;
                    }
                } else if v != 0 {
                    hit = true;
                    break;
                }
            }
            if hit {
                out.set(x as u32, y as u32, 255);
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_with_square(w: u32, h: u32, bg: u8, fg: u8) -> Frame {
        let mut f = Frame::zeros(w, h);
        f.fill([bg, bg, bg]);
        for y in h / 4..h / 2 {
            for x in w / 4..w / 2 {
                f.set_pixel(x, y, [fg, fg, fg]);
            }
        }
        f
    }

    #[test]
    fn static_scene_settles_to_empty_mask() {
        let mut model = MotionModel::new(32, 32);
        let mut f = Frame::zeros(32, 32);
        f.fill([60, 60, 60]);
        let mut mask = model.apply(&f);
        for _ in 0..10 {
            mask = model.apply(&f);
        }
        assert_eq!(mask.count_nonzero(), 0);
    }

    #[test]
    fn appearing_square_is_flagged_foreground() {
        let mut model = MotionModel::new(32, 32);
        let bg = Frame::zeros(32, 32);
        for _ in 0..20 {
            model.apply(&bg);
        }
        let mask = model.apply(&frame_with_square(32, 32, 0, 220));
        // square covers an 8x8 block
        assert!(mask.count_nonzero() >= 60);
        assert_eq!(mask.get(0, 0), 0);
    }

    #[test]
    fn resize_resets_history() {
        let mut model = MotionModel::new(16, 16);
        model.apply(&Frame::zeros(16, 16));
        assert_eq!(model.frames_seen(), 1);
        model.apply(&Frame::zeros(32, 16));
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn open_removes_isolated_pixel() {
        let mut m = GrayBuffer::zeros(16, 16);
        m.set(8, 8, 255);
        let opened = morph_open(&m, 2);
        assert_eq!(opened.count_nonzero(), 0);
    }

    #[test]
    fn close_fills_small_hole() {
        let mut m = GrayBuffer::zeros(16, 16);
        for y in 4..12 {
            for x in 4..12 {
                m.set(x, y, 255);
            }
        }
        m.set(8, 8, 0);
        let closed = morph_close(&m, 1);
        assert_eq!(closed.get(8, 8), 255);
    }
}
