//! Per-stream effect state
//!
//! Every independently processed pixel stream (the full frame, or one panel
//! region) owns an `EffectContext`: its background model, the silhouette
//! accumulator for Motion Trails, the per-pixel trail ages for Rainbow
//! Trails, the delayed-frame ring for Double Exposure, and a scrolling hue
//! offset. Resizing reallocates everything and restarts the background
//! model, so a context never mixes buffers of different geometries.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::frame::{Frame, GrayBuffer};
use crate::motion::MotionModel;

/// Capacity of the delayed-frame ring.
pub const FRAME_HISTORY: usize = 90;
/// Inclusive bounds for the randomized read-back offset, in frames.
pub const MIN_TIME_OFFSET: u32 = 15;
pub const MAX_TIME_OFFSET: u32 = 75;
/// The offset is re-rolled after this many pushes.
pub const OFFSET_REROLL_FRAMES: u32 = 60;

/// Ring buffer of recent frames with a randomized read-back delay.
pub struct FrameHistory {
    slots: Vec<Option<Frame>>,
    frames_written: u64,
    time_offset: u32,
    reroll_counter: u32,
    rng: SmallRng,
}

impl FrameHistory {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_rng(mut rng: SmallRng) -> Self {
        let time_offset = rng.random_range(MIN_TIME_OFFSET..=MAX_TIME_OFFSET);
        Self {
            slots: (0..FRAME_HISTORY).map(|_| None).collect(),
            frames_written: 0,
            time_offset,
            reroll_counter: 0,
            rng,
        }
    }

    pub fn time_offset(&self) -> u32 {
        self.time_offset
    }

    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }

    /// Store a frame, advancing the write cursor and occasionally re-rolling
    /// the read-back offset.
    pub fn push(&mut self, frame: &Frame) {
        let slot = (self.frames_written % FRAME_HISTORY as u64) as usize;
        match &mut self.slots[slot] {
            Some(existing) => existing.clone_from(frame),
            empty => *empty = Some(frame.clone()),
        }
        self.frames_written += 1;
        self.reroll_counter += 1;
        if self.reroll_counter >= OFFSET_REROLL_FRAMES {
            self.time_offset = self.rng.random_range(MIN_TIME_OFFSET..=MAX_TIME_OFFSET);
            self.reroll_counter = 0;
        }
    }

    /// The frame written `time_offset` pushes before the most recent one, or
    /// `None` while the ring hasn't filled that far yet.
    pub fn read_delayed(&self) -> Option<&Frame> {
        let offset = self.time_offset as u64;
        if self.frames_written <= offset {
            return None;
        }
        let index = self.frames_written - 1 - offset;
        self.slots[(index % FRAME_HISTORY as u64) as usize].as_ref()
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            *slot = None;
        }
        self.frames_written = 0;
        self.reroll_counter = 0;
    }
}

pub struct EffectContext {
    width: u32,
    height: u32,
    motion: MotionModel,
    /// Foreground mask for the frame currently being processed.
    mask: GrayBuffer,
    /// Stamp of the frame the mask belongs to, so a transition rendering two
    /// effects never steps the background model twice.
    mask_stamp: Option<u64>,
    /// Decaying silhouette accumulator (Motion Trails).
    pub accumulator: Frame,
    /// Per-pixel trail age 0..255 (Rainbow Trails).
    pub trail_age: Vec<f32>,
    /// Scrolling hue offset, advanced by Rainbow Trails.
    pub hue_offset: f32,
    /// Delayed-frame ring (Double Exposure).
    pub history: FrameHistory,
}

impl EffectContext {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            motion: MotionModel::new(width, height),
            mask: GrayBuffer::zeros(width, height),
            mask_stamp: None,
            accumulator: Frame::zeros(width, height),
            trail_age: vec![0.0; width as usize * height as usize],
            hue_offset: 0.0,
            history: FrameHistory::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Reallocate every buffer when the stream geometry changes.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width == width && self.height == height {
            return;
        }
        log::debug!(
            "effect context resize {}x{} -> {}x{}",
            self.width,
            self.height,
            width,
            height
        );
        self.width = width;
        self.height = height;
        self.motion.reset(width, height);
        self.mask = GrayBuffer::zeros(width, height);
        self.mask_stamp = None;
        self.accumulator = Frame::zeros(width, height);
        self.trail_age = vec![0.0; width as usize * height as usize];
        self.history.clear();
    }

    /// Run background subtraction for this frame, at most once per stamp.
    /// Returns the foreground mask for `frame_no`.
    pub fn update_motion(&mut self, input: &Frame, frame_no: u64) -> &GrayBuffer {
        if self.mask_stamp != Some(frame_no) {
            self.mask = self.motion.apply(input);
            self.mask_stamp = Some(frame_no);
        }
        &self.mask
    }

    pub fn mask(&self) -> &GrayBuffer {
        &self.mask
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_frame(n: u8) -> Frame {
        let mut f = Frame::zeros(4, 4);
        f.fill([n, n, n]);
        f
    }

    fn history_with_offset(offset: u32) -> FrameHistory {
        // roll seeds until the initial offset matches
        for seed in 0..10_000u64 {
            let h = FrameHistory::with_rng(SmallRng::seed_from_u64(seed));
            if h.time_offset() == offset {
                return h;
            }
        }
        unreachable!("no seed produced offset {offset}");
    }

    #[test]
    fn initial_offset_in_range() {
        for seed in 0..50 {
            let h = FrameHistory::with_rng(SmallRng::seed_from_u64(seed));
            assert!((MIN_TIME_OFFSET..=MAX_TIME_OFFSET).contains(&h.time_offset()));
        }
    }

    #[test]
    fn delayed_read_returns_exact_past_frame() {
        let mut h = history_with_offset(15);
        for n in 0..=15u8 {
            h.push(&numbered_frame(n));
        }
        // last written is 15; offset 15 reads frame 0
        let past = h.read_delayed().unwrap();
        assert_eq!(past.pixel(0, 0), [0, 0, 0]);
        h.push(&numbered_frame(16));
        let past = h.read_delayed().unwrap();
        assert_eq!(past.pixel(0, 0), [1, 1, 1]);
    }

    #[test]
    fn underfilled_ring_reads_none() {
        let mut h = history_with_offset(20);
        for n in 0..20u8 {
            h.push(&numbered_frame(n));
            assert!(h.read_delayed().is_none());
        }
        h.push(&numbered_frame(20));
        assert!(h.read_delayed().is_some());
    }

    #[test]
    fn offset_rerolls_every_sixty_pushes_and_stays_in_range() {
        let mut h = FrameHistory::with_rng(SmallRng::seed_from_u64(7));
        for _ in 0..(OFFSET_REROLL_FRAMES * 5) {
            h.push(&numbered_frame(0));
            assert!((MIN_TIME_OFFSET..=MAX_TIME_OFFSET).contains(&h.time_offset()));
        }
    }

    #[test]
    fn motion_mask_computed_once_per_stamp() {
        let mut ctx = EffectContext::new(8, 8);
        let bg = Frame::zeros(8, 8);
        for n in 0..5 {
            ctx.update_motion(&bg, n);
        }
        // same stamp twice only steps the model once
        let mut lit = Frame::zeros(8, 8);
        lit.fill([250, 250, 250]);
        ctx.update_motion(&lit, 5);
        ctx.update_motion(&lit, 5);
        // 5 background frames + 1 lit frame
        assert_eq!(ctx.motion.frames_seen(), 6);
    }

    #[test]
    fn resize_clears_everything() {
        let mut ctx = EffectContext::new(8, 8);
        ctx.trail_age[3] = 9.0;
        ctx.update_motion(&Frame::zeros(8, 8), 0);
        ctx.ensure_size(16, 8);
        assert_eq!(ctx.trail_age.len(), 16 * 8);
        assert!(ctx.trail_age.iter().all(|&a| a == 0.0));
        assert_eq!(ctx.accumulator.width(), 16);
        assert_eq!(ctx.history.frames_written(), 0);
    }
}
