//! Pixel buffer types
//!
//! `Frame` is the interchange type for the whole pipeline: a tightly packed
//! row-major BGR8 grid. `GrayBuffer` is its single-channel sibling, used for
//! foreground masks.

/// A decoded BGR frame. 3 bytes per pixel, row-major, no padding.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl Frame {
    /// Create a black frame of the given size.
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; Self::expected_size(width, height)],
            width,
            height,
        }
    }

    /// Wrap existing BGR data. Fails if the buffer length doesn't match.
    pub fn from_data(data: Vec<u8>, width: u32, height: u32) -> Result<Self, String> {
        let expected = Self::expected_size(width, height);
        if data.len() != expected {
            return Err(format!(
                "frame buffer is {} bytes, expected {} for {}x{}",
                data.len(),
                expected,
                width,
                height
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Expected buffer size in bytes for a BGR frame of the given dimensions.
    pub fn expected_size(width: u32, height: u32) -> usize {
        width as usize * height as usize * 3
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Non-degenerate dimensions and a consistent buffer.
    pub fn is_valid(&self) -> bool {
        self.width > 0
            && self.height > 0
            && self.data.len() == Self::expected_size(self.width, self.height)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 3
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
        let i = self.offset(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3]) {
        let i = self.offset(x, y);
        self.data[i..i + 3].copy_from_slice(&bgr);
    }

    /// Blend `bgr` over the existing pixel with the given alpha.
    #[inline]
    pub fn blend_pixel(&mut self, x: u32, y: u32, bgr: [u8; 3], alpha: f32) {
        let a = alpha.clamp(0.0, 1.0);
        let i = self.offset(x, y);
        for c in 0..3 {
            let old = self.data[i + c] as f32;
            self.data[i + c] = (old * (1.0 - a) + bgr[c] as f32 * a) as u8;
        }
    }

    /// Reset to black, keeping the allocation.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn fill(&mut self, bgr: [u8; 3]) {
        for px in self.data.chunks_exact_mut(3) {
            px.copy_from_slice(&bgr);
        }
    }

    /// Resize the backing buffer, zero-filling. No-op when dimensions match.
    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::zeros(width, height);
        }
    }

    /// Multiply every channel by `factor` (used for decaying accumulators).
    pub fn decay(&mut self, factor: f32) {
        for b in self.data.iter_mut() {
            *b = (*b as f32 * factor) as u8;
        }
    }

    /// Copy a rectangular region out into a new frame. The region is clamped
    /// to the frame bounds.
    pub fn region(&self, x: u32, y: u32, w: u32, h: u32) -> Frame {
        let x = x.min(self.width);
        let y = y.min(self.height);
        let w = w.min(self.width - x);
        let h = h.min(self.height - y);
        let mut out = Frame::zeros(w, h);
        for row in 0..h {
            let src = self.offset(x, y + row);
            let dst = out.offset(0, row);
            out.data[dst..dst + w as usize * 3]
                .copy_from_slice(&self.data[src..src + w as usize * 3]);
        }
        out
    }

    /// Paste `src` into this frame with its top-left corner at (dst_x, dst_y),
    /// clipping at the frame edges.
    pub fn blit(&mut self, src: &Frame, dst_x: u32, dst_y: u32) {
        if dst_x >= self.width || dst_y >= self.height {
            return;
        }
        let w = src.width.min(self.width - dst_x);
        let h = src.height.min(self.height - dst_y);
        for row in 0..h {
            let s = src.offset(0, row);
            let d = self.offset(dst_x, dst_y + row);
            self.data[d..d + w as usize * 3].copy_from_slice(&src.data[s..s + w as usize * 3]);
        }
    }

    /// Bilinear resample to a new size.
    pub fn resize_bilinear(&self, width: u32, height: u32) -> Frame {
        let mut out = Frame::zeros(width, height);
        if !self.is_valid() || width == 0 || height == 0 {
            return out;
        }
        let sx = self.width as f32 / width as f32;
        let sy = self.height as f32 / height as f32;
        for y in 0..height {
            let fy = ((y as f32 + 0.5) * sy - 0.5).max(0.0);
            let y0 = (fy as u32).min(self.height - 1);
            let y1 = (y0 + 1).min(self.height - 1);
            let ty = fy - y0 as f32;
            for x in 0..width {
                let fx = ((x as f32 + 0.5) * sx - 0.5).max(0.0);
                let x0 = (fx as u32).min(self.width - 1);
                let x1 = (x0 + 1).min(self.width - 1);
                let tx = fx - x0 as f32;
                let mut bgr = [0u8; 3];
                for c in 0..3 {
                    let p00 = self.data[self.offset(x0, y0) + c] as f32;
                    let p10 = self.data[self.offset(x1, y0) + c] as f32;
                    let p01 = self.data[self.offset(x0, y1) + c] as f32;
                    let p11 = self.data[self.offset(x1, y1) + c] as f32;
                    let top = p00 * (1.0 - tx) + p10 * tx;
                    let bot = p01 * (1.0 - tx) + p11 * tx;
                    bgr[c] = (top * (1.0 - ty) + bot * ty).round().clamp(0.0, 255.0) as u8;
                }
                out.set_pixel(x, y, bgr);
            }
        }
        out
    }

    /// Per-pixel crossfade: `self = self*(1-alpha) + other*alpha`. Mismatched
    /// sizes are ignored.
    pub fn lerp_toward(&mut self, other: &Frame, alpha: f32) {
        if self.width != other.width || self.height != other.height {
            return;
        }
        let a = alpha.clamp(0.0, 1.0);
        for (d, s) in self.data.iter_mut().zip(other.data.iter()) {
            *d = (*d as f32 * (1.0 - a) + *s as f32 * a) as u8;
        }
    }

    /// Saturating weighted add: `self = self*wa + other*wb`.
    pub fn add_weighted(&mut self, wa: f32, other: &Frame, wb: f32) {
        if self.width != other.width || self.height != other.height {
            return;
        }
        for (d, s) in self.data.iter_mut().zip(other.data.iter()) {
            *d = (*d as f32 * wa + *s as f32 * wb).clamp(0.0, 255.0) as u8;
        }
    }
}

/// Single-channel byte buffer, same layout conventions as `Frame`.
#[derive(Clone, Debug, PartialEq)]
pub struct GrayBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
}

impl GrayBuffer {
    pub fn zeros(width: u32, height: u32) -> Self {
        Self {
            data: vec![0; width as usize * height as usize],
            width,
            height,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    #[inline]
    pub fn get(&self, x: u32, y: u32) -> u8 {
        self.data[y as usize * self.width as usize + x as usize]
    }

    #[inline]
    pub fn set(&mut self, x: u32, y: u32, v: u8) {
        self.data[y as usize * self.width as usize + x as usize] = v;
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn ensure_size(&mut self, width: u32, height: u32) {
        if self.width != width || self.height != height {
            *self = Self::zeros(width, height);
        }
    }

    /// Number of nonzero pixels.
    pub fn count_nonzero(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }
}
