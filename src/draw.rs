//! CPU raster primitives
//!
//! Everything the effect processors need to put pixels on a `Frame`: HSV
//! conversion, lines (plain and anti-aliased), polygon scan fill, circles,
//! and a separable blur. No external imaging dependency; the matrices are
//! small enough that straightforward loops are plenty fast.

use crate::frame::{Frame, GrayBuffer};

/// Convert HSV (hue in degrees 0..360, s/v in 0..1) to a BGR triple.
pub fn hsv_to_bgr(h: f32, s: f32, v: f32) -> [u8; 3] {
    let h = h.rem_euclid(360.0);
    let s = s.clamp(0.0, 1.0);
    let v = v.clamp(0.0, 1.0);
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;
    let (r, g, b) = match (h / 60.0) as u32 {
        0 => (c, x, 0.0),
        1 => (x, c, 0.0),
        2 => (0.0, c, x),
        3 => (0.0, x, c),
        4 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };
    [
        ((b + m) * 255.0) as u8,
        ((g + m) * 255.0) as u8,
        ((r + m) * 255.0) as u8,
    ]
}

#[inline]
fn plot(frame: &mut Frame, x: i32, y: i32, color: [u8; 3], alpha: f32) {
    if x < 0 || y < 0 || x >= frame.width() as i32 || y >= frame.height() as i32 {
        return;
    }
    frame.blend_pixel(x as u32, y as u32, color, alpha);
}

/// Anti-aliased line (Xiaolin Wu), coverage blended over the background.
pub fn draw_line_aa(frame: &mut Frame, x0: f32, y0: f32, x1: f32, y1: f32, color: [u8; 3]) {
    let steep = (y1 - y0).abs() > (x1 - x0).abs();
    let (mut x0, mut y0, mut x1, mut y1) = if steep {
        (y0, x0, y1, x1)
    } else {
        (x0, y0, x1, y1)
    };
    if x0 > x1 {
        std::mem::swap(&mut x0, &mut x1);
        std::mem::swap(&mut y0, &mut y1);
    }
    let dx = x1 - x0;
    let gradient = if dx.abs() < f32::EPSILON {
        1.0
    } else {
        (y1 - y0) / dx
    };

    let mut put = |x: i32, y: i32, a: f32| {
        if steep {
            plot(frame, y, x, color, a);
        } else {
            plot(frame, x, y, color, a);
        }
    };

    // first endpoint
    let xend = x0.round();
    let yend = y0 + gradient * (xend - x0);
    let xgap = 1.0 - (x0 + 0.5).fract();
    let xpxl1 = xend as i32;
    let ypxl1 = yend.floor() as i32;
    put(xpxl1, ypxl1, (1.0 - yend.fract()) * xgap);
    put(xpxl1, ypxl1 + 1, yend.fract() * xgap);
    let mut intery = yend + gradient;

    // second endpoint
    let xend2 = x1.round();
    let yend2 = y1 + gradient * (xend2 - x1);
    let xgap2 = (x1 + 0.5).fract();
    let xpxl2 = xend2 as i32;
    let ypxl2 = yend2.floor() as i32;
    put(xpxl2, ypxl2, (1.0 - yend2.fract()) * xgap2);
    put(xpxl2, ypxl2 + 1, yend2.fract() * xgap2);

    for x in (xpxl1 + 1)..xpxl2 {
        put(x, intery.floor() as i32, 1.0 - intery.fract());
        put(x, intery.floor() as i32 + 1, intery.fract());
        intery += gradient;
    }
}

/// Plain line with integer thickness. Thickness 1 is Bresenham; wider lines
/// stamp a disc at each step.
pub fn draw_line(
    frame: &mut Frame,
    x0: i32,
    y0: i32,
    x1: i32,
    y1: i32,
    color: [u8; 3],
    thickness: u32,
) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;
    let (mut x, mut y) = (x0, y0);
    loop {
        if thickness <= 1 {
            plot(frame, x, y, color, 1.0);
        } else {
            fill_circle(frame, x as f32, y as f32, thickness as f32 * 0.5, color);
        }
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
}

/// Connected segments; `closed` joins the last point back to the first.
pub fn draw_polyline(
    frame: &mut Frame,
    points: &[(i32, i32)],
    closed: bool,
    color: [u8; 3],
    thickness: u32,
) {
    if points.len() < 2 {
        return;
    }
    for w in points.windows(2) {
        draw_line(frame, w[0].0, w[0].1, w[1].0, w[1].1, color, thickness);
    }
    if closed {
        let a = points[points.len() - 1];
        let b = points[0];
        draw_line(frame, a.0, a.1, b.0, b.1, color, thickness);
    }
}

/// Even-odd scanline polygon fill.
pub fn fill_polygon(frame: &mut Frame, points: &[(f32, f32)], color: [u8; 3]) {
    if points.len() < 3 {
        return;
    }
    let min_y = points
        .iter()
        .map(|p| p.1)
        .fold(f32::INFINITY, f32::min)
        .floor()
        .max(0.0) as i32;
    let max_y = points
        .iter()
        .map(|p| p.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(frame.height() as f32 - 1.0) as i32;

    let mut xs: Vec<f32> = Vec::with_capacity(points.len());
    for y in min_y..=max_y {
        let fy = y as f32 + 0.5;
        xs.clear();
        for i in 0..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            if (y0 <= fy && y1 > fy) || (y1 <= fy && y0 > fy) {
                xs.push(x0 + (fy - y0) / (y1 - y0) * (x1 - x0));
            }
        }
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for pair in xs.chunks_exact(2) {
            let start = pair[0].ceil().max(0.0) as i32;
            let end = (pair[1].floor() as i32).min(frame.width() as i32 - 1);
            for x in start..=end {
                plot(frame, x, y, color, 1.0);
            }
        }
    }
}

/// Same scan fill, but into a mask (255 inside).
pub fn fill_polygon_mask(mask: &mut GrayBuffer, points: &[(f32, f32)]) {
    if points.len() < 3 {
        return;
    }
    let min_y = points
        .iter()
        .map(|p| p.1)
        .fold(f32::INFINITY, f32::min)
        .floor()
        .max(0.0) as i32;
    let max_y = points
        .iter()
        .map(|p| p.1)
        .fold(f32::NEG_INFINITY, f32::max)
        .ceil()
        .min(mask.height() as f32 - 1.0) as i32;

    let mut xs: Vec<f32> = Vec::with_capacity(points.len());
    for y in min_y..=max_y {
        let fy = y as f32 + 0.5;
        xs.clear();
        for i in 0..points.len() {
            let (x0, y0) = points[i];
            let (x1, y1) = points[(i + 1) % points.len()];
            if (y0 <= fy && y1 > fy) || (y1 <= fy && y0 > fy) {
                xs.push(x0 + (fy - y0) / (y1 - y0) * (x1 - x0));
            }
        }
        xs.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        for pair in xs.chunks_exact(2) {
            let start = pair[0].ceil().max(0.0) as i32;
            let end = (pair[1].floor() as i32).min(mask.width() as i32 - 1);
            for x in start..=end {
                if x >= 0 {
                    mask.set(x as u32, y as u32, 255);
                }
            }
        }
    }
}

pub fn fill_circle(frame: &mut Frame, cx: f32, cy: f32, radius: f32, color: [u8; 3]) {
    let r = radius.max(0.5);
    let min_x = (cx - r).floor() as i32;
    let max_x = (cx + r).ceil() as i32;
    let min_y = (cy - r).floor() as i32;
    let max_y = (cy + r).ceil() as i32;
    let r2 = r * r;
    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            if dx * dx + dy * dy <= r2 {
                plot(frame, x, y, color, 1.0);
            }
        }
    }
}

/// Separable box blur, one pass per axis with edge clamping.
fn box_blur_channels(data: &mut [u8], width: usize, height: usize, channels: usize, radius: usize) {
    if radius == 0 || width == 0 || height == 0 {
        return;
    }
    let mut tmp = vec![0u8; data.len()];
    let norm = (2 * radius + 1) as f32;

    // horizontal
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for k in -(radius as i32)..=(radius as i32) {
                    let xi = (x as i32 + k).clamp(0, width as i32 - 1) as usize;
                    sum += data[(y * width + xi) * channels + c] as f32;
                }
                tmp[(y * width + x) * channels + c] = (sum / norm) as u8;
            }
        }
    }
    // vertical
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for k in -(radius as i32)..=(radius as i32) {
                    let yi = (y as i32 + k).clamp(0, height as i32 - 1) as usize;
                    sum += tmp[(yi * width + x) * channels + c] as f32;
                }
                data[(y * width + x) * channels + c] = (sum / norm) as u8;
            }
        }
    }
}

/// Gaussian-ish blur of a BGR frame; a box blur is close enough at the
/// small radii used here.
pub fn blur_frame(frame: &Frame, radius: usize) -> Frame {
    let mut out = frame.clone();
    let (w, h) = (frame.width() as usize, frame.height() as usize);
    box_blur_channels(out.data_mut(), w, h, 3, radius);
    out
}

pub fn blur_gray(mask: &GrayBuffer, radius: usize) -> GrayBuffer {
    let mut out = mask.clone();
    let (w, h) = (mask.width() as usize, mask.height() as usize);
    box_blur_channels(out.data_mut(), w, h, 1, radius);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hsv_primaries() {
        assert_eq!(hsv_to_bgr(0.0, 1.0, 1.0), [0, 0, 255]); // red
        assert_eq!(hsv_to_bgr(120.0, 1.0, 1.0), [0, 255, 0]); // green
        assert_eq!(hsv_to_bgr(240.0, 1.0, 1.0), [255, 0, 0]); // blue
        assert_eq!(hsv_to_bgr(0.0, 0.0, 1.0), [255, 255, 255]); // white
    }

    #[test]
    fn hsv_wraps_hue() {
        assert_eq!(hsv_to_bgr(360.0, 1.0, 1.0), hsv_to_bgr(0.0, 1.0, 1.0));
        assert_eq!(hsv_to_bgr(-120.0, 1.0, 1.0), hsv_to_bgr(240.0, 1.0, 1.0));
    }

    #[test]
    fn line_stays_in_bounds() {
        let mut f = Frame::zeros(8, 8);
        draw_line(&mut f, -5, -5, 20, 20, [255, 255, 255], 1);
        // diagonal pixels inside the frame are set
        assert_eq!(f.pixel(3, 3), [255, 255, 255]);
    }

    #[test]
    fn filled_polygon_covers_interior() {
        let mut f = Frame::zeros(20, 20);
        let square = [(4.0, 4.0), (15.0, 4.0), (15.0, 15.0), (4.0, 15.0)];
        fill_polygon(&mut f, &square, [0, 0, 255]);
        assert_eq!(f.pixel(10, 10), [0, 0, 255]);
        assert_eq!(f.pixel(1, 1), [0, 0, 0]);
        assert_eq!(f.pixel(18, 18), [0, 0, 0]);
    }

    #[test]
    fn degenerate_polygon_is_skipped() {
        let mut f = Frame::zeros(8, 8);
        fill_polygon(&mut f, &[(1.0, 1.0), (5.0, 5.0)], [255, 0, 0]);
        assert!(f.data().iter().all(|&b| b == 0));
    }

    #[test]
    fn blur_preserves_flat_regions() {
        let mut f = Frame::zeros(16, 16);
        f.fill([100, 100, 100]);
        let b = blur_frame(&f, 2);
        assert_eq!(b.pixel(8, 8), [100, 100, 100]);
    }
}
