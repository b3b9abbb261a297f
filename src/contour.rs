//! Contour extraction
//!
//! Connected-component labeling over a foreground mask, Moore-neighbor
//! boundary tracing for the outline of each component, and Douglas-Peucker
//! polygon simplification. Components smaller than the caller's area floor
//! are dropped before tracing.

use crate::draw;
use crate::frame::{Frame, GrayBuffer};

/// One external contour: its traced boundary and the pixel area of the
/// component it bounds.
#[derive(Clone, Debug)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
    pub area: f64,
}

impl Contour {
    pub fn as_f32(&self) -> Vec<(f32, f32)> {
        self.points.iter().map(|&(x, y)| (x as f32, y as f32)).collect()
    }
}

/// Extract external contours of all components with pixel area > `min_area`.
pub fn find_contours(mask: &GrayBuffer, min_area: f64) -> Vec<Contour> {
    let (w, h) = (mask.width() as i32, mask.height() as i32);
    if w == 0 || h == 0 {
        return Vec::new();
    }
    let mut labels = vec![0u32; (w * h) as usize];
    let mut contours = Vec::new();
    let mut next_label = 1u32;
    let mut stack = Vec::new();

    for y in 0..h {
        for x in 0..w {
            let i = (y * w + x) as usize;
            if mask.data()[i] == 0 || labels[i] != 0 {
                continue;
            }
            // flood fill one component (8-connected)
            let label = next_label;
            next_label += 1;
            let mut area = 0u64;
            let mut start = (x, y); // topmost-leftmost in scan order
            labels[i] = label;
            stack.push((x, y));
            while let Some((px, py)) = stack.pop() {
                area += 1;
                if (py, px) < (start.1, start.0) {
                    start = (px, py);
                }
                for dy in -1..=1 {
                    for dx in -1..=1 {
                        let (nx, ny) = (px + dx, py + dy);
                        if nx < 0 || ny < 0 || nx >= w || ny >= h {
                            continue;
                        }
                        let ni = (ny * w + nx) as usize;
                        if mask.data()[ni] != 0 && labels[ni] == 0 {
                            labels[ni] = label;
                            stack.push((nx, ny));
                        }
                    }
                }
            }
            if (area as f64) > min_area {
                contours.push(Contour {
                    points: trace_boundary(&labels, w, h, label, start),
                    area: area as f64,
                });
            }
        }
    }
    contours
}

/// Moore-neighbor boundary trace starting from the component's
/// topmost-leftmost pixel.
fn trace_boundary(labels: &[u32], w: i32, h: i32, label: u32, start: (i32, i32)) -> Vec<(i32, i32)> {
    // clockwise, starting west
    const DIRS: [(i32, i32); 8] = [
        (-1, 0),
        (-1, -1),
        (0, -1),
        (1, -1),
        (1, 0),
        (1, 1),
        (0, 1),
        (-1, 1),
    ];
    let on = |x: i32, y: i32| -> bool {
        x >= 0 && y >= 0 && x < w && y < h && labels[(y * w + x) as usize] == label
    };

    let mut points = vec![start];
    let mut current = start;
    // the scan reached `start` from the west, so begin searching there
    let mut backtrack_dir = 0usize;
    let max_steps = (w * h * 4) as usize;

    for _ in 0..max_steps {
        let mut found = None;
        for k in 0..8 {
            let dir = (backtrack_dir + k) % 8;
            let (dx, dy) = DIRS[dir];
            if on(current.0 + dx, current.1 + dy) {
                found = Some(dir);
                break;
            }
        }
        let Some(dir) = found else {
            // isolated pixel
            break;
        };
        let next = (current.0 + DIRS[dir].0, current.1 + DIRS[dir].1);
        // resume the sweep from the neighbor opposite the move direction,
        // rotated one step clockwise
        backtrack_dir = (dir + 5) % 8;
        current = next;
        if current == start && points.len() > 1 {
            break;
        }
        points.push(current);
    }
    points
}

/// Douglas-Peucker simplification with the given distance tolerance.
pub fn approx_poly_dp(points: &[(i32, i32)], epsilon: f64) -> Vec<(i32, i32)> {
    if points.len() <= 2 {
        return points.to_vec();
    }
    let mut keep = vec![false; points.len()];
    keep[0] = true;
    keep[points.len() - 1] = true;
    let mut ranges = vec![(0usize, points.len() - 1)];
    while let Some((lo, hi)) = ranges.pop() {
        if hi <= lo + 1 {
            continue;
        }
        let (a, b) = (points[lo], points[hi]);
        let mut max_d = 0.0;
        let mut max_i = lo;
        for (i, &p) in points.iter().enumerate().take(hi).skip(lo + 1) {
            let d = point_segment_distance(p, a, b);
            if d > max_d {
                max_d = d;
                max_i = i;
            }
        }
        if max_d > epsilon {
            keep[max_i] = true;
            ranges.push((lo, max_i));
            ranges.push((max_i, hi));
        }
    }
    points
        .iter()
        .zip(keep.iter())
        .filter_map(|(&p, &k)| k.then_some(p))
        .collect()
}

fn point_segment_distance(p: (i32, i32), a: (i32, i32), b: (i32, i32)) -> f64 {
    let (px, py) = (p.0 as f64, p.1 as f64);
    let (ax, ay) = (a.0 as f64, a.1 as f64);
    let (bx, by) = (b.0 as f64, b.1 as f64);
    let (dx, dy) = (bx - ax, by - ay);
    let len2 = dx * dx + dy * dy;
    if len2 == 0.0 {
        return ((px - ax).powi(2) + (py - ay).powi(2)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len2).clamp(0.0, 1.0);
    let (cx, cy) = (ax + t * dx, ay + t * dy);
    ((px - cx).powi(2) + (py - cy).powi(2)).sqrt()
}

/// Fill the interior of a contour into a frame.
pub fn fill_contour(frame: &mut Frame, contour: &Contour, color: [u8; 3]) {
    draw::fill_polygon(frame, &contour.as_f32(), color);
}

/// Fill the interior of a contour into a mask.
pub fn fill_contour_mask(mask: &mut GrayBuffer, contour: &Contour) {
    draw::fill_polygon_mask(mask, &contour.as_f32());
}

/// Stroke the contour boundary.
pub fn draw_contour(frame: &mut Frame, contour: &Contour, color: [u8; 3], thickness: u32) {
    draw::draw_polyline(frame, &contour.points, true, color, thickness);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_mask(w: u32, h: u32, x0: u32, y0: u32, side: u32) -> GrayBuffer {
        let mut m = GrayBuffer::zeros(w, h);
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                m.set(x, y, 255);
            }
        }
        m
    }

    #[test]
    fn finds_single_square() {
        let m = square_mask(64, 64, 10, 10, 20);
        let contours = find_contours(&m, 100.0);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area, 400.0);
        // boundary stays on the square's perimeter
        for &(x, y) in &contours[0].points {
            assert!((10..30).contains(&x));
            assert!((10..30).contains(&y));
            assert!(x == 10 || x == 29 || y == 10 || y == 29);
        }
    }

    #[test]
    fn area_floor_drops_small_blobs() {
        let mut m = square_mask(64, 64, 4, 4, 30);
        // a 3x3 speck well below the floor
        for y in 50..53 {
            for x in 50..53 {
                m.set(x, y, 255);
            }
        }
        let contours = find_contours(&m, 500.0);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].area, 900.0);
    }

    #[test]
    fn separate_blobs_get_separate_contours() {
        let mut m = square_mask(64, 64, 2, 2, 10);
        for y in 40..55 {
            for x in 40..55 {
                m.set(x, y, 255);
            }
        }
        let contours = find_contours(&m, 50.0);
        assert_eq!(contours.len(), 2);
    }

    #[test]
    fn single_pixel_component_survives_tracing() {
        let mut m = GrayBuffer::zeros(8, 8);
        m.set(4, 4, 255);
        let contours = find_contours(&m, 0.5);
        assert_eq!(contours.len(), 1);
        assert_eq!(contours[0].points, vec![(4, 4)]);
    }

    #[test]
    fn dp_reduces_square_to_corners() {
        let m = square_mask(64, 64, 10, 10, 30);
        let contours = find_contours(&m, 100.0);
        let approx = approx_poly_dp(&contours[0].points, 3.0);
        // a clean square simplifies to a handful of vertices
        assert!(approx.len() <= 6);
        assert!(approx.len() >= 3);
    }

    #[test]
    fn dp_keeps_endpoints() {
        let pts = vec![(0, 0), (5, 1), (10, 0)];
        let approx = approx_poly_dp(&pts, 10.0);
        assert_eq!(approx.first(), Some(&(0, 0)));
        assert_eq!(approx.last(), Some(&(10, 0)));
    }
}
