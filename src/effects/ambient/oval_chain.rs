//! Interlocking oval-chain animator
//!
//! One rigid chain of stadium-shaped metal links per cycle. Links alternate
//! 0/90 degree rotations so odd-indexed links thread through the holes of
//! their even-indexed neighbors; spacing is tight enough that every odd
//! link's center stays inside the adjacent even link's hole ellipse for the
//! whole traversal. The chain enters from a random edge, crosses the canvas
//! with a shared lateral sway and per-link rotation wobble, and rebuilds
//! with a fresh direction when it has fully exited.
//!
//! Render order is what sells the interlock: back half of each even link,
//! then every odd link in full, then the front half of each even link.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::draw;
use crate::frame::Frame;

/// Link length tip to tip, px.
pub const LINK_OUTER_WIDTH: f32 = 38.0;
/// Link width, px.
pub const LINK_OUTER_HEIGHT: f32 = 14.0;
/// Hole size relative to the outer dimensions.
pub const HOLE_RATIO: f32 = 0.5;
/// Wire thickness, px.
const RING_THICKNESS: f32 = 5.0;
/// Seconds for a full traversal.
const TRAVERSE_TIME: f32 = 7.0;
const OSCILLATION_AMPLITUDE: f32 = 10.0;
const MAX_LINKS: usize = 25;
const BASE_BRIGHTNESS: f32 = 0.85;
const THREADING_BRIGHTNESS_BOOST: f32 = 0.4;
/// Center spacing between adjacent links. Must stay inside the neighbor's
/// hole semi-axis (LINK_OUTER_WIDTH * HOLE_RATIO / 2) with wobble margin.
pub const LINK_SPACING: f32 = LINK_OUTER_WIDTH * 0.22;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
enum ChainDirection {
    FromLeft = 0,
    FromRight = 1,
    FromTop = 2,
    FromBottom = 3,
}

impl ChainDirection {
    fn from_index(v: u8) -> Self {
        match v % 4 {
            0 => Self::FromLeft,
            1 => Self::FromRight,
            2 => Self::FromTop,
            _ => Self::FromBottom,
        }
    }

    fn is_horizontal(self) -> bool {
        matches!(self, Self::FromLeft | Self::FromRight)
    }

    fn sign(self) -> f32 {
        match self {
            Self::FromLeft | Self::FromTop => 1.0,
            Self::FromRight | Self::FromBottom => -1.0,
        }
    }
}

#[derive(Clone, Debug)]
pub struct OvalLink {
    pub position: (f32, f32),
    pub rotation: f32,
    pub brightness: f32,
    pub age: f32,
    pub is_threading: bool,
    pub threading_depth: f32,
}

impl OvalLink {
    /// Whether a point lies inside this link's hole ellipse.
    pub fn is_point_in_hole(&self, point: (f32, f32)) -> bool {
        self.hole_penetration(point) > 0.0
    }

    /// Normalized penetration depth: 0 at (or outside) the hole edge,
    /// approaching 1 at the hole center.
    pub fn hole_penetration(&self, point: (f32, f32)) -> f32 {
        let dx = point.0 - self.position.0;
        let dy = point.1 - self.position.1;
        let (sin_r, cos_r) = (-self.rotation).sin_cos();
        let local_x = dx * cos_r - dy * sin_r;
        let local_y = dx * sin_r + dy * cos_r;
        let semi_x = LINK_OUTER_WIDTH * HOLE_RATIO * 0.5;
        let semi_y = LINK_OUTER_HEIGHT * HOLE_RATIO * 0.5;
        let d = ((local_x / semi_x).powi(2) + (local_y / semi_y).powi(2)).sqrt();
        (1.0 - d).max(0.0)
    }
}

pub struct OvalChain {
    links: Vec<OvalLink>,
    time: f32,
    cycle_start: f32,
    direction: ChainDirection,
    built_for: (u32, u32),
    rng: SmallRng,
}

impl OvalChain {
    pub fn new() -> Self {
        Self::with_rng(SmallRng::from_os_rng())
    }

    pub fn with_rng(rng: SmallRng) -> Self {
        Self {
            links: Vec::new(),
            time: 0.0,
            cycle_start: 0.0,
            direction: ChainDirection::FromLeft,
            built_for: (0, 0),
            rng,
        }
    }

    pub fn links(&self) -> &[OvalLink] {
        &self.links
    }

    fn start_new_chain(&mut self, width: u32, height: u32) {
        self.direction = ChainDirection::from_index(self.rng.random_range(0..4u8));
        self.links.clear();
        self.built_for = (width, height);
        self.cycle_start = self.time;

        let span = if self.direction.is_horizontal() {
            width as f32
        } else {
            height as f32
        };
        let total = span + LINK_OUTER_WIDTH * 4.0;
        let count = ((total / LINK_SPACING) as usize + 2).min(MAX_LINKS);

        for i in 0..count {
            let rotation = if self.direction.is_horizontal() == (i % 2 == 0) {
                0.0
            } else {
                std::f32::consts::FRAC_PI_2
            };
            self.links.push(OvalLink {
                position: (0.0, 0.0), // set by the first update
                rotation,
                brightness: BASE_BRIGHTNESS,
                age: 0.0,
                is_threading: i > 0,
                threading_depth: 0.5,
            });
        }
    }

    fn update(&mut self, dt: f32, width: u32, height: u32) {
        if self.built_for != (width, height) {
            self.start_new_chain(width, height);
        }
        let progress = (self.time - self.cycle_start) / TRAVERSE_TIME;
        if progress >= 1.0 {
            self.start_new_chain(width, height);
        }
        let progress = (self.time - self.cycle_start) / TRAVERSE_TIME;

        let horizontal = self.direction.is_horizontal();
        let span = if horizontal {
            width as f32
        } else {
            height as f32
        };
        let chain_length = self.links.len() as f32 * LINK_SPACING;
        let margin = LINK_OUTER_WIDTH * 2.0;
        let total_travel = margin + span + chain_length + margin;
        let head_offset = progress * total_travel - margin;
        let sign = self.direction.sign();

        // one sway shared by the whole chain keeps the interlock rigid
        let sway = OSCILLATION_AMPLITUDE * (self.time * 2.5).sin();

        for (i, link) in self.links.iter_mut().enumerate() {
            link.age += dt;
            let along = head_offset - i as f32 * LINK_SPACING;
            if horizontal {
                let origin = if self.direction == ChainDirection::FromLeft {
                    0.0
                } else {
                    width as f32
                };
                link.position = (origin + along * sign, height as f32 / 2.0 + sway);
                link.rotation = if i % 2 == 0 {
                    0.0
                } else {
                    std::f32::consts::FRAC_PI_2
                };
            } else {
                let origin = if self.direction == ChainDirection::FromTop {
                    0.0
                } else {
                    height as f32
                };
                link.position = (width as f32 / 2.0 + sway, origin + along * sign);
                link.rotation = if i % 2 == 0 {
                    std::f32::consts::FRAC_PI_2
                } else {
                    0.0
                };
            }
            link.rotation += (self.time * 3.0 + i as f32 * 0.5).sin() * 0.025;
        }

        // threading state: odd links ride inside their even predecessor's hole
        for i in (1..self.links.len()).step_by(2) {
            let depth = self.links[i - 1].hole_penetration(self.links[i].position);
            let link = &mut self.links[i];
            link.threading_depth = depth;
            link.is_threading = depth > 0.0;
            link.brightness = BASE_BRIGHTNESS + THREADING_BRIGHTNESS_BOOST * depth * 0.25;
        }
    }

    /// Advance one frame and render into `out` at the requested size.
    pub fn process(&mut self, out: &mut Frame, target_width: u32, target_height: u32) {
        if target_width == 0 || target_height == 0 {
            log::warn!("oval chain: degenerate target {target_width}x{target_height}");
            out.ensure_size(64, 64);
            out.clear();
            return;
        }
        let dt = 1.0 / 30.0;
        self.time += dt;

        self.update(dt, target_width, target_height);

        out.ensure_size(target_width, target_height);
        out.clear();
        self.render(out);
    }

    fn on_canvas(link: &OvalLink, w: f32, h: f32) -> bool {
        let max_dim = LINK_OUTER_WIDTH.max(LINK_OUTER_HEIGHT);
        link.position.0 >= -max_dim * 2.0
            && link.position.0 <= w + max_dim * 2.0
            && link.position.1 >= -max_dim * 2.0
            && link.position.1 <= h + max_dim * 2.0
    }

    fn render(&self, out: &mut Frame) {
        let (w, h) = (out.width() as f32, out.height() as f32);
        for (i, link) in self.links.iter().enumerate() {
            if i % 2 == 0 && Self::on_canvas(link, w, h) {
                draw_link_half(out, link, false);
            }
        }
        for (i, link) in self.links.iter().enumerate() {
            if i % 2 == 1 && Self::on_canvas(link, w, h) {
                draw_full_link(out, link);
            }
        }
        for (i, link) in self.links.iter().enumerate() {
            if i % 2 == 0 && Self::on_canvas(link, w, h) {
                draw_link_half(out, link, true);
            }
        }
    }
}

impl Default for OvalChain {
    fn default() -> Self {
        Self::new()
    }
}

const SEGMENTS: usize = 12;
const HOLE_COLOR: [u8; 3] = [5, 5, 8];

struct LinkPalette {
    base_metal: [u8; 3],
    highlight: [u8; 3],
    shadow: [u8; 3],
    dark_edge: [u8; 3],
}

fn palette(brightness: f32) -> LinkPalette {
    let base = brightness * 180.0;
    let clamp = |v: f32| v.min(255.0) as u8;
    LinkPalette {
        base_metal: [clamp(base * 0.75), clamp(base * 0.80), clamp(base * 0.85)],
        highlight: [
            clamp(brightness * 250.0 * 0.88),
            clamp(brightness * 250.0 * 0.93),
            clamp(brightness * 250.0),
        ],
        shadow: [clamp(base * 0.35), clamp(base * 0.38), clamp(base * 0.42)],
        dark_edge: [clamp(base * 0.25), clamp(base * 0.28), clamp(base * 0.30)],
    }
}

struct LinkGeometry {
    center: (f32, f32),
    cos_a: f32,
    sin_a: f32,
    half_length: f32,
    half_width: f32,
    end_radius: f32,
    inner_half_length: f32,
    inner_end_radius: f32,
    wire: f32,
}

impl LinkGeometry {
    fn of(link: &OvalLink) -> Self {
        let wire = RING_THICKNESS;
        let inner_length = LINK_OUTER_WIDTH - wire * 2.2;
        let inner_width = (LINK_OUTER_HEIGHT - wire * 2.2).max(2.0);
        let (sin_a, cos_a) = link.rotation.sin_cos();
        Self {
            center: link.position,
            cos_a,
            sin_a,
            half_length: LINK_OUTER_WIDTH / 2.0,
            half_width: LINK_OUTER_HEIGHT / 2.0,
            end_radius: LINK_OUTER_HEIGHT / 2.0,
            inner_half_length: inner_length / 2.0,
            inner_end_radius: inner_width / 2.0,
            wire,
        }
    }

    fn rotate(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.cos_a - y * self.sin_a + self.center.0,
            x * self.sin_a + y * self.cos_a + self.center.1,
        )
    }

    /// Semicircular arc of the stadium outline around one end.
    /// `left` selects the end; `inner` selects the hole radius.
    fn end_arc(&self, left: bool, inner: bool, reversed: bool) -> Vec<(f32, f32)> {
        let (cx, radius) = if inner {
            (self.inner_half_length - self.inner_end_radius, self.inner_end_radius)
        } else {
            (self.half_length - self.end_radius, self.end_radius)
        };
        let base = if left {
            std::f32::consts::FRAC_PI_2
        } else {
            -std::f32::consts::FRAC_PI_2
        };
        let sign = if left { -1.0 } else { 1.0 };
        let mut pts: Vec<(f32, f32)> = (0..=SEGMENTS)
            .map(|i| {
                let theta = base + std::f32::consts::PI * i as f32 / SEGMENTS as f32;
                self.rotate(sign * cx + radius * theta.cos(), radius * theta.sin())
            })
            .collect();
        if reversed {
            pts.reverse();
        }
        pts
    }

    /// Full stadium outline (both end arcs).
    fn stadium(&self, inner: bool) -> Vec<(f32, f32)> {
        let mut pts = self.end_arc(false, inner, false);
        pts.extend(self.end_arc(true, inner, false));
        pts
    }
}

fn to_i32(pts: &[(f32, f32)]) -> Vec<(i32, i32)> {
    pts.iter().map(|&(x, y)| (x as i32, y as i32)).collect()
}

/// Whole link: body, shading strips, hole, edges.
fn draw_full_link(out: &mut Frame, link: &OvalLink) {
    let geo = LinkGeometry::of(link);
    let pal = palette(link.brightness);

    let outer = geo.stadium(false);
    draw::fill_polygon(out, &outer, pal.base_metal);

    // top highlight strip
    let y_high = -geo.half_width * 0.4;
    let mut strip: Vec<(f32, f32)> = (0..=SEGMENTS)
        .map(|i| {
            let theta = -std::f32::consts::FRAC_PI_2
                + std::f32::consts::PI * i as f32 / SEGMENTS as f32;
            let x = (geo.half_length - geo.end_radius)
                + (geo.end_radius - geo.wire * 0.3) * theta.cos();
            let y = (y_high - geo.half_width * 0.15)
                .max(-geo.half_width + geo.wire * 0.3);
            (x, y + geo.half_width * 0.12 * (1.0 + theta.sin()))
        })
        .map(|(x, y)| geo.rotate(x, y))
        .collect();
    let back: Vec<(f32, f32)> = (0..=SEGMENTS)
        .rev()
        .map(|i| {
            let theta = -std::f32::consts::FRAC_PI_2
                + std::f32::consts::PI * i as f32 / SEGMENTS as f32;
            let x = (geo.half_length - geo.end_radius)
                + (geo.end_radius - geo.wire * 0.6) * theta.cos();
            geo.rotate(x, y_high - geo.half_width * 0.15)
        })
        .collect();
    strip.extend(back);
    draw::fill_polygon(out, &strip, pal.highlight);

    // bottom shadow strip
    let mut shade: Vec<(f32, f32)> = (0..=SEGMENTS)
        .map(|i| {
            let theta = std::f32::consts::FRAC_PI_2
                - std::f32::consts::PI * i as f32 / SEGMENTS as f32;
            let x = (geo.half_length - geo.end_radius)
                + (geo.end_radius - geo.wire * 0.2) * theta.cos();
            let y = geo.half_width * 0.3 + geo.half_width * 0.2 * (1.0 - theta.cos());
            geo.rotate(x, y)
        })
        .collect();
    let shade_back: Vec<(f32, f32)> = (0..=SEGMENTS)
        .rev()
        .map(|i| {
            let theta = std::f32::consts::FRAC_PI_2
                - std::f32::consts::PI * i as f32 / SEGMENTS as f32;
            let x = (geo.half_length - geo.end_radius)
                + (geo.end_radius - geo.wire * 0.5) * theta.cos();
            geo.rotate(x, geo.half_width * 0.5)
        })
        .collect();
    shade.extend(shade_back);
    draw::fill_polygon(out, &shade, pal.shadow);

    let hole = geo.stadium(true);
    draw::fill_polygon(out, &hole, HOLE_COLOR);
    draw::draw_polyline(out, &to_i32(&hole), true, pal.dark_edge, 1);
    draw::draw_polyline(out, &to_i32(&outer), true, pal.dark_edge, 1);
}

/// Back half (far end, side bars, hole) or front half (near end ring only).
fn draw_link_half(out: &mut Frame, link: &OvalLink, front: bool) {
    let geo = LinkGeometry::of(link);
    let pal = palette(link.brightness);
    let bar_x = geo.half_length - geo.end_radius;

    if front {
        // near-end ring: outer arc out, inner arc back
        let mut ring = geo.end_arc(false, false, false);
        ring.extend(geo.end_arc(false, true, true));
        draw::fill_polygon(out, &ring, pal.base_metal);
        draw::draw_polyline(out, &to_i32(&ring), true, pal.dark_edge, 1);
        // specular dots along the curve
        for i in 3..=(SEGMENTS - 3) {
            let theta = -std::f32::consts::FRAC_PI_2
                + std::f32::consts::PI * i as f32 / SEGMENTS as f32;
            let r = geo.end_radius - geo.wire * 0.35;
            let (px, py) = geo.rotate(bar_x + r * theta.cos(), r * theta.sin() - geo.wire * 0.15);
            draw::fill_circle(out, px, py, 1.0, pal.highlight);
        }
        return;
    }

    // side bars
    for side in [-1.0f32, 1.0] {
        let outer_y = geo.half_width * side;
        let inner_y = geo.inner_end_radius * side;
        let bar = [
            geo.rotate(-bar_x, outer_y),
            geo.rotate(bar_x, outer_y),
            geo.rotate(bar_x, inner_y),
            geo.rotate(-bar_x, inner_y),
        ];
        draw::fill_polygon(out, &bar, pal.base_metal);
    }

    // far-end ring
    let mut back_end = geo.end_arc(true, false, false);
    back_end.extend(geo.end_arc(true, true, true));
    draw::fill_polygon(out, &back_end, pal.base_metal);

    // hole
    let hole = geo.stadium(true);
    draw::fill_polygon(out, &hole, HOLE_COLOR);

    // edges and a highlight along the top bar
    let (x0, y0) = geo.rotate(-bar_x, -geo.half_width);
    let (x1, y1) = geo.rotate(bar_x, -geo.half_width);
    draw::draw_line(out, x0 as i32, y0 as i32, x1 as i32, y1 as i32, pal.dark_edge, 1);
    let (x0, y0) = geo.rotate(-bar_x, geo.half_width);
    let (x1, y1) = geo.rotate(bar_x, geo.half_width);
    draw::draw_line(out, x0 as i32, y0 as i32, x1 as i32, y1 as i32, pal.dark_edge, 1);
    draw::draw_polyline(out, &to_i32(&back_end), true, pal.dark_edge, 1);
    draw::draw_polyline(out, &to_i32(&hole), true, pal.dark_edge, 1);
    let (x0, y0) = geo.rotate(-bar_x, -geo.half_width + geo.wire * 0.25);
    let (x1, y1) = geo.rotate(bar_x, -geo.half_width + geo.wire * 0.25);
    draw::draw_line(out, x0 as i32, y0 as i32, x1 as i32, y1 as i32, pal.highlight, 1);
}
