//! Small curve and hit-testing helpers shared by the map overlays and the
//! diagrams.

use egui::{Color32, Pos2, Rect, Vec2, pos2};

pub fn sample_quadratic(p0: Pos2, c: Pos2, p1: Pos2, segments: usize) -> Vec<Pos2> {
    let n = segments.max(1);
    (0..=n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let u = 1.0 - t;
            pos2(
                u * u * p0.x + 2.0 * u * t * c.x + t * t * p1.x,
                u * u * p0.y + 2.0 * u * t * c.y + t * t * p1.y,
            )
        })
        .collect()
}

pub fn sample_cubic(p0: Pos2, c0: Pos2, c1: Pos2, p1: Pos2, segments: usize) -> Vec<Pos2> {
    let n = segments.max(1);
    (0..=n)
        .map(|i| {
            let t = i as f32 / n as f32;
            let u = 1.0 - t;
            let a = u * u * u;
            let b = 3.0 * u * u * t;
            let c = 3.0 * u * t * t;
            let d = t * t * t;
            pos2(
                a * p0.x + b * c0.x + c * c1.x + d * p1.x,
                a * p0.y + b * c0.y + c * c1.y + d * p1.y,
            )
        })
        .collect()
}

pub fn polyline_length(points: &[Pos2]) -> f32 {
    points.windows(2).map(|w| w[0].distance(w[1])).sum()
}

/// Leading part of a polyline covering `fraction` of its length; the
/// stroke-dash reveal of a line being drawn in.
pub fn polyline_prefix(points: &[Pos2], fraction: f32) -> Vec<Pos2> {
    let fraction = fraction.clamp(0.0, 1.0);
    if points.len() < 2 || fraction >= 1.0 {
        return points.to_vec();
    }
    let target = polyline_length(points) * fraction;
    let mut out = vec![points[0]];
    let mut walked = 0.0;
    for w in points.windows(2) {
        let seg = w[0].distance(w[1]);
        if walked + seg >= target {
            let t = if seg > 0.0 { (target - walked) / seg } else { 0.0 };
            out.push(w[0] + (w[1] - w[0]) * t);
            return out;
        }
        walked += seg;
        out.push(w[1]);
    }
    out
}

pub fn point_segment_distance(p: Pos2, a: Pos2, b: Pos2) -> f32 {
    let ab = b - a;
    let len2 = ab.length_sq();
    if len2 <= f32::EPSILON {
        return p.distance(a);
    }
    let t = ((p - a).dot(ab) / len2).clamp(0.0, 1.0);
    p.distance(a + ab * t)
}

pub fn distance_to_polyline(p: Pos2, points: &[Pos2]) -> f32 {
    points
        .windows(2)
        .map(|w| point_segment_distance(p, w[0], w[1]))
        .fold(f32::INFINITY, f32::min)
}

/// Even-odd point in polygon test.
pub fn point_in_polygon(p: Pos2, polygon: &[Pos2]) -> bool {
    let mut inside = false;
    let n = polygon.len();
    if n < 3 {
        return false;
    }
    let mut j = n - 1;
    for i in 0..n {
        let (a, b) = (polygon[i], polygon[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

pub fn bounding_rect(points: impl IntoIterator<Item = Pos2>) -> Option<Rect> {
    let mut it = points.into_iter();
    let first = it.next()?;
    Some(it.fold(Rect::from_min_max(first, first), |r, p| r.union(Rect::from_min_max(p, p))))
}

/// Point at `angle` (radians, clockwise from 12 o'clock) on a circle.
pub fn polar(center: Pos2, radius: f32, angle: f32) -> Pos2 {
    center + Vec2::new(radius * angle.sin(), -radius * angle.cos())
}

pub fn lerp_color(a: Color32, b: Color32, t: f32) -> Color32 {
    let t = t.clamp(0.0, 1.0);
    let mix = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * t).round() as u8;
    Color32::from_rgba_unmultiplied(mix(a.r(), b.r()), mix(a.g(), b.g()), mix(a.b(), b.b()), mix(a.a(), b.a()))
}

/// Deterministic 32-bit FNV-1a hash, stable across runs and platforms.
pub fn fnv1a(s: &str) -> u32 {
    let mut h: u32 = 0x811c_9dc5;
    for b in s.bytes() {
        h ^= b as u32;
        h = h.wrapping_mul(0x0100_0193);
    }
    h
}
