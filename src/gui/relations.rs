//! Curved connector lines between languages on the map, with draw-in and
//! fade-out animation. Times are egui input times in seconds.

use std::f32::consts::TAU;

use egui::{Color32, Painter, Pos2, Shape, Stroke, Vec2};

use super::geometry::{distance_to_polyline, fnv1a, polyline_prefix, sample_cubic, sample_quadratic};

pub const DRAW_IN_SECS: f64 = 1.0;
pub const FADE_OUT_SECS: f64 = 0.5;

const CURVE_SEGMENTS: usize = 32;
const LOOP_RADIUS: f32 = 18.0;
const LOOP_SPREAD: f32 = 0.6;
const HIT_TOLERANCE: f32 = 5.0;

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub width: f32,
    pub color: Color32,
    pub opacity: f32,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self { width: 1.5, color: Color32::WHITE, opacity: 1.0 }
    }
}

#[derive(Clone, Debug)]
pub struct RelationLine {
    pub from: String,
    pub to: String,
    pub style: LineStyle,
    // Language pair to open when the line is clicked
    pub click: Option<(String, String)>,
    // Route of the selection that drew the line
    pub owner: String,
    born: f64,
    fading_since: Option<f64>,
}

impl RelationLine {
    pub fn is_self_loop(&self) -> bool {
        self.from == self.to
    }

    pub fn is_fading(&self) -> bool {
        self.fading_since.is_some()
    }

    /// Share of the curve revealed at `now`, 0 to 1.
    pub fn reveal(&self, now: f64) -> f32 {
        ((now - self.born) / DRAW_IN_SECS).clamp(0.0, 1.0) as f32
    }

    /// Current stroke width; shrinks to zero while fading out.
    pub fn stroke_width(&self, now: f64) -> f32 {
        match self.fading_since {
            None => self.style.width,
            Some(t) => {
                let left = 1.0 - ((now - t) / FADE_OUT_SECS).clamp(0.0, 1.0);
                self.style.width * left as f32
            }
        }
    }

    fn is_gone(&self, now: f64) -> bool {
        self.fading_since.is_some_and(|t| now - t >= FADE_OUT_SECS)
    }
}

/// Curve for one line in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LineGeometry {
    Arc { from: Pos2, control: Pos2, to: Pos2 },
    Loop { at: Pos2, c0: Pos2, c1: Pos2 },
}

impl LineGeometry {
    pub fn between(from: Pos2, to: Pos2, iso: &str) -> Self {
        if from.distance(to) < 0.5 {
            let (c0, c1) = self_loop_controls(from, iso);
            return LineGeometry::Loop { at: from, c0, c1 };
        }
        let mid = from + (to - from) * 0.5;
        let dir = to - from;
        let normal = Vec2::new(-dir.y, dir.x).normalized();
        // bend always to the same side of the travel direction
        let control = mid + normal * (dir.length() * 0.2);
        LineGeometry::Arc { from, control, to }
    }

    pub fn sample(&self) -> Vec<Pos2> {
        match *self {
            LineGeometry::Arc { from, control, to } => sample_quadratic(from, control, to, CURVE_SEGMENTS),
            LineGeometry::Loop { at, c0, c1 } => sample_cubic(at, c0, c1, at, CURVE_SEGMENTS),
        }
    }
}

/// Direction of a self-loop for `iso`, derived from a hash of the code so
/// the same language always loops the same way.
pub fn loop_angle(iso: &str) -> f32 {
    (fnv1a(iso) as f64 / u32::MAX as f64) as f32 * TAU
}

fn self_loop_controls(at: Pos2, iso: &str) -> (Pos2, Pos2) {
    let angle = loop_angle(iso);
    let r = LOOP_RADIUS * 1.6;
    let c0 = at + Vec2::angled(angle - LOOP_SPREAD) * r;
    let c1 = at + Vec2::angled(angle + LOOP_SPREAD) * r;
    (c0, c1)
}

/// Splits a language chain into the consecutive pairs that become lines.
pub fn path_segments(isocodes: &[String]) -> Vec<(String, String)> {
    isocodes.windows(2).map(|w| (w[0].clone(), w[1].clone())).collect()
}

#[derive(Default)]
pub struct RelationRenderer {
    lines: Vec<RelationLine>,
}

impl RelationRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one line per consecutive pair of `isocodes`.
    pub fn add_path(
        &mut self,
        isocodes: &[String],
        style: LineStyle,
        click: Option<(String, String)>,
        owner: &str,
        now: f64,
    ) {
        for (from, to) in path_segments(isocodes) {
            self.lines.push(RelationLine {
                from,
                to,
                style: style.clone(),
                click: click.clone(),
                owner: owner.to_string(),
                born: now,
                fading_since: None,
            });
        }
    }

    /// Starts fading out every line currently shown.
    pub fn clear(&mut self, now: f64) {
        for l in self.lines.iter_mut().filter(|l| l.fading_since.is_none()) {
            l.fading_since = Some(now);
        }
    }

    /// Drops lines whose fade-out has finished.
    pub fn prune(&mut self, now: f64) {
        self.lines.retain(|l| !l.is_gone(now));
    }

    pub fn lines(&self) -> &[RelationLine] {
        &self.lines
    }

    pub fn active_lines(&self) -> impl Iterator<Item = &RelationLine> {
        self.lines.iter().filter(|l| !l.is_fading())
    }

    /// Lines with a non-zero stroke at `now`.
    pub fn visible_lines(&self, now: f64) -> impl Iterator<Item = &RelationLine> {
        self.lines.iter().filter(move |l| l.stroke_width(now) > 0.0 && l.reveal(now) > 0.0)
    }

    /// True while some line is still drawing in or fading out.
    pub fn is_animating(&self, now: f64) -> bool {
        self.lines.iter().any(|l| l.is_fading() || l.reveal(now) < 1.0)
    }

    pub fn paint(&self, painter: &Painter, now: f64, project: impl Fn(&str) -> Option<Pos2>) {
        for line in self.visible_lines(now) {
            let (Some(a), Some(b)) = (project(&line.from), project(&line.to)) else { continue };
            let pts = LineGeometry::between(a, b, &line.from).sample();
            let shown = polyline_prefix(&pts, line.reveal(now));
            let color = line.style.color.gamma_multiply(line.style.opacity);
            painter.add(Shape::line(shown, Stroke::new(line.stroke_width(now), color)));
        }
    }

    /// Pair attached to the clickable line under `pos`, if any.
    pub fn hit_test(&self, pos: Pos2, project: impl Fn(&str) -> Option<Pos2>) -> Option<(String, String)> {
        self.active_lines()
            .filter(|l| l.click.is_some())
            .filter_map(|l| {
                let (a, b) = (project(&l.from)?, project(&l.to)?);
                let d = distance_to_polyline(pos, &LineGeometry::between(a, b, &l.from).sample());
                (d <= HIT_TOLERANCE + l.style.width).then(|| (d, l))
            })
            .min_by(|x, y| x.0.total_cmp(&y.0))
            .and_then(|(_, l)| l.click.clone())
    }
}
