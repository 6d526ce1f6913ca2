//! Chord diagram of a language and its strongest partners.
//!
//! The layout is the d3-chord algorithm: each row of the matrix becomes an
//! arc whose length is proportional to the row sum, split into subgroups
//! (sorted descending) that anchor the ribbons.

use std::f32::consts::{PI, TAU};

use egui::{Align2, Color32, FontId, Mesh, Pos2, Sense, Shape, Stroke, Ui, vec2};

use super::{DiagramAction, ramp};
use crate::gui::geometry::{lerp_color, point_in_polygon, polar};
use crate::lang_data::network::LanguageNetwork;

pub const PAD_ANGLE: f32 = 0.05;
pub const MAX_PARTNERS: usize = 5;

const ARC_STEPS: usize = 24;
const RIBBON_ROWS: usize = 8;
const RIBBON_COLS: usize = 24;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChordGroup {
    pub index: usize,
    pub start_angle: f32,
    pub end_angle: f32,
    pub value: f64,
}

/// One end of a ribbon: the slice of arc `index` reserved for `subindex`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ChordEnd {
    pub index: usize,
    pub subindex: usize,
    pub start_angle: f32,
    pub end_angle: f32,
    pub value: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Chord {
    pub source: ChordEnd,
    pub target: ChordEnd,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChordLayout {
    pub groups: Vec<ChordGroup>,
    pub chords: Vec<Chord>,
}

/// Angles are radians clockwise from 12 o'clock. Negative entries count as
/// zero; an all-zero matrix yields equal empty arcs.
pub fn chord_layout(matrix: &[Vec<f64>], pad_angle: f32) -> ChordLayout {
    let n = matrix.len();
    if n == 0 {
        return ChordLayout::default();
    }
    let value = |i: usize, j: usize| matrix[i].get(j).copied().unwrap_or(0.0).max(0.0);
    let sums: Vec<f64> = (0..n).map(|i| (0..n).map(|j| value(i, j)).sum()).collect();
    let total: f64 = sums.iter().sum();
    let (k, dx) = if total > 0.0 {
        ((TAU - pad_angle * n as f32).max(0.0) as f64 / total, pad_angle as f64)
    } else {
        (0.0, (TAU / n as f32) as f64)
    };

    let empty = ChordEnd { index: 0, subindex: 0, start_angle: 0.0, end_angle: 0.0, value: 0.0 };
    // subgroups[j * n + i] is row i, column j
    let mut subgroups = vec![empty; n * n];
    let mut groups = Vec::with_capacity(n);
    let mut x = 0.0f64;
    for i in 0..n {
        let x0 = x;
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| value(i, b).total_cmp(&value(i, a)));
        for j in order {
            let v = value(i, j);
            let a0 = x;
            x += v * k;
            subgroups[j * n + i] = ChordEnd { index: i, subindex: j, start_angle: a0 as f32, end_angle: x as f32, value: v };
        }
        groups.push(ChordGroup { index: i, start_angle: x0 as f32, end_angle: x as f32, value: sums[i] });
        x += dx;
    }

    let mut chords = Vec::new();
    for i in 0..n {
        for j in i..n {
            let source = subgroups[j * n + i];
            let target = subgroups[i * n + j];
            if source.value > 0.0 || target.value > 0.0 {
                chords.push(if source.value < target.value {
                    Chord { source: target, target: source }
                } else {
                    Chord { source, target }
                });
            }
        }
    }
    ChordLayout { groups, chords }
}

/// The focal language last, after up to [`MAX_PARTNERS`] partners ranked by
/// the symmetric relation index. Returns the members and the focal index.
pub fn chord_members(network: &LanguageNetwork, focal: &str) -> (Vec<String>, usize) {
    let mut members: Vec<String> = network
        .strongest_partners(focal, MAX_PARTNERS)
        .into_iter()
        .filter(|iso| iso != focal)
        .collect();
    members.push(focal.to_string());
    let focal_index = members.len() - 1;
    (members, focal_index)
}

/// `ln(1 + count)` of the words flowing from row to column; the diagonal is
/// zero.
pub fn relation_matrix(network: &LanguageNetwork, members: &[String]) -> Vec<Vec<f64>> {
    members
        .iter()
        .enumerate()
        .map(|(i, a)| {
            members
                .iter()
                .enumerate()
                .map(|(j, b)| if i == j { 0.0 } else { (network.count_from(a, b).unwrap_or(0) as f64).ln_1p() })
                .collect()
        })
        .collect()
}

fn angle_of(p: Pos2, center: Pos2) -> f32 {
    let d = p - center;
    d.x.atan2(-d.y).rem_euclid(TAU)
}

fn hit_arc(p: Pos2, center: Pos2, inner: f32, outer: f32, a0: f32, a1: f32) -> bool {
    let r = p.distance(center);
    let a = angle_of(p, center);
    r >= inner && r <= outer && a >= a0 && a <= a1
}

fn arc_points(center: Pos2, radius: f32, a0: f32, a1: f32) -> Vec<Pos2> {
    (0..=ARC_STEPS).map(|s| polar(center, radius, a0 + (a1 - a0) * s as f32 / ARC_STEPS as f32)).collect()
}

fn annulus_mesh(center: Pos2, inner: f32, outer: f32, a0: f32, a1: f32, color: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    for s in 0..=ARC_STEPS {
        let a = a0 + (a1 - a0) * s as f32 / ARC_STEPS as f32;
        mesh.colored_vertex(polar(center, inner, a), color);
        mesh.colored_vertex(polar(center, outer, a), color);
        if s > 0 {
            let b = (2 * s) as u32;
            mesh.add_triangle(b - 2, b - 1, b);
            mesh.add_triangle(b - 1, b + 1, b);
        }
    }
    mesh
}

// Point of the ribbon surface: `u` sweeps across the two arcs, `t` runs along
// the curve through the centre.
fn ribbon_point(center: Pos2, radius: f32, chord: &Chord, u: f32, t: f32) -> Pos2 {
    let (s, g) = (&chord.source, &chord.target);
    let a = polar(center, radius, s.start_angle + u * (s.end_angle - s.start_angle));
    let b = polar(center, radius, g.end_angle - u * (g.end_angle - g.start_angle));
    let w = 1.0 - t;
    (a.to_vec2() * (w * w) + center.to_vec2() * (2.0 * w * t) + b.to_vec2() * (t * t)).to_pos2()
}

fn ribbon_mesh(center: Pos2, radius: f32, chord: &Chord, from: Color32, to: Color32) -> Mesh {
    let mut mesh = Mesh::default();
    let cols = RIBBON_COLS as u32 + 1;
    for r in 0..=RIBBON_ROWS {
        let u = r as f32 / RIBBON_ROWS as f32;
        for c in 0..=RIBBON_COLS {
            let t = c as f32 / RIBBON_COLS as f32;
            mesh.colored_vertex(ribbon_point(center, radius, chord, u, t), lerp_color(from, to, t));
        }
        if r > 0 {
            let (top, bottom) = ((r as u32 - 1) * cols, r as u32 * cols);
            for c in 0..RIBBON_COLS as u32 {
                mesh.add_triangle(top + c, bottom + c, top + c + 1);
                mesh.add_triangle(bottom + c, bottom + c + 1, top + c + 1);
            }
        }
    }
    mesh
}

fn ribbon_outline(center: Pos2, radius: f32, chord: &Chord) -> Vec<Pos2> {
    let (s, g) = (&chord.source, &chord.target);
    let curve = |u: f32| (0..=RIBBON_COLS).map(move |c| ribbon_point(center, radius, chord, u, c as f32 / RIBBON_COLS as f32));
    let mut pts = arc_points(center, radius, s.start_angle, s.end_angle);
    pts.extend(curve(1.0));
    pts.extend(arc_points(center, radius, g.start_angle, g.end_angle));
    pts.extend(curve(0.0).collect::<Vec<_>>().into_iter().rev());
    pts
}

pub struct ChordDiagram;

impl ChordDiagram {
    /// Paints the chord diagram of `focal`; clicking an arc opens that
    /// language, clicking a ribbon the pair it joins.
    pub fn show(ui: &mut Ui, network: &LanguageNetwork, focal: &str) -> Option<DiagramAction> {
        let (members, focal_index) = chord_members(network, focal);
        if members.len() < 2 {
            ui.weak("No related languages.");
            return None;
        }
        let layout = chord_layout(&relation_matrix(network, &members), PAD_ANGLE);

        let width = ui.available_width().min(460.0);
        let (response, painter) = ui.allocate_painter(vec2(width, width * 1.2), Sense::click());
        let center = response.rect.center();
        let outer = width / 2.5;
        let inner = width / 3.0;
        let last = (members.len() - 1) as f32;
        let color = |i: usize| if i == focal_index { Color32::RED } else { ramp(i as f32 / last) };

        let pointer = response.hover_pos();
        let hovered_group = pointer.and_then(|p| {
            layout.groups.iter().find(|g| hit_arc(p, center, inner, outer, g.start_angle, g.end_angle)).map(|g| g.index)
        });
        let hovered_chord = match (hovered_group, pointer) {
            (None, Some(p)) => layout.chords.iter().position(|c| point_in_polygon(p, &ribbon_outline(center, inner, c))),
            _ => None,
        };

        for (ci, c) in layout.chords.iter().enumerate() {
            let alpha = if hovered_chord == Some(ci) { 1.0 } else { 0.7 };
            let mesh = ribbon_mesh(center, inner, c, color(c.source.index).gamma_multiply(alpha), color(c.target.index).gamma_multiply(alpha));
            painter.add(Shape::mesh(mesh));
            painter.add(Shape::closed_line(ribbon_outline(center, inner, c), Stroke::new(0.5, Color32::BLACK)));
        }

        let text_color = ui.visuals().text_color();
        for g in &layout.groups {
            let alpha = if hovered_group == Some(g.index) { 1.0 } else { 0.7 };
            painter.add(Shape::mesh(annulus_mesh(center, inner, outer, g.start_angle, g.end_angle, color(g.index).gamma_multiply(alpha))));
            let mut outline = arc_points(center, outer, g.start_angle, g.end_angle);
            outline.extend(arc_points(center, inner, g.start_angle, g.end_angle).into_iter().rev());
            painter.add(Shape::closed_line(outline, Stroke::new(0.8, Color32::BLACK)));

            let mid = (g.start_angle + g.end_angle) / 2.0;
            let align = if mid <= PI { Align2::LEFT_CENTER } else { Align2::RIGHT_CENTER };
            painter.text(polar(center, outer * 1.05, mid), align, network.name_or_code(&members[g.index]), FontId::proportional(12.0), text_color);
        }

        if !response.clicked() {
            return None;
        }
        if let Some(i) = hovered_group {
            return Some(DiagramAction::Language(members[i].clone()));
        }
        hovered_chord.map(|ci| {
            let c = &layout.chords[ci];
            DiagramAction::Pair(members[c.source.index].clone(), members[c.target.index].clone())
        })
    }
}
