//! Alluvial diagram: inbound influence on the left, outbound on the right,
//! both flowing through a central node for the focal language.

use egui::{Align2, Color32, FontId, Pos2, Rect, Sense, Shape, Stroke, Ui, pos2, vec2};

use super::{DiagramAction, HOVER, ramp};
use crate::gui::geometry::{distance_to_polyline, sample_cubic};
use crate::lang_data::network::LanguageNetwork;

/// Entries below this share of the words are folded into "Other".
pub const INFLUENCE_THRESHOLD: f64 = 0.05;
/// Gap between stacked entries, as a share of the total height.
pub const MARGIN: f64 = 0.05;

const NODE_FILL: Color32 = Color32::from_rgb(0x37, 0x48, 0x5e);
const CENTER_FILL: Color32 = Color32::from_rgb(0xba, 0x53, 0x57);
const LINK_STEPS: usize = 24;

#[derive(Clone, Debug, PartialEq)]
pub struct FlowEntry {
    // None is the synthetic "Other" bucket
    pub iso: Option<String>,
    pub weight: f64,
}

impl FlowEntry {
    pub fn language(iso: impl Into<String>, weight: f64) -> Self {
        Self { iso: Some(iso.into()), weight }
    }
}

/// Appends an "Other" bucket holding `1 - sum` when the weights do not
/// already cover the whole.
pub fn with_other_bucket(mut entries: Vec<FlowEntry>) -> Vec<FlowEntry> {
    let sum: f64 = entries.iter().map(|e| e.weight).sum();
    if sum < 1.0 - 1e-9 {
        entries.push(FlowEntry { iso: None, weight: 1.0 - sum });
    }
    entries
}

/// Leading entries of a descending proportion list above the threshold,
/// completed with the "Other" bucket.
pub fn influence_entries(proportions: &[(String, f64)]) -> Vec<FlowEntry> {
    let kept = proportions
        .iter()
        .take_while(|(_, p)| *p > INFLUENCE_THRESHOLD)
        .map(|(iso, p)| FlowEntry::language(iso.as_str(), *p))
        .collect();
    with_other_bucket(kept)
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlluvialNode {
    pub iso: Option<String>,
    pub weight: f64,
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlluvialLink {
    pub iso: Option<String>,
    pub inbound: bool,
    pub index: usize,
    pub width: f32,
    pub points: Vec<Pos2>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AlluvialLayout {
    pub size: f32,
    pub left: Vec<AlluvialNode>,
    pub right: Vec<AlluvialNode>,
    pub center: Rect,
    pub links: Vec<AlluvialLink>,
}

fn cumulative(entries: &[FlowEntry]) -> Vec<f64> {
    entries
        .iter()
        .scan(0.0, |acc, e| {
            let start = *acc;
            *acc += e.weight;
            Some(start)
        })
        .collect()
}

// Two flat ends joined by an S-shaped curve, the shape of a monotone spline
// through four points.
fn link_path(a: Pos2, b: Pos2, c: Pos2, d: Pos2) -> Vec<Pos2> {
    let mid = (b.x + c.x) / 2.0;
    let mut pts = vec![a];
    pts.extend(sample_cubic(b, pos2(mid, b.y), pos2(mid, c.y), c, LINK_STEPS));
    pts.push(d);
    pts
}

/// Lays the diagram out in a `size` x `size` square with its origin at zero.
pub fn layout(inbound: &[FlowEntry], outbound: &[FlowEntry], size: f32) -> AlluvialLayout {
    let h = size as f64;
    let node_w = size / 20.0;
    let span = |n: usize| 1.0 + MARGIN * n.saturating_sub(1) as f64;
    let max_sum = span(inbound.len()).max(span(outbound.len()));
    let scale = h / max_sum;
    let offset_in = (h - span(inbound.len()) * scale) / 2.0;
    let offset_out = (h - span(outbound.len()) * scale) / 2.0;
    let offset_mid = (h - scale) / 2.0;

    let cum_in = cumulative(inbound);
    let cum_out = cumulative(outbound);
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut links = Vec::new();

    for (i, e) in inbound.iter().enumerate() {
        let top = offset_in + (cum_in[i] + i as f64 * MARGIN) * scale;
        let rect = Rect::from_min_size(pos2(0.0, top as f32), vec2(node_w, (e.weight * scale) as f32));
        let y_side = (top + e.weight * scale / 2.0) as f32;
        let y_mid = (offset_mid + (cum_in[i] + e.weight / 2.0) * scale) as f32;
        links.push(AlluvialLink {
            iso: e.iso.clone(),
            inbound: true,
            index: i,
            width: (e.weight * scale) as f32,
            points: link_path(
                pos2(0.0, y_side),
                pos2(node_w, y_side),
                pos2(size / 2.0 - node_w / 2.0, y_mid),
                pos2(size / 2.0 + node_w / 2.0, y_mid),
            ),
        });
        left.push(AlluvialNode { iso: e.iso.clone(), weight: e.weight, rect });
    }

    for (i, e) in outbound.iter().enumerate() {
        let top = offset_out + (cum_out[i] + i as f64 * MARGIN) * scale;
        let rect = Rect::from_min_size(pos2(size - node_w, top as f32), vec2(node_w, (e.weight * scale) as f32));
        let y_side = (top + e.weight * scale / 2.0) as f32;
        let y_mid = (offset_mid + (cum_out[i] + e.weight / 2.0) * scale) as f32;
        links.push(AlluvialLink {
            iso: e.iso.clone(),
            inbound: false,
            index: i,
            width: (e.weight * scale) as f32,
            points: link_path(
                pos2(size / 2.0 - node_w / 2.0, y_mid),
                pos2(size / 2.0 + node_w / 2.0, y_mid),
                pos2(size - node_w, y_side),
                pos2(size, y_side),
            ),
        });
        right.push(AlluvialNode { iso: e.iso.clone(), weight: e.weight, rect });
    }

    let center = Rect::from_min_size(pos2(size / 2.0 - node_w / 2.0, offset_mid as f32), vec2(node_w, scale as f32));
    AlluvialLayout { size, left, right, center, links }
}

fn display_name<'a>(network: &'a LanguageNetwork, iso: &'a Option<String>) -> &'a str {
    match iso {
        Some(i) => network.name_or_code(i),
        None => "Others",
    }
}

pub struct AlluvialDiagram;

impl AlluvialDiagram {
    /// Paints the flows of `focal`. A named node opens its language, a named
    /// link the pair in the direction of the flow.
    pub fn show(ui: &mut Ui, network: &LanguageNetwork, focal: &str) -> Option<DiagramAction> {
        let inbound = influence_entries(network.from_proportion(focal));
        let outbound = influence_entries(network.to_proportion(focal));
        let size = (ui.available_width() * 0.8).clamp(120.0, 420.0);
        let (response, painter) = ui.allocate_painter(vec2(size, size), Sense::click());
        let origin = response.rect.min.to_vec2();
        let lay = layout(&inbound, &outbound, size);

        let pointer = response.hover_pos().map(|p| p - origin);
        let hovered_node = pointer.and_then(|p| {
            lay.left
                .iter()
                .map(|n| (true, n))
                .chain(lay.right.iter().map(|n| (false, n)))
                .find(|(_, n)| n.iso.is_some() && n.rect.contains(p))
                .map(|(left, n)| (left, n.iso.clone()))
        });
        let hovered_link = match (hovered_node.is_none(), pointer) {
            (true, Some(p)) => lay
                .links
                .iter()
                .filter(|l| l.iso.is_some())
                .find(|l| distance_to_polyline(p, &l.points) <= l.width / 2.0)
                .map(|l| (l.inbound, l.index)),
            _ => None,
        };

        for link in &lay.links {
            let count = if link.inbound { lay.left.len() } else { lay.right.len() };
            let base = ramp(link.index as f32 / count.max(1) as f32);
            let color = if hovered_link == Some((link.inbound, link.index)) { HOVER } else { base };
            let pts: Vec<Pos2> = link.points.iter().map(|p| *p + origin).collect();
            painter.add(Shape::line(pts, Stroke::new(link.width, color.gamma_multiply(0.8))));
        }

        let text_color = ui.visuals().text_color();
        let font = FontId::proportional(12.0);
        for (left, nodes) in [(true, &lay.left), (false, &lay.right)] {
            for n in nodes {
                let rect = n.rect.translate(origin);
                let hot = n.iso.is_some() && hovered_node.as_ref().is_some_and(|(l, iso)| *l == left && *iso == n.iso);
                painter.rect_filled(rect, 0.0, if hot { HOVER } else { NODE_FILL });
                let (pos, align) = if left {
                    (pos2(rect.max.x + 5.0, rect.center().y), Align2::LEFT_CENTER)
                } else {
                    (pos2(rect.min.x - 5.0, rect.center().y), Align2::RIGHT_CENTER)
                };
                painter.text(pos, align, display_name(network, &n.iso), font.clone(), text_color);
            }
        }

        let center = lay.center.translate(origin);
        painter.rect_filled(center, 0.0, CENTER_FILL);
        painter.text(
            center.center_top() - vec2(0.0, 4.0),
            Align2::CENTER_BOTTOM,
            network.name_or_code(focal),
            FontId::proportional(16.0),
            text_color,
        );

        if !response.clicked() {
            return None;
        }
        if let Some((_, Some(iso))) = hovered_node {
            return Some(DiagramAction::Language(iso));
        }
        let (inbound_link, index) = hovered_link?;
        let entries = if inbound_link { &inbound } else { &outbound };
        let iso = entries.get(index)?.iso.clone()?;
        Some(if inbound_link {
            DiagramAction::Pair(focal.to_string(), iso)
        } else {
            DiagramAction::Pair(iso, focal.to_string())
        })
    }
}
