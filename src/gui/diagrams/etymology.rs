//! Two-sided etymology tree: descendants above the focal word, ancestors
//! below it.

use std::collections::BTreeMap;

use egui::{Align2, Color32, FontId, Pos2, ScrollArea, Sense, Shape, Stroke, Ui, pos2, vec2};

use super::{DiagramAction, HOVER, RAMP_HIGH, RAMP_LOW};
use crate::gui::geometry::{distance_to_polyline, sample_cubic};
use crate::lang_data::network::LanguageNetwork;
use crate::lang_data::word::{EtymologyNode, WordInfo};

/// Relatives sharing their parent's language kept per node.
pub const SAME_LANGUAGE_KEEP: usize = 3;
pub const LEVEL_HEIGHT: f32 = 130.0;
pub const CROSS_LANGUAGE_WIDTH: f32 = 7.0;
pub const SAME_LANGUAGE_WIDTH: f32 = 3.0;

const FOCAL_RADIUS: f32 = 20.0;
const NODE_RADIUS: f32 = 10.0;
const FOCAL_FILL: Color32 = Color32::from_rgb(0xff, 0x66, 0x66);
const DESCENDANT_FILL: Color32 = Color32::from_rgb(0xff, 0x7f, 0x00);
const LINK_COLOR: Color32 = Color32::from_gray(0xaa);
const LINK_STEPS: usize = 20;

/// Keeps at most [`SAME_LANGUAGE_KEEP`] relatives in `lang` (a declension
/// or conjugation table would otherwise flood the tree), followed by every
/// relative in another language.
pub fn smart_trim<'a>(relatives: &'a [EtymologyNode], lang: &str) -> Vec<&'a EtymologyNode> {
    let same = relatives.iter().filter(|n| n.lang == lang).take(SAME_LANGUAGE_KEEP);
    let other = relatives.iter().filter(|n| n.lang != lang);
    same.chain(other).collect()
}

/// Depth and per-level width of one half of the tree after trimming.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HalfStats {
    pub max_depth: usize,
    // level (1 = next to the focal word) -> node count
    pub widths: BTreeMap<usize, usize>,
}

impl HalfStats {
    pub fn max_width(&self) -> usize {
        self.widths.values().copied().max().unwrap_or(0)
    }
}

pub fn half_stats(roots: &[EtymologyNode], lang: &str) -> HalfStats {
    fn visit(node: &EtymologyNode, depth: usize, stats: &mut HalfStats) {
        stats.max_depth = stats.max_depth.max(depth);
        *stats.widths.entry(depth).or_insert(0) += 1;
        for c in smart_trim(&node.children, &node.lang) {
            visit(c, depth + 1, stats);
        }
    }

    let mut stats = HalfStats::default();
    for r in smart_trim(roots, lang) {
        visit(r, 1, &mut stats);
    }
    stats
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Half {
    Focal,
    Ancestors,
    Descendants,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeNode {
    pub word: String,
    pub lang: String,
    pub half: Half,
    pub pos: Pos2,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeLink {
    // node indices; `outer` is farther from the focal word
    pub outer: usize,
    pub inner: usize,
    pub cross_language: bool,
    pub points: Vec<Pos2>,
}

impl TreeLink {
    pub fn width(&self) -> f32 {
        if self.cross_language { CROSS_LANGUAGE_WIDTH } else { SAME_LANGUAGE_WIDTH }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeLayout {
    pub width: f32,
    pub height: f32,
    pub nodes: Vec<TreeNode>,
    pub links: Vec<TreeLink>,
}

// Vertical link in the style of d3.linkVertical.
fn vertical_link(a: Pos2, b: Pos2) -> Vec<Pos2> {
    let my = (a.y + b.y) / 2.0;
    sample_cubic(a, pos2(a.x, my), pos2(b.x, my), b, LINK_STEPS)
}

struct HalfBuilder<'a> {
    half: Half,
    // +1 below the focal word, -1 above
    direction: f32,
    width: f32,
    leaves: usize,
    next_leaf: usize,
    level_y: &'a dyn Fn(f32) -> f32,
}

impl HalfBuilder<'_> {
    fn count_leaves(node: &EtymologyNode) -> usize {
        let kids = smart_trim(&node.children, &node.lang);
        if kids.is_empty() { 1 } else { kids.into_iter().map(Self::count_leaves).sum() }
    }

    // Leaves are spread evenly; an inner node sits above the middle of its
    // first and last child.
    fn place(&mut self, node: &EtymologyNode, depth: usize, parent: usize, out: &mut TreeLayout) -> f32 {
        let idx = out.nodes.len();
        out.nodes.push(TreeNode { word: node.word.clone(), lang: node.lang.clone(), half: self.half, pos: Pos2::ZERO });
        let kids = smart_trim(&node.children, &node.lang);
        let x = if kids.is_empty() {
            let x = (self.next_leaf as f32 + 0.5) / self.leaves as f32 * self.width;
            self.next_leaf += 1;
            x
        } else {
            let xs: Vec<f32> = kids.into_iter().map(|k| self.place(k, depth + 1, idx, out)).collect();
            (xs[0] + xs[xs.len() - 1]) / 2.0
        };
        let y = (self.level_y)(self.direction * depth as f32);
        out.nodes[idx].pos = pos2(x, y);
        let cross_language = node.lang != out.nodes[parent].lang;
        out.links.push(TreeLink { outer: idx, inner: parent, cross_language, points: Vec::new() });
        x
    }
}

/// Lays out the tree of `info` on a canvas at least `min_width` wide. The
/// canvas widens with the busiest level so sibling nodes keep apart.
pub fn layout(info: &WordInfo, min_width: f32) -> TreeLayout {
    let up = half_stats(&info.children, &info.lang);
    let down = half_stats(&info.parents, &info.lang);
    let total_depth = up.max_depth + down.max_depth;
    let height = (total_depth + 2) as f32 * LEVEL_HEIGHT;
    let max_width = up.max_width().max(down.max_width());
    let width = (max_width as f32 * min_width / 5.0).max(min_width);

    let levels = (total_depth + 2) as f32;
    let children_depth = up.max_depth as f32;
    let level_y = move |signed_depth: f32| height * (children_depth + signed_depth + 1.0) / levels;

    let mut out = TreeLayout { width, height, nodes: Vec::new(), links: Vec::new() };
    out.nodes.push(TreeNode {
        word: info.word.clone(),
        lang: info.lang.clone(),
        half: Half::Focal,
        pos: pos2(width / 2.0, level_y(0.0)),
    });

    for (half, direction, roots) in [(Half::Ancestors, 1.0, &info.parents), (Half::Descendants, -1.0, &info.children)] {
        let top = smart_trim(roots, &info.lang);
        let leaves = top.iter().map(|n| HalfBuilder::count_leaves(n)).sum::<usize>().max(1);
        let mut builder = HalfBuilder { half, direction, width, leaves, next_leaf: 0, level_y: &level_y };
        for n in top {
            builder.place(n, 1, 0, &mut out);
        }
    }

    for link in &mut out.links {
        link.points = vertical_link(out.nodes[link.outer].pos, out.nodes[link.inner].pos);
    }
    out
}

pub struct EtymologyTree;

impl EtymologyTree {
    /// Paints the tree inside a horizontal scroll area. Nodes open the word,
    /// language captions the language and cross-language links the pair.
    pub fn show(ui: &mut Ui, network: &LanguageNetwork, info: &WordInfo) -> Option<DiagramAction> {
        let lay = layout(info, ui.available_width().max(200.0) * 0.95);
        let mut action = None;
        ScrollArea::horizontal().id_salt("etymology_tree").show(ui, |ui| {
            let (response, painter) = ui.allocate_painter(vec2(lay.width, lay.height), Sense::click());
            let origin = response.rect.min.to_vec2();
            let pointer = response.hover_pos().map(|p| p - origin);
            let font = FontId::proportional(12.0);
            let text_color = ui.visuals().text_color();

            let radius = |n: &TreeNode| if n.half == Half::Focal { FOCAL_RADIUS } else { NODE_RADIUS };
            let hovered_node = pointer.and_then(|p| lay.nodes.iter().position(|n| n.pos.distance(p) <= radius(n)));
            // caption rects are known only once laid out, collect them while painting
            let mut hovered_caption = None;
            let hovered_link = match (hovered_node, pointer) {
                (None, Some(p)) => lay
                    .links
                    .iter()
                    .position(|l| l.cross_language && distance_to_polyline(p, &l.points) <= l.width() / 2.0 + 2.0),
                _ => None,
            };

            for (i, link) in lay.links.iter().enumerate() {
                let color = if hovered_link == Some(i) { HOVER } else { LINK_COLOR };
                let pts: Vec<Pos2> = link.points.iter().map(|p| *p + origin).collect();
                painter.add(Shape::line(pts, Stroke::new(link.width(), color)));
            }

            for (i, n) in lay.nodes.iter().enumerate() {
                let center = n.pos + origin;
                let r = radius(n);
                let fill = match n.half {
                    _ if hovered_node == Some(i) => HOVER,
                    Half::Focal => FOCAL_FILL,
                    Half::Descendants => DESCENDANT_FILL,
                    Half::Ancestors => RAMP_LOW,
                };
                let stroke = if hovered_node == Some(i) { Color32::RED } else { RAMP_HIGH };
                painter.circle(center, r, fill, Stroke::new(2.0, stroke));
                painter.text(center - vec2(0.0, r + 5.0), Align2::CENTER_BOTTOM, &n.word, font.clone(), text_color);
                let caption = painter.text(
                    center + vec2(0.0, r + 5.0),
                    Align2::CENTER_TOP,
                    network.name_or_code(&n.lang),
                    font.clone(),
                    text_color,
                );
                if pointer.is_some_and(|p| caption.contains(p + origin)) {
                    hovered_caption = Some(i);
                }
            }

            if response.clicked() {
                action = if let Some(i) = hovered_node {
                    let n = &lay.nodes[i];
                    Some(DiagramAction::Word { word: n.word.clone(), lang: n.lang.clone() })
                } else if let Some(i) = hovered_caption {
                    Some(DiagramAction::Language(lay.nodes[i].lang.clone()))
                } else {
                    hovered_link.map(|i| {
                        let l = &lay.links[i];
                        DiagramAction::Pair(lay.nodes[l.outer].lang.clone(), lay.nodes[l.inner].lang.clone())
                    })
                };
            }
        });
        action
    }
}
