//! World basemap, language markers, pan/zoom and label placement.

use std::collections::{HashMap, HashSet};

use egui::{Align2, Color32, FontId, Painter, Pos2, Rect, Sense, Shape, Stroke, Ui, Vec2, pos2, vec2};

use super::geometry::bounding_rect;
use super::relations::RelationRenderer;
use crate::lang_data::ReferenceData;
use crate::lang_data::geo::NaturalEarth;

pub const MIN_SCALE: f32 = 1.0;
pub const MAX_SCALE: f32 = 30.0;
/// Zoom used when fitting a single language.
pub const SINGLE_POINT_SCALE: f32 = 8.0;
/// Share of the free viewport a fitted selection should fill.
pub const FIT_FILL: f32 = 0.9;
pub const FIT_SECS: f64 = 1.0;
const DIMMED_OPACITY: f32 = 0.15;
const MARKER_RADIUS: f32 = 2.5;

const SEA: Color32 = Color32::from_rgb(0xa4, 0xc0, 0xd1);
const MARKER_FILL: Color32 = Color32::WHITE;
const MARKER_STROKE: Color32 = Color32::from_rgb(40, 70, 200);
const MAIN_MARKER: Color32 = Color32::from_rgb(0xff, 0x66, 0x66);

/// d3-style zoom transform: `screen = world * k + (x, y)` in viewport-local
/// coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ZoomTransform {
    pub k: f32,
    pub x: f32,
    pub y: f32,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform { k: 1.0, x: 0.0, y: 0.0 };

    pub fn apply(&self, p: Pos2) -> Pos2 {
        pos2(p.x * self.k + self.x, p.y * self.k + self.y)
    }

    pub fn invert(&self, p: Pos2) -> Pos2 {
        pos2((p.x - self.x) / self.k, (p.y - self.y) / self.k)
    }

    /// Zooms by `factor` keeping `anchor` (viewport-local) fixed.
    pub fn scaled_around(&self, factor: f32, anchor: Pos2) -> Self {
        let k = (self.k * factor).clamp(MIN_SCALE, MAX_SCALE);
        let world = self.invert(anchor);
        ZoomTransform { k, x: anchor.x - world.x * k, y: anchor.y - world.y * k }
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        ZoomTransform { k: self.k, x: self.x + delta.x, y: self.y + delta.y }
    }

    fn lerp(&self, to: &ZoomTransform, t: f32) -> Self {
        ZoomTransform {
            k: self.k + (to.k - self.k) * t,
            x: self.x + (to.x - self.x) * t,
            y: self.y + (to.y - self.y) * t,
        }
    }
}

/// Keeps the world extent covering the viewport (the d3-zoom constrain
/// rule): when the extent is smaller than the viewport it is centred.
pub fn constrain(t: ZoomTransform, viewport: Vec2, extent: Rect) -> ZoomTransform {
    let tl = t.invert(Pos2::ZERO);
    let br = t.invert(pos2(viewport.x, viewport.y));
    let (dx0, dx1) = (tl.x - extent.min.x, br.x - extent.max.x);
    let (dy0, dy1) = (tl.y - extent.min.y, br.y - extent.max.y);
    let shift = |d0: f32, d1: f32| {
        if d1 > d0 {
            (d0 + d1) / 2.0
        } else if d0.min(0.0) != 0.0 {
            d0.min(0.0)
        } else {
            d1.max(0.0)
        }
    };
    let (sx, sy) = (shift(dx0, dx1), shift(dy0, dy1));
    ZoomTransform { k: t.k, x: t.x + t.k * sx, y: t.y + t.k * sy }
}

/// Marker and label opacity. `focused` is `None` when nothing is selected:
/// opacity then grows with zoom² and the word count, so sparsely documented
/// languages only appear when zoomed in. A language without a known count
/// is always fully shown.
pub fn marker_opacity(k: f32, word_count: Option<u64>, focused: Option<bool>) -> f32 {
    match focused {
        None => word_count.map_or(1.0, |c| (k * k * c as f32 / 1e6).clamp(0.0, 1.0)),
        Some(true) => 1.0,
        Some(false) => DIMMED_OPACITY,
    }
}

/// Transform framing `points` (world coordinates) in the part of the
/// viewport left of a side panel `panel_width` wide.
pub fn fit_transform(points: &[Pos2], viewport: Vec2, panel_width: f32) -> Option<ZoomTransform> {
    let bounds = bounding_rect(points.iter().copied())?;
    let free = vec2((viewport.x - panel_width).max(viewport.x * 0.25), viewport.y);
    let center = pos2(free.x / 2.0, free.y / 2.0);
    let (bw, bh) = (bounds.width(), bounds.height());
    let k = if bw <= f32::EPSILON && bh <= f32::EPSILON {
        SINGLE_POINT_SCALE
    } else {
        let sx = bw / (FIT_FILL * free.x);
        let sy = bh / (FIT_FILL * free.y);
        (1.0 / sx.max(sy)).clamp(MIN_SCALE, MAX_SCALE)
    };
    let mid = bounds.center();
    Some(ZoomTransform { k, x: center.x - k * mid.x, y: center.y - k * mid.y })
}

#[derive(Clone, Debug)]
pub struct LabelCandidate {
    pub iso: String,
    pub rect: Rect,
    pub word_count: u64,
}

/// Greedy label placement: the main language first, then by word count
/// descending; a label is kept only if it overlaps no kept label.
pub fn resolve_label_collisions(candidates: &[LabelCandidate], main: Option<&str>) -> Vec<String> {
    let mut order: Vec<&LabelCandidate> = candidates.iter().collect();
    order.sort_by(|a, b| {
        let am = Some(a.iso.as_str()) == main;
        let bm = Some(b.iso.as_str()) == main;
        bm.cmp(&am)
            .then_with(|| b.word_count.cmp(&a.word_count))
            .then_with(|| a.iso.cmp(&b.iso))
    });
    let mut accepted: Vec<Rect> = Vec::new();
    let mut visible = Vec::new();
    for c in order {
        if accepted.iter().any(|r| r.intersects(c.rect)) {
            continue;
        }
        accepted.push(c.rect);
        visible.push(c.iso.clone());
    }
    visible
}

/// Carries a transform over to a new projection and viewport: the point
/// under the old viewport centre lands under the new centre, `k` is kept.
pub fn reproject(t: ZoomTransform, old: (NaturalEarth, Vec2), new: (NaturalEarth, Vec2)) -> ZoomTransform {
    let (from, old_size) = old;
    let (to, new_size) = new;
    let world = t.invert(pos2(old_size.x / 2.0, old_size.y / 2.0));
    let ratio = (to.scale / from.scale) as f32;
    let moved = pos2(
        to.translate.0 as f32 + (world.x - from.translate.0 as f32) * ratio,
        to.translate.1 as f32 + (world.y - from.translate.1 as f32) * ratio,
    );
    ZoomTransform { k: t.k, x: new_size.x / 2.0 - t.k * moved.x, y: new_size.y / 2.0 - t.k * moved.y }
}

fn ease_cubic_in_out(t: f32) -> f32 {
    if t < 0.5 { 4.0 * t * t * t } else { 1.0 - (-2.0 * t + 2.0).powi(3) / 2.0 }
}

struct ZoomAnimation {
    from: ZoomTransform,
    to: ZoomTransform,
    start: f64,
}

/// Focus information the map needs from the view state each frame.
pub struct MapFocus<'a> {
    pub highlighted: &'a HashSet<String>,
    pub main: Option<&'a str>,
}

#[derive(Default, Debug)]
pub struct MapResponse {
    pub clicked_language: Option<String>,
    pub clicked_pair: Option<(String, String)>,
    pub background_clicked: bool,
}

struct Marker {
    iso: String,
    world: Pos2,
    count: Option<u64>,
}

pub struct MapView {
    size: Vec2,
    projection: NaturalEarth,
    extent: Rect,
    // projected rings and markers for `size`
    rings: Vec<Vec<Pos2>>,
    markers: Vec<Marker>,
    marker_index: HashMap<String, usize>,
    transform: ZoomTransform,
    animation: Option<ZoomAnimation>,
}

impl Default for MapView {
    fn default() -> Self {
        Self::new()
    }
}

impl MapView {
    pub fn new() -> Self {
        Self {
            size: Vec2::ZERO,
            projection: NaturalEarth::for_viewport(vec2(1.0, 1.0)),
            extent: Rect::NOTHING,
            rings: Vec::new(),
            markers: Vec::new(),
            marker_index: HashMap::new(),
            transform: ZoomTransform::IDENTITY,
            animation: None,
        }
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    /// Re-projects the basemap and markers when the viewport size changes.
    /// The place shown at the viewport centre stays there at the same zoom.
    pub fn ensure_projection(&mut self, size: Vec2, data: &ReferenceData) {
        if size == self.size && !self.markers.is_empty() {
            return;
        }
        let projection = NaturalEarth::for_viewport(size);
        if self.size != Vec2::ZERO {
            let old = (self.projection, self.size);
            self.transform = reproject(self.transform, old, (projection, size));
            if let Some(anim) = &mut self.animation {
                anim.from = reproject(anim.from, old, (projection, size));
                anim.to = reproject(anim.to, old, (projection, size));
            }
        }
        self.size = size;
        self.projection = projection;
        self.extent = self.projection.world_extent();
        self.rings = data
            .basemap
            .countries
            .iter()
            .flat_map(|c| c.rings.iter())
            .map(|ring| ring.iter().map(|&(lon, lat)| self.projection.project(lon, lat)).collect())
            .collect();
        self.markers = data
            .network
            .languages()
            .map(|l| Marker { iso: l.isocode.clone(), world: self.projection.project(l.longitude, l.latitude), count: l.count })
            .collect();
        // draw rarely documented languages first so common ones stay on top
        self.markers.sort_by(|a, b| a.count.cmp(&b.count).then_with(|| a.iso.cmp(&b.iso)));
        self.marker_index = self.markers.iter().enumerate().map(|(i, m)| (m.iso.clone(), i)).collect();
        self.transform = constrain(self.transform, size, self.extent);
        log::debug!("map projected for {:?}: {} rings, {} markers", size, self.rings.len(), self.markers.len());
    }

    pub fn world_position(&self, iso: &str) -> Option<Pos2> {
        self.marker_index.get(iso).map(|&i| self.markers[i].world)
    }

    /// Starts an animated pan/zoom framing `isocodes`; unknown codes are
    /// ignored.
    pub fn fit_to(&mut self, isocodes: &[String], panel_width: f32, now: f64) {
        let points: Vec<Pos2> = isocodes.iter().filter_map(|iso| self.world_position(iso)).collect();
        let Some(target) = fit_transform(&points, self.size, panel_width) else { return };
        let target = constrain(target, self.size, self.extent);
        self.animation = Some(ZoomAnimation { from: self.transform, to: target, start: now });
    }

    fn tick(&mut self, now: f64) -> bool {
        let Some(anim) = &self.animation else { return false };
        let t = ((now - anim.start) / FIT_SECS).clamp(0.0, 1.0) as f32;
        self.transform = anim.from.lerp(&anim.to, ease_cubic_in_out(t));
        if t >= 1.0 {
            self.animation = None;
        }
        true
    }

    pub fn show(
        &mut self,
        ui: &mut Ui,
        data: &ReferenceData,
        focus: &MapFocus<'_>,
        relations: &RelationRenderer,
        now: f64,
    ) -> MapResponse {
        let mut out = MapResponse::default();
        let (response, painter) = ui.allocate_painter(ui.available_size(), Sense::click_and_drag());
        let rect = response.rect;
        self.ensure_projection(rect.size(), data);

        // interaction: drag pans, scroll zooms around the pointer
        if response.dragged() {
            self.animation = None;
            self.transform = constrain(self.transform.translated(response.drag_delta()), self.size, self.extent);
        }
        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll != 0.0 {
                if let Some(p) = response.hover_pos() {
                    self.animation = None;
                    let factor = (scroll * 0.004).exp();
                    let local = (p - rect.min).to_pos2();
                    self.transform = constrain(self.transform.scaled_around(factor, local), self.size, self.extent);
                }
            }
        }
        if self.tick(now) || relations.is_animating(now) {
            ui.ctx().request_repaint();
        }

        let t = self.transform;
        let to_screen = |w: Pos2| rect.min + t.apply(w).to_vec2();

        painter.rect_filled(rect, 0.0, SEA);
        self.paint_basemap(&painter, &to_screen);

        let project = |iso: &str| self.world_position(iso).map(to_screen);
        relations.paint(&painter, now, project);

        let selection_active = !focus.highlighted.is_empty();
        let marker_r = MARKER_RADIUS * t.k.sqrt();
        let mut hovered: Option<(&Marker, f32)> = None;
        let pointer = response.hover_pos();
        for m in &self.markers {
            let focused = selection_active.then(|| focus.highlighted.contains(&m.iso));
            let opacity = marker_opacity(t.k, m.count, focused);
            if opacity <= 0.01 {
                continue;
            }
            let p = to_screen(m.world);
            if !rect.expand(marker_r).contains(p) {
                continue;
            }
            let fill = if focus.main == Some(m.iso.as_str()) { MAIN_MARKER } else { MARKER_FILL };
            painter.circle(p, marker_r, fill.gamma_multiply(opacity), Stroke::new(0.6, MARKER_STROKE.gamma_multiply(opacity)));
            if let Some(ptr) = pointer {
                let d = ptr.distance(p);
                if d <= marker_r + 3.0 && hovered.is_none_or(|(_, best)| d < best) {
                    hovered = Some((m, d));
                }
            }
        }

        let labels: HashSet<String> = if selection_active {
            self.paint_labels(&painter, data, focus, &to_screen)
        } else {
            HashSet::new()
        };

        if let Some((m, _)) = hovered.filter(|(m, _)| !labels.contains(&m.iso)) {
            let p = to_screen(m.world);
            painter.text(
                p + vec2(0.0, -marker_r - 4.0),
                Align2::CENTER_BOTTOM,
                data.network.name_or_code(&m.iso),
                FontId::proportional(13.0),
                Color32::BLACK,
            );
        }

        if response.clicked() {
            let pos = response.interact_pointer_pos();
            if let Some((m, _)) = hovered {
                out.clicked_language = Some(m.iso.clone());
            } else if let Some(pair) = pos.and_then(|p| relations.hit_test(p, project)) {
                out.clicked_pair = Some(pair);
            } else {
                out.background_clicked = true;
            }
        }
        out
    }

    fn paint_basemap(&self, painter: &Painter, to_screen: &impl Fn(Pos2) -> Pos2) {
        let clip = painter.clip_rect();
        let stroke = Stroke::new(0.8, Color32::from_gray(150));
        for ring in &self.rings {
            let pts: Vec<Pos2> = ring.iter().map(|&p| to_screen(p)).collect();
            let visible = bounding_rect(pts.iter().copied()).is_some_and(|b| b.intersects(clip));
            if !visible {
                continue;
            }
            // fills are convex-only in egui, outline the land instead
            painter.add(Shape::closed_line(pts, stroke));
        }
    }

    fn paint_labels(
        &self,
        painter: &Painter,
        data: &ReferenceData,
        focus: &MapFocus<'_>,
        to_screen: &impl Fn(Pos2) -> Pos2,
    ) -> HashSet<String> {
        let font = FontId::proportional(12.0);
        let mut candidates = Vec::new();
        let mut galleys = HashMap::new();
        for iso in focus.highlighted {
            let (Some(w), Ok(lang)) = (self.world_position(iso), data.network.language(iso)) else { continue };
            let galley = painter.layout_no_wrap(lang.name.clone(), font.clone(), Color32::BLACK);
            let anchor = to_screen(w) + vec2(0.0, -6.0);
            let size = galley.size();
            let rect = Rect::from_min_size(pos2(anchor.x - size.x / 2.0, anchor.y - size.y), size);
            candidates.push(LabelCandidate { iso: iso.clone(), rect, word_count: lang.count.unwrap_or(0) });
            galleys.insert(iso.clone(), (rect, galley));
        }
        let visible: HashSet<String> = resolve_label_collisions(&candidates, focus.main).into_iter().collect();
        for iso in &visible {
            if let Some((rect, galley)) = galleys.remove(iso) {
                painter.rect_filled(rect.expand(1.5), 2.0, Color32::from_white_alpha(170));
                painter.galley(rect.min, galley, Color32::BLACK);
            }
        }
        visible
    }
}
