//! Selection state machine behind the side panel and the map overlays.
//!
//! Exactly one [`ViewMode`] is active at a time; it is derived from the
//! current [`Selection`]. Every applied transition fades out the previous
//! relation lines, recomputes the focus set and queues a fit-to-selection
//! for the map.

use std::collections::HashSet;
use std::sync::Arc;

use egui::Color32;

use super::map_view::MapFocus;
use super::relations::{LineStyle, RelationRenderer};
use super::routes::Route;
use crate::api::{LangInfo, PairInfo};
use crate::error::{EtymapError, Result};
use crate::lang_data::ReferenceData;
use crate::lang_data::word::WordInfo;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewMode {
    None,
    Language,
    Pair,
    Word,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SubPanel {
    Language,
    Pair,
    Word,
}

impl SubPanel {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubPanel::Language => "language-panel",
            SubPanel::Pair => "language-pair-panel",
            SubPanel::Word => "word-panel",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Selection {
    None,
    Language(LangInfo),
    Pair { forward: PairInfo, backward: PairInfo },
    Word(WordInfo),
}

impl Selection {
    pub fn mode(&self) -> ViewMode {
        match self {
            Selection::None => ViewMode::None,
            Selection::Language(_) => ViewMode::Language,
            Selection::Pair { .. } => ViewMode::Pair,
            Selection::Word(_) => ViewMode::Word,
        }
    }
}

/// Result of a lookup, ready to be applied to the view.
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Language(LangInfo),
    // both directions of a pair, src to dst first
    Pair(PairInfo, PairInfo),
    Word(WordInfo),
}

/// Identifies one navigation; responses carrying an older generation are
/// dropped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub generation: u64,
    pub route: Route,
}

const LANGUAGE_LINE_OPACITY: f32 = 0.5;
const PAIR_LINE_OPACITY: f32 = 0.7;

pub struct ViewStateController {
    data: Arc<ReferenceData>,
    selection: Selection,
    panel_open: bool,
    generation: u64,
    pending: Option<Route>,
    route: Option<Route>,
    highlighted: HashSet<String>,
    main: Option<String>,
    relations: RelationRenderer,
    pending_fit: Option<Vec<String>>,
    last_error: Option<String>,
}

impl ViewStateController {
    pub fn new(data: Arc<ReferenceData>) -> Self {
        Self {
            data,
            selection: Selection::None,
            panel_open: false,
            generation: 0,
            pending: None,
            route: None,
            highlighted: HashSet::new(),
            main: None,
            relations: RelationRenderer::new(),
            pending_fit: None,
            last_error: None,
        }
    }

    pub fn data(&self) -> &Arc<ReferenceData> {
        &self.data
    }

    pub fn mode(&self) -> ViewMode {
        self.selection.mode()
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Sub-panel matching the current mode, whether or not the panel is open.
    pub fn sub_panel(&self) -> Option<SubPanel> {
        match self.mode() {
            ViewMode::None => None,
            ViewMode::Language => Some(SubPanel::Language),
            ViewMode::Pair => Some(SubPanel::Pair),
            ViewMode::Word => Some(SubPanel::Word),
        }
    }

    pub fn visible_sub_panels(&self) -> Vec<SubPanel> {
        if !self.panel_open {
            return Vec::new();
        }
        self.sub_panel().into_iter().collect()
    }

    pub fn is_panel_open(&self) -> bool {
        self.panel_open
    }

    pub fn set_panel_open(&mut self, open: bool) {
        self.panel_open = open;
    }

    pub fn route(&self) -> Option<&Route> {
        self.route.as_ref()
    }

    pub fn pending_route(&self) -> Option<&Route> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn dismiss_error(&mut self) {
        self.last_error = None;
    }

    pub fn relations(&self) -> &RelationRenderer {
        &self.relations
    }

    pub fn highlighted(&self) -> &HashSet<String> {
        &self.highlighted
    }

    pub fn main_language(&self) -> Option<&str> {
        self.main.as_deref()
    }

    pub fn focus(&self) -> MapFocus<'_> {
        MapFocus { highlighted: &self.highlighted, main: self.main.as_deref() }
    }

    /// Isocodes the map should frame, once per applied transition.
    pub fn take_fit_request(&mut self) -> Option<Vec<String>> {
        self.pending_fit.take()
    }

    /// Drops relation lines whose fade-out has finished.
    pub fn tick(&mut self, now: f64) {
        self.relations.prune(now);
    }

    /// Starts a navigation, superseding any request still in flight.
    pub fn navigate(&mut self, route: Route) -> FetchTicket {
        self.generation += 1;
        log::debug!("navigate to {} (generation {})", route, self.generation);
        self.pending = Some(route.clone());
        FetchTicket { generation: self.generation, route }
    }

    /// Applies a lookup result if it answers the latest navigation. Returns
    /// false when the response is stale and was discarded.
    pub fn accept(&mut self, generation: u64, result: Result<Payload>, now: f64) -> bool {
        if generation != self.generation {
            log::debug!("discarding stale response (generation {}, current {})", generation, self.generation);
            return false;
        }
        let route = self.pending.take();
        let applied = result.and_then(|payload| match payload {
            Payload::Language(info) => self.select_language(info, now),
            Payload::Pair(forward, backward) => self.select_pair(forward, backward, now),
            Payload::Word(info) => self.select_word(info, now),
        });
        if let Err(e) = applied {
            let what = route.map(|r| r.to_string()).unwrap_or_default();
            log::warn!("lookup {} failed: {}", what, e);
            self.last_error = Some(e.to_string());
        }
        true
    }

    fn begin_transition(&mut self, route: Route, selection: Selection, now: f64) {
        // direct selections win over whatever is still loading
        self.generation += 1;
        self.pending = None;
        self.relations.clear(now);
        self.highlighted.clear();
        self.main = None;
        self.last_error = None;
        self.selection = selection;
        self.panel_open = true;
        self.route = Some(route);
    }

    fn finish_transition(&mut self, main: &str, mut focus: Vec<String>) {
        focus.retain(|iso| self.data.network.contains(iso));
        self.highlighted = focus.iter().cloned().collect();
        self.main = self.data.network.contains(main).then(|| main.to_string());
        self.pending_fit = Some(focus);
    }

    /// Shows a language: one line to every language it gives words to,
    /// each opening the pair when clicked.
    pub fn select_language(&mut self, info: LangInfo, now: f64) -> Result<()> {
        let iso = info.lang.clone();
        self.data.network.language(&iso)?;
        let route = Route::language(iso.as_str());
        let owner = route.to_string();
        let data = Arc::clone(&self.data);
        self.begin_transition(route, Selection::Language(info), now);

        let mut focus = vec![iso.clone()];
        for (other, proportion) in data.network.from_proportion(&iso) {
            let style = LineStyle { width: 0.5 + *proportion as f32, color: Color32::WHITE, opacity: LANGUAGE_LINE_OPACITY };
            self.relations.add_path(
                &[iso.clone(), other.clone()],
                style,
                Some((iso.clone(), other.clone())),
                &owner,
                now,
            );
            focus.push(other.clone());
        }
        self.finish_transition(&iso, focus);
        Ok(())
    }

    /// Shows a language pair from both directions; `forward` is src to dst.
    pub fn select_pair(&mut self, forward: PairInfo, backward: PairInfo, now: f64) -> Result<()> {
        let (src, dst) = (forward.lang_src.clone(), forward.lang_to.clone());
        self.data.network.language(&src)?;
        self.data.network.language(&dst)?;
        let route = Route::pair(src.as_str(), dst.as_str());
        let owner = route.to_string();
        let proportion = self.data.network.proportion_from(&src, &dst).unwrap_or_else(|| {
            log::warn!("{}", EtymapError::NoRelation { src: src.clone(), dst: dst.clone() });
            0.0
        });
        self.begin_transition(route, Selection::Pair { forward, backward }, now);

        let style = LineStyle { width: 0.5 + proportion as f32, color: Color32::WHITE, opacity: PAIR_LINE_OPACITY };
        self.relations.add_path(&[src.clone(), dst.clone()], style, None, &owner, now);
        self.finish_transition(&src, vec![src.clone(), dst]);
        Ok(())
    }

    /// Shows a word: one line chain per ancestry path. Languages missing
    /// from the coordinate table are skipped.
    pub fn select_word(&mut self, info: WordInfo, now: f64) -> Result<()> {
        let lang = info.lang.clone();
        let route = Route::word(info.word.as_str(), lang.as_str());
        let owner = route.to_string();
        let paths = info.ancestry_paths();
        self.begin_transition(route, Selection::Word(info), now);

        let mut focus = vec![lang.clone()];
        for path in paths {
            let known: Vec<String> = path
                .into_iter()
                .filter(|iso| {
                    let ok = self.data.network.contains(iso);
                    if !ok {
                        log::warn!("{}", EtymapError::UnknownLanguage(iso.clone()));
                    }
                    ok
                })
                .collect();
            for iso in &known {
                if !focus.contains(iso) {
                    focus.push(iso.clone());
                }
            }
            if known.len() >= 2 {
                let style = LineStyle { width: 1.0, color: Color32::WHITE, opacity: 1.0 };
                self.relations.add_path(&known, style, None, &owner, now);
            }
        }
        self.finish_transition(&lang, focus);
        Ok(())
    }

    /// Background click: back to no selection with the panel closed.
    pub fn clear(&mut self, now: f64) {
        self.generation += 1;
        self.pending = None;
        self.relations.clear(now);
        self.highlighted.clear();
        self.main = None;
        self.selection = Selection::None;
        self.panel_open = false;
        self.route = None;
    }
}
