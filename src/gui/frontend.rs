use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use eframe::egui::{self, Color32, RichText};

use super::diagrams::DiagramAction;
use super::diagrams::alluvial::AlluvialDiagram;
use super::diagrams::chord::ChordDiagram;
use super::diagrams::etymology::EtymologyTree;
use super::map_view::MapView;
use super::routes::Route;
use super::view_state::{Selection, ViewStateController};
use super::worker::FetchWorker;
use crate::api::{self, LangInfo, LookupSource, PairInfo, SearchEntry};
use crate::lang_data::ReferenceData;
use crate::lang_data::index::DataIndex;
use crate::lang_data::network::LanguageNetwork;
use crate::lang_data::word::WordInfo;
use crate::persistence::settings::AppSettings;

const SAMPLE_WORDS: usize = 6;
const TOP_LETTERS: usize = 5;

pub struct EtymapApp {
    settings: AppSettings,
    source: Arc<dyn LookupSource>,
    initial_route: Option<Route>,
    state: AppState,
}

enum AppState {
    Loading { rx: Receiver<Result<ReferenceData, String>> },
    Ready(Box<Explorer>),
    Error(String),
}

impl EtymapApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        settings: AppSettings,
        source: Arc<dyn LookupSource>,
        initial_route: Option<Route>,
    ) -> Self {
        let state = Self::start_load(settings.data_dir.clone());
        Self { settings, source, initial_route, state }
    }

    fn start_load(dir: PathBuf) -> AppState {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let result = ReferenceData::load(&dir).map_err(|e| format!("{:#}", e));
            let _ = tx.send(result);
        });
        AppState::Loading { rx }
    }
}

impl eframe::App for EtymapApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let mut transition = None;

        match &mut self.state {
            AppState::Loading { rx } => {
                match rx.try_recv() {
                    Ok(Ok(data)) => {
                        let mut explorer = Explorer::new(Arc::new(data), Arc::clone(&self.source), &self.settings);
                        if let Some(route) = self.initial_route.take() {
                            explorer.go(route, ctx);
                        }
                        transition = Some(AppState::Ready(Box::new(explorer)));
                    }
                    Ok(Err(e)) => transition = Some(AppState::Error(e)),
                    Err(TryRecvError::Disconnected) => {
                        transition = Some(AppState::Error("reference data loader stopped unexpectedly".into()))
                    }
                    Err(TryRecvError::Empty) => {}
                }
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() / 3.0);
                        ui.spinner();
                        ui.label(format!("Loading reference data from {}", self.settings.data_dir.display()));
                    });
                });
                ctx.request_repaint();
            }
            AppState::Ready(explorer) => explorer.ui(ctx),
            AppState::Error(msg) => {
                let mut retry = false;
                egui::CentralPanel::default().show(ctx, |ui| {
                    ui.vertical_centered(|ui| {
                        ui.add_space(ui.available_height() / 3.0);
                        ui.heading("Could not load reference data");
                        ui.colored_label(Color32::RED, msg.as_str());
                        retry = ui.button("Retry").clicked();
                    });
                });
                if retry {
                    transition = Some(Self::start_load(self.settings.data_dir.clone()));
                }
            }
        }

        if let Some(next) = transition {
            self.state = next;
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        let AppState::Ready(explorer) = &self.state else { return };
        // command line overrides are not persisted, only the panel width
        let mut stored = AppSettings::load().unwrap_or_default();
        stored.side_panel_width = explorer.panel_width;
        if let Err(e) = stored.save() {
            log::warn!("could not save settings: {:#}", e);
        }
    }
}

struct Explorer {
    view: ViewStateController,
    map: MapView,
    worker: FetchWorker,
    search_text: String,
    suggestions: Vec<SearchEntry>,
    route_text: String,
    route_error: Option<String>,
    shown_route: Option<Route>,
    panel_width: f32,
    settings: AppSettings,
    // loaded on the first start from the GUI, reused on restarts
    server_index: Option<Arc<DataIndex>>,
    server_error: Option<String>,
}

impl Explorer {
    fn new(data: Arc<ReferenceData>, source: Arc<dyn LookupSource>, settings: &AppSettings) -> Self {
        Self {
            view: ViewStateController::new(data),
            map: MapView::new(),
            worker: FetchWorker::new(source),
            search_text: String::new(),
            suggestions: Vec::new(),
            route_text: String::new(),
            route_error: None,
            shown_route: None,
            panel_width: settings.side_panel_width,
            settings: settings.clone(),
            server_index: None,
            server_error: None,
        }
    }

    fn start_server(&mut self) -> anyhow::Result<()> {
        let index = match &self.server_index {
            Some(index) => Arc::clone(index),
            None => {
                let index = Arc::new(DataIndex::load(&self.settings.data_dir)?);
                self.server_index = Some(Arc::clone(&index));
                index
            }
        };
        api::server::start_server(&self.settings, index)
    }

    fn server_menu(&mut self, ui: &mut egui::Ui) {
        if api::server::is_running() {
            ui.label(format!("Lookup API on {}", self.settings.local_api_url()));
            if ui.button("Stop server").clicked() {
                api::server::stop_server();
                log::info!("lookup API stopped from the GUI");
                ui.close();
            }
        } else {
            ui.label("Lookup API stopped");
            if ui.button("Start server").clicked() {
                self.server_error = self.start_server().err().map(|e| format!("{:#}", e));
                if let Some(err) = &self.server_error {
                    log::warn!("could not start the lookup API: {}", err);
                }
                ui.close();
            }
        }
        if let Some(err) = &self.server_error {
            ui.colored_label(Color32::RED, err);
        }
    }

    fn go(&mut self, route: Route, ctx: &egui::Context) {
        let ticket = self.view.navigate(route);
        self.worker.spawn(ticket, ctx);
    }

    fn ui(&mut self, ctx: &egui::Context) {
        let now = ctx.input(|i| i.time);
        for (generation, result) in self.worker.poll() {
            self.view.accept(generation, result, now);
        }
        if let Some(result) = self.worker.poll_search() {
            match result {
                Ok(entries) => self.suggestions = entries,
                Err(e) => log::warn!("search failed: {}", e),
            }
        }
        self.view.tick(now);
        if self.view.route() != self.shown_route.as_ref() {
            self.shown_route = self.view.route().cloned();
            self.route_text = self.shown_route.as_ref().map(|r| r.to_string()).unwrap_or_default();
        }

        let mut nav: Option<Route> = None;
        self.top_bar(ctx, &mut nav);
        if self.view.is_panel_open() {
            let shown = egui::SidePanel::right("detail_panel")
                .resizable(true)
                .default_width(self.panel_width)
                .show(ctx, |ui| self.detail_panel(ui, &mut nav));
            self.panel_width = shown.response.rect.width();
        }

        let data = Arc::clone(self.view.data());
        egui::CentralPanel::default().frame(egui::Frame::NONE).show(ctx, |ui| {
            let resp = self.map.show(ui, &data, &self.view.focus(), self.view.relations(), now);
            if let Some(iso) = resp.clicked_language {
                nav = Some(Route::language(iso));
            } else if let Some((src, dst)) = resp.clicked_pair {
                nav = Some(Route::pair(src, dst));
            } else if resp.background_clicked {
                self.view.clear(now);
            }
        });
        if let Some(isocodes) = self.view.take_fit_request() {
            // the docked side panel is already outside the map area
            self.map.fit_to(&isocodes, 0.0, now);
            ctx.request_repaint();
        }

        if let Some(route) = nav {
            self.worker.cancel_search();
            self.suggestions.clear();
            self.go(route, ctx);
        }
    }

    fn top_bar(&mut self, ctx: &egui::Context, nav: &mut Option<Route>) {
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Etymap").strong());
                ui.separator();

                let search = ui.add(
                    egui::TextEdit::singleline(&mut self.search_text)
                        .hint_text("Search a word or a language")
                        .desired_width(240.0),
                );
                if search.changed() {
                    let query = self.search_text.trim().to_string();
                    if query.is_empty() {
                        self.worker.cancel_search();
                        self.suggestions.clear();
                    } else {
                        self.worker.search(&query, ctx);
                    }
                }

                ui.separator();
                ui.label("Route");
                let route_box = ui.add(egui::TextEdit::singleline(&mut self.route_text).desired_width(200.0));
                if route_box.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                    match self.route_text.parse::<Route>() {
                        Ok(route) => {
                            self.route_error = None;
                            *nav = Some(route);
                        }
                        Err(e) => self.route_error = Some(e.to_string()),
                    }
                }
                if let Some(err) = &self.route_error {
                    ui.colored_label(Color32::RED, err);
                }

                if self.view.is_loading() {
                    ui.spinner();
                }
                ui.separator();
                ui.menu_button("Server", |ui| self.server_menu(ui));
                if !self.view.is_panel_open() && self.view.sub_panel().is_some() && ui.button("Show details").clicked() {
                    self.view.set_panel_open(true);
                }
            });

            if !self.suggestions.is_empty() {
                let network = &self.view.data().network;
                ui.horizontal_wrapped(|ui| {
                    for entry in &self.suggestions {
                        let lang = network.name_or_code(&entry.lang);
                        let (text, route) = match &entry.word {
                            Some(word) => (format!("{} ({})", word, lang), Route::word(word.as_str(), entry.lang.as_str())),
                            None => (lang.to_string(), Route::language(entry.lang.as_str())),
                        };
                        if ui.small_button(text).clicked() {
                            *nav = Some(route);
                        }
                    }
                });
            }
        });
    }

    fn detail_panel(&mut self, ui: &mut egui::Ui, nav: &mut Option<Route>) {
        ui.horizontal(|ui| {
            if let Some(panel) = self.view.sub_panel() {
                ui.small(panel.as_str());
            }
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.small_button("✕").on_hover_text("Close panel").clicked() {
                    self.view.set_panel_open(false);
                }
            });
        });
        if let Some(err) = self.view.last_error().map(str::to_string) {
            egui::Frame::group(ui.style()).fill(Color32::from_rgb(0x5a, 0x1e, 0x1e)).show(ui, |ui| {
                ui.horizontal(|ui| {
                    ui.colored_label(Color32::WHITE, err);
                    if ui.small_button("Dismiss").clicked() {
                        self.view.dismiss_error();
                    }
                });
            });
        }
        ui.separator();

        let data = Arc::clone(self.view.data());
        let network = &data.network;
        let mut action = None;
        egui::ScrollArea::vertical().auto_shrink([false, false]).show(ui, |ui| {
            action = match self.view.selection() {
                Selection::None => None,
                Selection::Language(info) => language_panel(ui, network, info),
                Selection::Pair { forward, backward } => pair_panel(ui, network, forward, backward),
                Selection::Word(info) => word_panel(ui, network, info),
            };
        });
        if let Some(a) = action {
            *nav = Some(action_route(a));
        }
    }
}

fn action_route(action: DiagramAction) -> Route {
    match action {
        DiagramAction::Language(iso) => Route::language(iso),
        DiagramAction::Pair(src, dst) => Route::pair(src, dst),
        DiagramAction::Word { word, lang } => Route::word(word, lang),
    }
}

fn stat_card(ui: &mut egui::Ui, title: &str, value: String) {
    egui::Frame::group(ui.style()).show(ui, |ui| {
        ui.vertical(|ui| {
            ui.small(title);
            ui.label(RichText::new(value).strong());
        });
    });
}

fn sample_buttons(ui: &mut egui::Ui, samples: &[String], lang: &str) -> Option<DiagramAction> {
    let mut action = None;
    ui.horizontal_wrapped(|ui| {
        for word in samples.iter().take(SAMPLE_WORDS) {
            if ui.button(word).clicked() {
                action = Some(DiagramAction::Word { word: word.clone(), lang: lang.to_string() });
            }
        }
        if samples.is_empty() {
            ui.weak("No sample words.");
        }
    });
    action
}

fn language_panel(ui: &mut egui::Ui, network: &LanguageNetwork, info: &LangInfo) -> Option<DiagramAction> {
    let mut action = None;
    let iso = info.lang.as_str();
    ui.heading(info.name.as_deref().unwrap_or_else(|| network.name_or_code(iso)));
    if let Ok(lang) = network.language(iso) {
        ui.horizontal_wrapped(|ui| {
            if let Some(count) = lang.count {
                stat_card(ui, "Words", count.to_string());
            }
            if let Some(mean) = lang.mean_length {
                stat_card(ui, "Mean length", format!("{:.2}", mean));
            }
            if let Some(median) = lang.median_length {
                stat_card(ui, "Median length", format!("{:.1}", median));
            }
        });
        let letters = lang.top_letters(TOP_LETTERS);
        if !letters.is_empty() {
            let text = letters.iter().map(|(l, f)| format!("{} {:.1}%", l, f * 100.0)).collect::<Vec<_>>().join("  ");
            ui.label(format!("Most frequent letters: {}", text));
        }
    }

    ui.add_space(6.0);
    ui.strong("Sample words");
    action = action.or(sample_buttons(ui, &info.samples, iso));

    ui.add_space(6.0);
    ui.strong("Borrowing flows");
    action = action.or(AlluvialDiagram::show(ui, network, iso));

    ui.add_space(6.0);
    ui.strong("Closest languages");
    action.or(ChordDiagram::show(ui, network, iso))
}

fn pair_direction(ui: &mut egui::Ui, network: &LanguageNetwork, info: &PairInfo) -> Option<DiagramAction> {
    let (from, to) = (info.lang_src.as_str(), info.lang_to.as_str());
    let (from_name, to_name) = (network.name_or_code(from), network.name_or_code(to));
    let mut action = None;

    ui.heading(format!("From {} to {}", from_name, to_name));
    if ui.link(from_name).clicked() {
        action = Some(DiagramAction::Language(from.to_string()));
    }

    let words = network.count_from(from, to).unwrap_or(0);
    ui.label(format!("{} words come from {} to {}.", words, from_name, to_name));
    if let Some(total) = network.language(to).ok().and_then(|l| l.count).filter(|c| *c > 0) {
        let share = words as f64 / total as f64 * 100.0;
        ui.label(format!("That is {:.1} % of {}'s words.", share, to_name));
    }

    ui.strong("Sample words");
    action = action.or(sample_buttons(ui, &info.samples, from));

    ui.strong(format!("Other relations for {}", from_name));
    action.or(AlluvialDiagram::show(ui, network, from))
}

fn pair_panel(ui: &mut egui::Ui, network: &LanguageNetwork, forward: &PairInfo, backward: &PairInfo) -> Option<DiagramAction> {
    let first = pair_direction(ui, network, forward);
    ui.separator();
    let second = pair_direction(ui, network, backward);
    first.or(second)
}

fn word_list(ui: &mut egui::Ui, network: &LanguageNetwork, pairs: &[&(String, String)]) -> Option<DiagramAction> {
    let mut action = None;
    if pairs.is_empty() {
        ui.weak("None known.");
    }
    for (lang, word) in pairs.iter().map(|p| (&p.0, &p.1)) {
        ui.horizontal(|ui| {
            if ui.button(word).clicked() {
                action = Some(DiagramAction::Word { word: word.clone(), lang: lang.clone() });
            }
            if ui.link(network.name_or_code(lang)).clicked() {
                action = Some(DiagramAction::Language(lang.clone()));
            }
        });
    }
    action
}

fn word_panel(ui: &mut egui::Ui, network: &LanguageNetwork, info: &WordInfo) -> Option<DiagramAction> {
    let mut action = None;
    ui.heading(&info.word);
    if ui.link(network.name_or_code(&info.lang)).clicked() {
        action = Some(DiagramAction::Language(info.lang.clone()));
    }

    ui.add_space(6.0);
    ui.strong("Synonyms");
    let synonyms: Vec<&(String, String)> = info.same_language_synonyms().collect();
    action = action.or(word_list(ui, network, &synonyms));

    ui.strong("Translations");
    let translations: Vec<&(String, String)> = info.translations().collect();
    action = action.or(word_list(ui, network, &translations));

    if !info.homographs.is_empty() {
        ui.strong("Same spelling in");
        ui.horizontal_wrapped(|ui| {
            for iso in &info.homographs {
                if ui.small_button(network.name_or_code(iso)).clicked() {
                    action = Some(DiagramAction::Word { word: info.word.clone(), lang: iso.clone() });
                }
            }
        });
    }

    ui.add_space(6.0);
    ui.strong(format!("Etymology of {}", info.word));
    action.or(EtymologyTree::show(ui, network, info))
}
