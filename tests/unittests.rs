use std::collections::HashMap;
use std::f32::consts::TAU;
use std::sync::Arc;
use std::time::{Duration, Instant};

use egui::{Rect, pos2, vec2};

use etymap::api::client::HttpLookup;
use etymap::api::{LangInfo, LookupSource, PairInfo};
use etymap::error::EtymapError;
use etymap::gui::diagrams::alluvial::{self, FlowEntry, influence_entries, with_other_bucket};
use etymap::gui::diagrams::chord::{chord_layout, chord_members, relation_matrix};
use etymap::gui::diagrams::etymology::{self, half_stats, smart_trim};
use etymap::gui::geometry::polyline_prefix;
use etymap::gui::map_view::{
    LabelCandidate, MAX_SCALE, MIN_SCALE, SINGLE_POINT_SCALE, ZoomTransform, constrain, fit_transform,
    marker_opacity, reproject, resolve_label_collisions,
};
use etymap::gui::relations::{FADE_OUT_SECS, LineGeometry, LineStyle, RelationRenderer, loop_angle};
use etymap::gui::routes::Route;
use etymap::gui::view_state::{Payload, SubPanel, ViewMode, ViewStateController};
use etymap::gui::worker::{FetchWorker, fetch};
use etymap::lang_data::ReferenceData;
use etymap::lang_data::geo::{Basemap, NaturalEarth};
use etymap::lang_data::index::{DataIndex, LangEntry, SEARCH_LIMIT};
use etymap::lang_data::network::LanguageNetwork;
use etymap::lang_data::word::{EtymologyNode, WordInfo};
use etymap::persistence::settings::AppSettings;

const NETWORK_JSON: &str = r#"{
  "locations": {
    "eng": {"name": "English", "longitude": -1.5, "latitude": 52.0, "count": 500000},
    "fra": {"name": "French", "longitude": 2.3, "latitude": 47.0, "count": 300000},
    "lat": {"name": "Latin", "longitude": 12.5, "latitude": 41.9, "count": 200000},
    "deu": {"name": "German", "longitude": 10.0, "latitude": 51.0, "count": 250000},
    "grc": {"name": "Ancient Greek", "longitude": 23.7, "latitude": 38.0, "count": 90000}
  },
  "from": {
    "eng": [["fra", 600], ["lat", 300], ["deu", 100], ["eng", 5], ["xxx", 9]],
    "fra": [["lat", 800], ["eng", 50]],
    "lat": [["grc", 70]]
  },
  "to": {
    "fra": [["eng", 600]],
    "lat": [["eng", 300], ["fra", 800]],
    "eng": [["fra", 50]],
    "deu": [["eng", 100]],
    "grc": [["lat", 70]]
  }
}"#;

fn network() -> LanguageNetwork {
    LanguageNetwork::from_json_str(NETWORK_JSON).expect("fixture network should parse")
}

fn reference() -> Arc<ReferenceData> {
    Arc::new(ReferenceData { network: network(), basemap: Basemap::default() })
}

fn node(word: &str, lang: &str, children: Vec<EtymologyNode>) -> EtymologyNode {
    EtymologyNode::leaf(word, lang).with_children(children)
}

fn car() -> WordInfo {
    let mut w = WordInfo::new("car", "eng");
    w.parents = vec![node("char", "fra", vec![node("carrus", "lat", vec![])])];
    w
}

fn automobile() -> WordInfo {
    let mut w = WordInfo::new("automobile", "eng");
    w.parents = vec![node(
        "automobile",
        "fra",
        vec![node("autós", "grc", vec![]), node("mobilis", "lat", vec![])],
    )];
    w
}

fn lang_info(iso: &str) -> LangInfo {
    LangInfo { lang: iso.to_string(), name: None, samples: vec![] }
}

fn pair_info(src: &str, dst: &str) -> PairInfo {
    PairInfo { lang_src: src.to_string(), lang_to: dst.to_string(), samples: vec![] }
}

// ---------------------------------------------------------------- network

#[test]
fn network_proportions_sum_to_one_or_are_empty() {
    let net = network();
    for lang in net.languages() {
        for list in [net.from_proportion(&lang.isocode), net.to_proportion(&lang.isocode)] {
            if list.is_empty() {
                continue;
            }
            let sum: f64 = list.iter().map(|(_, p)| p).sum();
            assert!((sum - 1.0).abs() <= 1e-9, "{} proportions sum to {}", lang.isocode, sum);
        }
    }
    assert!(net.from_proportion("grc").is_empty());
    let eng = net.from_proportion("eng");
    assert_eq!(eng[0].0, "fra");
    assert!((eng[0].1 - 0.6).abs() < 1e-12);
}

#[test]
fn network_relation_is_from_plus_to() {
    let net = network();
    for lang in net.languages() {
        let Some(rel) = net.relation(&lang.isocode) else { continue };
        for (other, value) in rel {
            let from = net.count_from(&lang.isocode, other).unwrap_or(0);
            let to = net.count_to(&lang.isocode, other).unwrap_or(0);
            assert_eq!(*value, from + to, "relation {} -> {}", lang.isocode, other);
        }
    }
    assert_eq!(net.relation_between("eng", "fra"), 650);
}

#[test]
fn network_drops_self_and_unknown_relations() {
    let net = network();
    assert!(!net.contains("xxx"));
    assert_eq!(net.len(), 5);
    let eng: Vec<&str> = net.from("eng").iter().map(|(o, _)| o.as_str()).collect();
    assert_eq!(eng, vec!["fra", "lat", "deu"]);
    assert!(matches!(net.language("zzz"), Err(EtymapError::UnknownLanguage(code)) if code == "zzz"));
    assert_eq!(net.name_or_code("zzz"), "zzz");
}

#[test]
fn network_csv_import_matches_json_semantics() {
    let coords = "isocode,name,longitude,latitude,count\n\
                  eng,English,-1.0,52.0,100\n\
                  fra,French,2.0,47.0,50\n\
                  xxx,Nowhere,,,0\n";
    let rels = "src_lang,to_lang,count\n\
                eng,fra,30\n\
                fra,eng,10\n\
                eng,eng,4\n\
                eng,xxx,5\n";
    let net = LanguageNetwork::from_csv_readers(
        csv::Reader::from_reader(coords.as_bytes()),
        csv::Reader::from_reader(rels.as_bytes()),
    )
    .expect("csv import");
    assert_eq!(net.len(), 2);
    assert_eq!(net.count_from("eng", "fra"), Some(30));
    assert_eq!(net.from("eng").len(), 1);
    assert_eq!(net.count_to("fra", "eng"), Some(30));
    assert_eq!(net.relation_between("eng", "fra"), 40);
    assert_eq!(net.language("eng").expect("eng").count, Some(100));
}

#[test]
fn network_without_word_counts_keeps_markers_visible() {
    let coords = "isocode,name,longitude,latitude\n\
                  eng,English,-1.0,52.0\n\
                  fra,French,2.0,47.0\n";
    let rels = "src_lang,to_lang,count\neng,fra,3\n";
    let net = LanguageNetwork::from_csv_readers(
        csv::Reader::from_reader(coords.as_bytes()),
        csv::Reader::from_reader(rels.as_bytes()),
    )
    .expect("csv import");
    assert_eq!(net.len(), 2);
    for lang in net.languages() {
        assert_eq!(lang.count, None);
        assert!(marker_opacity(MIN_SCALE, lang.count, None) > 0.01, "{} would never be drawn", lang.isocode);
    }

    let json = r#"{"locations": {"eng": {"name": "English", "longitude": -1.5, "latitude": 52.0}}}"#;
    let net = LanguageNetwork::from_json_str(json).expect("json");
    let eng = net.language("eng").expect("eng");
    assert_eq!(eng.count, None);
    assert_eq!(marker_opacity(MIN_SCALE, eng.count, None), 1.0);
}

#[test]
fn geo_basemap_reads_polygons_and_skips_other_geometry() {
    let geojson = r#"{"type": "FeatureCollection", "features": [
        {"properties": {"name": "Square"}, "geometry": {"type": "Polygon",
            "coordinates": [[[0, 0], [10, 0], [10, 10], [0, 10], [0, 0]]]}},
        {"properties": {"name": "Islands"}, "geometry": {"type": "MultiPolygon",
            "coordinates": [[[[20, 0], [21, 0], [21, 1], [20, 0]]], [[[30, 0], [31, 0], [31, 1], [30, 0]]]]}},
        {"properties": {"name": "Point"}, "geometry": {"type": "Point", "coordinates": [1, 2]}},
        {"properties": {}, "geometry": null}
    ]}"#;
    let map = Basemap::from_geojson_str(geojson).expect("geojson");
    assert_eq!(map.countries.len(), 2);
    assert_eq!(map.countries[0].name, "Square");
    assert_eq!(map.ring_count(), 3);
    assert_eq!(map.countries[1].rings[1][0], (30.0, 0.0));
}

#[test]
fn geo_projection_is_centred_and_inside_world_extent() {
    let proj = NaturalEarth::for_viewport(vec2(700.0, 400.0));
    assert_eq!(proj.project(0.0, 0.0), pos2(350.0, 200.0));
    let extent = proj.world_extent();
    assert!((extent.center().x - 350.0).abs() < 1e-3);
    let net = network();
    for lang in net.languages() {
        let p = proj.project(lang.longitude, lang.latitude);
        assert!(extent.contains(p), "{} projects outside the world", lang.isocode);
    }
    // north is up
    assert!(proj.project(0.0, 60.0).y < proj.project(0.0, -60.0).y);
}

// -------------------------------------------------------------- relations

#[test]
fn relations_self_loop_angle_is_deterministic() {
    let a = loop_angle("fra");
    let b = loop_angle("fra");
    assert_eq!(a, b);
    assert!((0.0..=TAU).contains(&a));

    let p = pos2(120.0, 80.0);
    let first = LineGeometry::between(p, p, "fra");
    let second = LineGeometry::between(p, p, "fra");
    assert!(matches!(first, LineGeometry::Loop { .. }));
    assert_eq!(first, second);
    assert_eq!(first.sample(), second.sample());
}

#[test]
fn relations_draw_in_then_fade_out() {
    let mut r = RelationRenderer::new();
    let path = vec!["eng".to_string(), "fra".to_string(), "lat".to_string()];
    let style = LineStyle { width: 2.0, ..Default::default() };
    r.add_path(&path, style, None, "w/car/eng", 0.0);
    assert_eq!(r.lines().len(), 2);
    assert!((r.lines()[0].reveal(0.5) - 0.5).abs() < 1e-6);
    assert!(r.is_animating(0.5));
    assert!(!r.is_animating(1.0));

    r.clear(1.0);
    assert_eq!(r.active_lines().count(), 0);
    assert!((r.lines()[0].stroke_width(1.0 + FADE_OUT_SECS / 2.0) - 1.0).abs() < 1e-6);
    r.prune(1.0 + FADE_OUT_SECS);
    assert!(r.lines().is_empty());
}

#[test]
fn geometry_polyline_prefix_cuts_by_length() {
    let pts = vec![pos2(0.0, 0.0), pos2(10.0, 0.0), pos2(10.0, 10.0)];
    let half = polyline_prefix(&pts, 0.25);
    assert_eq!(half.last().copied(), Some(pos2(5.0, 0.0)));
    assert_eq!(polyline_prefix(&pts, 1.0), pts);
}

// -------------------------------------------------------------------- map

#[test]
fn map_label_collision_filter_is_idempotent() {
    let candidates = vec![
        LabelCandidate { iso: "eng".into(), rect: Rect::from_min_size(pos2(0.0, 0.0), vec2(50.0, 12.0)), word_count: 500 },
        LabelCandidate { iso: "fra".into(), rect: Rect::from_min_size(pos2(40.0, 5.0), vec2(50.0, 12.0)), word_count: 300 },
        LabelCandidate { iso: "lat".into(), rect: Rect::from_min_size(pos2(200.0, 0.0), vec2(40.0, 12.0)), word_count: 100 },
    ];
    let first = resolve_label_collisions(&candidates, Some("fra"));
    let second = resolve_label_collisions(&candidates, Some("fra"));
    assert_eq!(first, second);
    assert_eq!(first, vec!["fra".to_string(), "lat".to_string()]);

    let by_count = resolve_label_collisions(&candidates, None);
    assert_eq!(by_count, vec!["eng".to_string(), "lat".to_string()]);
}

#[test]
fn map_single_point_fit_has_capped_positive_scale() {
    let viewport = vec2(800.0, 600.0);
    for p in [pos2(100.0, 80.0), pos2(0.0, 0.0), pos2(799.0, 599.0)] {
        let t = fit_transform(&[p], viewport, 300.0).expect("one point fits");
        assert!(t.k > 0.0 && t.k <= MAX_SCALE);
        assert_eq!(t.k, SINGLE_POINT_SCALE);
    }
    let t = fit_transform(&[pos2(100.0, 80.0)], viewport, 300.0).expect("fit");
    assert_eq!(t.apply(pos2(100.0, 80.0)), pos2(250.0, 300.0));

    let close = fit_transform(&[pos2(10.0, 10.0), pos2(10.001, 10.0)], viewport, 0.0).expect("fit");
    assert_eq!(close.k, MAX_SCALE);
    assert!(fit_transform(&[], viewport, 0.0).is_none());
}

#[test]
fn map_constrain_keeps_world_covering_viewport() {
    let extent = Rect::from_min_max(pos2(0.0, 0.0), pos2(800.0, 400.0));
    let viewport = vec2(800.0, 400.0);
    let t = constrain(ZoomTransform { k: 1.0, x: 120.0, y: 0.0 }, viewport, extent);
    assert_eq!(t, ZoomTransform { k: 1.0, x: 0.0, y: 0.0 });

    let t = constrain(ZoomTransform { k: 2.0, x: -2000.0, y: 0.0 }, viewport, extent);
    assert_eq!(t.x, -800.0);
    assert_eq!(t.invert(pos2(800.0, 0.0)).x, 800.0);
}

#[test]
fn map_marker_opacity_follows_zoom_then_focus() {
    assert_eq!(marker_opacity(1.0, Some(500_000), None), 0.5);
    assert_eq!(marker_opacity(2.0, Some(500_000), None), 1.0);
    assert_eq!(marker_opacity(1.0, Some(0), None), 0.0);
    assert_eq!(marker_opacity(1.0, Some(10), Some(true)), 1.0);
    assert!(marker_opacity(30.0, Some(10_000_000), Some(false)) < 1.0);
    assert!(marker_opacity(30.0, None, Some(false)) < 1.0);
}

#[test]
fn map_resize_keeps_the_centred_place() {
    let (old_size, new_size) = (vec2(800.0, 400.0), vec2(500.0, 400.0));
    let (old, new) = (NaturalEarth::for_viewport(old_size), NaturalEarth::for_viewport(new_size));
    let t = fit_transform(&[old.project(10.0, 50.0)], old_size, 0.0).expect("fit");
    assert!(t.apply(old.project(10.0, 50.0)).distance(pos2(400.0, 200.0)) < 1e-2);

    let moved = reproject(t, (old, old_size), (new, new_size));
    assert_eq!(moved.k, t.k);
    let centre = moved.apply(new.project(10.0, 50.0));
    assert!((centre.x - 250.0).abs() < 1e-2, "x drifted to {}", centre.x);
    assert!((centre.y - 200.0).abs() < 1e-2, "y drifted to {}", centre.y);

    let same = reproject(t, (old, old_size), (old, old_size));
    assert!((same.x - t.x).abs() < 1e-2 && (same.y - t.y).abs() < 1e-2);
}

// ------------------------------------------------------------- view state

#[test]
fn view_select_language_shows_only_language_panel() {
    let mut view = ViewStateController::new(reference());
    assert_eq!(view.mode(), ViewMode::None);
    assert!(view.visible_sub_panels().is_empty());

    view.select_language(lang_info("eng"), 0.0).expect("eng is known");
    assert_eq!(view.mode(), ViewMode::Language);
    assert_eq!(view.visible_sub_panels(), vec![SubPanel::Language]);
    assert_eq!(view.visible_sub_panels()[0].as_str(), "language-panel");
    assert_eq!(view.relations().active_lines().count(), 3);
    assert_eq!(view.main_language(), Some("eng"));
    assert!(view.highlighted().contains("deu"));
    assert!(view.take_fit_request().is_some());
    assert!(view.take_fit_request().is_none());
}

#[test]
fn view_new_selection_fades_previous_lines() {
    let mut view = ViewStateController::new(reference());
    view.select_pair(pair_info("eng", "fra"), pair_info("fra", "eng"), 0.0).expect("pair");
    assert_eq!(view.mode(), ViewMode::Pair);

    view.select_language(lang_info("eng"), 0.1).expect("language");
    let old: Vec<_> = view.relations().lines().iter().filter(|l| l.owner == "r/eng/fra").collect();
    assert_eq!(old.len(), 1);
    assert!(old.iter().all(|l| l.is_fading()));
    assert!(view.relations().active_lines().all(|l| l.owner == "l/eng"));
}

#[test]
fn view_word_navigation_leaves_no_stale_lines() {
    let mut view = ViewStateController::new(reference());
    let first = view.navigate("w/car/eng".parse().expect("route"));
    assert!(view.accept(first.generation, Ok(Payload::Word(car())), 0.0));
    assert_eq!(view.relations().active_lines().count(), 2);

    let second = view.navigate("w/automobile/eng".parse().expect("route"));
    assert!(view.accept(second.generation, Ok(Payload::Word(automobile())), 0.3));
    assert!(view.relations().lines().iter().filter(|l| l.owner == "w/car/eng").all(|l| l.is_fading()));

    let done = 0.3 + FADE_OUT_SECS + 1.0;
    view.tick(done);
    let lines = view.relations().lines();
    assert_eq!(lines.len(), 4);
    assert!(lines.iter().all(|l| l.owner == "w/automobile/eng"));
    assert!(lines.iter().all(|l| l.reveal(done) == 1.0));
}

#[test]
fn view_stale_response_is_discarded() {
    let mut view = ViewStateController::new(reference());
    let old = view.navigate(Route::language("eng"));
    let new = view.navigate(Route::language("fra"));
    assert!(!view.accept(old.generation, Ok(Payload::Language(lang_info("eng"))), 0.0));
    assert_eq!(view.mode(), ViewMode::None);
    assert!(view.is_loading());

    assert!(view.accept(new.generation, Ok(Payload::Language(lang_info("fra"))), 0.1));
    assert_eq!(view.main_language(), Some("fra"));
    assert_eq!(view.route(), Some(&Route::language("fra")));
    assert!(!view.is_loading());
}

#[test]
fn view_background_click_returns_to_none() {
    let mut view = ViewStateController::new(reference());
    view.select_language(lang_info("fra"), 0.0).expect("fra");
    let pending = view.navigate(Route::pair("fra", "lat"));
    view.clear(0.5);
    assert_eq!(view.mode(), ViewMode::None);
    assert!(!view.is_panel_open());
    assert!(view.visible_sub_panels().is_empty());
    assert_eq!(view.relations().active_lines().count(), 0);

    let late = Payload::Pair(pair_info("fra", "lat"), pair_info("lat", "fra"));
    assert!(!view.accept(pending.generation, Ok(late), 0.6));
    assert_eq!(view.mode(), ViewMode::None);
}

#[test]
fn view_panel_visibility_is_independent_of_mode() {
    let mut view = ViewStateController::new(reference());
    view.select_word(car(), 0.0).expect("word");
    view.set_panel_open(false);
    assert_eq!(view.mode(), ViewMode::Word);
    assert_eq!(view.sub_panel(), Some(SubPanel::Word));
    assert!(view.visible_sub_panels().is_empty());
    view.set_panel_open(true);
    assert_eq!(view.visible_sub_panels(), vec![SubPanel::Word]);
}

#[test]
fn view_failed_lookup_keeps_current_view() {
    let mut view = ViewStateController::new(reference());
    view.select_language(lang_info("eng"), 0.0).expect("eng");
    let ticket = view.navigate(Route::language("zzz"));
    assert!(view.accept(ticket.generation, Err(EtymapError::UnknownLanguage("zzz".into())), 0.2));
    assert_eq!(view.mode(), ViewMode::Language);
    assert!(view.last_error().is_some_and(|e| e.contains("zzz")));
    view.dismiss_error();
    assert!(view.last_error().is_none());

    assert!(view.select_language(lang_info("zzz"), 0.3).is_err());
    assert_eq!(view.main_language(), Some("eng"));
}

#[test]
fn view_same_language_parent_draws_a_self_loop() {
    let mut view = ViewStateController::new(reference());
    let mut w = WordInfo::new("colour", "eng");
    w.parents = vec![node("colur", "eng", vec![node("color", "lat", vec![])])];
    view.select_word(w, 0.0).expect("word");

    let lines = view.relations().lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].is_self_loop());
    assert_eq!((lines[0].from.as_str(), lines[0].to.as_str()), ("eng", "eng"));
    assert!(!lines[1].is_self_loop());
    assert!(lines.iter().all(|l| l.owner == "w/colour/eng"));
}

#[test]
fn view_word_skips_unknown_languages() {
    let mut view = ViewStateController::new(reference());
    let mut w = WordInfo::new("thing", "eng");
    w.parents = vec![node("þing", "ang", vec![node("þingą", "gem", vec![])])];
    view.select_word(w, 0.0).expect("word");
    assert_eq!(view.relations().lines().len(), 0);
    assert_eq!(view.highlighted().len(), 1);
}

// ----------------------------------------------------------------- routes

#[test]
fn routes_parse_and_render() {
    assert_eq!("w/car/eng".parse::<Route>().expect("word"), Route::word("car", "eng"));
    assert_eq!("#/l/fra".parse::<Route>().expect("lang"), Route::language("fra"));
    assert_eq!("/r/lat/fra/".parse::<Route>().expect("pair"), Route::pair("lat", "fra"));
    for bad in ["", "x/y", "w/car", "l/", "r/lat", "l/fra/eng"] {
        assert!(matches!(bad.parse::<Route>(), Err(EtymapError::InvalidRoute(_))), "{:?} should not parse", bad);
    }
    assert_eq!(Route::pair("lat", "fra").to_string(), "r/lat/fra");
    let r = Route::word("automobile", "eng");
    assert_eq!(r.to_string().parse::<Route>().expect("round trip"), r);
}

// --------------------------------------------------------------- diagrams

#[test]
fn alluvial_other_bucket_takes_the_remainder() {
    let entries = with_other_bucket(vec![FlowEntry::language("fra", 0.5), FlowEntry::language("lat", 0.3)]);
    assert_eq!(entries.len(), 3);
    let other = &entries[2];
    assert_eq!(other.iso, None);
    assert!((other.weight - 0.2).abs() < 1e-9);

    let full = with_other_bucket(vec![FlowEntry::language("fra", 0.75), FlowEntry::language("lat", 0.25)]);
    assert_eq!(full.len(), 2);

    let empty = with_other_bucket(Vec::new());
    assert_eq!(empty, vec![FlowEntry { iso: None, weight: 1.0 }]);
}

#[test]
fn alluvial_keeps_leading_entries_above_threshold() {
    let props = vec![
        ("fra".to_string(), 0.6),
        ("lat".to_string(), 0.3),
        ("deu".to_string(), 0.04),
        ("grc".to_string(), 0.06),
    ];
    let entries = influence_entries(&props);
    let isos: Vec<Option<&str>> = entries.iter().map(|e| e.iso.as_deref()).collect();
    assert_eq!(isos, vec![Some("fra"), Some("lat"), None]);
}

#[test]
fn alluvial_layout_stacks_nodes_with_margin() {
    let inbound = vec![FlowEntry::language("fra", 0.6), FlowEntry::language("lat", 0.3), FlowEntry { iso: None, weight: 0.1 }];
    let outbound = vec![FlowEntry { iso: None, weight: 1.0 }];
    let lay = alluvial::layout(&inbound, &outbound, 440.0);
    let scale = 440.0 / 1.1;
    assert!((lay.left[0].rect.height() - 0.6 * scale).abs() < 1e-3);
    let gap = lay.left[1].rect.min.y - lay.left[0].rect.max.y;
    assert!((gap - alluvial::MARGIN as f32 * scale).abs() < 1e-3);
    assert!((lay.center.height() - scale).abs() < 1e-3);
    assert_eq!(lay.links.len(), 4);
    assert_eq!(lay.right[0].rect.max.x, 440.0);
    // left column spans the full height
    assert!(lay.left[0].rect.min.y.abs() < 1e-3);
    assert!((lay.left[2].rect.max.y - 440.0).abs() < 1e-3);
}

#[test]
fn chord_layout_follows_row_sums() {
    let matrix = vec![vec![0.0, 2.0, 1.0], vec![1.0, 0.0, 0.0], vec![3.0, 0.0, 0.0]];
    let lay = chord_layout(&matrix, 0.05);
    let covered: f32 = lay.groups.iter().map(|g| g.end_angle - g.start_angle).sum();
    assert!((covered - (TAU - 0.15)).abs() < 1e-4);
    assert_eq!(lay.chords.len(), 2);
    assert!(lay.chords.iter().any(|c| c.source.index == 2 && c.target.index == 0));
    assert!(lay.chords.iter().any(|c| c.source.index == 0 && c.target.index == 1));
    // subgroups of a row are sorted by value, largest first
    let row0 = lay.chords.iter().find(|c| c.source.index == 0).expect("row 0 chord");
    assert_eq!(row0.source.start_angle, lay.groups[0].start_angle);

    let zero = chord_layout(&[vec![0.0, 0.0], vec![0.0, 0.0]], 0.05);
    assert!(zero.chords.is_empty());
    assert!((zero.groups[1].start_angle - TAU / 2.0).abs() < 1e-6);
}

#[test]
fn chord_members_and_log_matrix() {
    let net = network();
    let (members, focal) = chord_members(&net, "eng");
    assert_eq!(members, vec!["fra", "lat", "deu", "eng"]);
    assert_eq!(focal, 3);
    let m = relation_matrix(&net, &members);
    assert!((m[3][0] - 601f64.ln()).abs() < 1e-12);
    assert!((m[0][1] - 801f64.ln()).abs() < 1e-12);
    assert_eq!(m[2][2], 0.0);
}

#[test]
fn tree_smart_trim_limits_same_language_relatives() {
    let relatives: Vec<EtymologyNode> = (0..5)
        .map(|i| EtymologyNode::leaf(format!("form{}", i), "lat"))
        .chain([EtymologyNode::leaf("Wort", "deu"), EtymologyNode::leaf("mot", "fra")])
        .collect();
    let kept = smart_trim(&relatives, "lat");
    let words: Vec<&str> = kept.iter().map(|n| n.word.as_str()).collect();
    assert_eq!(words, vec!["form0", "form1", "form2", "Wort", "mot"]);
}

#[test]
fn tree_layout_puts_ancestors_below_and_descendants_above() {
    let mut info = automobile();
    info.children = (0..5)
        .map(|i| EtymologyNode::leaf(format!("automobile{}", i), "eng"))
        .chain([EtymologyNode::leaf("Automobil", "deu")])
        .collect();

    let down = half_stats(&info.parents, &info.lang);
    assert_eq!(down.max_depth, 2);
    assert_eq!(down.max_width(), 2);
    let up = half_stats(&info.children, &info.lang);
    assert_eq!((up.max_depth, up.max_width()), (1, 4));

    let lay = etymology::layout(&info, 500.0);
    assert_eq!(lay.height, 5.0 * etymology::LEVEL_HEIGHT);
    assert_eq!(lay.width, 500.0);
    assert_eq!(lay.nodes.len(), 8);
    assert_eq!(lay.links.len(), 7);

    let focal = &lay.nodes[0];
    assert_eq!(focal.pos, pos2(250.0, 260.0));
    for link in &lay.links {
        let (outer, inner) = (&lay.nodes[link.outer], &lay.nodes[link.inner]);
        match outer.half {
            etymology::Half::Ancestors => assert!(outer.pos.y > inner.pos.y),
            etymology::Half::Descendants => assert!(outer.pos.y < inner.pos.y),
            etymology::Half::Focal => panic!("focal node is never the outer end"),
        }
        assert_eq!(link.cross_language, outer.lang != inner.lang);
        let expected = if link.cross_language { etymology::CROSS_LANGUAGE_WIDTH } else { etymology::SAME_LANGUAGE_WIDTH };
        assert_eq!(link.width(), expected);
    }
}

#[test]
fn word_ancestry_paths_follow_parents_only() {
    let mut w = automobile();
    w.children = vec![EtymologyNode::leaf("Automobil", "deu")];
    assert_eq!(
        w.ancestry_paths(),
        vec![vec!["eng", "fra", "grc"], vec!["eng", "fra", "lat"]]
    );
    assert!(WordInfo::new("x", "eng").ancestry_paths().is_empty());
    assert_eq!(automobile().parents[0].depth(), 2);
}

// ------------------------------------------------------------------ index

fn index() -> DataIndex {
    let mut idx = DataIndex::default();
    for (iso, name) in [("eng", "English"), ("fra", "French"), ("lat", "Latin")] {
        idx.langs.insert(iso.into(), LangEntry { name: name.into() });
    }
    idx.word_langs.insert("car".into(), vec!["eng".into(), "fra".into()]);
    idx.meanings.insert("eng:car".into(), vec!["eng:automobile".into(), "fra:voiture".into()]);
    idx.parents.insert("eng:car".into(), vec!["fra:char".into()]);
    idx.parents.insert("fra:char".into(), vec!["lat:carrus".into()]);
    idx.lang_samples.insert("fra".into(), vec!["voiture".into(), "char".into()]);
    idx.relation_samples.insert("engfra".into(), vec!["ballet".into()]);
    idx.relation_samples.insert("fraeng".into(), vec!["weekend".into()]);
    idx
}

#[test]
fn index_word_lookup_builds_trees_and_synonyms() {
    let idx = index();
    let info = idx.word("car", "eng").expect("car is indexed");
    assert_eq!(info.homographs, vec!["fra"]);
    assert_eq!(info.same_language_synonyms().count(), 1);
    assert_eq!(info.translations().count(), 1);
    assert_eq!(info.parents, vec![node("char", "fra", vec![node("carrus", "lat", vec![])])]);
    assert!(info.children.is_empty());
    assert!(matches!(idx.word("nope", "eng"), Err(EtymapError::UnknownWord { .. })));
}

#[test]
fn index_tree_stops_on_cycles() {
    let mut idx = DataIndex::default();
    let mut parents = HashMap::new();
    parents.insert("eng:a".to_string(), vec!["fra:b".to_string()]);
    parents.insert("fra:b".to_string(), vec!["eng:a".to_string(), "lat:c".to_string()]);
    idx.parents = parents;
    let tree = idx.tree("eng:a", &idx.parents);
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].depth(), 2);
    assert_eq!(tree[0].children[0], EtymologyNode::leaf("a", "eng"));
    assert_eq!(tree[0].children[1], EtymologyNode::leaf("c", "lat"));
}

#[test]
fn index_language_pair_and_search() {
    let idx = index();
    let fra = idx.language("fra").expect("fra");
    assert_eq!(fra.name.as_deref(), Some("French"));
    assert_eq!(fra.samples.len(), 2);
    assert!(matches!(idx.language("zzz"), Err(EtymapError::UnknownLanguage(_))));
    assert!(idx.pair("eng", "zzz").is_err());

    let hits = idx.search("car").expect("search");
    assert_eq!(hits[0].word.as_deref(), Some("car"));
    let langs = idx.search("fr").expect("search");
    assert_eq!(langs.len(), 1);
    assert_eq!(langs[0].lang, "fra");
    assert!(idx.search("  ").expect("search").is_empty());

    let mut many = DataIndex::default();
    for i in 0..30 {
        many.langs.insert(format!("l{:02}", i), LangEntry { name: format!("Lang {:02}", i) });
    }
    assert_eq!(many.search("lang").expect("search").len(), SEARCH_LIMIT);
}

#[test]
fn fetch_pair_asks_both_directions() {
    let idx = index();
    match fetch(&idx, &Route::pair("eng", "fra")).expect("pair") {
        Payload::Pair(forward, backward) => {
            assert_eq!((forward.lang_src.as_str(), forward.lang_to.as_str()), ("eng", "fra"));
            assert_eq!(forward.samples, vec!["ballet"]);
            assert_eq!(backward.samples, vec!["weekend"]);
        }
        other => panic!("unexpected payload {:?}", other),
    }
    assert!(fetch(&idx, &Route::word("nope", "eng")).is_err());
}

#[test]
fn worker_cancelled_search_is_dropped() {
    let ctx = egui::Context::default();
    let mut worker = FetchWorker::new(Arc::new(index()));
    worker.search("car", &ctx);
    worker.cancel_search();
    std::thread::sleep(Duration::from_millis(200));
    assert!(worker.poll_search().is_none());

    worker.search("car", &ctx);
    let deadline = Instant::now() + Duration::from_secs(5);
    let hits = loop {
        if let Some(result) = worker.poll_search() {
            break result.expect("search");
        }
        assert!(Instant::now() < deadline, "search never answered");
        std::thread::sleep(Duration::from_millis(10));
    };
    assert_eq!(hits[0].word.as_deref(), Some("car"));
}

// ------------------------------------------------------- client, settings

#[test]
fn http_lookup_encodes_path_segments() {
    let client = HttpLookup::new("http://127.0.0.1:8787/api/").expect("client");
    let url = client.endpoint(&["word", "a b/c", "eng"]);
    assert_eq!(url.as_str(), "http://127.0.0.1:8787/api/word/a%20b%2Fc/eng");
    assert!(HttpLookup::new("not a url").is_err());
}

#[test]
fn settings_round_trip_and_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join("settings.json");
    assert_eq!(AppSettings::load_from(&path).expect("missing file"), AppSettings::default());

    let s = AppSettings { offline: true, api_port: 9000, side_panel_width: 380.0, ..Default::default() };
    s.save_to(&path).expect("save");
    assert_eq!(AppSettings::load_from(&path).expect("load"), s);

    std::fs::write(&path, r#"{"api_port": 1234}"#).expect("write");
    let partial = AppSettings::load_from(&path).expect("partial");
    assert_eq!(partial.api_port, 1234);
    assert_eq!(partial.api_base_url, AppSettings::default().api_base_url);
    assert_eq!(partial.local_api_url(), "http://127.0.0.1:1234");
}
