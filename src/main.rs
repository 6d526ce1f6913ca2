use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use eframe::egui;

use etymap::api::client::HttpLookup;
use etymap::api::{self, LookupSource};
use etymap::gui::frontend::EtymapApp;
use etymap::gui::routes::Route;
use etymap::lang_data::index::DataIndex;
use etymap::persistence::settings::AppSettings;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Directory holding lang_network.json, world.geo.json and the index files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Base URL of the lookup API
    #[arg(long)]
    api_url: Option<String>,
    /// Answer lookups from the local index files instead of the API
    #[arg(long)]
    offline: bool,
    /// Serve the lookup API from this process and use it
    #[arg(long)]
    embedded_server: bool,
    /// View to open first, e.g. l/fra, r/lat/fra or w/car/eng
    route: Option<String>,
}

fn lookup_source(settings: &AppSettings) -> anyhow::Result<Arc<dyn LookupSource>> {
    if settings.offline {
        let index = DataIndex::load(&settings.data_dir)
            .with_context(|| format!("loading the index from {}", settings.data_dir.display()))?;
        return Ok(Arc::new(index));
    }
    if settings.embedded_server {
        let index = DataIndex::load(&settings.data_dir)
            .with_context(|| format!("loading the index from {}", settings.data_dir.display()))?;
        api::server::start_server(settings, Arc::new(index))?;
        log::info!("embedded API on {}", settings.local_api_url());
        return Ok(Arc::new(HttpLookup::new(&settings.local_api_url())?));
    }
    Ok(Arc::new(HttpLookup::new(&settings.api_base_url)?))
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = AppSettings::load().unwrap_or_else(|e| {
        log::warn!("settings unreadable, using defaults: {:#}", e);
        AppSettings::default()
    });
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(url) = args.api_url {
        settings.api_base_url = url;
    }
    settings.offline |= args.offline;
    settings.embedded_server |= args.embedded_server;

    let initial_route = args.route.as_deref().map(str::parse::<Route>).transpose()?;
    let source = lookup_source(&settings)?;

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1300.0, 780.0])
            .with_min_inner_size([700.0, 420.0])
            .with_resizable(true),
        ..Default::default()
    };
    let result = eframe::run_native(
        "Etymap",
        options,
        Box::new(move |cc| Ok(Box::new(EtymapApp::new(cc, settings, source, initial_route)) as Box<dyn eframe::App>)),
    );
    api::server::stop_server();
    result.map_err(|e| anyhow::anyhow!("window closed with an error: {}", e))
}
