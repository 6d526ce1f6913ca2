//! Standalone lookup API: `etymap-server --data-dir data --port 8787`.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use etymap::api::server;
use etymap::lang_data::index::DataIndex;
use etymap::persistence::settings::AppSettings;

#[derive(Debug, Parser)]
#[command(author, version, about = "Serves the Etymap word, language and relation lookups")]
struct Args {
    /// Directory holding langs.json and the other index files
    #[arg(long)]
    data_dir: Option<PathBuf>,
    #[arg(long)]
    bind: Option<String>,
    #[arg(long)]
    port: Option<u16>,
    /// Directory for the daily request logs
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut settings = AppSettings::load().unwrap_or_default();
    if let Some(dir) = args.data_dir {
        settings.data_dir = dir;
    }
    if let Some(bind) = args.bind {
        settings.api_bind_addr = bind;
    }
    if let Some(port) = args.port {
        settings.api_port = port;
    }
    if args.log_dir.is_some() {
        settings.api_log_override = args.log_dir;
    }

    let index = DataIndex::load(&settings.data_dir)
        .with_context(|| format!("loading the index from {}", settings.data_dir.display()))?;
    log::info!("serving on http://{} (logs in {})", settings.api_endpoint(), settings.api_log_dir().display());
    server::run_blocking(&settings, Arc::new(index))
}
