pub mod geo;
pub mod index;
pub mod network;
pub mod word;

use std::path::Path;

use anyhow::Context;

use geo::Basemap;
use network::LanguageNetwork;

pub const NETWORK_FILE: &str = "lang_network.json";
pub const BASEMAP_FILE: &str = "world.geo.json";
pub const COORDINATES_CSV: &str = "filtered_languages_coordinates.csv";
pub const RELATIONS_CSV: &str = "relations.csv";

/// Immutable reference data shared by every renderer once loaded.
#[derive(Clone, Debug, Default)]
pub struct ReferenceData {
    pub network: LanguageNetwork,
    pub basemap: Basemap,
}

impl ReferenceData {
    /// Loads `lang_network.json` (or the CSV exports when it is absent) and the
    /// world outline from `dir`. A missing outline only costs the basemap.
    pub fn load(dir: &Path) -> anyhow::Result<Self> {
        let json = dir.join(NETWORK_FILE);
        let network = if json.exists() {
            LanguageNetwork::load_json(&json).with_context(|| format!("reading {}", json.display()))?
        } else {
            let coords = dir.join(COORDINATES_CSV);
            let rels = dir.join(RELATIONS_CSV);
            log::info!("{} not found, importing {} and {}", json.display(), coords.display(), rels.display());
            LanguageNetwork::load_csv(&coords, &rels)
                .with_context(|| format!("importing language CSV files from {}", dir.display()))?
        };

        let geo = dir.join(BASEMAP_FILE);
        let basemap = match Basemap::load(&geo) {
            Ok(b) => b,
            Err(e) => {
                log::warn!("basemap unavailable ({}): {}", geo.display(), e);
                Basemap::default()
            }
        };
        log::info!("basemap: {} countries, {} rings", basemap.countries.len(), basemap.ring_count());

        Ok(ReferenceData { network, basemap })
    }
}
