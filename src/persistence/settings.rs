use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSettings {
    // Base URL of the lookup API used by the explorer
    #[serde(default = "AppSettings::default_api_url")]
    pub api_base_url: String,
    // Reference data and index files (lang_network.json, world.geo.json, ...)
    #[serde(default = "AppSettings::default_data_dir")]
    pub data_dir: PathBuf,
    // Answer lookups from the local index instead of HTTP
    #[serde(default)]
    pub offline: bool,
    // Host the lookup API inside the GUI process (actix)
    #[serde(default)]
    pub embedded_server: bool,
    #[serde(default = "AppSettings::default_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "AppSettings::default_port")]
    pub api_port: u16,
    // If None, server traffic logs go to OS temp dir
    #[serde(default)]
    pub api_log_override: Option<PathBuf>,
    #[serde(default = "AppSettings::default_panel_width")]
    pub side_panel_width: f32,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            api_base_url: Self::default_api_url(),
            data_dir: Self::default_data_dir(),
            offline: false,
            embedded_server: false,
            api_bind_addr: Self::default_bind_addr(),
            api_port: Self::default_port(),
            api_log_override: None,
            side_panel_width: Self::default_panel_width(),
        }
    }
}

impl AppSettings {
    fn config_dir() -> PathBuf {
        // Cross-platform user config dir
        #[cfg(target_os = "macos")]
        {
            // ~/Library/Application Support/Etymap
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join("Library").join("Application Support").join("Etymap");
        }
        #[cfg(target_os = "windows")]
        {
            // %APPDATA%\Etymap
            if let Ok(appdata) = std::env::var("APPDATA") {
                return PathBuf::from(appdata).join("Etymap");
            }
            return PathBuf::from("Etymap");
        }
        #[cfg(all(unix, not(target_os = "macos")))]
        {
            // $XDG_CONFIG_HOME/Etymap or ~/.config/Etymap
            if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
                return PathBuf::from(xdg).join("Etymap");
            }
            let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("~"));
            return home.join(".config").join("Etymap");
        }
    }

    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_dir().join("settings.json"))
    }

    /// Reads settings from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut f = std::fs::File::open(path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        let v: Self = serde_json::from_str(&s)?;
        Ok(v)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        self.save_to(&Self::config_dir().join("settings.json"))
    }

    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let s = serde_json::to_string_pretty(self)?;
        let mut f = std::fs::File::create(path)?;
        f.write_all(s.as_bytes())?;
        Ok(())
    }

    pub(crate) fn default_api_url() -> String { "http://127.0.0.1:8787".to_string() }
    pub(crate) fn default_data_dir() -> PathBuf { PathBuf::from("data") }
    pub(crate) fn default_bind_addr() -> String { "127.0.0.1".to_string() }
    pub(crate) fn default_port() -> u16 { 8787 }
    pub(crate) fn default_panel_width() -> f32 { 420.0 }

    pub fn api_endpoint(&self) -> String {
        format!("{}:{}", self.api_bind_addr, self.api_port)
    }

    /// URL of the embedded server as seen from this process.
    pub fn local_api_url(&self) -> String {
        let host = if self.api_bind_addr == "0.0.0.0" { "127.0.0.1" } else { self.api_bind_addr.as_str() };
        format!("http://{}:{}", host, self.api_port)
    }

    /// Default API log directory when no override is set: OS temporary directory.
    /// Example: {temp_dir}/Etymap/api-logs
    pub fn api_log_default_dir() -> PathBuf {
        let mut p = std::env::temp_dir();
        p.push("Etymap");
        p.push("api-logs");
        p
    }

    /// Effective API log directory honoring user override or falling back to OS temp.
    pub fn api_log_dir(&self) -> PathBuf {
        if let Some(p) = &self.api_log_override { return p.clone(); }
        Self::api_log_default_dir()
    }
}
