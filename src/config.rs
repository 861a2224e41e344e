// download-portal/src/config.rs

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_BIND: &str = "0.0.0.0:8788";
pub const DEFAULT_LIST_LIMIT: usize = 1000;
pub const DEFAULT_WALLPAPER_BASE_URL: &str = "https://www.bing.com";
pub const DEFAULT_WALLPAPER_MARKET: &str = "zh-CN";

/// Fully loaded portal configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Absent means no storage is bound: listings are empty, downloads fail.
    #[serde(default)]
    pub storage: Option<StorageConfig>,
    #[serde(default)]
    pub wallpaper: WallpaperConfig,
}

impl PortalConfig {
    pub fn trace_loaded(&self) {
        info!(
            bind = %self.server.bind,
            storage_bound = self.storage.is_some(),
            wallpaper_base_url = %self.wallpaper.base_url,
            "Loaded PortalConfig"
        );
        if let Some(storage) = &self.storage {
            storage.trace_loaded();
        }
        debug!(?self, "PortalConfig loaded (full debug)");
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind: default_bind(),
        }
    }
}

/// Which backend holds the artifacts. Chosen once at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StorageConfig {
    /// An object store addressed by DSN: `memory://`, `file:///path`, `s3://host/bucket`.
    ObjectStore {
        dsn: String,
        #[serde(default = "default_list_limit")]
        list_limit: usize,
    },
    /// A static JSON manifest of files, optionally served from a public base URL.
    Manifest {
        path: PathBuf,
        #[serde(default)]
        public_url: Option<String>,
    },
}

impl StorageConfig {
    pub fn trace_loaded(&self) {
        match self {
            StorageConfig::ObjectStore { dsn, list_limit } => {
                let scheme = dsn.split("://").next().unwrap_or("");
                info!(scheme = scheme, list_limit = *list_limit, "Loaded object store storage");
            }
            StorageConfig::Manifest { path, public_url } => {
                info!(
                    path = %path.display(),
                    public_url = public_url.as_deref().unwrap_or(""),
                    "Loaded manifest storage"
                );
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WallpaperConfig {
    #[serde(default = "default_wallpaper_base_url")]
    pub base_url: String,
    #[serde(default = "default_wallpaper_market")]
    pub market: String,
}

impl Default for WallpaperConfig {
    fn default() -> Self {
        WallpaperConfig {
            base_url: default_wallpaper_base_url(),
            market: default_wallpaper_market(),
        }
    }
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_list_limit() -> usize {
    DEFAULT_LIST_LIMIT
}

fn default_wallpaper_base_url() -> String {
    DEFAULT_WALLPAPER_BASE_URL.to_string()
}

fn default_wallpaper_market() -> String {
    DEFAULT_WALLPAPER_MARKET.to_string()
}
