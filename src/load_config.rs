/// `load_config` module: Loads a static YAML config and applies environment overrides.
///
/// The YAML file holds everything that is safe to commit (bind address,
/// storage kind, wallpaper settings). Credentials and deployment-specific
/// values come from the environment:
///
/// - `PORTAL_STORAGE_DSN` replaces the object-store DSN, or binds object-store
///   storage when the file has no `storage` section.
/// - `PORTAL_BIND` replaces the server bind address.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use crate::config::{PortalConfig, StorageConfig, DEFAULT_LIST_LIMIT};
use anyhow::Result;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

pub const STORAGE_DSN_ENV: &str = "PORTAL_STORAGE_DSN";
pub const BIND_ENV: &str = "PORTAL_BIND";

/// Loads a static YAML config file and injects environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<PortalConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => {
            info!(config_path = ?path_ref, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path_ref,
                e
            ));
        }
    };

    let mut config: PortalConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow::anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    apply_env_overrides(&mut config)?;
    config.trace_loaded();
    Ok(config)
}

fn apply_env_overrides(config: &mut PortalConfig) -> Result<()> {
    if let Ok(bind) = std::env::var(BIND_ENV) {
        info!(bind = %bind, "Bind address overridden from environment");
        config.server.bind = bind;
    }

    if let Ok(env_dsn) = std::env::var(STORAGE_DSN_ENV) {
        match &mut config.storage {
            Some(StorageConfig::ObjectStore { dsn, .. }) => {
                info!("Object store DSN overridden from environment");
                *dsn = env_dsn;
            }
            Some(StorageConfig::Manifest { .. }) => {
                warn!(
                    env = STORAGE_DSN_ENV,
                    "Ignoring storage DSN from environment: manifest storage is configured"
                );
            }
            None => {
                info!("Object store storage bound from environment");
                config.storage = Some(StorageConfig::ObjectStore {
                    dsn: env_dsn,
                    list_limit: DEFAULT_LIST_LIMIT,
                });
            }
        }
    }

    if let Some(StorageConfig::ObjectStore { list_limit, .. }) = &config.storage {
        if *list_limit == 0 {
            error!("storage.list_limit must be at least 1");
            anyhow::bail!("storage.list_limit must be at least 1");
        }
    }

    Ok(())
}
