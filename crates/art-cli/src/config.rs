//! Config file loading (spec §0 "Configuration"), mirroring the teacher's
//! `sa_gateway::cli::load_config` — an env-var override, else a default.

use art_domain::RuntimeConfig;

const CONFIG_PATH_ENV: &str = "ART_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "art.toml";

/// Load [`RuntimeConfig`] from the path named by `ART_CONFIG` (or
/// `art.toml` in the current directory); falls back to built-in defaults
/// when no such file exists.
pub fn load_config() -> anyhow::Result<(RuntimeConfig, String)> {
    let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());

    let config = if std::path::Path::new(&path).exists() {
        let raw = std::fs::read_to_string(&path).map_err(|e| anyhow::anyhow!("reading {path}: {e}"))?;
        RuntimeConfig::from_toml(&raw).map_err(|e| anyhow::anyhow!("parsing {path}: {e}"))?
    } else {
        RuntimeConfig::default()
    };

    Ok((config, path))
}
