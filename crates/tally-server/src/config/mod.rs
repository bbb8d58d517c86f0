//! Server config loader (strict parsing + env overlay).

pub mod schema;

use std::fs;

use tally_core::error::{Result, TallyError};

pub use schema::{
    HeavyTaskConfig, LokiConfig, LoggingSection, MetricsSection, ServerConfig, ServerSection,
};

/// Env var naming an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "TALLY_CONFIG";
/// Env var overriding `server.port`.
pub const PORT_ENV: &str = "PORT";

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| TallyError::BadConfig(format!("read config failed ({path}): {e}")))?;
    load_from_str(&s)
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| TallyError::BadConfig(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Resolve the effective config from the process environment: the file named
/// by `TALLY_CONFIG` (or defaults), then `PORT`.
pub fn load_from_env() -> Result<ServerConfig> {
    load_with(|k| std::env::var(k).ok())
}

/// Same as [`load_from_env`] with an injectable env lookup.
pub fn load_with<F>(env: F) -> Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut cfg = match env(CONFIG_PATH_ENV) {
        Some(path) => load_from_file(&path)?,
        None => ServerConfig::default(),
    };
    // An empty PORT counts as unset.
    if let Some(port) = env(PORT_ENV).filter(|p| !p.trim().is_empty()) {
        cfg.server.port = port
            .trim()
            .parse()
            .map_err(|e| TallyError::BadConfig(format!("{PORT_ENV} must be a port number: {e}")))?;
    }
    cfg.validate()?;
    Ok(cfg)
}
