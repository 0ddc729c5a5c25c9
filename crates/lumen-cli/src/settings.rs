use std::env;
use std::fs;
use std::path::PathBuf;

use lumen_core::config::Config;
use tracing::debug;

pub const CONFIG_ENV: &str = "LUMEN_CONFIG";
const APP_DIR: &str = "lumen";
const CONFIG_FILE: &str = "config.toml";

pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Missing file means defaults; a file that exists but does not parse is an
/// error.
pub fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let Some(path) = config_path() else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(&path)
        .map_err(|err| format!("failed to read config {}: {err}", path.display()))?;
    parse_config(&content)
        .map_err(|err| format!("failed to parse config {}: {err}", path.display()).into())
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}

pub fn data_dir(config: &Config) -> PathBuf {
    let dir = config.storage.data_dir.clone().unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    });
    debug!(data_dir = %dir.display(), "resolved data directory");
    dir
}
