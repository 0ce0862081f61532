use std::fs;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::error::FangstError;

pub const DEFAULT_BASE_URL: &str = "http://localhost:8010";
pub const DEFAULT_EXPORT_DIR: &str = "export";
pub const DEFAULT_INTERVAL: u32 = 10;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub auth_url: Option<String>,
    #[serde(default)]
    pub export_dir: Option<String>,
    #[serde(default)]
    pub species: Vec<String>,
    #[serde(default)]
    pub interval: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub base_url: String,
    pub auth_url: String,
    pub export_dir: Utf8PathBuf,
    /// Default species selection for charts and summaries, lowercased.
    pub species: Vec<String>,
    pub interval: u32,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `fangstdata.json` from the working directory, or the given path.
    /// A missing implicit file resolves to defaults; a missing explicit path
    /// is an error.
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, FangstError> {
        let config_path = match path {
            Some(path) => Utf8PathBuf::from(path),
            None => Utf8PathBuf::from("fangstdata.json"),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| FangstError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| FangstError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, FangstError> {
        let base_url = config
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let auth_url = config
            .auth_url
            .unwrap_or_else(|| format!("{}/auth", base_url.trim_end_matches('/')));
        let export_dir = Utf8PathBuf::from(
            config
                .export_dir
                .unwrap_or_else(|| DEFAULT_EXPORT_DIR.to_string()),
        );

        Ok(ResolvedConfig {
            base_url,
            auth_url,
            export_dir,
            species: config
                .species
                .into_iter()
                .map(|name| name.to_lowercase())
                .collect(),
            interval: config.interval.unwrap_or(DEFAULT_INTERVAL),
        })
    }
}
