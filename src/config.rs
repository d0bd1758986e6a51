use anyhow::{bail, Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_PREFIX: &str = "ECLTOPO_";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the ESP server hosting WsTopology.
    pub esp_url: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Per-request timeout. Unset means calls wait indefinitely.
    pub timeout_secs: Option<u64>,
    pub log_level: String,
    /// Listen address for `ecltopo serve`.
    pub http_addr: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            esp_url: "http://127.0.0.1:8010".to_string(),
            username: None,
            password: None,
            timeout_secs: None,
            log_level: "info".to_string(),
            http_addr: "127.0.0.1:9110".to_string(),
        }
    }
}

impl Config {
    pub fn path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("could not determine config directory")?;
        Ok(config_dir.join("ecltopo").join("config.yaml"))
    }
}

/// Defaults, then the YAML file, then `ECLTOPO_*` environment variables.
///
/// An explicit `path` must exist; the default location is optional.
pub fn load(path: Option<&str>) -> Result<Config> {
    let path = match path {
        Some(p) => {
            let p = PathBuf::from(p);
            if !p.exists() {
                bail!("config file {} not found", p.display());
            }
            p
        }
        None => Config::path()?,
    };
    layered(&path, ENV_PREFIX)
        .extract()
        .with_context(|| format!("loading config from {}", path.display()))
}

fn layered(path: &Path, env_prefix: &str) -> Figment {
    Figment::from(Serialized::defaults(Config::default()))
        .merge(Yaml::file(path))
        .merge(Env::prefixed(env_prefix))
}
