pub mod output;
pub mod serve;
pub mod thor;
pub mod topology;

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;

use crate::client::WsTopologyClient;
use crate::config::{self, Config};
use crate::domain::topology_service::TopologyService;

/// Flags shared by every subcommand; they override the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub config: Option<String>,
    pub esp_url: Option<String>,
    pub log_level: Option<String>,
    pub http_addr: Option<String>,
}

pub fn load_config(overrides: Overrides) -> Result<Config> {
    let mut cfg = config::load(overrides.config.as_deref())?;
    if let Some(url) = overrides.esp_url {
        cfg.esp_url = url;
    }
    if let Some(level) = overrides.log_level {
        cfg.log_level = level;
    }
    if let Some(addr) = overrides.http_addr {
        cfg.http_addr = addr;
    }
    Ok(cfg)
}

fn service(config: &Config) -> Result<TopologyService> {
    let client = WsTopologyClient::from_config(config)?;
    Ok(TopologyService::new(Arc::new(client)))
}

// Build tokio runtime explicitly (no #[tokio::main] on fn main)
fn block_on<F: Future<Output = Result<()>>>(future: F) -> Result<()> {
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(future)
}
