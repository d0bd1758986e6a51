use anyhow::Result;

use crate::config::Config;

pub fn run(config: Config) -> Result<()> {
    super::block_on(crate::server::run(config))
}
