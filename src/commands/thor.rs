//! `ecltopo thor <name>`: refresh and show one Thor cluster's status.

use anyhow::{Context, Result};

use crate::config::Config;

use super::output::{print_output, Format};

pub fn run(config: Config, name: String, format: Format) -> Result<()> {
    super::block_on(async move {
        let service = super::service(&config)?;
        let thor = service.thor(&name);
        thor.refresh()
            .await
            .with_context(|| format!("refreshing thor '{}'", name))?;
        print_output(format, &thor.attributes().await)
    })
}
