//! `ecltopo tree|roots|children|logical-clusters`: browse the topology.

use anyhow::Result;
use colored::Colorize;

use crate::config::Config;
use crate::domain::child_store::{Filter, QueryOptions, QueryPage};

use super::output::{print_nodes, Format};

pub fn tree(config: Config, format: Format, depth: Option<usize>) -> Result<()> {
    super::block_on(async move {
        let service = super::service(&config)?;
        let forest = service.get_topology().await?;
        print_nodes(format, &forest, depth)
    })
}

pub fn roots(config: Config, format: Format) -> Result<()> {
    super::block_on(async move {
        let service = super::service(&config)?;
        let page = service.root().get_children().await?;
        print_page(format, &page)
    })
}

/// Expand one row. Ids from `roots` (`Topology::...`) and from `tree`
/// (bare ids) both resolve.
pub fn children(
    config: Config,
    id: String,
    filter: Filter,
    options: QueryOptions,
    format: Format,
) -> Result<()> {
    super::block_on(async move {
        let service = super::service(&config)?;
        let page = service.children(&id, &filter, &options).await?;
        print_page(format, &page)
    })
}

pub fn logical_clusters(config: Config, format: Format) -> Result<()> {
    super::block_on(async move {
        let service = super::service(&config)?;
        let clusters = service.logical_clusters().await?;
        print_nodes(format, &clusters, Some(0))
    })
}

fn print_page(format: Format, page: &QueryPage) -> Result<()> {
    match format {
        Format::Tree => {
            print_nodes(format, &page.items, Some(0))?;
            println!("{}", format!("total: {}", page.total).dimmed());
            Ok(())
        }
        other => super::output::print_output(other, page),
    }
}
