mod api;
mod client;
mod commands;
mod config;
mod domain;
mod logging;
mod server;

use clap::{Parser, Subcommand};

use commands::output::Format;
use commands::Overrides;
use domain::child_store::{Filter, QueryOptions};

#[derive(Parser)]
#[command(name = "ecltopo", version, about = "Browse HPCC cluster topology through WsTopology")]
struct Cli {
    /// Path to config file (default: ~/.config/ecltopo/config.yaml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// ESP base URL (overrides config)
    #[arg(long, global = true)]
    esp_url: Option<String>,

    /// Log level (overrides config)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Full topology: target clusters, clusters, then services
    Tree {
        /// Output format (tree, table, json or yaml)
        #[arg(long, default_value = "tree")]
        format: Format,

        /// Stop descending after this many levels
        #[arg(long)]
        depth: Option<usize>,
    },

    /// Children of the Topology root (target clusters)
    Roots {
        #[arg(long, default_value = "tree")]
        format: Format,
    },

    /// Children of one node, by id (e.g. "mythor::thor1")
    Children {
        id: String,

        /// Attribute to sort by
        #[arg(long)]
        sort: Option<String>,

        #[arg(long)]
        descending: bool,

        #[arg(long, default_value_t = 0)]
        start: usize,

        #[arg(long)]
        count: Option<usize>,

        /// Keep children whose attribute equals a value (FIELD=VALUE, repeatable)
        #[arg(long = "where", value_parser = parse_field_value)]
        filters: Vec<(String, String)>,

        #[arg(long, default_value = "tree")]
        format: Format,
    },

    /// Refresh and show a Thor cluster's status
    Thor {
        name: String,

        #[arg(long, default_value = "table")]
        format: Format,
    },

    /// Logical clusters and their queues
    LogicalClusters {
        #[arg(long, default_value = "tree")]
        format: Format,
    },

    /// Run the REST + GraphQL daemon
    Serve {
        /// HTTP listen address (overrides config)
        #[arg(long)]
        http_addr: Option<String>,
    },
}

fn parse_field_value(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((field, value)) if !field.is_empty() => Ok((field.to_string(), value.to_string())),
        _ => Err(format!("expected FIELD=VALUE, got '{s}'")),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut overrides = Overrides {
        config: cli.config,
        esp_url: cli.esp_url,
        log_level: cli.log_level,
        http_addr: None,
    };
    if let Commands::Serve { http_addr } = &cli.command {
        overrides.http_addr = http_addr.clone();
    }
    let cfg = commands::load_config(overrides)?;

    if !matches!(cli.command, Commands::Serve { .. }) {
        logging::init(&cfg.log_level, false);
    }

    match cli.command {
        Commands::Tree { format, depth } => commands::topology::tree(cfg, format, depth),
        Commands::Roots { format } => commands::topology::roots(cfg, format),
        Commands::Children {
            id,
            sort,
            descending,
            start,
            count,
            filters,
            format,
        } => {
            let mut options = QueryOptions {
                start,
                count,
                ..Default::default()
            };
            if let Some(field) = sort {
                options = options.sorted_by(field, descending);
            }
            let filter = filters
                .into_iter()
                .fold(Filter::new(), |f, (field, value)| f.with(field, value));
            commands::topology::children(cfg, id, filter, options, format)
        }
        Commands::Thor { name, format } => commands::thor::run(cfg, name, format),
        Commands::LogicalClusters { format } => commands::topology::logical_clusters(cfg, format),
        Commands::Serve { .. } => commands::serve::run(cfg),
    }
}
