//! Rendering for command output: `tree`, `table`, `json` or `yaml`.

use anyhow::{bail, Result};
use colored::Colorize;
use serde::Serialize;

use crate::domain::child_store::QueryOptions;
use crate::domain::node::TopologyNode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Tree,
    Table,
    Json,
    Yaml,
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tree" => Ok(Self::Tree),
            "table" => Ok(Self::Table),
            "json" => Ok(Self::Json),
            "yaml" => Ok(Self::Yaml),
            other => bail!("unknown format '{}' (expected tree, table, json or yaml)", other),
        }
    }
}

/// Print nodes. `tree` draws the hierarchy; the other formats serialize.
pub fn print_nodes(format: Format, nodes: &[TopologyNode], max_depth: Option<usize>) -> Result<()> {
    match format {
        Format::Tree => {
            for (depth, node) in tree_rows(nodes, max_depth) {
                println!("{}", tree_line(depth, node));
            }
            Ok(())
        }
        other => print_output(other, &nodes),
    }
}

/// Pre-order rows limited to `max_depth` levels below the given nodes.
pub fn tree_rows(nodes: &[TopologyNode], max_depth: Option<usize>) -> Vec<(usize, &TopologyNode)> {
    let mut rows = Vec::new();
    for node in nodes {
        push_rows(node, 0, max_depth, &mut rows);
    }
    rows
}

fn push_rows<'a>(
    node: &'a TopologyNode,
    depth: usize,
    max_depth: Option<usize>,
    rows: &mut Vec<(usize, &'a TopologyNode)>,
) {
    rows.push((depth, node));
    if max_depth.is_some_and(|max| depth >= max) {
        return;
    }
    for child in node.get_children(&QueryOptions::default()) {
        push_rows(child, depth + 1, max_depth, rows);
    }
}

fn tree_line(depth: usize, node: &TopologyNode) -> String {
    let pad = "  ".repeat(depth);
    let marker = if node.may_have_children() { "▸" } else { "•" };
    let label = if depth == 0 {
        node.display_name().bold().to_string()
    } else {
        node.display_name().to_string()
    };
    format!("{}{} {}  {}", pad, marker, label, node.id().dimmed())
}

pub fn print_output<T: Serialize>(format: Format, data: &T) -> Result<()> {
    match format {
        Format::Json => {
            let json = serde_json::to_string_pretty(data)?;
            println!("{}", json);
        }
        Format::Yaml => {
            print!("{}", serde_yaml::to_string(data)?);
        }
        Format::Table | Format::Tree => {
            // Recursive key-value from serde_json::Value
            let value = serde_json::to_value(data)?;
            print_value(&value, 0);
        }
    }
    Ok(())
}

fn print_value(value: &serde_json::Value, indent: usize) {
    let pad = "  ".repeat(indent);
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map {
                match val {
                    serde_json::Value::Object(_) => {
                        println!("{}{}:", pad, key.cyan());
                        print_value(val, indent + 1);
                    }
                    serde_json::Value::Array(arr) if arr.is_empty() => {
                        println!("{}{}: []", pad, key.cyan());
                    }
                    serde_json::Value::Array(_) => {
                        println!("{}{}:", pad, key.cyan());
                        print_value(val, indent + 1);
                    }
                    _ => println!("{}{}: {}", pad, key.cyan(), format_scalar(val)),
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for (i, item) in arr.iter().enumerate() {
                if item.is_object() || item.is_array() {
                    println!("{}[{}]:", pad, i);
                    print_value(item, indent + 1);
                } else {
                    println!("{}- {}", pad, format_scalar(item));
                }
            }
        }
        _ => println!("{}{}", pad, format_scalar(value)),
    }
}

fn format_scalar(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}
