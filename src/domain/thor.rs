//! Thor status wrapper, one per Thor cluster name via `ThorCache`.

use std::sync::Arc;

use serde_json::{json, Map, Value};
use tokio::sync::RwLock;
use tracing::info;

use super::backend::{TopologyBackend, TopologyMethod};
use super::cache::NamedResourceCache;
use super::error::Result;
use super::response::{scalar_text, truthy};

pub type ThorCache = NamedResourceCache<Thor>;

/// Build the session's Thor cache over `backend`.
pub fn thor_cache(backend: Arc<dyn TopologyBackend>) -> ThorCache {
    NamedResourceCache::new(move |name| Thor::new(name, backend.clone()))
}

pub struct Thor {
    name: String,
    backend: Arc<dyn TopologyBackend>,
    attributes: RwLock<Map<String, Value>>,
}

impl Thor {
    /// Associates the name only; nothing is fetched until `refresh`.
    pub fn new(name: &str, backend: Arc<dyn TopologyBackend>) -> Self {
        let mut attributes = Map::new();
        attributes.insert("Name".to_string(), Value::String(name.to_string()));
        Self {
            name: name.to_string(),
            backend,
            attributes: RwLock::new(attributes),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn attributes(&self) -> Map<String, Value> {
        self.attributes.read().await.clone()
    }

    #[cfg(test)]
    pub async fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.read().await.get(key).cloned()
    }

    /// Fetch `TpThorStatus` and merge it into this wrapper's attributes.
    ///
    /// When both `Graph` and `SubGraph` are set, `GraphSummary` becomes
    /// `"<Graph>-<SubGraph>"`. Returns the raw response.
    pub async fn refresh(&self) -> Result<Value> {
        let method = TopologyMethod::ThorStatus;
        let response = self
            .backend
            .query(method, json!({ "Name": self.name }))
            .await?;

        if let Some(status) = response.get(method.response_key()).and_then(Value::as_object) {
            let mut attributes = self.attributes.write().await;
            for (key, value) in status {
                attributes.insert(key.clone(), value.clone());
            }

            let graph = status.get("Graph");
            let subgraph = status.get("SubGraph");
            match (graph, subgraph) {
                (Some(g), Some(s)) if truthy(graph) && truthy(subgraph) => {
                    let summary = format!("{}-{}", scalar_text(g), scalar_text(s));
                    attributes.insert("GraphSummary".to_string(), Value::String(summary));
                }
                _ => {}
            }

            info!(
                thor = %self.name,
                fields = status.len(),
                "thor status refreshed"
            );
        }

        Ok(response)
    }
}
