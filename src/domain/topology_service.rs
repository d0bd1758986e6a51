//! Topology service: the entry point that turns WsTopology queries into
//! typed forests.
//!
//! Two overlapping paths exist and stay separate:
//!   `get_topology()`          cluster + service + target-cluster queries
//!   `root().get_children()`   target-cluster query only, for lazy expand
//!
//! Row ids say which path produced them: `Topology::...` rows hang off the
//! root and are resolved through the target-cluster query, bare ids through
//! the full forest. Nothing is cached between calls except the Thor wrappers.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{debug, info};

use super::backend::{TopologyBackend, TopologyMethod};
use super::child_store::{run_query, Filter, QueryOptions, QueryPage};
use super::error::{Result, TopologyError};
use super::kind::NodeKind;
use super::node::{TopologyNode, ID_SEPARATOR, ROOT_ID};
use super::response::{path, records, scalar_text};
use super::store::TopologyStore;
use super::thor::{thor_cache, Thor, ThorCache};

const SERVICES_ID: &str = "Services";

pub struct TopologyService {
    backend: Arc<dyn TopologyBackend>,
    thors: ThorCache,
}

impl TopologyService {
    pub fn new(backend: Arc<dyn TopologyBackend>) -> Self {
        let thors = thor_cache(backend.clone());
        Self { backend, thors }
    }

    /// Fetch the whole forest: target clusters, then clusters, then services.
    ///
    /// The three queries run concurrently and all must succeed. Output order
    /// does not depend on which one completes first.
    pub async fn get_topology(&self) -> Result<Vec<TopologyNode>> {
        let backend = self.backend.as_ref();
        let (target_clusters, clusters, services) = tokio::try_join!(
            query_target_clusters(backend, None),
            query_clusters(backend),
            query_services(backend),
        )?;

        info!(
            target_clusters = target_clusters.len(),
            clusters = clusters.len(),
            services = services.len(),
            "topology fetched"
        );

        let mut forest = target_clusters;
        forest.extend(clusters);
        forest.extend(services);
        Ok(forest)
    }

    /// `get_topology` wrapped in a tree-grid store.
    pub async fn topology_store(&self) -> Result<TopologyStore> {
        self.get_topology().await.map(TopologyStore::new)
    }

    pub fn root(&self) -> TopologyRoot {
        TopologyRoot::new(self.backend.clone())
    }

    /// Any row handed out by the root view or the full forest, by id.
    pub async fn node(&self, id: &str) -> Result<TopologyNode> {
        let store = self.store_for(id).await?;
        store
            .get(id)
            .cloned()
            .ok_or_else(|| TopologyError::UnknownNode(id.to_string()))
    }

    /// Expand one row. Leaf rows answer an empty page without querying
    /// their (empty) child store.
    pub async fn children(
        &self,
        id: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<QueryPage> {
        if id == ROOT_ID {
            let page = self.root().get_children().await?;
            return Ok(run_query(page.items.iter(), filter, options).to_page());
        }
        let store = self.store_for(id).await?;
        if !store.may_have_children(id)? {
            return Ok(QueryPage {
                items: Vec::new(),
                total: 0,
            });
        }
        Ok(store.get_children(id, filter, options)?.to_page())
    }

    async fn store_for(&self, id: &str) -> Result<TopologyStore> {
        if id == ROOT_ID {
            return Ok(self.root().store());
        }
        let under_root = id
            .strip_prefix(ROOT_ID)
            .is_some_and(|rest| rest.starts_with(ID_SEPARATOR));
        if under_root {
            let page = self.root().get_children().await?;
            return Ok(TopologyStore::new(page.items));
        }
        self.topology_store().await
    }

    /// The session's wrapper for `name`; created on first use, not fetched.
    pub fn thor(&self, name: &str) -> Arc<Thor> {
        self.thors.get(name)
    }

    /// One `TpCluster` node per logical cluster.
    pub async fn logical_clusters(&self) -> Result<Vec<TopologyNode>> {
        let method = TopologyMethod::LogicalClusterQuery;
        let response = self.backend.query(method, json!({})).await?;
        let key = method.response_key();
        let nodes = nodes_at(
            &response,
            &[key.as_str(), "TpLogicalClusters", "TpLogicalCluster"],
            NodeKind::TpCluster,
            None,
        );
        debug!(count = nodes.len(), "logical clusters fetched");
        Ok(nodes)
    }
}

/// The fixed "Topology" node at the top of the tree-grid.
pub struct TopologyRoot {
    node: TopologyNode,
    backend: Arc<dyn TopologyBackend>,
}

impl TopologyRoot {
    pub fn new(backend: Arc<dyn TopologyBackend>) -> Self {
        Self {
            node: TopologyNode::root(),
            backend,
        }
    }

    /// Store whose only row is the root itself.
    pub fn store(&self) -> TopologyStore {
        TopologyStore::new(vec![self.node.clone()])
    }

    /// Target clusters only, parented by the root. `total` is the count.
    pub async fn get_children(&self) -> Result<QueryPage> {
        let items = query_target_clusters(self.backend.as_ref(), Some(self.node.id())).await?;
        Ok(QueryPage {
            total: items.len(),
            items,
        })
    }
}

async fn query_target_clusters(
    backend: &dyn TopologyBackend,
    parent_id: Option<&str>,
) -> Result<Vec<TopologyNode>> {
    let method = TopologyMethod::TargetClusterQuery;
    let response = backend.query(method, json!({ "Type": "ROOT" })).await?;
    let key = method.response_key();
    Ok(nodes_at(
        &response,
        &[key.as_str(), "TpTargetClusters", "TpTargetCluster"],
        NodeKind::TargetCluster,
        parent_id,
    ))
}

async fn query_clusters(backend: &dyn TopologyBackend) -> Result<Vec<TopologyNode>> {
    let method = TopologyMethod::ClusterQuery;
    let response = backend.query(method, json!({ "Type": "ROOT" })).await?;
    let key = method.response_key();
    Ok(nodes_at(
        &response,
        &[key.as_str(), "TpClusters", "TpCluster"],
        NodeKind::Cluster,
        None,
    ))
}

async fn query_services(backend: &dyn TopologyBackend) -> Result<Vec<TopologyNode>> {
    let method = TopologyMethod::ServiceQuery;
    let response = backend.query(method, json!({ "Type": "ALLSERVICES" })).await?;

    let key = method.response_key();
    let list = path(&response, &[key.as_str(), "ServiceList"]).and_then(Value::as_object);
    Ok(match list {
        Some(list) => {
            let mut services = TopologyNode::new(None, SERVICES_ID, NodeKind::Services)
                .with_display_name(SERVICES_ID);
            services.absorb(list);
            vec![services]
        }
        None => Vec::new(),
    })
}

/// One node per named record found at `keys`; records without a `Name`
/// are skipped.
fn nodes_at(
    response: &Value,
    keys: &[&str],
    kind: NodeKind,
    parent_id: Option<&str>,
) -> Vec<TopologyNode> {
    let Some(list) = path(response, keys) else {
        return Vec::new();
    };
    records(list)
        .into_iter()
        .filter_map(|record| {
            let name = record.get("Name").map(scalar_text)?;
            Some(TopologyNode::from_record(parent_id, &name, kind, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::testing::ScriptedBackend;
    use std::time::Duration;

    fn cluster_response() -> Value {
        json!({"TpClusterQueryResponse": {"TpClusters": {"TpCluster": [
            {"Name": "thor", "Type": "ThorCluster",
             "TpMachines": {"TpMachine": [{"Netaddress": "10.0.0.5", "ProcessNumber": 1}]}},
            {"Name": "roxie", "Type": "RoxieCluster"}
        ]}}})
    }

    fn service_response() -> Value {
        json!({"TpServiceQueryResponse": {"ServiceList": {
            "TpDalis": {"TpDali": [{"Name": "mydali", "Type": "DaliServerProcess"}]},
            "TpEspServers": {"TpEspServer": [{"Name": "myesp", "Type": "EspProcess"}]}
        }}})
    }

    fn target_cluster_response() -> Value {
        json!({"TpTargetClusterQueryResponse": {"TpTargetClusters": {"TpTargetCluster": [
            {"Name": "mythor", "Type": "ThorCluster",
             "TpClusters": {"TpCluster": [{"Name": "thor1"}]}},
            {"Name": "hthor", "Type": "HThorCluster"}
        ]}}})
    }

    fn full_backend() -> ScriptedBackend {
        ScriptedBackend::new()
            .respond(TopologyMethod::ClusterQuery, cluster_response())
            .respond(TopologyMethod::ServiceQuery, service_response())
            .respond(TopologyMethod::TargetClusterQuery, target_cluster_response())
    }

    fn ids(nodes: &[TopologyNode]) -> Vec<&str> {
        nodes.iter().map(TopologyNode::id).collect()
    }

    #[tokio::test]
    async fn forest_is_target_clusters_then_clusters_then_services() {
        let backend = Arc::new(full_backend());
        let service = TopologyService::new(backend.clone());

        let forest = service.get_topology().await.unwrap();

        assert_eq!(ids(&forest), ["mythor", "hthor", "thor", "roxie", "Services"]);
        assert!(forest.iter().all(|n| n.parent_id().is_none()));
        assert_eq!(forest[0].display_name(), "[ThorCluster] mythor");
        assert_eq!(forest[4].display_name(), "Services");
        assert!(forest[2].find("thor::10.0.0.5::1").is_some());

        assert_eq!(
            backend.requests(TopologyMethod::ClusterQuery),
            vec![json!({"Type": "ROOT"})]
        );
        assert_eq!(
            backend.requests(TopologyMethod::ServiceQuery),
            vec![json!({"Type": "ALLSERVICES"})]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn order_is_independent_of_completion_timing() {
        let backend = Arc::new(
            full_backend()
                .delay(TopologyMethod::TargetClusterQuery, 40)
                .delay(TopologyMethod::ClusterQuery, 30)
                .delay(TopologyMethod::ServiceQuery, 20),
        );
        let service = TopologyService::new(backend.clone());

        let started = tokio::time::Instant::now();
        let first = service.get_topology().await.unwrap();
        let elapsed = started.elapsed();
        let second = service.get_topology().await.unwrap();

        // Concurrent queries finish with the slowest one, not the sum (90ms).
        assert!(elapsed >= Duration::from_millis(40), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(50), "{elapsed:?}");

        assert_eq!(backend.total_calls(), 6);
        for method in [
            TopologyMethod::ClusterQuery,
            TopologyMethod::ServiceQuery,
            TopologyMethod::TargetClusterQuery,
        ] {
            assert_eq!(backend.calls(method), 2);
        }
        assert_eq!(ids(&first), ids(&second));
        assert_eq!(ids(&first)[0], "mythor");
        assert_eq!(ids(&first).last().copied(), Some("Services"));
    }

    #[tokio::test]
    async fn any_query_failure_fails_the_aggregate() {
        let backend = Arc::new(full_backend().fail(TopologyMethod::ServiceQuery, "ESP down"));
        let service = TopologyService::new(backend);
        let err = service.get_topology().await.unwrap_err();
        assert!(err.to_string().contains("ESP down"));
    }

    #[tokio::test]
    async fn empty_responses_give_empty_forest() {
        let service = TopologyService::new(Arc::new(ScriptedBackend::new()));
        assert!(service.get_topology().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn root_children_use_target_cluster_query_only() {
        let backend = Arc::new(full_backend());
        let service = TopologyService::new(backend.clone());
        let root = service.root();

        assert!(root.store().may_have_children(ROOT_ID).unwrap());
        let page = root.get_children().await.unwrap();

        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].id(), "Topology::mythor");
        assert_eq!(page.items[0].parent_id(), Some(ROOT_ID));
        assert_eq!(backend.total_calls(), 1);
        assert_eq!(backend.calls(TopologyMethod::TargetClusterQuery), 1);
    }

    #[tokio::test]
    async fn root_store_holds_only_the_root() {
        let service = TopologyService::new(Arc::new(ScriptedBackend::new()));
        let store = service.root().store();
        assert_eq!(store.query(&Filter::new(), &QueryOptions::default()).total, 1);
        assert!(store.may_have_children(ROOT_ID).unwrap());
    }

    #[tokio::test]
    async fn rows_expand_level_by_level_from_the_root() {
        let backend = Arc::new(full_backend());
        let service = TopologyService::new(backend.clone());
        let all = QueryOptions::default();

        let top = service.children(ROOT_ID, &Filter::new(), &all).await.unwrap();
        assert_eq!(ids(&top.items), ["Topology::mythor", "Topology::hthor"]);

        let clusters = service
            .children("Topology::mythor", &Filter::new(), &all)
            .await
            .unwrap();
        assert_eq!(ids(&clusters.items), ["Topology::mythor::thor1"]);
        assert!(!clusters.items[0].may_have_children());

        let leaf = service
            .children("Topology::mythor::thor1", &Filter::new(), &all)
            .await
            .unwrap();
        assert_eq!(leaf.total, 0);

        // only the target-cluster query backs rows under the root
        assert_eq!(backend.total_calls(), 3);
        assert_eq!(backend.calls(TopologyMethod::TargetClusterQuery), 3);

        let node = service.node("Topology::mythor::thor1").await.unwrap();
        assert_eq!(node.display_name(), "[C] thor1");
        assert_eq!(node.parent_id(), Some("Topology::mythor"));
    }

    #[tokio::test]
    async fn forest_rows_resolve_by_bare_id() {
        let service = TopologyService::new(Arc::new(full_backend()));

        let machines = service
            .children("thor", &Filter::new(), &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(ids(&machines.items), ["thor::10.0.0.5::1"]);

        let root = service.node(ROOT_ID).await.unwrap();
        assert_eq!(root.kind(), NodeKind::Topology);

        assert!(matches!(
            service.node("Topology::ghost").await,
            Err(TopologyError::UnknownNode(id)) if id == "Topology::ghost"
        ));
        assert!(matches!(
            service.children("ghost", &Filter::new(), &QueryOptions::default()).await,
            Err(TopologyError::UnknownNode(_))
        ));
    }

    #[tokio::test]
    async fn root_children_honour_filter_and_paging() {
        let service = TopologyService::new(Arc::new(full_backend()));
        let thor_only = Filter::new().with("Type", "ThorCluster");
        let page = service
            .children(ROOT_ID, &thor_only, &QueryOptions::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id(), "Topology::mythor");

        let sorted = QueryOptions {
            count: Some(1),
            ..Default::default()
        }
        .sorted_by("Name", false);
        let page = service.children(ROOT_ID, &Filter::new(), &sorted).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(ids(&page.items), ["Topology::hthor"]);
    }

    #[tokio::test]
    async fn logical_clusters_become_tp_cluster_nodes() {
        let backend = Arc::new(ScriptedBackend::new().respond(
            TopologyMethod::LogicalClusterQuery,
            json!({"TpLogicalClusterQueryResponse": {"TpLogicalClusters": {"TpLogicalCluster": [
                {"Name": "thor", "Queue": "thor.agent"}
            ]}}}),
        ));
        let service = TopologyService::new(backend);
        let clusters = service.logical_clusters().await.unwrap();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].kind(), NodeKind::TpCluster);
        assert_eq!(clusters[0].display_name(), "[Cluster] thor");
    }

    #[tokio::test]
    async fn thor_wrappers_are_shared_per_name() {
        let service = TopologyService::new(Arc::new(ScriptedBackend::new()));
        assert!(Arc::ptr_eq(&service.thor("ThorA"), &service.thor("ThorA")));
        assert!(!Arc::ptr_eq(&service.thor("ThorA"), &service.thor("ThorB")));
    }
}
