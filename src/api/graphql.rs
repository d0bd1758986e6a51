use async_graphql::{Context, EmptySubscription, InputObject, Json, Object, Schema, SimpleObject};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::domain::child_store::{Filter, QueryOptions};
use crate::domain::error::TopologyError;
use crate::domain::kind::NodeKind;
use crate::domain::node::TopologyNode;
use crate::domain::thor::Thor;
use crate::domain::topology_service::TopologyService;

pub type TopologySchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Attribute equality test applied to children before sorting.
#[derive(InputObject)]
pub struct AttributeFilter {
    pub field: String,
    pub value: String,
}

/// GraphQL view of one topology node.
pub struct NodeObject(TopologyNode);

#[Object(name = "TopologyNode")]
impl NodeObject {
    async fn id(&self) -> &str {
        self.0.id()
    }

    async fn kind(&self) -> NodeKind {
        self.0.kind()
    }

    /// Short bracketed tag used in display names.
    async fn tag(&self) -> &str {
        self.0.kind().tag()
    }

    async fn display_name(&self) -> &str {
        self.0.display_name()
    }

    async fn parent_id(&self) -> Option<&str> {
        self.0.parent_id()
    }

    async fn attributes(&self) -> Json<Map<String, Value>> {
        Json(self.0.attributes().clone())
    }

    /// A single attribute, or null when absent.
    async fn attribute(&self, name: String) -> Option<Json<Value>> {
        self.0.attribute(&name).cloned().map(Json)
    }

    async fn may_have_children(&self) -> bool {
        self.0.may_have_children()
    }

    /// The root fetches its target clusters on demand; every other node
    /// answers from the children it already holds.
    async fn children(
        &self,
        ctx: &Context<'_>,
        sort: Option<String>,
        #[graphql(default)] descending: bool,
        #[graphql(default)] start: u32,
        count: Option<u32>,
        #[graphql(default)] filter: Vec<AttributeFilter>,
    ) -> async_graphql::Result<Vec<NodeObject>> {
        let mut options = QueryOptions {
            start: start as usize,
            count: count.map(|c| c as usize),
            ..Default::default()
        };
        if let Some(field) = sort {
            options = options.sorted_by(field, descending);
        }
        let filter = filter
            .into_iter()
            .fold(Filter::new(), |f, a| f.with(a.field, a.value));

        if self.0.kind() == NodeKind::Topology {
            let svc = ctx.data::<Arc<TopologyService>>()?;
            let page = svc
                .children(self.0.id(), &filter, &options)
                .await
                .map_err(gql_err)?;
            return Ok(wrap(page.items));
        }
        let results = self.0.children().query(&filter, &options);
        Ok(results.iter().map(|n| NodeObject(n.clone())).collect())
    }
}

fn wrap(nodes: Vec<TopologyNode>) -> Vec<NodeObject> {
    nodes.into_iter().map(NodeObject).collect()
}

#[derive(SimpleObject)]
pub struct ThorStatus {
    pub name: String,
    pub attributes: Json<Map<String, Value>>,
}

impl ThorStatus {
    async fn of(thor: &Thor) -> Self {
        Self {
            name: thor.name().to_string(),
            attributes: Json(thor.attributes().await),
        }
    }
}

fn gql_err(e: impl std::fmt::Display) -> async_graphql::Error {
    async_graphql::Error::new(e.to_string())
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Target clusters, then clusters, then services. Fetched fresh.
    async fn topology(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<NodeObject>> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        svc.get_topology().await.map(wrap).map_err(gql_err)
    }

    /// Children of the "Topology" root (target clusters only).
    async fn root_children(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<NodeObject>> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        let page = svc.root().get_children().await.map_err(gql_err)?;
        Ok(wrap(page.items))
    }

    /// Any row by id: the root, a row under it, or a row of the full forest.
    async fn node(&self, ctx: &Context<'_>, id: String) -> async_graphql::Result<Option<NodeObject>> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        match svc.node(&id).await {
            Ok(node) => Ok(Some(NodeObject(node))),
            Err(TopologyError::UnknownNode(_)) => Ok(None),
            Err(e) => Err(gql_err(e)),
        }
    }

    /// Last known status of a Thor cluster. Does not fetch.
    async fn thor(&self, ctx: &Context<'_>, name: String) -> async_graphql::Result<ThorStatus> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        Ok(ThorStatus::of(&svc.thor(&name)).await)
    }

    async fn logical_clusters(&self, ctx: &Context<'_>) -> async_graphql::Result<Vec<NodeObject>> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        svc.logical_clusters().await.map(wrap).map_err(gql_err)
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Fetch fresh Thor status and return the merged attributes.
    async fn refresh_thor(&self, ctx: &Context<'_>, name: String) -> async_graphql::Result<ThorStatus> {
        let svc = ctx.data::<Arc<TopologyService>>()?;
        let thor = svc.thor(&name);
        thor.refresh().await.map_err(gql_err)?;
        Ok(ThorStatus::of(&thor).await)
    }
}

pub fn build_schema(topology: Arc<TopologyService>) -> TopologySchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(topology)
        .finish()
}
