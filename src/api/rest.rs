use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::domain::child_store::{Filter, QueryOptions, QueryPage};
use crate::domain::error::TopologyError;
use crate::domain::node::TopologyNode;
use crate::domain::topology_service::TopologyService;

/// Shared application state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub topology: Arc<TopologyService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/v1/topology", get(topology))
        .route("/api/v1/topology/root", get(root))
        .route("/api/v1/topology/root/children", get(root_children))
        .route("/api/v1/nodes/{id}", get(node))
        .route("/api/v1/nodes/{id}/children", get(node_children))
        .route("/api/v1/thor/{name}", get(thor))
        .route("/api/v1/logical-clusters", get(logical_clusters))
        .with_state(state)
}

type ApiError = (StatusCode, String);

fn api_error(e: TopologyError) -> ApiError {
    let status = match e {
        TopologyError::UnknownNode(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    (status, e.to_string())
}

#[derive(Debug, Serialize)]
struct Health {
    status: &'static str,
    version: &'static str,
}

async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Fresh three-way aggregation on every call.
async fn topology(State(state): State<AppState>) -> Result<Json<Vec<TopologyNode>>, ApiError> {
    state
        .topology
        .get_topology()
        .await
        .map(Json)
        .map_err(api_error)
}

async fn root(State(state): State<AppState>) -> Json<QueryPage> {
    let store = state.topology.root().store();
    let page = store.query(&Default::default(), &QueryOptions::default()).to_page();
    Json(page)
}

async fn root_children(State(state): State<AppState>) -> Result<Json<QueryPage>, ApiError> {
    state
        .topology
        .root()
        .get_children()
        .await
        .map(Json)
        .map_err(api_error)
}

/// `sort`, `descending`, `start` and `count` shape the page; any other
/// parameter is an attribute equality filter (`?Type=ThorCluster`).
fn children_query(params: Vec<(String, String)>) -> Result<(Filter, QueryOptions), ApiError> {
    let mut filter = Filter::new();
    let mut options = QueryOptions::default();
    let mut sort = None;
    let mut descending = false;

    for (key, value) in params {
        match key.as_str() {
            "sort" => sort = Some(value),
            "descending" => descending = parse_param(&key, &value)?,
            "start" => options.start = parse_param(&key, &value)?,
            "count" => options.count = Some(parse_param(&key, &value)?),
            _ => filter = filter.with(key, value),
        }
    }
    if let Some(field) = sort {
        options = options.sorted_by(field, descending);
    }
    Ok((filter, options))
}

fn parse_param<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ApiError> {
    value.parse().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            format!("invalid value '{value}' for '{key}'"),
        )
    })
}

/// One row by id, including its `mayHaveChildren` flag.
async fn node(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TopologyNode>, ApiError> {
    state.topology.node(&id).await.map(Json).map_err(api_error)
}

/// Expand one row: the root, a row under it, or a row of the full forest.
async fn node_children(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<Json<QueryPage>, ApiError> {
    let (filter, options) = children_query(params)?;
    state
        .topology
        .children(&id, &filter, &options)
        .await
        .map(Json)
        .map_err(api_error)
}

/// Refresh the named Thor wrapper and return its attributes.
async fn thor(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Map<String, Value>>, ApiError> {
    let thor = state.topology.thor(&name);
    thor.refresh().await.map_err(api_error)?;
    Ok(Json(thor.attributes().await))
}

async fn logical_clusters(
    State(state): State<AppState>,
) -> Result<Json<Vec<TopologyNode>>, ApiError> {
    state
        .topology
        .logical_clusters()
        .await
        .map(Json)
        .map_err(api_error)
}
