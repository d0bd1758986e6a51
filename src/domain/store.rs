//! TopologyStore: the tree-grid binding over a forest of topology nodes.
//!
//! Rows are addressed by node id. `query` covers the top level,
//! `get_children` expands one row.

use serde::Serialize;

use super::child_store::{run_query, Filter, QueryOptions, QueryResults};
use super::error::{Result, TopologyError};
use super::node::TopologyNode;

#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologyStore {
    data: Vec<TopologyNode>,
}

impl TopologyStore {
    pub fn new(data: Vec<TopologyNode>) -> Self {
        Self { data }
    }

    pub fn query(&self, filter: &Filter, options: &QueryOptions) -> QueryResults<'_> {
        run_query(self.data.iter(), filter, options)
    }

    pub fn get(&self, id: &str) -> Option<&TopologyNode> {
        self.data.iter().find_map(|root| root.find(id))
    }

    pub fn may_have_children(&self, id: &str) -> Result<bool> {
        self.node(id).map(TopologyNode::may_have_children)
    }

    /// Children of row `id`, narrowed by `filter` before sorting and paging.
    pub fn get_children(
        &self,
        id: &str,
        filter: &Filter,
        options: &QueryOptions,
    ) -> Result<QueryResults<'_>> {
        self.node(id).map(|node| node.children().query(filter, options))
    }

    fn node(&self, id: &str) -> Result<&TopologyNode> {
        self.get(id)
            .ok_or_else(|| TopologyError::UnknownNode(id.to_string()))
    }
}
