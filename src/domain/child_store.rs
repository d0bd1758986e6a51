//! ChildStore: the ordered, queryable children of one topology node.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::node::TopologyNode;

/// Attribute-equality filter. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    pub equals: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.equals.push((field.into(), value.into()));
        self
    }

    fn matches(&self, node: &TopologyNode) -> bool {
        self.equals
            .iter()
            .all(|(field, want)| node.field_text(field).as_deref() == Some(want.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub attribute: String,
    #[serde(default)]
    pub descending: bool,
}

/// Sorting and paging applied on top of a filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryOptions {
    #[serde(default)]
    pub sort: Vec<SortKey>,
    #[serde(default)]
    pub start: usize,
    #[serde(default)]
    pub count: Option<usize>,
}

impl QueryOptions {
    pub fn sorted_by(mut self, attribute: impl Into<String>, descending: bool) -> Self {
        self.sort.push(SortKey {
            attribute: attribute.into(),
            descending,
        });
        self
    }
}

/// One view of a query. `total` counts every match before paging.
#[derive(Debug, Clone)]
pub struct QueryResults<'a> {
    pub items: Vec<&'a TopologyNode>,
    pub total: usize,
}

impl<'a> QueryResults<'a> {
    pub fn iter(&self) -> impl Iterator<Item = &'a TopologyNode> + '_ {
        self.items.iter().copied()
    }

    pub fn to_page(&self) -> QueryPage {
        QueryPage {
            items: self.items.iter().map(|n| (*n).clone()).collect(),
            total: self.total,
        }
    }
}

impl<'a> IntoIterator for QueryResults<'a> {
    type Item = &'a TopologyNode;
    type IntoIter = std::vec::IntoIter<&'a TopologyNode>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// Owned query result, as handed across the API boundary.
#[derive(Debug, Clone, Serialize)]
pub struct QueryPage {
    pub items: Vec<TopologyNode>,
    pub total: usize,
}

/// Filter, sort and page a sequence of nodes.
pub(crate) fn run_query<'a>(
    nodes: impl Iterator<Item = &'a TopologyNode>,
    filter: &Filter,
    options: &QueryOptions,
) -> QueryResults<'a> {
    let mut items: Vec<&TopologyNode> = nodes.filter(|n| filter.matches(n)).collect();

    if !options.sort.is_empty() {
        items.sort_by(|a, b| compare(a, b, &options.sort));
    }

    let total = items.len();
    let items = items
        .into_iter()
        .skip(options.start)
        .take(options.count.unwrap_or(usize::MAX))
        .collect();

    QueryResults { items, total }
}

fn compare(a: &TopologyNode, b: &TopologyNode, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let ord = a
            .field_text(&key.attribute)
            .cmp(&b.field_text(&key.attribute));
        let ord = if key.descending { ord.reverse() } else { ord };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ChildStore {
    items: Vec<TopologyNode>,
}

impl ChildStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child. A child whose id is already present replaces the
    /// existing entry in place, so ids stay unique under one parent.
    pub fn add(&mut self, node: TopologyNode) {
        match self.items.iter().position(|n| n.id() == node.id()) {
            Some(pos) => {
                debug!(id = %node.id(), "replacing child with duplicate id");
                self.items[pos] = node;
            }
            None => self.items.push(node),
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TopologyNode> {
        self.items.iter()
    }

    #[cfg(test)]
    pub fn get(&self, id: &str) -> Option<&TopologyNode> {
        self.items.iter().find(|n| n.id() == id)
    }

    pub fn query(&self, filter: &Filter, options: &QueryOptions) -> QueryResults<'_> {
        run_query(self.items.iter(), filter, options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::kind::NodeKind;
    use serde_json::json;

    fn service(name: &str, kind: &str) -> TopologyNode {
        let record = json!({"Name": name, "Type": kind});
        TopologyNode::from_record(Some("svc"), name, NodeKind::Service, record.as_object().unwrap())
    }

    fn store() -> ChildStore {
        let mut store = ChildStore::new();
        store.add(service("roxie", "RoxieCluster"));
        store.add(service("dali", "DaliServerProcess"));
        store.add(service("esp", "EspProcess"));
        store
    }

    #[test]
    fn preserves_insertion_order_without_sort() {
        let store = store();
        let ids: Vec<_> = store
            .query(&Filter::new(), &QueryOptions::default())
            .iter()
            .map(|n| n.id().to_string())
            .collect();
        assert_eq!(ids, ["svc::roxie", "svc::dali", "svc::esp"]);
    }

    #[test]
    fn sorts_by_attribute_both_directions() {
        let store = store();
        let asc = store.query(&Filter::new(), &QueryOptions::default().sorted_by("Name", false));
        let names: Vec<_> = asc.iter().map(|n| n.field_text("Name").unwrap()).collect();
        assert_eq!(names, ["dali", "esp", "roxie"]);

        let desc = store.query(&Filter::new(), &QueryOptions::default().sorted_by("Name", true));
        assert_eq!(desc.items[0].id(), "svc::roxie");
    }

    #[test]
    fn pages_after_filtering_and_reports_total() {
        let store = store();
        let opts = QueryOptions {
            start: 1,
            count: Some(1),
            ..Default::default()
        }
        .sorted_by("Name", false);
        let page = store.query(&Filter::new(), &opts);
        assert_eq!(page.total, 3);
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].id(), "svc::esp");

        let filtered = store.query(&Filter::new().with("Type", "EspProcess"), &QueryOptions::default());
        assert_eq!(filtered.total, 1);
        assert_eq!(filtered.items[0].id(), "svc::esp");
    }

    #[test]
    fn query_is_restartable() {
        let store = store();
        let opts = QueryOptions::default();
        let first: Vec<_> = store.query(&Filter::new(), &opts).into_iter().collect();
        let second: Vec<_> = store.query(&Filter::new(), &opts).into_iter().collect();
        assert_eq!(first.len(), second.len());
        assert!(first.iter().zip(&second).all(|(a, b)| a.id() == b.id()));
    }

    #[test]
    fn duplicate_id_replaces_in_place() {
        let mut store = store();
        store.add(service("dali", "Replacement"));
        assert_eq!(store.len(), 3);
        let dali = store.get("svc::dali").unwrap();
        assert_eq!(dali.field_text("Type").as_deref(), Some("Replacement"));
        assert_eq!(store.iter().nth(1).unwrap().id(), "svc::dali");
    }
}
