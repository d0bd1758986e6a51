//! TopologyNode: one element of the remote topology tree.
//!
//! A node absorbs the flat attribute bag ESP returns for it. Fields named in
//! its kind's expansion table become typed children; everything else is kept
//! verbatim as an attribute. Absorption never fails: missing or malformed
//! nested lists are skipped.

use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use super::child_store::{ChildStore, Filter, QueryOptions, QueryResults};
use super::kind::{ChildRule, Expansion, NodeKind};
use super::response::{records, scalar_text};

/// Separator between a parent id and a child's local id.
pub const ID_SEPARATOR: &str = "::";

pub const ROOT_ID: &str = "Topology";

#[derive(Debug, Clone)]
pub struct TopologyNode {
    id: String,
    kind: NodeKind,
    parent_id: Option<String>,
    display_name: String,
    attributes: Map<String, Value>,
    children: ChildStore,
}

impl TopologyNode {
    /// Build an empty node. The id is `parent_id::local_id`, or `local_id`
    /// when there is no parent.
    pub fn new(parent_id: Option<&str>, local_id: &str, kind: NodeKind) -> Self {
        let id = match parent_id {
            Some(parent) => format!("{parent}{ID_SEPARATOR}{local_id}"),
            None => local_id.to_string(),
        };
        Self {
            id,
            kind,
            parent_id: parent_id.map(str::to_string),
            display_name: local_id.to_string(),
            attributes: Map::new(),
            children: ChildStore::new(),
        }
    }

    /// Build a node and absorb its backend record in one step.
    pub fn from_record(
        parent_id: Option<&str>,
        local_id: &str,
        kind: NodeKind,
        record: &Map<String, Value>,
    ) -> Self {
        let mut node = Self::new(parent_id, local_id, kind);
        node.absorb(record);
        node
    }

    /// The fixed "Topology" root.
    pub fn root() -> Self {
        Self::new(None, ROOT_ID, NodeKind::Topology).with_display_name(ROOT_ID)
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent_id(&self) -> Option<&str> {
        self.parent_id.as_deref()
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    pub fn children(&self) -> &ChildStore {
        &self.children
    }

    /// Merge a backend attribute bag into this node.
    pub fn absorb(&mut self, attributes: &Map<String, Value>) {
        let mut relabel = false;

        for (key, value) in attributes {
            if let Some(expansion) = self.kind.expansion_for(key) {
                self.expand(expansion, value);
                continue;
            }
            if self.kind.name_field() == Some(key.as_str())
                || (key == "Type" && self.kind.honours_type_override())
            {
                relabel = true;
            }
            self.attributes.insert(key.clone(), value.clone());
        }

        if relabel {
            self.relabel();
        }
    }

    /// True once any child has been inserted. The root always reports true
    /// because its children are fetched on demand.
    pub fn may_have_children(&self) -> bool {
        self.kind == NodeKind::Topology || !self.children.is_empty()
    }

    pub fn get_children(&self, options: &QueryOptions) -> QueryResults<'_> {
        self.children.query(&Filter::new(), options)
    }

    /// Depth-first lookup by id within this subtree.
    pub fn find(&self, id: &str) -> Option<&TopologyNode> {
        if self.id == id {
            return Some(self);
        }
        let below = id
            .strip_prefix(self.id.as_str())
            .is_some_and(|rest| rest.starts_with(ID_SEPARATOR));
        if !below {
            return None;
        }
        self.children.iter().find_map(|child| child.find(id))
    }

    /// Text used for filtering and sorting. `id`, `kind`, `displayName` and
    /// `parentId` address the node itself; anything else is an attribute.
    pub fn field_text(&self, field: &str) -> Option<String> {
        match field {
            "id" => Some(self.id.clone()),
            "kind" => Some(self.kind.tag().to_string()),
            "displayName" => Some(self.display_name.clone()),
            "parentId" => self.parent_id.clone(),
            _ => self.attributes.get(field).map(scalar_text),
        }
    }

    fn relabel(&mut self) {
        let Some(name) = self
            .kind
            .name_field()
            .and_then(|field| self.attributes.get(field))
        else {
            return;
        };
        let type_override = self
            .kind
            .honours_type_override()
            .then(|| self.attributes.get("Type").and_then(Value::as_str))
            .flatten()
            .filter(|t| !t.is_empty());
        let tag = type_override.unwrap_or(self.kind.tag());
        self.display_name = format!("[{}] {}", tag, scalar_text(name));
    }

    fn expand(&mut self, expansion: &Expansion, value: &Value) {
        let Some(list) = value.get(expansion.list) else {
            return;
        };
        let entries = records(list);

        match expansion.rule {
            ChildRule::Typed(kind) => {
                for record in entries {
                    match local_id(kind, record) {
                        Some(local) => {
                            let child = Self::from_record(Some(&self.id), &local, kind, record);
                            self.children.add(child);
                        }
                        None => {
                            debug!(parent = %self.id, list = expansion.list, "skipping record without id");
                        }
                    }
                }
            }
            ChildRule::Grouped {
                local_id,
                display_name,
            } => {
                let mut group = Self::new(Some(&self.id), local_id, NodeKind::ServiceType)
                    .with_display_name(display_name);
                group.add_services(&entries);
                self.children.add(group);
            }
        }
    }

    /// Add one `Service` child per record, keyed by its `Name`.
    pub fn add_services(&mut self, entries: &[&Map<String, Value>]) {
        for record in entries {
            match local_id(NodeKind::Service, record) {
                Some(local) => {
                    let child = Self::from_record(Some(&self.id), &local, NodeKind::Service, record);
                    self.children.add(child);
                }
                None => debug!(parent = %self.id, "skipping service without name"),
            }
        }
    }
}

// Hand-written so the derived `mayHaveChildren` flag travels with each row.
impl Serialize for TopologyNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut row = serializer.serialize_struct("TopologyNode", 7)?;
        row.serialize_field("id", &self.id)?;
        row.serialize_field("kind", &self.kind)?;
        row.serialize_field("parentId", &self.parent_id)?;
        row.serialize_field("displayName", &self.display_name)?;
        row.serialize_field("mayHaveChildren", &self.may_have_children())?;
        row.serialize_field("attributes", &self.attributes)?;
        row.serialize_field("children", &self.children)?;
        row.end()
    }
}

/// Local id of a child record: `Netaddress::ProcessNumber` for machines,
/// `Name` for everything else.
fn local_id(kind: NodeKind, record: &Map<String, Value>) -> Option<String> {
    match kind {
        NodeKind::Machine => {
            let address = record.get("Netaddress").map(scalar_text)?;
            Some(match record.get("ProcessNumber") {
                Some(number) => format!("{}{}{}", address, ID_SEPARATOR, scalar_text(number)),
                None => address,
            })
        }
        _ => record.get("Name").map(scalar_text),
    }
}
