//! Node kinds and their nested-field expansion tables.
//!
//! Every kind shares the same node capabilities; they differ only in the
//! fixed tag used for labels and in which nested fields become children.

use async_graphql::Enum;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Enum)]
pub enum NodeKind {
    Machine,
    EclAgent,
    EclServer,
    EclScheduler,
    Cluster,
    TpCluster,
    Service,
    ServiceType,
    Services,
    TargetCluster,
    Topology,
}

/// How entries of a nested list turn into children.
#[derive(Debug, Clone, Copy)]
pub enum ChildRule {
    /// One child of the given kind per entry.
    Typed(NodeKind),
    /// A synthetic `ServiceType` parent holding one `Service` per entry.
    Grouped {
        local_id: &'static str,
        display_name: &'static str,
    },
}

/// `field.list[]` → children, e.g. `TpMachines.TpMachine[]`.
#[derive(Debug, Clone, Copy)]
pub struct Expansion {
    pub field: &'static str,
    pub list: &'static str,
    pub rule: ChildRule,
}

const fn typed(field: &'static str, list: &'static str, kind: NodeKind) -> Expansion {
    Expansion {
        field,
        list,
        rule: ChildRule::Typed(kind),
    }
}

const fn grouped(
    field: &'static str,
    list: &'static str,
    display_name: &'static str,
) -> Expansion {
    Expansion {
        field,
        list,
        rule: ChildRule::Grouped {
            local_id: list,
            display_name,
        },
    }
}

const MACHINES: Expansion = typed("TpMachines", "TpMachine", NodeKind::Machine);

const COMMON: &[Expansion] = &[MACHINES];

const SERVICES: &[Expansion] = &[
    MACHINES,
    grouped("TpDalis", "TpDali", "Dali Servers"),
    grouped("TpDfuServers", "TpDfuServer", "DFU Servers"),
    grouped("TpDropZones", "TpDropZone", "Drop Zones"),
    grouped("TpEclAgents", "TpEclAgent", "ECL Agents"),
    grouped("TpEclCCServers", "TpEclCCServer", "ECLCC Servers"),
    grouped("TpEclSchedulers", "TpEclScheduler", "ECL Schedulers"),
    grouped("TpEspServers", "TpEspServer", "ESP Servers"),
    grouped("TpFTSlaves", "TpFTSlave", "FT Slaves"),
    grouped("TpSashaServers", "TpSashaServer", "Sasha Servers"),
];

// CC servers are reported as `TpEclServer` records, same as ECL servers.
const TARGET_CLUSTER: &[Expansion] = &[
    MACHINES,
    typed("TpEclAgents", "TpEclAgent", NodeKind::EclAgent),
    typed("TpEclCCServers", "TpEclServer", NodeKind::EclServer),
    typed("TpEclServers", "TpEclServer", NodeKind::EclServer),
    typed("TpEclSchedulers", "TpEclScheduler", NodeKind::EclScheduler),
    typed("TpClusters", "TpCluster", NodeKind::Cluster),
];

impl NodeKind {
    /// Fixed tag shown in brackets in display labels.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Machine => "Machine",
            Self::EclAgent => "EclAgent",
            Self::EclServer => "EclServer",
            Self::EclScheduler => "EclScheduler",
            Self::Cluster => "C",
            Self::TpCluster => "Cluster",
            Self::Service => "S",
            Self::ServiceType => "ST",
            Self::Services => "Ss",
            Self::TargetCluster => "TC",
            Self::Topology => "Topology",
        }
    }

    /// Attribute whose value names the node in its label.
    pub fn name_field(&self) -> Option<&'static str> {
        match self {
            Self::Machine => Some("Netaddress"),
            Self::Topology => None,
            _ => Some("Name"),
        }
    }

    /// Whether a backend `Type` attribute replaces the fixed tag in labels.
    pub fn honours_type_override(&self) -> bool {
        !matches!(self, Self::Machine | Self::Topology)
    }

    pub fn expansions(&self) -> &'static [Expansion] {
        match self {
            Self::Machine | Self::Topology => &[],
            Self::Services => SERVICES,
            Self::TargetCluster => TARGET_CLUSTER,
            _ => COMMON,
        }
    }

    pub fn expansion_for(&self, field: &str) -> Option<&'static Expansion> {
        self.expansions().iter().find(|e| e.field == field)
    }
}
