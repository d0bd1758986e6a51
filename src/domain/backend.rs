//! Backend seam: the remote WsTopology operations the tree cache consumes.
//!
//! Production code talks to ESP through `client::WsTopologyClient`; tests
//! script responses through the same trait.

use async_trait::async_trait;
use serde_json::Value;

use super::error::Result;

/// The WsTopology methods this crate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopologyMethod {
    ClusterQuery,
    ServiceQuery,
    TargetClusterQuery,
    ThorStatus,
    LogicalClusterQuery,
}

impl TopologyMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ClusterQuery => "TpClusterQuery",
            Self::ServiceQuery => "TpServiceQuery",
            Self::TargetClusterQuery => "TpTargetClusterQuery",
            Self::ThorStatus => "TpThorStatus",
            Self::LogicalClusterQuery => "TpLogicalClusterQuery",
        }
    }

    /// Top-level key wrapping the request body.
    pub fn request_key(&self) -> String {
        format!("{}Request", self.as_str())
    }

    /// Top-level key wrapping the response body.
    pub fn response_key(&self) -> String {
        format!("{}Response", self.as_str())
    }
}

#[async_trait]
pub trait TopologyBackend: Send + Sync {
    /// Issue one WsTopology call and return the full JSON response.
    async fn query(&self, method: TopologyMethod, request: Value) -> Result<Value>;
}
