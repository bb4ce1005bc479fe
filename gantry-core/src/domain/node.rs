//! Node domain model
//!
//! Represents a compute node in the cluster. Nodes are the unit the console's
//! online/offline operations act on, and the node name is the key the watchers
//! narrow their queries by.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::str::FromStr;
use uuid::Uuid;

use crate::rest::{DecodeError, RestObject};

/// A compute node in the cluster
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Numeric id assigned by the cluster manager
    pub id: Option<u64>,

    /// Stable GUID of the node
    pub guid: Option<Uuid>,

    /// Node name, unique within the cluster
    pub name: String,

    /// Current lifecycle state
    pub state: NodeState,

    /// Whether the management service can currently reach the node
    pub reachable: Option<bool>,

    /// Node groups this node belongs to
    pub node_groups: Vec<String>,

    /// Number of physical cores
    pub num_cores: Option<u32>,

    /// Number of CPU sockets
    pub num_sockets: Option<u32>,

    /// Installed memory in megabytes
    pub memory_size: Option<u64>,

    /// CPU clock speed in MHz
    pub cpu_speed: Option<u64>,

    /// Physical or cloud location label
    pub location: Option<String>,

    /// Scheduling availability label reported by the backend
    pub availability: Option<String>,

    /// Last transition to Online
    pub online_time: Option<DateTime<Utc>>,

    /// Last transition to Offline
    pub offline_time: Option<DateTime<Utc>>,
}

impl Node {
    /// Decode a node from the API's property bag
    ///
    /// Only `Name` is required. Everything else decodes leniently because the
    /// backend blanks properties that do not apply to a node's deployment type.
    pub fn from_properties(obj: &RestObject) -> Result<Self, DecodeError> {
        let name = obj
            .get("Name")
            .ok_or(DecodeError::MissingProperty("Name"))?
            .to_string();

        let state = obj
            .get("State")
            .map(|v| v.parse().unwrap_or(NodeState::Unknown))
            .unwrap_or(NodeState::Unknown);

        let node_groups = obj
            .get("NodeGroups")
            .map(|v| {
                v.split(',')
                    .map(|g| g.trim().to_string())
                    .filter(|g| !g.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Ok(Self {
            id: obj.get_parsed("Id"),
            guid: obj.get_parsed("Guid"),
            name,
            state,
            reachable: obj.get_bool("Reachable"),
            node_groups,
            num_cores: obj.get_parsed("NumCores"),
            num_sockets: obj.get_parsed("NumSockets"),
            memory_size: obj.get_parsed("MemorySize"),
            cpu_speed: obj.get_parsed("CpuSpeed"),
            location: obj.get("Location").map(str::to_string),
            availability: obj.get("Availability").map(str::to_string),
            online_time: obj.get_time("OnlineTime"),
            offline_time: obj.get_time("OfflineTime"),
        })
    }
}

/// Lifecycle state of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeState {
    /// Accepting work
    Online,

    /// Administratively out of the pool
    Offline,

    /// Finishing current work before going offline
    Draining,

    /// Being deployed
    Provisioning,

    /// Coming online
    Starting,

    /// State not reported or not recognized
    Unknown,
}

impl FromStr for NodeState {
    type Err = Infallible;

    /// Never fails: states this build does not know map to `Unknown` so a
    /// newer backend cannot break a running watch.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "Online" => NodeState::Online,
            "Offline" => NodeState::Offline,
            "Draining" => NodeState::Draining,
            "Provisioning" => NodeState::Provisioning,
            "Starting" => NodeState::Starting,
            _ => NodeState::Unknown,
        })
    }
}

/// A state-change operation on a set of nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeOperation {
    Online,
    Offline,
}

impl NodeOperation {
    /// URL path segment of the operation endpoint
    pub fn verb(&self) -> &'static str {
        match self {
            NodeOperation::Online => "online",
            NodeOperation::Offline => "offline",
        }
    }

    /// The state every targeted node must reach for the operation to be
    /// considered complete
    pub fn target_state(&self) -> NodeState {
        match self {
            NodeOperation::Online => NodeState::Online,
            NodeOperation::Offline => NodeState::Offline,
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeState::Online => write!(f, "Online"),
            NodeState::Offline => write!(f, "Offline"),
            NodeState::Draining => write!(f, "Draining"),
            NodeState::Provisioning => write!(f, "Provisioning"),
            NodeState::Starting => write!(f, "Starting"),
            NodeState::Unknown => write!(f, "Unknown"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rest::RestProperty;

    fn bag(pairs: &[(&str, &str)]) -> RestObject {
        RestObject {
            properties: pairs
                .iter()
                .map(|(name, value)| RestProperty {
                    name: name.to_string(),
                    value: value.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn test_decode_full_node() {
        let obj = bag(&[
            ("Id", "7"),
            ("Guid", "3f2d9b1c-8e55-4a3e-9f6a-0c1d2e3f4a5b"),
            ("Name", "CN-007"),
            ("State", "Online"),
            ("Reachable", "true"),
            ("NodeGroups", "ComputeNodes, AzureNodes"),
            ("NumCores", "32"),
            ("NumSockets", "2"),
            ("MemorySize", "262144"),
            ("CpuSpeed", "2600"),
            ("Location", "rack-4/u12"),
            ("OnlineTime", "2026-08-01T12:30:00Z"),
        ]);

        let node = Node::from_properties(&obj).unwrap();
        assert_eq!(node.id, Some(7));
        assert_eq!(node.name, "CN-007");
        assert_eq!(node.state, NodeState::Online);
        assert_eq!(node.reachable, Some(true));
        assert_eq!(node.node_groups, vec!["ComputeNodes", "AzureNodes"]);
        assert_eq!(node.num_cores, Some(32));
        assert_eq!(node.memory_size, Some(262_144));
        assert!(node.online_time.is_some());
        assert!(node.offline_time.is_none());
    }

    #[test]
    fn test_decode_requires_name() {
        let obj = bag(&[("State", "Online")]);
        assert!(matches!(
            Node::from_properties(&obj),
            Err(DecodeError::MissingProperty("Name"))
        ));
    }

    #[test]
    fn test_unknown_state_does_not_fail() {
        let obj = bag(&[("Name", "CN-001"), ("State", "Rebooting")]);
        let node = Node::from_properties(&obj).unwrap();
        assert_eq!(node.state, NodeState::Unknown);
    }

    #[test]
    fn test_state_display_round_trip() {
        for state in [
            NodeState::Online,
            NodeState::Offline,
            NodeState::Draining,
            NodeState::Provisioning,
            NodeState::Starting,
        ] {
            assert_eq!(state.to_string().parse::<NodeState>().unwrap(), state);
        }
    }
}
