//! Topology input record and the resolver that turns it into a validated [`TopologySpec`].

use crate::addressing::{AddressPlan, Cidr};
use crate::architecture::ArchitectureOption;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const MIN_PORTS_PER_NODE: u32 = 2;
pub const MAX_PORTS_PER_NODE: u32 = 24;
pub const MAX_SWITCHED_NODES: u32 = 16;
/// Management + compute ports reserved on every node by the default intent.
pub const RESERVED_MGMT_PORTS: u32 = 2;
/// Network ATC supports at most this many storage networks.
pub const MAX_STORAGE_NETWORKS: u32 = 8;
pub const DEFAULT_STORAGE_VLAN_BASE: u16 = 711;

const RACK_AWARE_NODE_COUNTS: [u32; 4] = [2, 4, 6, 8];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageMode {
    #[default]
    Switched,
    Switchless,
}

impl StorageMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Switched => "switched",
            Self::Switchless => "switchless",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkMode {
    SingleLink,
    DualLink,
}

impl LinkMode {
    /// Dedicated port pairs per node pair.
    pub fn multiplier(self) -> u32 {
        match self {
            Self::SingleLink => 1,
            Self::DualLink => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleLink => "single_link",
            Self::DualLink => "dual_link",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentAssignment {
    #[default]
    Default,
    /// Arbitrary zone labels per port.
    Custom,
    /// Default intents, but the user picked which ports carry them.
    Mapped,
}

/// Logical role of one physical port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PortRole {
    MgmtCompute,
    Storage,
    Unused,
    Custom(String),
}

impl PortRole {
    pub fn as_str(&self) -> &str {
        match self {
            Self::MgmtCompute => "mgmt_compute",
            Self::Storage => "storage",
            Self::Unused => "unused",
            Self::Custom(label) => label,
        }
    }

    /// Human-facing group title used on role boxes.
    pub fn display_label(&self) -> &str {
        match self {
            Self::MgmtCompute => "Management + Compute",
            Self::Storage => "Storage",
            Self::Unused => "Unused",
            Self::Custom(label) => label,
        }
    }

    pub fn is_storage_like(&self) -> bool {
        match self {
            Self::Storage => true,
            Self::Custom(label) => label.to_ascii_lowercase().contains("storage"),
            _ => false,
        }
    }

    /// Bucket order for rendering: management first, storage-like after other custom roles,
    /// unused last.
    pub fn group_rank(&self) -> u8 {
        match self {
            Self::MgmtCompute => 0,
            Self::Unused => 3,
            r if r.is_storage_like() => 2,
            _ => 1,
        }
    }
}

impl From<String> for PortRole {
    fn from(raw: String) -> Self {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        match key.as_str() {
            "mgmt_compute" | "management_compute" | "management_+_compute" | "mgmt+compute" => {
                Self::MgmtCompute
            }
            "storage" => Self::Storage,
            "" | "unused" | "none" => Self::Unused,
            _ => Self::Custom(raw.trim().to_string()),
        }
    }
}

impl From<&str> for PortRole {
    fn from(raw: &str) -> Self {
        Self::from(raw.to_string())
    }
}

impl From<PortRole> for String {
    fn from(role: PortRole) -> Self {
        role.as_str().to_string()
    }
}

impl fmt::Display for PortRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw topology fields as captured by the wizard. Only types are trusted; [`resolve`] checks
/// the combinations.
///
/// [`resolve`]: TopologyInput::resolve
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TopologyInput {
    pub node_count: u32,
    pub ports_per_node: u32,
    pub storage_mode: StorageMode,
    pub link_mode: Option<LinkMode>,
    pub tor_switch_count: Option<u8>,
    /// Rack-aware architecture option; presence makes the topology rack-aware.
    pub architecture_option: Option<String>,
    /// Room (1 or 2) per node, rack-aware only.
    pub node_rooms: Vec<u8>,
    /// Display-name overrides by port index; `None` or blank keeps the default.
    pub port_names: Vec<Option<String>>,
    pub intent_assignment: IntentAssignment,
    /// 1-based port index to role, used when `intent_assignment` is not `default`.
    pub port_roles: BTreeMap<u32, PortRole>,
    pub storage_subnets: Vec<String>,
    pub storage_auto_ip: bool,
    pub storage_vlans: Vec<u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RackLayout {
    /// Verbatim option code; parsed by the architecture planner.
    pub architecture_option: String,
    /// Room (1 or 2) for each node, index 0 = Node1.
    pub node_rooms: Vec<u8>,
}

impl RackLayout {
    pub fn room_of(&self, node: u32) -> u8 {
        node.checked_sub(1)
            .and_then(|i| self.node_rooms.get(i as usize))
            .copied()
            .unwrap_or(1)
    }

    pub fn nodes_in_room(&self, room: u8) -> Vec<u32> {
        self.node_rooms
            .iter()
            .enumerate()
            .filter(|(_, r)| **r == room)
            .map(|(i, _)| i as u32 + 1)
            .collect()
    }
}

/// A validated topology. Produced only by [`TopologyInput::resolve`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologySpec {
    pub node_count: u32,
    pub ports_per_node: u32,
    pub storage_mode: StorageMode,
    /// Set for switchless storage only.
    pub link_mode: Option<LinkMode>,
    pub tor_switch_count: u8,
    pub rack: Option<RackLayout>,
    pub intent_assignment: IntentAssignment,
    /// Role per port, index 0 = port 1. Identical on every node.
    pub port_roles: Vec<PortRole>,
    /// Display name per port, index 0 = port 1.
    pub port_names: Vec<String>,
    pub address_plan: AddressPlan,
    /// VLAN per storage network, index 0 = subnet 1.
    pub storage_vlans: Vec<u16>,
}

impl TopologySpec {
    pub fn role(&self, port: u32) -> Option<&PortRole> {
        port.checked_sub(1)
            .and_then(|i| self.port_roles.get(i as usize))
    }

    pub fn port_name(&self, port: u32) -> Option<&str> {
        port.checked_sub(1)
            .and_then(|i| self.port_names.get(i as usize))
            .map(String::as_str)
    }

    pub fn is_rack_aware(&self) -> bool {
        self.rack.is_some()
    }

    pub fn storage_vlan(&self, subnet_id: u32) -> u16 {
        subnet_id
            .checked_sub(1)
            .and_then(|i| self.storage_vlans.get(i as usize))
            .copied()
            .unwrap_or_else(|| default_vlan(subnet_id))
    }

    /// Short slug describing the topology, e.g. `switchless-3node-dual-link`.
    pub fn kind_slug(&self) -> String {
        match (&self.rack, self.storage_mode, self.link_mode) {
            (Some(rack), _, _) => {
                let option = match ArchitectureOption::parse(&rack.architecture_option) {
                    Ok(option) => option.code().to_string(),
                    Err(_) => rack
                        .architecture_option
                        .trim()
                        .to_ascii_lowercase()
                        .replace(|c: char| !c.is_ascii_alphanumeric(), "-"),
                };
                format!("rack-aware-{option}-{}node", self.node_count)
            }
            (None, StorageMode::Switchless, Some(link)) => format!(
                "switchless-{}node-{}",
                self.node_count,
                link.as_str().replace('_', "-")
            ),
            (None, mode, _) => format!("{}-{}node", mode.as_str(), self.node_count),
        }
    }
}

fn default_vlan(subnet_id: u32) -> u16 {
    let offset = u16::try_from(subnet_id.saturating_sub(1)).unwrap_or(u16::MAX);
    DEFAULT_STORAGE_VLAN_BASE.saturating_add(offset)
}

impl TopologyInput {
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn from_value(value: &serde_json::Value) -> Result<Self> {
        Ok(Self::deserialize(value)?)
    }

    /// Validates the field combination and resolves roles, names and addressing.
    pub fn resolve(&self) -> Result<TopologySpec> {
        let n = self.node_count;
        let ports = self.ports_per_node;

        if !(MIN_PORTS_PER_NODE..=MAX_PORTS_PER_NODE).contains(&ports) {
            return Err(Error::invalid(format!(
                "{ports} ports per node is not supported; expected {MIN_PORTS_PER_NODE}-{MAX_PORTS_PER_NODE} \
                 ({RESERVED_MGMT_PORTS} are always reserved for management + compute)"
            )));
        }

        let rack = self.resolve_rack()?;
        let link_mode = self.resolve_link_mode()?;

        if rack.is_none() {
            match self.storage_mode {
                StorageMode::Switched if !(1..=MAX_SWITCHED_NODES).contains(&n) => {
                    return Err(Error::invalid(format!(
                        "switched storage supports 1-{MAX_SWITCHED_NODES} nodes, got {n}"
                    )));
                }
                StorageMode::Switchless if !(2..=4).contains(&n) => {
                    return Err(Error::invalid(format!(
                        "switchless storage is only defined for 2-4 nodes, got {n}"
                    )));
                }
                _ => {}
            }
        }

        let storage_needed = match link_mode {
            Some(link) => (n - 1) * link.multiplier(),
            None => 0,
        };
        if self.storage_mode == StorageMode::Switchless
            && ports < RESERVED_MGMT_PORTS + storage_needed
        {
            return Err(Error::invalid(format!(
                "switchless {n}-node {} needs {} ports per node ({RESERVED_MGMT_PORTS} management + compute, \
                 {storage_needed} storage), got {ports}",
                link_mode.map(LinkMode::as_str).unwrap_or_default(),
                RESERVED_MGMT_PORTS + storage_needed
            )));
        }

        let tor_switch_count = match (&rack, self.tor_switch_count) {
            (Some(_), _) | (None, None) => 1,
            (None, Some(c @ (1 | 2))) => c,
            (None, Some(other)) => {
                return Err(Error::invalid(format!(
                    "{other} TOR switches requested; only 1 or 2 are supported"
                )));
            }
        };

        let port_roles = self.resolve_roles(storage_needed)?;
        let port_names = self.resolve_names(&port_roles);
        let address_plan = self.resolve_address_plan()?;
        let storage_vlans = self.resolve_vlans(&port_roles, storage_needed)?;

        let spec = TopologySpec {
            node_count: n,
            ports_per_node: ports,
            storage_mode: self.storage_mode,
            link_mode,
            tor_switch_count,
            rack,
            intent_assignment: self.intent_assignment,
            port_roles,
            port_names,
            address_plan,
            storage_vlans,
        };
        tracing::debug!(
            kind = %spec.kind_slug(),
            ports = spec.ports_per_node,
            intent = ?spec.intent_assignment,
            "resolved topology"
        );
        Ok(spec)
    }

    fn resolve_rack(&self) -> Result<Option<RackLayout>> {
        let Some(option) = self.architecture_option.as_deref() else {
            return Ok(None);
        };
        let n = self.node_count;
        if self.storage_mode == StorageMode::Switchless {
            return Err(Error::invalid(
                "rack-aware clusters connect storage through TOR switches; switchless storage is not supported",
            ));
        }
        if !RACK_AWARE_NODE_COUNTS.contains(&n) {
            return Err(Error::invalid(format!(
                "rack-aware clusters need 2, 4, 6 or 8 nodes, got {n}"
            )));
        }

        let node_rooms = if self.node_rooms.is_empty() {
            (1..=n).map(|node| if node <= n / 2 { 1 } else { 2 }).collect()
        } else {
            if self.node_rooms.len() != n as usize {
                return Err(Error::invalid(format!(
                    "rack-aware room assignment lists {} nodes but the cluster has {n}",
                    self.node_rooms.len()
                )));
            }
            if let Some(bad) = self.node_rooms.iter().find(|r| !matches!(r, 1 | 2)) {
                return Err(Error::invalid(format!(
                    "room {bad} does not exist; rack-aware clusters span rooms 1 and 2"
                )));
            }
            let in_first = self.node_rooms.iter().filter(|r| **r == 1).count() as u32;
            if in_first != n / 2 {
                return Err(Error::invalid(format!(
                    "rack-aware rooms must hold {} nodes each, room 1 has {in_first}",
                    n / 2
                )));
            }
            self.node_rooms.clone()
        };

        Ok(Some(RackLayout {
            architecture_option: option.trim().to_string(),
            node_rooms,
        }))
    }

    fn resolve_link_mode(&self) -> Result<Option<LinkMode>> {
        if self.storage_mode != StorageMode::Switchless {
            return Ok(None);
        }
        match self.link_mode {
            None | Some(LinkMode::DualLink) => Ok(Some(LinkMode::DualLink)),
            Some(LinkMode::SingleLink) if self.node_count == 3 => Ok(Some(LinkMode::SingleLink)),
            Some(LinkMode::SingleLink) => Err(Error::invalid(format!(
                "single_link switchless storage is only defined for 3 nodes, got {}",
                self.node_count
            ))),
        }
    }

    fn resolve_roles(&self, storage_needed: u32) -> Result<Vec<PortRole>> {
        let ports = self.ports_per_node;
        if self.intent_assignment == IntentAssignment::Default {
            return Ok((1..=ports)
                .map(|port| match self.storage_mode {
                    _ if port <= RESERVED_MGMT_PORTS => PortRole::MgmtCompute,
                    StorageMode::Switched => PortRole::Storage,
                    StorageMode::Switchless if port <= RESERVED_MGMT_PORTS + storage_needed => {
                        PortRole::Storage
                    }
                    StorageMode::Switchless => PortRole::Unused,
                })
                .collect());
        }

        if let Some(port) = self.port_roles.keys().find(|p| !(1..=ports).contains(*p)) {
            return Err(Error::invalid(format!(
                "port role table references port {port}, but nodes have {ports} ports"
            )));
        }
        let roles: Vec<PortRole> = (1..=ports)
            .map(|port| self.port_roles.get(&port).cloned().unwrap_or(PortRole::Unused))
            .collect();

        if self.intent_assignment == IntentAssignment::Mapped {
            if let Some(PortRole::Custom(label)) =
                roles.iter().find(|r| matches!(r, PortRole::Custom(_)))
            {
                return Err(Error::invalid(format!(
                    "mapped intent only assigns mgmt_compute, storage or unused; found {label:?}"
                )));
            }
        }
        if !roles.contains(&PortRole::MgmtCompute) {
            return Err(Error::invalid(
                "port role table must assign at least one mgmt_compute port",
            ));
        }
        if self.storage_mode == StorageMode::Switchless {
            let storage = roles.iter().filter(|r| **r == PortRole::Storage).count() as u32;
            if storage != storage_needed {
                return Err(Error::invalid(format!(
                    "switchless {}-node storage needs exactly {storage_needed} storage ports, the role table assigns {storage}",
                    self.node_count
                )));
            }
        }
        Ok(roles)
    }

    fn resolve_names(&self, roles: &[PortRole]) -> Vec<String> {
        if self.port_names.len() > roles.len() {
            tracing::debug!(
                supplied = self.port_names.len(),
                ports = roles.len(),
                "ignoring port name overrides beyond the port count"
            );
        }
        let mut mgmt_ordinal = 0u32;
        let mut storage_ordinal = 0u32;
        roles
            .iter()
            .enumerate()
            .map(|(idx, role)| {
                let default = match role {
                    PortRole::MgmtCompute => {
                        mgmt_ordinal += 1;
                        format!("NIC{mgmt_ordinal}")
                    }
                    PortRole::Storage => {
                        storage_ordinal += 1;
                        format!("SMB{storage_ordinal}")
                    }
                    _ => format!("Port {}", idx + 1),
                };
                self.port_names
                    .get(idx)
                    .and_then(|o| o.as_deref())
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .unwrap_or(default)
            })
            .collect()
    }

    fn resolve_address_plan(&self) -> Result<AddressPlan> {
        if self.storage_auto_ip {
            return Ok(AddressPlan::AutoIp);
        }
        if self.storage_subnets.iter().all(|s| s.trim().is_empty()) {
            return Ok(AddressPlan::Placeholder);
        }
        let mut list = Vec::with_capacity(self.storage_subnets.len());
        for raw in &self.storage_subnets {
            let raw = raw.trim();
            if !raw.is_empty() {
                raw.parse::<Cidr>()?;
            }
            list.push(raw.to_string());
        }
        Ok(AddressPlan::Custom(list))
    }

    fn resolve_vlans(&self, roles: &[PortRole], storage_needed: u32) -> Result<Vec<u16>> {
        if let Some(bad) = self.storage_vlans.iter().find(|v| !(1..=4094).contains(*v)) {
            return Err(Error::invalid(format!(
                "storage VLAN {bad} is outside 1-4094"
            )));
        }
        let subnets = match self.storage_mode {
            StorageMode::Switchless => storage_needed * self.node_count / 2,
            StorageMode::Switched => {
                let storage = roles.iter().filter(|r| **r == PortRole::Storage).count() as u32;
                storage.min(MAX_STORAGE_NETWORKS)
            }
        };
        Ok((1..=subnets)
            .map(|id| {
                id.checked_sub(1)
                    .and_then(|i| self.storage_vlans.get(i as usize))
                    .copied()
                    .unwrap_or_else(|| default_vlan(id))
            })
            .collect())
    }
}
