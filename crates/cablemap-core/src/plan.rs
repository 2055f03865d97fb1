//! Logical cabling: port roles for every node and the switchless full-mesh storage pairing.

use crate::topology::{
    LinkMode, MAX_STORAGE_NETWORKS, PortRole, StorageMode, TopologySpec,
};
use crate::{Error, Result};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PortRef {
    pub node: u32,
    pub port: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortAssignment {
    pub port: u32,
    pub name: String,
    pub role: PortRole,
    /// Switchless: the point-to-point subnet. Switched: the storage network this port carries.
    pub subnet_id: Option<u32>,
    /// Far end of a switchless storage link.
    pub peer: Option<PortRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodePorts {
    pub node: u32,
    pub label: String,
    pub ports: Vec<PortAssignment>,
}

/// One point-to-point storage subnet between two node ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageEdge {
    pub subnet_id: u32,
    pub node_a: u32,
    pub port_a: u32,
    pub node_b: u32,
    pub port_b: u32,
    pub pair_label: String,
}

impl StorageEdge {
    pub fn endpoints(&self) -> [PortRef; 2] {
        [
            PortRef {
                node: self.node_a,
                port: self.port_a,
            },
            PortRef {
                node: self.node_b,
                port: self.port_b,
            },
        ]
    }
}

/// A switched storage network (one per storage port ordinal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageNetwork {
    pub subnet_id: u32,
    pub port: u32,
    pub vlan: u16,
    pub label: String,
}

/// Ports sharing a role, in the order they are drawn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGroup {
    pub role: PortRole,
    pub ports: Vec<u32>,
}

/// The full logical cabling of a cluster. Recomputed wholesale whenever the topology changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CablingPlan {
    pub node_count: u32,
    pub ports_per_node: u32,
    pub storage_mode: StorageMode,
    pub link_mode: Option<LinkMode>,
    pub nodes: Vec<NodePorts>,
    pub role_groups: Vec<RoleGroup>,
    pub storage_edges: Vec<StorageEdge>,
    pub storage_networks: Vec<StorageNetwork>,
}

pub fn node_label(node: u32) -> String {
    format!("Node{node}")
}

pub fn pair_label(a: u32, b: u32) -> String {
    format!("Node{a}↔Node{b}")
}

/// Computes the cabling plan for a resolved topology.
///
/// Switchless subnets follow the canonical numbering: node pairs in ascending order
/// `(1,2), (1,3), …, (2,3), …`, each taking the next one or two subnet ids, and each node in the
/// pair giving up its lowest still-free storage port.
pub fn plan_cabling(spec: &TopologySpec) -> Result<CablingPlan> {
    let role_groups = group_roles(&spec.port_roles);
    let storage_ports: Vec<u32> = (1..=spec.ports_per_node)
        .filter(|p| spec.role(*p) == Some(&PortRole::Storage))
        .collect();

    let mut nodes: Vec<NodePorts> = (1..=spec.node_count)
        .map(|node| NodePorts {
            node,
            label: node_label(node),
            ports: (1..=spec.ports_per_node)
                .map(|port| PortAssignment {
                    port,
                    name: spec.port_name(port).unwrap_or_default().to_string(),
                    role: spec.role(port).cloned().unwrap_or(PortRole::Unused),
                    subnet_id: None,
                    peer: None,
                })
                .collect(),
        })
        .collect();

    let mut storage_edges = Vec::new();
    let mut storage_networks = Vec::new();

    match (spec.storage_mode, spec.link_mode) {
        (StorageMode::Switchless, Some(link)) => {
            storage_edges = full_mesh(spec.node_count, link, &storage_ports)?;
            for edge in &storage_edges {
                let [a, b] = edge.endpoints();
                assign_peer(&mut nodes, a, b, edge.subnet_id);
                assign_peer(&mut nodes, b, a, edge.subnet_id);
            }
        }
        (StorageMode::Switchless, None) => {
            return Err(Error::invalid("switchless storage requires a link mode"));
        }
        (StorageMode::Switched, _) => {
            for (idx, port) in storage_ports
                .iter()
                .take(MAX_STORAGE_NETWORKS as usize)
                .enumerate()
            {
                let subnet_id = idx as u32 + 1;
                storage_networks.push(StorageNetwork {
                    subnet_id,
                    port: *port,
                    vlan: spec.storage_vlan(subnet_id),
                    label: format!("Storage {subnet_id}"),
                });
                for node in &mut nodes {
                    if let Some(slot) = node.ports.iter_mut().find(|p| p.port == *port) {
                        slot.subnet_id = Some(subnet_id);
                    }
                }
            }
        }
    }

    let plan = CablingPlan {
        node_count: spec.node_count,
        ports_per_node: spec.ports_per_node,
        storage_mode: spec.storage_mode,
        link_mode: spec.link_mode,
        nodes,
        role_groups,
        storage_edges,
        storage_networks,
    };
    tracing::debug!(
        nodes = plan.node_count,
        edges = plan.storage_edges.len(),
        networks = plan.storage_networks.len(),
        groups = plan.role_groups.len(),
        "planned cabling"
    );
    Ok(plan)
}

fn full_mesh(node_count: u32, link: LinkMode, storage_ports: &[u32]) -> Result<Vec<StorageEdge>> {
    let mut cursor = vec![0usize; node_count as usize];
    let mut next_port = |node: u32| -> Result<u32> {
        let slot = &mut cursor[(node - 1) as usize];
        let port = storage_ports.get(*slot).copied().ok_or_else(|| {
            Error::invalid(format!(
                "Node{node} runs out of storage ports: {} available for a {node_count}-node {} mesh",
                storage_ports.len(),
                link.as_str()
            ))
        })?;
        *slot += 1;
        Ok(port)
    };

    let mut edges = Vec::new();
    let mut subnet_id = 1u32;
    for a in 1..=node_count {
        for b in (a + 1)..=node_count {
            for _ in 0..link.multiplier() {
                let port_a = next_port(a)?;
                let port_b = next_port(b)?;
                edges.push(StorageEdge {
                    subnet_id,
                    node_a: a,
                    port_a,
                    node_b: b,
                    port_b,
                    pair_label: pair_label(a, b),
                });
                subnet_id += 1;
            }
        }
    }
    Ok(edges)
}

fn assign_peer(nodes: &mut [NodePorts], local: PortRef, remote: PortRef, subnet_id: u32) {
    let Some(slot) = nodes
        .iter_mut()
        .find(|n| n.node == local.node)
        .and_then(|n| n.ports.iter_mut().find(|p| p.port == local.port))
    else {
        return;
    };
    slot.subnet_id = Some(subnet_id);
    slot.peer = Some(remote);
}

/// Buckets ports by role: management + compute first, storage-like roles after the other custom
/// roles, unused last. Ports keep their ascending order inside a bucket.
pub fn group_roles(roles: &[PortRole]) -> Vec<RoleGroup> {
    let mut buckets: IndexMap<&PortRole, Vec<u32>> = IndexMap::new();
    for (idx, role) in roles.iter().enumerate() {
        buckets.entry(role).or_default().push(idx as u32 + 1);
    }
    let mut groups: Vec<RoleGroup> = buckets
        .into_iter()
        .map(|(role, ports)| RoleGroup {
            role: role.clone(),
            ports,
        })
        .collect();
    groups.sort_by_key(|g| g.role.group_rank());
    groups
}

impl CablingPlan {
    pub fn node(&self, node: u32) -> Option<&NodePorts> {
        self.nodes.iter().find(|n| n.node == node)
    }

    pub fn port(&self, node: u32, port: u32) -> Option<&PortAssignment> {
        self.node(node)?.ports.iter().find(|p| p.port == port)
    }

    pub fn port_name(&self, node: u32, port: u32) -> Option<&str> {
        self.port(node, port).map(|p| p.name.as_str())
    }

    pub fn storage_port_count(&self, node: u32) -> usize {
        self.node(node)
            .map(|n| n.ports.iter().filter(|p| p.role == PortRole::Storage).count())
            .unwrap_or(0)
    }

    pub fn edges_between(&self, a: u32, b: u32) -> impl Iterator<Item = &StorageEdge> {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        self.storage_edges
            .iter()
            .filter(move |e| e.node_a == lo && e.node_b == hi)
    }

    /// Subnet ids in ascending order: switchless edges, or switched storage networks.
    pub fn subnet_ids(&self) -> Vec<u32> {
        if self.storage_edges.is_empty() {
            self.storage_networks.iter().map(|n| n.subnet_id).collect()
        } else {
            self.storage_edges.iter().map(|e| e.subnet_id).collect()
        }
    }

    /// Re-checks the plan invariants: one role per port, no port in two subnets, contiguous
    /// subnet ids and the per-node switchless storage count.
    pub fn validate(&self) -> Result<()> {
        for node in &self.nodes {
            if node.ports.len() != self.ports_per_node as usize {
                return Err(Error::invalid(format!(
                    "{} has {} port assignments for {} ports",
                    node.label,
                    node.ports.len(),
                    self.ports_per_node
                )));
            }
        }

        let mut seen: FxHashSet<PortRef> = FxHashSet::default();
        for edge in &self.storage_edges {
            for end in edge.endpoints() {
                if !seen.insert(end) {
                    return Err(Error::invalid(format!(
                        "Node{} port {} appears in more than one storage subnet",
                        end.node, end.port
                    )));
                }
            }
        }

        for (idx, id) in self.subnet_ids().iter().enumerate() {
            if *id != idx as u32 + 1 {
                return Err(Error::invalid(format!(
                    "subnet ids are not contiguous: position {} holds {id}",
                    idx + 1
                )));
            }
        }

        if let Some(link) = self.link_mode {
            let expected = ((self.node_count - 1) * link.multiplier()) as usize;
            for node in &self.nodes {
                let wired = node.ports.iter().filter(|p| p.peer.is_some()).count();
                if wired != expected {
                    return Err(Error::invalid(format!(
                        "{} has {wired} storage links, expected {expected}",
                        node.label
                    )));
                }
            }
        }
        Ok(())
    }
}
