//! Switch-side cabling: which TOR each node port lands on, and the inter-TOR trunks/LAGs of the
//! rack-aware architecture options.
//!
//! Nothing here knows about coordinates; the layout engine consumes [`Architecture`] as-is.

use crate::plan::{CablingPlan, PortRef};
use crate::topology::{PortRole, StorageMode, TopologySpec};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArchitectureOption {
    /// Dual TORs per room, one cross-room trunk per storage subnet.
    A,
    /// Dual TORs per room, storage subnets share one aggregated trunk bus.
    B,
    /// One TOR per room joined by a single bundled link.
    C,
    /// One TOR per room, every node cabled to both TORs.
    D,
}

impl ArchitectureOption {
    /// Accepts `A`..`D` in any case, optionally prefixed by `option`, `option_` or `option-`.
    pub fn parse(raw: &str) -> Result<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let code = lowered
            .strip_prefix("option")
            .map(|rest| rest.trim_start_matches(['_', '-', ' ']))
            .unwrap_or(&lowered);
        match code {
            "a" => Ok(Self::A),
            "b" => Ok(Self::B),
            "c" => Ok(Self::C),
            "d" => Ok(Self::D),
            _ => Err(Error::UnsupportedArchitectureOption {
                option: raw.to_string(),
            }),
        }
    }

    /// Lowercase letter used in slugs and filenames.
    pub fn code(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
            Self::C => "c",
            Self::D => "d",
        }
    }

    pub fn tors_per_room(self) -> u8 {
        match self {
            Self::A | Self::B => 2,
            Self::C | Self::D => 1,
        }
    }

    pub fn has_router(self) -> bool {
        matches!(self, Self::A | Self::B)
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::A => "Option A: dedicated storage links",
            Self::B => "Option B: aggregated storage links",
            Self::C => "Option C: single TOR per room",
            Self::D => "Option D: cross-room node connectivity",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum LinkEndpoint {
    Tor { index: u8 },
    Router,
    StorageBus,
    NodePort { node: u32, port: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    Lag,
    Trunk,
    /// Node port to TOR.
    Access,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Carries {
    Role(PortRole),
    Subnets(Vec<u32>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureLink {
    pub from: LinkEndpoint,
    pub to: LinkEndpoint,
    pub kind: LinkKind,
    pub carries: Carries,
    pub label: String,
}

impl ArchitectureLink {
    pub fn tor_pair(&self) -> Option<(u8, u8)> {
        match (self.from, self.to) {
            (LinkEndpoint::Tor { index: a }, LinkEndpoint::Tor { index: b }) => Some((a, b)),
            _ => None,
        }
    }

    pub fn node_port(&self) -> Option<PortRef> {
        match self.from {
            LinkEndpoint::NodePort { node, port } => Some(PortRef { node, port }),
            _ => None,
        }
    }

    pub fn target_tor(&self) -> Option<u8> {
        match self.to {
            LinkEndpoint::Tor { index } => Some(index),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorSwitch {
    pub index: u8,
    pub room: u8,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    /// `None` for single-room clusters.
    pub option: Option<ArchitectureOption>,
    pub rooms: u8,
    pub tors: Vec<TorSwitch>,
    /// Whether an upstream Switch/Router box is part of the picture.
    pub router: bool,
    pub links: Vec<ArchitectureLink>,
}

impl Architecture {
    pub fn tor(&self, index: u8) -> Option<&TorSwitch> {
        self.tors.iter().find(|t| t.index == index)
    }

    pub fn tors_in_room(&self, room: u8) -> impl Iterator<Item = &TorSwitch> {
        self.tors.iter().filter(move |t| t.room == room)
    }

    pub fn access_links(&self) -> impl Iterator<Item = &ArchitectureLink> {
        self.links.iter().filter(|l| l.kind == LinkKind::Access)
    }

    /// TOR-to-TOR, TOR-to-bus and TOR-to-router links.
    pub fn switch_links(&self) -> impl Iterator<Item = &ArchitectureLink> {
        self.links.iter().filter(|l| l.kind != LinkKind::Access)
    }
}

/// Computes the switch-side cabling for any resolved topology.
///
/// Rack-aware topologies follow their architecture option; single-room clusters get their
/// TOR(s), access links and, with two TORs, an MLAG peer link.
pub fn plan_architecture(spec: &TopologySpec, plan: &CablingPlan) -> Result<Architecture> {
    let arch = match &spec.rack {
        Some(rack) => {
            let option = ArchitectureOption::parse(&rack.architecture_option)?;
            plan_rack_aware(spec, plan, option)?
        }
        None => plan_single_room(spec, plan),
    };
    tracing::debug!(
        option = ?arch.option,
        tors = arch.tors.len(),
        links = arch.links.len(),
        "planned switch cabling"
    );
    Ok(arch)
}

fn tor_label(index: u8) -> String {
    format!("TOR{index}")
}

fn tor(index: u8) -> LinkEndpoint {
    LinkEndpoint::Tor { index }
}

fn vlan_list(spec: &TopologySpec, subnets: &[u32]) -> String {
    subnets
        .iter()
        .map(|s| spec.storage_vlan(*s).to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn plan_single_room(spec: &TopologySpec, plan: &CablingPlan) -> Architecture {
    let count = spec.tor_switch_count.clamp(1, 2);
    let tors: Vec<TorSwitch> = (1..=count)
        .map(|index| TorSwitch {
            index,
            room: 1,
            label: tor_label(index),
        })
        .collect();
    let targets: Vec<u8> = tors.iter().map(|t| t.index).collect();

    let mut links = Vec::new();
    for node in 1..=plan.node_count {
        access_links(spec, plan, node, &targets, &mut links);
    }
    if count == 2 {
        links.push(ArchitectureLink {
            from: tor(1),
            to: tor(2),
            kind: LinkKind::Lag,
            carries: Carries::Role(PortRole::MgmtCompute),
            label: "MLAG peer link".to_string(),
        });
    }

    Architecture {
        option: None,
        rooms: 1,
        tors,
        router: false,
        links,
    }
}

fn plan_rack_aware(
    spec: &TopologySpec,
    plan: &CablingPlan,
    option: ArchitectureOption,
) -> Result<Architecture> {
    let Some(rack) = spec.rack.as_ref() else {
        return Err(Error::invalid("rack-aware planning needs a room assignment"));
    };
    if spec.storage_mode != StorageMode::Switched {
        return Err(Error::invalid(
            "rack-aware clusters connect storage through TOR switches",
        ));
    }

    let per_room = option.tors_per_room();
    let tors: Vec<TorSwitch> = (1..=2u8)
        .flat_map(|room| {
            (1..=per_room).map(move |k| {
                let index = (room - 1) * per_room + k;
                TorSwitch {
                    index,
                    room,
                    label: tor_label(index),
                }
            })
        })
        .collect();
    let room_tors = |room: u8| -> Vec<u8> {
        tors.iter()
            .filter(|t| t.room == room)
            .map(|t| t.index)
            .collect()
    };

    let mut links = Vec::new();
    for node in 1..=plan.node_count {
        let targets = match option {
            ArchitectureOption::D => vec![1, 2],
            _ => room_tors(rack.room_of(node)),
        };
        access_links(spec, plan, node, &targets, &mut links);
    }

    let subnets = plan.subnet_ids();
    match option {
        ArchitectureOption::A | ArchitectureOption::B => {
            for (a, b) in [(1, 2), (3, 4)] {
                links.push(ArchitectureLink {
                    from: tor(a),
                    to: tor(b),
                    kind: LinkKind::Lag,
                    carries: Carries::Role(PortRole::MgmtCompute),
                    label: format!("LAG TOR{a}-TOR{b}"),
                });
            }
            if option == ArchitectureOption::A {
                for subnet in &subnets {
                    let (a, b) = if subnet % 2 == 1 { (1, 3) } else { (2, 4) };
                    links.push(ArchitectureLink {
                        from: tor(a),
                        to: tor(b),
                        kind: LinkKind::Trunk,
                        carries: Carries::Subnets(vec![*subnet]),
                        label: format!("Storage {subnet} (VLAN {})", spec.storage_vlan(*subnet)),
                    });
                }
            } else if !subnets.is_empty() {
                for t in &tors {
                    links.push(ArchitectureLink {
                        from: tor(t.index),
                        to: LinkEndpoint::StorageBus,
                        kind: LinkKind::Trunk,
                        carries: Carries::Subnets(subnets.clone()),
                        label: format!("Storage bus (VLAN {})", vlan_list(spec, &subnets)),
                    });
                }
            }
            for t in &tors {
                links.push(ArchitectureLink {
                    from: tor(t.index),
                    to: LinkEndpoint::Router,
                    kind: LinkKind::Trunk,
                    carries: Carries::Role(PortRole::MgmtCompute),
                    label: "Uplink".to_string(),
                });
            }
        }
        ArchitectureOption::C if !subnets.is_empty() => {
            links.push(ArchitectureLink {
                from: tor(1),
                to: tor(2),
                kind: LinkKind::Lag,
                carries: Carries::Subnets(subnets.clone()),
                label: format!("Storage trunk (VLAN {})", vlan_list(spec, &subnets)),
            });
        }
        ArchitectureOption::C => {}
        ArchitectureOption::D => {}
    }

    Ok(Architecture {
        option: Some(option),
        rooms: 2,
        tors,
        router: option.has_router(),
        links,
    })
}

/// Appends the node-port to TOR links of one node.
///
/// Non-storage ports alternate over `targets` by ordinal; switched storage ports follow the
/// parity of their subnet id (odd to the first TOR, even to the second). Switchless storage
/// ports and unused ports are not switch-attached.
fn access_links(
    spec: &TopologySpec,
    plan: &CablingPlan,
    node: u32,
    targets: &[u8],
    out: &mut Vec<ArchitectureLink>,
) {
    let Some(ports) = plan.node(node) else {
        return;
    };
    if targets.is_empty() {
        return;
    }
    let pick = |ordinal: usize| targets[ordinal % targets.len()];

    let mut other_ordinal = 0usize;
    let mut storage_ordinal = 0usize;
    for p in &ports.ports {
        let (target, carries, label) = match (&p.role, plan.storage_mode) {
            (PortRole::Unused, _) => continue,
            (PortRole::Storage, StorageMode::Switchless) => continue,
            (PortRole::Storage, StorageMode::Switched) => {
                let ordinal = storage_ordinal;
                storage_ordinal += 1;
                match p.subnet_id {
                    Some(subnet) => (
                        pick((subnet as usize + 1) % 2),
                        Carries::Subnets(vec![subnet]),
                        format!("VLAN {}", spec.storage_vlan(subnet)),
                    ),
                    None => (
                        pick(ordinal),
                        Carries::Role(PortRole::Storage),
                        p.name.clone(),
                    ),
                }
            }
            (role, _) => {
                let ordinal = other_ordinal;
                other_ordinal += 1;
                (
                    pick(ordinal),
                    Carries::Role(role.clone()),
                    role.display_label().to_string(),
                )
            }
        };
        out.push(ArchitectureLink {
            from: LinkEndpoint::NodePort { node, port: p.port },
            to: tor(target),
            kind: LinkKind::Access,
            carries,
            label,
        });
    }
}
