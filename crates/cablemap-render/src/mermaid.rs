//! Mermaid flowchart markup for a planned topology.
//!
//! Each node becomes a subgraph with one nested subgraph per role group; switchless storage
//! subnets are drawn as labelled links between adapters, and switch-side cabling as links to
//! the TOR (and router/bus) nodes. Rack-aware topologies wrap each room in its own subgraph.

use cablemap_core::{
    ArchitectureLink, Carries, LinkEndpoint, LinkKind, PlannedTopology, plan::node_label,
};
use std::fmt::Write as _;

fn port_id(node: u32, port: u32) -> String {
    format!("n{node}p{port}")
}

fn endpoint_id(endpoint: LinkEndpoint) -> String {
    match endpoint {
        LinkEndpoint::Tor { index } => format!("tor{index}"),
        LinkEndpoint::Router => "router".to_string(),
        LinkEndpoint::StorageBus => "storage_bus".to_string(),
        LinkEndpoint::NodePort { node, port } => port_id(node, port),
    }
}

/// Mermaid labels are double-quoted; inner quotes use the `#quot;` entity.
fn label(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "#quot;"))
}

pub fn to_mermaid(topology: &PlannedTopology) -> String {
    let plan = &topology.plan;
    let arch = &topology.architecture;
    let mut out = String::from("flowchart TB\n");

    let write_node = |out: &mut String, node: u32, indent: &str| {
        let _ = writeln!(out, "{indent}subgraph node{node}[{}]", label(&node_label(node)));
        let _ = writeln!(out, "{indent}    direction LR");
        for (gi, group) in plan.role_groups.iter().enumerate() {
            let _ = writeln!(
                out,
                "{indent}    subgraph node{node}_g{gi}[{}]",
                label(group.role.display_label())
            );
            for port in &group.ports {
                let name = plan
                    .port_name(node, *port)
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Port {port}"));
                let _ = writeln!(out, "{indent}        {}[{}]", port_id(node, *port), label(&name));
            }
            let _ = writeln!(out, "{indent}    end");
        }
        let _ = writeln!(out, "{indent}end");
    };
    let write_tor = |out: &mut String, index: u8, indent: &str| {
        let name = arch
            .tor(index)
            .map(|t| t.label.clone())
            .unwrap_or_else(|| format!("TOR{index}"));
        let _ = writeln!(out, "{indent}tor{index}[[{}]]", label(&name));
    };

    match &topology.spec.rack {
        Some(rack) => {
            for room in 1..=arch.rooms {
                let _ = writeln!(out, "    subgraph room{room}[{}]", label(&format!("Room {room}")));
                for t in arch.tors_in_room(room) {
                    write_tor(&mut out, t.index, "        ");
                }
                for node in rack.nodes_in_room(room) {
                    write_node(&mut out, node, "        ");
                }
                out.push_str("    end\n");
            }
        }
        None => {
            for t in &arch.tors {
                write_tor(&mut out, t.index, "    ");
            }
            for node in 1..=plan.node_count {
                write_node(&mut out, node, "    ");
            }
        }
    }
    if arch.router {
        let _ = writeln!(out, "    router[[{}]]", label("Switch/Router"));
    }
    if arch.links.iter().any(|l| l.to == LinkEndpoint::StorageBus) {
        let _ = writeln!(out, "    storage_bus(({}))", label("Storage bus"));
    }

    for edge in &plan.storage_edges {
        let block = topology.spec.address_plan.block_for(edge.subnet_id);
        let _ = writeln!(
            out,
            "    {} ---|{}| {}",
            port_id(edge.node_a, edge.port_a),
            label(&format!("S{} {block}", edge.subnet_id)),
            port_id(edge.node_b, edge.port_b)
        );
    }
    for link in &arch.links {
        write_link(&mut out, link);
    }
    out
}

fn write_link(out: &mut String, link: &ArchitectureLink) {
    let from = endpoint_id(link.from);
    let to = endpoint_id(link.to);
    let arrow = match link.kind {
        LinkKind::Lag => "===",
        LinkKind::Trunk | LinkKind::Access => "---",
    };
    let show_label = match (&link.kind, &link.carries) {
        (LinkKind::Access, Carries::Subnets(_)) => true,
        (LinkKind::Access, Carries::Role(_)) => false,
        _ => !link.label.is_empty(),
    };
    if show_label {
        let _ = writeln!(out, "    {from} {arrow}|{}| {to}", label(&link.label));
    } else {
        let _ = writeln!(out, "    {from} {arrow} {to}");
    }
}
