use cablemap_core::{
    CablingPlan, LinkMode, PortRole, StorageMode, TopologyInput, adapter_addresses, plan_cabling,
};
use std::net::Ipv4Addr;
use rustc_hash::FxHashSet;
use serde_json::json;

fn switchless(nodes: u32, ports: u32, link: Option<&str>) -> CablingPlan {
    let mut raw = json!({
        "nodeCount": nodes,
        "portsPerNode": ports,
        "storageMode": "switchless",
    });
    if let Some(link) = link {
        raw["linkMode"] = json!(link);
    }
    let spec = TopologyInput::from_value(&raw)
        .expect("input")
        .resolve()
        .expect("valid spec");
    plan_cabling(&spec).expect("plan")
}

fn pairs_by_subnet(plan: &CablingPlan) -> Vec<(u32, u32, u32)> {
    plan.storage_edges
        .iter()
        .map(|e| (e.subnet_id, e.node_a, e.node_b))
        .collect()
}

#[test]
fn three_node_dual_link_matches_reference_numbering() {
    let plan = switchless(3, 6, Some("dual_link"));
    assert_eq!(
        pairs_by_subnet(&plan),
        vec![(1, 1, 2), (2, 1, 2), (3, 1, 3), (4, 1, 3), (5, 2, 3), (6, 2, 3)]
    );

    let ports: Vec<(u32, u32, u32, u32)> = plan
        .storage_edges
        .iter()
        .map(|e| (e.node_a, e.port_a, e.node_b, e.port_b))
        .collect();
    assert_eq!(
        ports,
        vec![
            (1, 3, 2, 3),
            (1, 4, 2, 4),
            (1, 5, 3, 3),
            (1, 6, 3, 4),
            (2, 5, 3, 5),
            (2, 6, 3, 6),
        ]
    );
    assert_eq!(plan.storage_edges[0].pair_label, "Node1↔Node2");
    assert_eq!(plan.storage_edges[5].pair_label, "Node2↔Node3");
    plan.validate().expect("invariants hold");
}

#[test]
fn three_node_single_link_matches_reference_numbering() {
    let plan = switchless(3, 4, Some("single_link"));
    assert_eq!(pairs_by_subnet(&plan), vec![(1, 1, 2), (2, 1, 3), (3, 2, 3)]);

    let ports: Vec<(u32, u32, u32, u32)> = plan
        .storage_edges
        .iter()
        .map(|e| (e.node_a, e.port_a, e.node_b, e.port_b))
        .collect();
    assert_eq!(ports, vec![(1, 3, 2, 3), (1, 4, 3, 3), (2, 4, 3, 4)]);
    assert_eq!(plan.storage_edges[1].pair_label, "Node1↔Node3");
    plan.validate().expect("invariants hold");
}

#[test]
fn full_mesh_coverage_for_every_supported_size() {
    for (nodes, link, mult) in [
        (2, None, 2u32),
        (3, Some("dual_link"), 2),
        (3, Some("single_link"), 1),
        (4, None, 2),
    ] {
        let ports = 2 + (nodes - 1) * mult;
        let plan = switchless(nodes, ports, link);
        let expected_edges = (nodes * (nodes - 1) / 2 * mult) as usize;
        assert_eq!(plan.storage_edges.len(), expected_edges, "{nodes} nodes");
        for node in 1..=nodes {
            assert_eq!(
                plan.storage_port_count(node),
                ((nodes - 1) * mult) as usize,
                "Node{node} of {nodes}"
            );
        }
        let ids: Vec<u32> = plan.storage_edges.iter().map(|e| e.subnet_id).collect();
        assert_eq!(ids, (1..=expected_edges as u32).collect::<Vec<_>>());
    }
}

#[test]
fn no_port_is_reused_across_edges() {
    let plan = switchless(4, 10, None);
    let mut seen = FxHashSet::default();
    for edge in &plan.storage_edges {
        for end in edge.endpoints() {
            assert!(seen.insert(end), "port reused: {end:?}");
        }
    }
    assert_eq!(seen.len(), 24);
}

#[test]
fn two_node_switchless_pairs_both_ports() {
    let plan = switchless(2, 4, None);
    assert_eq!(plan.link_mode, Some(LinkMode::DualLink));
    assert_eq!(plan.storage_edges.len(), 2);
    for edge in &plan.storage_edges {
        assert_eq!((edge.node_a, edge.node_b), (1, 2));
        assert_eq!(edge.port_a, edge.port_b);
    }
    let node1 = plan.node(1).unwrap();
    let peers: Vec<_> = node1.ports.iter().filter_map(|p| p.peer).collect();
    assert_eq!(peers.len(), 2);
    assert!(peers.iter().all(|p| p.node == 2));
}

#[test]
fn four_node_dual_link_has_twelve_subnets() {
    let plan = switchless(4, 8, None);
    assert_eq!(plan.storage_edges.len(), 12);
    for node in 1..=4 {
        assert_eq!(plan.storage_port_count(node), 6);
    }
    let pair_13: Vec<u32> = plan.edges_between(3, 1).map(|e| e.subnet_id).collect();
    assert_eq!(pair_13, vec![3, 4]);
    let pair_34: Vec<u32> = plan.edges_between(3, 4).map(|e| e.subnet_id).collect();
    assert_eq!(pair_34, vec![11, 12]);
}

#[test]
fn planning_is_deterministic() {
    let a = switchless(4, 8, None);
    let b = switchless(4, 8, None);
    assert_eq!(a, b);
}

#[test]
fn spare_switchless_ports_stay_unused() {
    let plan = switchless(2, 6, None);
    let roles: Vec<&PortRole> = plan.node(1).unwrap().ports.iter().map(|p| &p.role).collect();
    assert_eq!(
        roles,
        vec![
            &PortRole::MgmtCompute,
            &PortRole::MgmtCompute,
            &PortRole::Storage,
            &PortRole::Storage,
            &PortRole::Unused,
            &PortRole::Unused,
        ]
    );
}

#[test]
fn switched_storage_gets_networks_without_edges() {
    let spec = TopologyInput::from_value(&json!({
        "nodeCount": 4,
        "portsPerNode": 6,
        "storageMode": "switched",
        "storageVlans": [800]
    }))
    .unwrap()
    .resolve()
    .unwrap();
    let plan = plan_cabling(&spec).unwrap();
    assert_eq!(plan.storage_mode, StorageMode::Switched);
    assert!(plan.storage_edges.is_empty());
    let nets: Vec<(u32, u32, u16)> = plan
        .storage_networks
        .iter()
        .map(|n| (n.subnet_id, n.port, n.vlan))
        .collect();
    assert_eq!(nets, vec![(1, 3, 800), (2, 4, 712), (3, 5, 713), (4, 6, 714)]);
    assert_eq!(plan.subnet_ids(), vec![1, 2, 3, 4]);
    plan.validate().unwrap();
}

#[test]
fn switched_storage_networks_cap_at_eight() {
    let spec = TopologyInput::from_value(&json!({
        "nodeCount": 2,
        "portsPerNode": 24,
    }))
    .unwrap()
    .resolve()
    .unwrap();
    let plan = plan_cabling(&spec).unwrap();
    assert_eq!(plan.storage_networks.len(), 8);
    assert_eq!(plan.storage_port_count(1), 22);
    let last = plan.port(1, 24).unwrap();
    assert_eq!(last.role, PortRole::Storage);
    assert_eq!(last.subnet_id, None);
}

#[test]
fn mapped_switchless_uses_the_chosen_storage_ports() {
    let spec = TopologyInput::from_value(&json!({
        "nodeCount": 2,
        "portsPerNode": 4,
        "storageMode": "switchless",
        "intentAssignment": "mapped",
        "portRoles": { "1": "mgmt_compute", "2": "storage", "3": "mgmt_compute", "4": "storage" }
    }))
    .unwrap()
    .resolve()
    .unwrap();
    let plan = plan_cabling(&spec).unwrap();
    let ports: Vec<(u32, u32)> = plan
        .storage_edges
        .iter()
        .map(|e| (e.port_a, e.port_b))
        .collect();
    assert_eq!(ports, vec![(2, 2), (4, 4)]);
    assert_eq!(plan.port_name(1, 2), Some("SMB1"));
    assert_eq!(plan.port_name(1, 3), Some("NIC2"));
}

#[test]
fn custom_roles_group_for_rendering() {
    let spec = TopologyInput::from_value(&json!({
        "nodeCount": 2,
        "portsPerNode": 6,
        "intentAssignment": "custom",
        "portRoles": {
            "1": "Compute 1",
            "2": "mgmt_compute",
            "3": "storage",
            "4": "mgmt_compute",
            "5": "storage"
        }
    }))
    .unwrap()
    .resolve()
    .unwrap();
    let plan = plan_cabling(&spec).unwrap();
    let groups: Vec<(String, Vec<u32>)> = plan
        .role_groups
        .iter()
        .map(|g| (g.role.to_string(), g.ports.clone()))
        .collect();
    assert_eq!(
        groups,
        vec![
            ("mgmt_compute".to_string(), vec![2, 4]),
            ("Compute 1".to_string(), vec![1]),
            ("storage".to_string(), vec![3, 5]),
            ("unused".to_string(), vec![6]),
        ]
    );
}

#[test]
fn adapters_take_their_node_number_as_host() {
    let spec = TopologyInput::from_value(&json!({
        "nodeCount": 3,
        "portsPerNode": 6,
        "storageMode": "switchless",
        "storageSubnets": ["192.168.10.0/24", "192.168.11.0/31"]
    }))
    .expect("input")
    .resolve()
    .expect("valid spec");
    let plan = plan_cabling(&spec).expect("plan");
    let addresses = adapter_addresses(&plan, &spec.address_plan).expect("addresses");
    assert_eq!(addresses.len(), 12);

    let first: Vec<_> = addresses
        .iter()
        .filter(|a| a.subnet_id == 1)
        .map(|a| (a.node, a.port_name.as_str(), a.address))
        .collect();
    assert_eq!(
        first,
        vec![
            (1, "SMB1", Some(Ipv4Addr::new(192, 168, 10, 1))),
            (2, "SMB1", Some(Ipv4Addr::new(192, 168, 10, 2))),
        ]
    );
    // Node2 does not fit a /31 host index of 2.
    let second: Vec<_> = addresses
        .iter()
        .filter(|a| a.subnet_id == 2)
        .map(|a| a.address)
        .collect();
    assert_eq!(second, vec![Some(Ipv4Addr::new(192, 168, 11, 1)), None]);
    // Remaining subnets fall back to placeholder blocks.
    let last = addresses.last().expect("address");
    assert_eq!((last.subnet_id, last.node, last.prefix), (6, 3, 24));
    assert_eq!(last.address, Some(Ipv4Addr::new(10, 0, 6, 3)));
}
