use cablemap_core::{DiagramConfig, PlannedTopology, TopologyInput, plan_topology};
use cablemap_render::model::{BoxKind, CableKind, CablingLayout, LaneBucket};
use cablemap_render::{LayoutOptions, layout_topology};
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};

fn planned(raw: Value) -> PlannedTopology {
    let input = TopologyInput::from_value(&raw).expect("input");
    plan_topology(&input).expect("planned")
}

fn layout(raw: Value) -> CablingLayout {
    layout_topology(&planned(raw), &LayoutOptions::default())
}

fn fixtures() -> Vec<Value> {
    vec![
        json!({ "nodeCount": 2, "portsPerNode": 4, "storageMode": "switchless" }),
        json!({ "nodeCount": 3, "portsPerNode": 6, "storageMode": "switchless" }),
        json!({ "nodeCount": 4, "portsPerNode": 10, "storageMode": "switchless" }),
        json!({ "nodeCount": 4, "portsPerNode": 6, "torSwitchCount": 2 }),
        json!({ "nodeCount": 4, "portsPerNode": 6, "architectureOption": "A" }),
        json!({ "nodeCount": 8, "portsPerNode": 4, "architectureOption": "B" }),
        json!({ "nodeCount": 6, "portsPerNode": 4, "architectureOption": "C" }),
        json!({ "nodeCount": 4, "portsPerNode": 4, "architectureOption": "D" }),
    ]
}

#[test]
fn lanes_and_landings_are_distinct_within_each_bucket() {
    for raw in fixtures() {
        let layout = layout(raw.clone());
        let mut buckets: FxHashMap<LaneBucket, Vec<(u32, f64)>> = FxHashMap::default();
        for path in &layout.paths {
            if let (Some(bucket), Some(x)) = (path.bucket, path.landing_x) {
                buckets.entry(bucket).or_default().push((path.lane, x));
            }
        }
        assert!(!buckets.is_empty(), "{raw}");
        for (bucket, entries) in buckets {
            let lanes: FxHashSet<u32> = entries.iter().map(|(l, _)| *l).collect();
            assert_eq!(lanes.len(), entries.len(), "{raw} {bucket:?}");
            for (i, (_, a)) in entries.iter().enumerate() {
                for (_, b) in &entries[i + 1..] {
                    assert!((a - b).abs() > 1e-6, "{raw} {bucket:?}: landing {a} reused");
                }
            }
        }
    }
}

#[test]
fn approach_levels_never_share_a_height() {
    for raw in fixtures() {
        let layout = layout(raw.clone());
        let mut heights: Vec<f64> = layout
            .paths
            .iter()
            .filter(|p| p.bucket.is_some())
            .map(|p| p.points[1].y)
            .collect();
        let total = heights.len();
        heights.sort_by(f64::total_cmp);
        heights.dedup_by(|a, b| (*a - *b).abs() < 1e-6);
        assert_eq!(heights.len(), total, "{raw}");
    }
}

fn sweep() -> Vec<Value> {
    let mut out = Vec::new();
    for n in 2..=4u32 {
        let needed = 2 + (n - 1) * 2;
        for ports in [needed, needed + 2] {
            out.push(json!({ "nodeCount": n, "portsPerNode": ports, "storageMode": "switchless" }));
        }
    }
    for ports in [4, 6] {
        out.push(json!({
            "nodeCount": 3,
            "portsPerNode": ports,
            "storageMode": "switchless",
            "linkMode": "single_link"
        }));
    }
    for n in 1..=16u32 {
        for ports in [2, 4, 6] {
            for tors in [1, 2] {
                out.push(json!({ "nodeCount": n, "portsPerNode": ports, "torSwitchCount": tors }));
            }
        }
    }
    for option in ["A", "B", "C", "D"] {
        for n in [2, 4, 6, 8] {
            for ports in [2, 4, 6, 8] {
                out.push(json!({ "nodeCount": n, "portsPerNode": ports, "architectureOption": option }));
            }
        }
    }
    out
}

/// Axis-aligned segments of every cable, tagged with the cable's index.
fn segments(layout: &CablingLayout) -> Vec<(usize, (f64, f64), (f64, f64))> {
    let mut out = Vec::new();
    for (i, path) in layout.paths.iter().enumerate() {
        for w in path.points.windows(2) {
            let (a, b) = ((w[0].x, w[0].y), (w[1].x, w[1].y));
            if (a.0 - b.0).abs() > 1e-6 || (a.1 - b.1).abs() > 1e-6 {
                out.push((i, a, b));
            }
        }
    }
    out
}

fn shared_run(a: ((f64, f64), (f64, f64)), b: ((f64, f64), (f64, f64))) -> bool {
    let span = |p: f64, q: f64| (p.min(q), p.max(q));
    let overlaps = |(lo1, hi1): (f64, f64), (lo2, hi2): (f64, f64)| hi1.min(hi2) - lo1.max(lo2) > 1e-6;
    let vertical = |s: ((f64, f64), (f64, f64))| (s.0.0 - s.1.0).abs() < 1e-6;
    let horizontal = |s: ((f64, f64), (f64, f64))| (s.0.1 - s.1.1).abs() < 1e-6;
    if vertical(a) && vertical(b) && (a.0.0 - b.0.0).abs() < 1e-6 {
        return overlaps(span(a.0.1, a.1.1), span(b.0.1, b.1.1));
    }
    if horizontal(a) && horizontal(b) && (a.0.1 - b.0.1).abs() < 1e-6 {
        return overlaps(span(a.0.0, a.1.0), span(b.0.0, b.1.0));
    }
    false
}

#[test]
fn cables_never_share_a_straight_run() {
    for raw in sweep() {
        let layout = layout(raw.clone());
        let segs = segments(&layout);
        for (i, (pa, a0, a1)) in segs.iter().enumerate() {
            for (pb, b0, b1) in &segs[i + 1..] {
                if pa == pb {
                    continue;
                }
                assert!(
                    !shared_run((*a0, *a1), (*b0, *b1)),
                    "{raw}: {} and {} overlap",
                    layout.paths[*pa].id,
                    layout.paths[*pb].id
                );
            }
        }
    }
}

#[test]
fn dual_tor_landings_clear_tile_rises() {
    let layout = layout(json!({ "nodeCount": 4, "portsPerNode": 4, "torSwitchCount": 2 }));
    let rises: Vec<f64> = layout
        .paths
        .iter()
        .filter(|p| p.bucket.is_some())
        .map(|p| p.points[0].x)
        .collect();
    for path in layout.paths.iter().filter(|p| p.bucket.is_some()) {
        let x = path.landing_x.expect("landing");
        assert!(rises.iter().all(|r| (r - x).abs() > 1e-6), "{} lands on a rise", path.id);
    }
}

#[test]
fn access_paths_land_on_their_tor() {
    for raw in fixtures() {
        let layout = layout(raw.clone());
        for path in layout.paths.iter().filter(|p| p.bucket.is_some()) {
            let bucket = path.bucket.unwrap();
            let tor = layout
                .boxes
                .iter()
                .find(|b| b.id == format!("tor-{}", bucket.tor))
                .expect("tor box");
            let x = path.landing_x.unwrap();
            assert!(x > tor.x && x < tor.right(), "{raw} {}", path.id);
            let last = path.points.last().unwrap();
            assert!((last.y - tor.bottom()).abs() < 1e-9);
            let tile_top = path.points[0].y;
            assert!(path.points[1].y < tile_top && path.points[1].y > tor.bottom());
        }
    }
}

#[test]
fn layout_is_deterministic() {
    for raw in fixtures() {
        let a = layout(raw.clone());
        let b = layout(raw);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}

#[test]
fn switchless_storage_runs_below_the_nodes() {
    let layout = layout(json!({ "nodeCount": 3, "portsPerNode": 6, "storageMode": "switchless" }));
    let node_bottom = layout
        .boxes_of(BoxKind::Node)
        .map(|b| b.bottom())
        .fold(f64::MIN, f64::max);
    let peers: Vec<_> = layout.paths_of(CableKind::Peer).collect();
    assert_eq!(peers.len(), 6);
    let mut levels: Vec<f64> = peers.iter().map(|p| p.points[1].y).collect();
    assert!(levels.iter().all(|y| *y > node_bottom));
    levels.dedup();
    assert_eq!(levels.len(), 6);
    // Management ports still reach the switch; storage ports do not.
    assert_eq!(layout.paths_of(CableKind::Management).count(), 6);
    assert_eq!(layout.paths_of(CableKind::Storage).count(), 0);
}

#[test]
fn option_d_cables_every_node_to_both_rooms() {
    let layout = layout(json!({ "nodeCount": 4, "portsPerNode": 4, "architectureOption": "D" }));
    assert_eq!(layout.boxes_of(BoxKind::Room).count(), 2);
    assert_eq!(layout.boxes_of(BoxKind::Tor).count(), 2);
    assert_eq!(layout.paths_of(CableKind::Trunk).count(), 0);
    assert_eq!(layout.paths_of(CableKind::Lag).count(), 0);
    for node in 1..=4u32 {
        let tors: FxHashSet<u8> = layout
            .paths
            .iter()
            .filter_map(|p| p.bucket.filter(|_| p.id.starts_with(&format!("access-n{node}-"))))
            .map(|b| b.tor)
            .collect();
        assert_eq!(tors.len(), 2, "Node{node}");
    }
}

#[test]
fn dual_tors_do_not_overlap() {
    let layout = layout(json!({ "nodeCount": 2, "portsPerNode": 4, "torSwitchCount": 2 }));
    let tors: Vec<_> = layout.boxes_of(BoxKind::Tor).collect();
    assert_eq!(tors.len(), 2);
    assert!(tors[0].right() < tors[1].x);
    let nodes: Vec<_> = layout.boxes_of(BoxKind::Node).collect();
    // Each TOR sits over one half of the node row.
    assert!(tors[0].center_x() < nodes[1].x);
    assert!(tors[1].center_x() > nodes[0].right());
}

#[test]
fn option_b_draws_a_storage_bus() {
    let layout = layout(json!({ "nodeCount": 4, "portsPerNode": 4, "architectureOption": "B" }));
    let bus: Vec<_> = layout.boxes_of(BoxKind::StorageBus).collect();
    assert_eq!(bus.len(), 1);
    assert_eq!(layout.paths_of(CableKind::Bus).count(), 4);
    assert_eq!(layout.paths_of(CableKind::Uplink).count(), 4);
    assert_eq!(layout.boxes_of(BoxKind::Router).count(), 1);
    let tor_top = layout.boxes_of(BoxKind::Tor).map(|b| b.y).fold(f64::MAX, f64::min);
    assert!(bus[0].bottom() < tor_top);
}

#[test]
fn large_clusters_collapse_into_summaries() {
    let layout = layout(json!({ "nodeCount": 16, "portsPerNode": 4 }));
    let more: Vec<_> = layout.boxes_of(BoxKind::Overflow).collect();
    assert_eq!(more.len(), 1);
    assert_eq!(more[0].label, "+12 more nodes");
    assert_eq!(layout.boxes_of(BoxKind::Node).count(), 4);
    assert!(layout.paths.iter().all(|p| !p.id.starts_with("access-n5-")));
}

#[test]
fn role_groups_cap_their_tiles() {
    let topology = planned(json!({ "nodeCount": 2, "portsPerNode": 24 }));
    let options = LayoutOptions::default().with_config(DiagramConfig::from_value(json!({
        "layout": { "maxTilesPerGroup": 3 }
    })));
    let layout = layout_topology(&topology, &options);
    let more: Vec<&str> = layout
        .boxes_of(BoxKind::Overflow)
        .map(|b| b.label.as_str())
        .collect();
    assert_eq!(more, vec!["+20 more", "+20 more"]);
    assert_eq!(layout.tiles.len(), 8);
    assert!(layout.tile(1, 5).is_none());
    assert_eq!(
        layout.paths.iter().filter(|p| p.bucket.is_some()).count(),
        8
    );
}

#[test]
fn port_tiles_sit_inside_their_role_group() {
    let layout = layout(json!({
        "nodeCount": 2,
        "portsPerNode": 6,
        "intentAssignment": "custom",
        "portRoles": { "1": "mgmt_compute", "2": "mgmt_compute", "3": "Backup", "4": "storage", "5": "storage" }
    }));
    for tile in &layout.tiles {
        let group = layout
            .boxes_of(BoxKind::RoleGroup)
            .find(|g| g.id.starts_with(&format!("node-{}-", tile.node)) && g.role.as_ref() == Some(&tile.role))
            .expect("group");
        assert!(tile.x >= group.x && tile.x + tile.width <= group.right());
        assert!(tile.y >= group.y && tile.y + tile.height <= group.bottom());
    }
    let labels: Vec<&str> = layout
        .boxes_of(BoxKind::RoleGroup)
        .filter(|g| g.id.starts_with("node-1-"))
        .map(|g| g.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Management + Compute", "Backup", "Storage", "Unused"]);
}
