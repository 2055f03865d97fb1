use super::LayoutConfig;
use crate::model::{CableKind, CablePath, CableSource, LayoutPoint, PortTile};
use cablemap_core::CablingPlan;

/// U-shaped switchless storage cables below the node row, one lane (height) per subnet.
///
/// Lane `j` runs at `channel_top + j * peer_lane_step`. Edges with an endpoint off the canvas are
/// skipped.
pub(crate) fn route_peers(
    plan: &CablingPlan,
    tiles: &[PortTile],
    channel_top: f64,
    cfg: &LayoutConfig,
) -> Vec<CablePath> {
    let tile = |node: u32, port: u32| tiles.iter().find(|t| t.node == node && t.port == port);
    let mut paths = Vec::with_capacity(plan.storage_edges.len());
    for (lane, edge) in plan.storage_edges.iter().enumerate() {
        let (Some(a), Some(b)) = (tile(edge.node_a, edge.port_a), tile(edge.node_b, edge.port_b))
        else {
            continue;
        };
        let lane = lane as u32;
        let y = channel_top + f64::from(lane) * cfg.peer_lane_step;
        let (pa, pb) = (a.bottom_anchor(), b.bottom_anchor());
        paths.push(CablePath {
            id: format!("subnet-{}", edge.subnet_id),
            kind: CableKind::Peer,
            source: CableSource::StorageEdge {
                subnet_id: edge.subnet_id,
            },
            lane,
            bucket: None,
            landing_x: None,
            points: vec![
                pa,
                LayoutPoint::new(pa.x, y),
                LayoutPoint::new(pb.x, y),
                pb,
            ],
            label: Some(format!("S{}", edge.subnet_id)),
            subnet_ids: vec![edge.subnet_id],
        });
    }
    paths
}
