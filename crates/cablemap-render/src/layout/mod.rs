//! Absolute geometry for a planned topology.
//!
//! Top to bottom: title, router (options A/B), room frames, trunk channel, TOR row, approach
//! zone, node row, switchless storage channel. Everything is plain arithmetic over the plan, so
//! the same topology and config always produce the same coordinates.

mod lanes;
mod nodes;
mod peers;
mod trunks;

use crate::LayoutOptions;
use crate::model::{BoxKind, Bounds, CablingLayout, LayoutBox};
use crate::text::TextStyle;
use cablemap_core::{DiagramConfig, LinkMode, PlannedTopology, StorageMode};
use indexmap::IndexMap;
use rustc_hash::FxHashSet;

/// Numeric layout parameters. Read from `layout.*` keys of a [`DiagramConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub margin: f64,
    pub title_height: f64,
    pub font_size: f64,
    pub tile_width: f64,
    pub tile_height: f64,
    pub tile_gap: f64,
    pub group_padding: f64,
    pub group_title_height: f64,
    pub group_gap: f64,
    pub node_padding: f64,
    pub node_header_height: f64,
    pub node_gap: f64,
    pub tor_width: f64,
    pub tor_height: f64,
    pub tor_gap: f64,
    pub router_width: f64,
    pub router_height: f64,
    pub room_gap: f64,
    pub room_padding: f64,
    pub room_title_height: f64,
    pub lane_step: f64,
    pub approach_clearance: f64,
    pub min_approach_height: f64,
    pub band_inset: f64,
    pub trunk_lane_step: f64,
    pub trunk_clearance: f64,
    pub bus_thickness: f64,
    pub peer_lane_step: f64,
    pub peer_clearance: f64,
    pub max_tiles_per_group: usize,
    pub max_detailed_nodes: usize,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            margin: 32.0,
            title_height: 32.0,
            font_size: 12.0,
            tile_width: 64.0,
            tile_height: 30.0,
            tile_gap: 8.0,
            group_padding: 8.0,
            group_title_height: 20.0,
            group_gap: 12.0,
            node_padding: 12.0,
            node_header_height: 28.0,
            node_gap: 48.0,
            tor_width: 160.0,
            tor_height: 40.0,
            tor_gap: 40.0,
            router_width: 200.0,
            router_height: 40.0,
            room_gap: 64.0,
            room_padding: 16.0,
            room_title_height: 24.0,
            lane_step: 10.0,
            approach_clearance: 20.0,
            min_approach_height: 80.0,
            band_inset: 8.0,
            trunk_lane_step: 14.0,
            trunk_clearance: 18.0,
            bus_thickness: 6.0,
            peer_lane_step: 14.0,
            peer_clearance: 18.0,
            max_tiles_per_group: 8,
            max_detailed_nodes: 4,
        }
    }
}

impl LayoutConfig {
    pub fn from_config(config: &DiagramConfig) -> Self {
        let d = Self::default();
        let f = |key: &str, default: f64| -> f64 {
            config
                .get_f64(&format!("layout.{key}"))
                .filter(|v| v.is_finite() && *v >= 0.0)
                .unwrap_or(default)
        };
        let n = |key: &str, default: usize| -> usize {
            config
                .get_usize(&format!("layout.{key}"))
                .unwrap_or(default)
        };
        Self {
            margin: f("margin", d.margin),
            title_height: f("titleHeight", d.title_height),
            font_size: f("fontSize", d.font_size).max(1.0),
            tile_width: f("tileWidth", d.tile_width).max(1.0),
            tile_height: f("tileHeight", d.tile_height).max(1.0),
            tile_gap: f("tileGap", d.tile_gap),
            group_padding: f("groupPadding", d.group_padding),
            group_title_height: f("groupTitleHeight", d.group_title_height),
            group_gap: f("groupGap", d.group_gap),
            node_padding: f("nodePadding", d.node_padding),
            node_header_height: f("nodeHeaderHeight", d.node_header_height),
            node_gap: f("nodeGap", d.node_gap),
            tor_width: f("torWidth", d.tor_width).max(16.0),
            tor_height: f("torHeight", d.tor_height).max(1.0),
            tor_gap: f("torGap", d.tor_gap),
            router_width: f("routerWidth", d.router_width).max(16.0),
            router_height: f("routerHeight", d.router_height).max(1.0),
            room_gap: f("roomGap", d.room_gap),
            room_padding: f("roomPadding", d.room_padding),
            room_title_height: f("roomTitleHeight", d.room_title_height),
            lane_step: f("laneStep", d.lane_step).max(1.0),
            approach_clearance: f("approachClearance", d.approach_clearance),
            min_approach_height: f("minApproachHeight", d.min_approach_height),
            band_inset: f("bandInset", d.band_inset),
            trunk_lane_step: f("trunkLaneStep", d.trunk_lane_step).max(1.0),
            trunk_clearance: f("trunkClearance", d.trunk_clearance),
            bus_thickness: f("busThickness", d.bus_thickness).max(1.0),
            peer_lane_step: f("peerLaneStep", d.peer_lane_step).max(1.0),
            peer_clearance: f("peerClearance", d.peer_clearance),
            max_tiles_per_group: n("maxTilesPerGroup", d.max_tiles_per_group).max(1),
            max_detailed_nodes: n("maxDetailedNodes", d.max_detailed_nodes).max(1),
        }
    }
}

/// Shifts `x` off every coordinate in `taken` by up to three eighths of `pitch` either way.
///
/// Slots `pitch` apart that are each shifted this way stay at least a quarter pitch apart and
/// keep their order.
pub(crate) fn clear_of(x: f64, taken: &[f64], pitch: f64) -> f64 {
    let clashes = |c: f64| taken.iter().any(|t| (t - c).abs() < 1e-6);
    let step = pitch.abs() / 8.0;
    if !clashes(x) || step <= 0.0 {
        return x;
    }
    for k in 1..=3 {
        for sign in [1.0, -1.0] {
            let c = x + sign * step * f64::from(k);
            if !clashes(c) {
                return c;
            }
        }
    }
    x
}

/// Diagram heading for a topology, e.g. `Switchless storage: 3 nodes, dual link`.
pub fn diagram_title(topology: &PlannedTopology) -> String {
    let spec = &topology.spec;
    if let Some(option) = topology.architecture.option {
        return format!("{} ({} nodes)", option.title(), spec.node_count);
    }
    match (spec.storage_mode, spec.link_mode) {
        (StorageMode::Switchless, link) => format!(
            "Switchless storage: {} nodes, {}",
            spec.node_count,
            match link {
                Some(LinkMode::SingleLink) => "single link",
                _ => "dual link",
            }
        ),
        (StorageMode::Switched, _) if spec.tor_switch_count > 1 => format!(
            "Switched storage: {} nodes, {} TOR switches",
            spec.node_count, spec.tor_switch_count
        ),
        (StorageMode::Switched, _) => format!("Switched storage: {} nodes", spec.node_count),
    }
}

pub fn layout_topology(topology: &PlannedTopology, options: &LayoutOptions) -> CablingLayout {
    let cfg = LayoutConfig::from_config(&options.config);
    let measurer = options.text_measurer.as_ref();
    let arch = &topology.architecture;

    let template = nodes::node_template(&topology.plan, &cfg, measurer);
    let rows = nodes::room_rows(topology, &cfg, &template, measurer);
    let two_rooms = rows.len() > 1;
    let content_right = rows
        .last()
        .map(|r| r.x + r.width)
        .unwrap_or(cfg.margin);
    let content_center = (cfg.margin + content_right) / 2.0;

    let mut boxes: Vec<LayoutBox> = Vec::new();
    let mut tiles = Vec::new();

    let mut y = cfg.margin + cfg.title_height;
    let router = arch.router.then(|| {
        let b = LayoutBox {
            id: "router".to_string(),
            kind: BoxKind::Router,
            x: content_center - cfg.router_width / 2.0,
            y,
            width: cfg.router_width,
            height: cfg.router_height,
            label: "Switch/Router".to_string(),
            role: None,
        };
        y += cfg.router_height;
        b
    });

    let rooms_top = y;
    if two_rooms {
        y += cfg.room_title_height;
    }
    let lanes = trunks::channel_lanes(arch);
    y += if lanes > 0 {
        cfg.trunk_clearance * 2.0 + f64::from(lanes - 1) * cfg.trunk_lane_step
    } else {
        cfg.trunk_clearance
    };

    let tor_top = y;
    let mut tor_boxes: IndexMap<u8, LayoutBox> = IndexMap::new();
    for row in &rows {
        for (index, cx) in row.tors.iter().zip(row.tor_centers(&template, &cfg)) {
            let label = arch
                .tor(*index)
                .map(|t| t.label.clone())
                .unwrap_or_else(|| format!("TOR{index}"));
            tor_boxes.insert(
                *index,
                LayoutBox {
                    id: format!("tor-{index}"),
                    kind: BoxKind::Tor,
                    x: cx - cfg.tor_width / 2.0,
                    y: tor_top,
                    width: cfg.tor_width,
                    height: cfg.tor_height,
                    label,
                    role: None,
                },
            );
        }
    }
    let tor_bottom = tor_top + cfg.tor_height;

    let shown: FxHashSet<u32> = rows.iter().flat_map(|r| r.nodes.iter().copied()).collect();
    let access_count = arch
        .access_links()
        .filter_map(|l| l.node_port())
        .filter(|p| shown.contains(&p.node) && template.is_visible(p.port))
        .count();
    let approach = cfg.approach_clearance * 2.0
        + access_count.saturating_sub(1) as f64 * cfg.lane_step;
    let node_top = tor_bottom + approach.max(cfg.min_approach_height);
    let node_bottom = node_top + template.height;

    for row in &rows {
        nodes::place_nodes(row, node_top, &template, &cfg, &mut boxes, &mut tiles);
    }

    let requests = lanes::access_requests(arch, &tiles);
    let mut paths = lanes::route_access(
        &requests,
        &tor_boxes,
        |tor| arch.tor(tor).map(|t| t.room).unwrap_or(1),
        node_top - cfg.approach_clearance,
        &cfg,
    );

    let trunk = trunks::route_trunks(
        arch,
        &tor_boxes,
        router.as_ref(),
        tor_top - cfg.trunk_clearance,
        &cfg,
    );
    paths.extend(trunk.paths);

    let peer_paths = peers::route_peers(
        &topology.plan,
        &tiles,
        node_bottom + cfg.peer_clearance,
        &cfg,
    );
    let content_bottom = match peer_paths.iter().map(|p| p.lane).max() {
        Some(last) => node_bottom + cfg.peer_clearance * 2.0 + f64::from(last) * cfg.peer_lane_step,
        None => node_bottom,
    };
    paths.extend(peer_paths);

    // Back to front: room frames, switches, nodes.
    let mut ordered: Vec<LayoutBox> = Vec::with_capacity(boxes.len() + tor_boxes.len() + 4);
    if two_rooms {
        for row in &rows {
            ordered.push(LayoutBox {
                id: format!("room-{}", row.room),
                kind: BoxKind::Room,
                x: row.x,
                y: rooms_top,
                width: row.width,
                height: content_bottom + cfg.room_padding - rooms_top,
                label: format!("Room {}", row.room),
                role: None,
            });
        }
    }
    ordered.extend(router);
    ordered.extend(tor_boxes.into_values());
    ordered.extend(trunk.bus);
    ordered.extend(boxes);

    let title = diagram_title(topology);
    let title_width = measurer
        .measure(
            &title,
            &TextStyle {
                font_size: cfg.font_size + 4.0,
                bold: true,
            },
        )
        .width;
    let corners = ordered
        .iter()
        .flat_map(|b| [(b.x, b.y), (b.right(), b.bottom())])
        .chain(paths.iter().flat_map(|p| p.points.iter().map(|pt| (pt.x, pt.y))))
        .chain([(0.0, 0.0), (cfg.margin + title_width, cfg.margin)]);
    let mut bounds = Bounds::from_points(corners).unwrap_or(Bounds {
        min_x: 0.0,
        min_y: 0.0,
        max_x: 0.0,
        max_y: 0.0,
    });
    bounds.max_x += cfg.margin;
    bounds.max_y += cfg.margin;

    let hidden_nodes: usize = rows.iter().map(|r| r.hidden_nodes).sum();
    if hidden_nodes > 0 || template.hidden_ports() > 0 {
        tracing::warn!(
            hidden_nodes,
            hidden_ports_per_node = template.hidden_ports(),
            "cabling diagram abbreviated; cables to hidden ports are omitted"
        );
    }
    tracing::debug!(
        kind = %topology.spec.kind_slug(),
        boxes = ordered.len(),
        tiles = tiles.len(),
        paths = paths.len(),
        width = bounds.width(),
        height = bounds.height(),
        "laid out cabling diagram"
    );

    CablingLayout {
        title,
        kind: topology.spec.kind_slug(),
        bounds,
        boxes: ordered,
        tiles,
        paths,
    }
}
