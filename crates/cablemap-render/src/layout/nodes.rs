//! Node boxes, role groups and port tiles.
//!
//! Every node carries the same role table, so one [`NodeTemplate`] (relative offsets) is computed
//! once and stamped at each node position.

use super::LayoutConfig;
use crate::model::{BoxKind, LayoutBox, LayoutPoint, PortTile};
use crate::text::{TextMeasurer, TextStyle};
use cablemap_core::{CablingPlan, PlannedTopology, PortRole};

#[derive(Debug, Clone)]
pub(crate) struct TileSlot {
    pub port: u32,
    pub name: String,
    pub x: f64,
}

#[derive(Debug, Clone)]
pub(crate) struct GroupTemplate {
    pub role: PortRole,
    pub x: f64,
    pub width: f64,
    pub tiles: Vec<TileSlot>,
    /// Ports folded into the trailing "+N more" tile.
    pub hidden: usize,
    pub more_x: Option<f64>,
}

#[derive(Debug, Clone)]
pub(crate) struct NodeTemplate {
    pub width: f64,
    pub height: f64,
    pub group_y: f64,
    pub group_height: f64,
    pub tile_y: f64,
    pub groups: Vec<GroupTemplate>,
}

impl NodeTemplate {
    pub fn is_visible(&self, port: u32) -> bool {
        self.groups
            .iter()
            .any(|g| g.tiles.iter().any(|t| t.port == port))
    }

    pub fn hidden_ports(&self) -> usize {
        self.groups.iter().map(|g| g.hidden).sum()
    }
}

pub(crate) fn node_template(
    plan: &CablingPlan,
    cfg: &LayoutConfig,
    measurer: &dyn TextMeasurer,
) -> NodeTemplate {
    let label_style = TextStyle {
        font_size: cfg.font_size,
        bold: false,
    };
    let max_tiles = cfg.max_tiles_per_group.max(1);
    let names = plan.nodes.first();

    let mut groups = Vec::with_capacity(plan.role_groups.len());
    let mut cursor = cfg.node_padding;
    for group in &plan.role_groups {
        let (shown, hidden) = if group.ports.len() > max_tiles {
            (max_tiles - 1, group.ports.len() - (max_tiles - 1))
        } else {
            (group.ports.len(), 0)
        };
        let slots = shown + usize::from(hidden > 0);
        let tiles_width = slots as f64 * cfg.tile_width + slots.saturating_sub(1) as f64 * cfg.tile_gap;
        let title_width = measurer
            .measure(group.role.display_label(), &label_style)
            .width;
        let width = tiles_width.max(title_width) + cfg.group_padding * 2.0;
        let start = cursor + (width - tiles_width) / 2.0;
        let step = cfg.tile_width + cfg.tile_gap;

        let tiles = group
            .ports
            .iter()
            .take(shown)
            .enumerate()
            .map(|(i, port)| TileSlot {
                port: *port,
                name: names
                    .and_then(|n| n.ports.iter().find(|p| p.port == *port))
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| format!("Port {port}")),
                x: start + i as f64 * step,
            })
            .collect();

        groups.push(GroupTemplate {
            role: group.role.clone(),
            x: cursor,
            width,
            tiles,
            hidden,
            more_x: (hidden > 0).then(|| start + shown as f64 * step),
        });
        cursor += width + cfg.group_gap;
    }

    let groups_width = (cursor - cfg.group_gap).max(cfg.node_padding) + cfg.node_padding;
    let header_width = measurer
        .measure(
            &format!("Node{}", plan.node_count),
            &TextStyle {
                font_size: cfg.font_size + 2.0,
                bold: true,
            },
        )
        .width
        + cfg.node_padding * 2.0;
    let width = groups_width.max(header_width);
    // Center the groups when the header is the wider part.
    let shift = (width - groups_width) / 2.0;
    for g in &mut groups {
        g.x += shift;
        for t in &mut g.tiles {
            t.x += shift;
        }
        if let Some(x) = g.more_x.as_mut() {
            *x += shift;
        }
    }

    let group_height = cfg.group_title_height + cfg.tile_height + cfg.group_padding;
    NodeTemplate {
        width,
        height: cfg.node_header_height + group_height + cfg.node_padding,
        group_y: cfg.node_header_height,
        group_height,
        tile_y: cfg.node_header_height + cfg.group_title_height,
        groups,
    }
}

/// Horizontal extent of one room (or of the single row of a one-room cluster).
#[derive(Debug, Clone)]
pub(crate) struct RoomRow {
    pub room: u8,
    pub x: f64,
    pub width: f64,
    /// Left edge and width of the TOR/node content inside the room frame.
    pub content_x: f64,
    pub content_width: f64,
    pub nodes: Vec<u32>,
    pub hidden_nodes: usize,
    pub tors: Vec<u8>,
    pub overflow_width: f64,
}

impl RoomRow {
    pub fn center_x(&self) -> f64 {
        self.content_x + self.content_width / 2.0
    }

    fn row_width(&self, template: &NodeTemplate, cfg: &LayoutConfig) -> f64 {
        let k = self.nodes.len() as f64;
        let mut w = k * template.width + (k - 1.0).max(0.0) * cfg.node_gap;
        if self.hidden_nodes > 0 {
            if !self.nodes.is_empty() {
                w += cfg.node_gap;
            }
            w += self.overflow_width;
        }
        w
    }

    pub fn node_x(&self, ordinal: usize, template: &NodeTemplate, cfg: &LayoutConfig) -> f64 {
        let row = self.row_width(template, cfg);
        self.center_x() - row / 2.0 + ordinal as f64 * (template.width + cfg.node_gap)
    }

    pub fn overflow_x(&self, template: &NodeTemplate, cfg: &LayoutConfig) -> f64 {
        let row = self.row_width(template, cfg);
        self.center_x() + row / 2.0 - self.overflow_width
    }

    /// Center x of each TOR in this room.
    ///
    /// Two TORs straddle the node row: each sits over one half, but never closer than one TOR
    /// width plus the configured gap.
    pub fn tor_centers(&self, template: &NodeTemplate, cfg: &LayoutConfig) -> Vec<f64> {
        let c = self.center_x();
        match self.tors.len() {
            0 => Vec::new(),
            1 => vec![c],
            n => {
                let row = self.row_width(template, cfg);
                let pitch = (row / n as f64).max(cfg.tor_width + cfg.tor_gap);
                (0..n)
                    .map(|i| c + (i as f64 - (n as f64 - 1.0) / 2.0) * pitch)
                    .collect()
            }
        }
    }
}

pub(crate) fn room_rows(
    topology: &PlannedTopology,
    cfg: &LayoutConfig,
    template: &NodeTemplate,
    measurer: &dyn TextMeasurer,
) -> Vec<RoomRow> {
    let arch = &topology.architecture;
    let two_rooms = arch.rooms > 1;
    let max_nodes = cfg.max_detailed_nodes.max(1);
    let frame = if two_rooms { cfg.room_padding } else { 0.0 };

    let mut rows = Vec::new();
    let mut x = cfg.margin;
    for room in 1..=arch.rooms.max(1) {
        let members: Vec<u32> = match &topology.spec.rack {
            Some(rack) => rack.nodes_in_room(room),
            None => (1..=topology.plan.node_count).collect(),
        };
        let hidden_nodes = members.len().saturating_sub(max_nodes);
        let nodes: Vec<u32> = members.into_iter().take(max_nodes).collect();
        let overflow_width = if hidden_nodes > 0 {
            let label = format!("+{hidden_nodes} more nodes");
            measurer
                .measure(
                    &label,
                    &TextStyle {
                        font_size: cfg.font_size,
                        bold: false,
                    },
                )
                .width
                + cfg.node_padding * 2.0
        } else {
            0.0
        };
        let tors: Vec<u8> = arch.tors_in_room(room).map(|t| t.index).collect();

        let mut row = RoomRow {
            room,
            x,
            width: 0.0,
            content_x: x + frame,
            content_width: 0.0,
            nodes,
            hidden_nodes,
            tors,
            overflow_width,
        };
        let t = row.tors.len() as f64;
        let tor_row = if row.tors.len() > 1 {
            // Pitch between TOR centers, see `tor_centers`.
            let pitch = (row.row_width(template, cfg) / t).max(cfg.tor_width + cfg.tor_gap);
            pitch * (t - 1.0) + cfg.tor_width
        } else {
            t * cfg.tor_width
        };
        row.content_width = row.row_width(template, cfg).max(tor_row);
        row.width = row.content_width + frame * 2.0;
        x += row.width + cfg.room_gap;
        rows.push(row);
    }
    rows
}

/// Node boxes, role groups, tiles and overflow markers for one room row at `top`.
pub(crate) fn place_nodes(
    row: &RoomRow,
    top: f64,
    template: &NodeTemplate,
    cfg: &LayoutConfig,
    boxes: &mut Vec<LayoutBox>,
    tiles: &mut Vec<PortTile>,
) {
    for (ordinal, node) in row.nodes.iter().enumerate() {
        let x = row.node_x(ordinal, template, cfg);
        boxes.push(LayoutBox {
            id: format!("node-{node}"),
            kind: BoxKind::Node,
            x,
            y: top,
            width: template.width,
            height: template.height,
            label: cablemap_core::plan::node_label(*node),
            role: None,
        });

        for (gi, group) in template.groups.iter().enumerate() {
            boxes.push(LayoutBox {
                id: format!("node-{node}-group-{gi}"),
                kind: BoxKind::RoleGroup,
                x: x + group.x,
                y: top + template.group_y,
                width: group.width,
                height: template.group_height,
                label: group.role.display_label().to_string(),
                role: Some(group.role.clone()),
            });
            let tile_y = top + template.tile_y;
            for slot in &group.tiles {
                let tx = x + slot.x;
                tiles.push(PortTile {
                    node: *node,
                    port: slot.port,
                    name: slot.name.clone(),
                    role: group.role.clone(),
                    x: tx,
                    y: tile_y,
                    width: cfg.tile_width,
                    height: cfg.tile_height,
                    anchor: LayoutPoint::new(tx + cfg.tile_width / 2.0, tile_y),
                });
            }
            if let Some(mx) = group.more_x {
                boxes.push(LayoutBox {
                    id: format!("node-{node}-group-{gi}-more"),
                    kind: BoxKind::Overflow,
                    x: x + mx,
                    y: tile_y,
                    width: cfg.tile_width,
                    height: cfg.tile_height,
                    label: format!("+{} more", group.hidden),
                    role: Some(group.role.clone()),
                });
            }
        }
    }

    if row.hidden_nodes > 0 {
        boxes.push(LayoutBox {
            id: format!("room-{}-more-nodes", row.room),
            kind: BoxKind::Overflow,
            x: row.overflow_x(template, cfg),
            y: top,
            width: row.overflow_width,
            height: template.height,
            label: format!("+{} more nodes", row.hidden_nodes),
            role: None,
        });
    }
}
