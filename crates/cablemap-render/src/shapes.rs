//! Flat, ordered drawing instructions for a laid-out diagram, plus the subnet legend.

use crate::LayoutOptions;
use crate::layout::LayoutConfig;
use crate::model::{BoxKind, CableKind, CablePath, CablingLayout, LayoutBox, LayoutPoint, PortTile};
use crate::text::TextStyle;
use crate::theme::ColorToken;
use cablemap_core::{PlannedTopology, PortRole, StorageMode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAnchor {
    Start,
    Middle,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "shape")]
pub enum Shape {
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        rx: f64,
        fill: ColorToken,
        stroke: ColorToken,
        stroke_width: f64,
        dashed: bool,
    },
    Polyline {
        id: String,
        points: Vec<LayoutPoint>,
        stroke: ColorToken,
        stroke_width: f64,
        dashed: bool,
    },
    Text {
        x: f64,
        y: f64,
        text: String,
        font_size: f64,
        bold: bool,
        anchor: TextAnchor,
        fill: ColorToken,
    },
}

/// One legend entry: a storage subnet, the nodes it joins and its address block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendRow {
    pub subnet_id: u32,
    pub pair_label: String,
    pub cidr: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShapeList {
    pub width: f64,
    pub height: f64,
    pub title: String,
    pub shapes: Vec<Shape>,
    pub legend: Vec<LegendRow>,
}

/// Legend rows in ascending subnet order.
///
/// Switchless diagrams list one row per point-to-point subnet; rack-aware diagrams list the
/// switched storage networks, which span every node. Single-room switched diagrams have none.
pub fn build_legend(topology: &PlannedTopology) -> Vec<LegendRow> {
    let plan = &topology.plan;
    let addresses = &topology.spec.address_plan;
    let mut rows: Vec<LegendRow> = match plan.storage_mode {
        StorageMode::Switchless => plan
            .storage_edges
            .iter()
            .map(|e| LegendRow {
                subnet_id: e.subnet_id,
                pair_label: e.pair_label.clone(),
                cidr: addresses.block_for(e.subnet_id),
            })
            .collect(),
        StorageMode::Switched if topology.spec.is_rack_aware() => plan
            .storage_networks
            .iter()
            .map(|n| LegendRow {
                subnet_id: n.subnet_id,
                pair_label: "All nodes".to_string(),
                cidr: addresses.block_for(n.subnet_id),
            })
            .collect(),
        StorageMode::Switched => Vec::new(),
    };
    rows.sort_by_key(|r| r.subnet_id);
    rows
}

fn tile_fill(role: &PortRole) -> ColorToken {
    match role {
        PortRole::MgmtCompute => ColorToken::TileMgmt,
        PortRole::Unused => ColorToken::TileUnused,
        r if r.is_storage_like() => ColorToken::TileStorage,
        _ => ColorToken::TileCustom,
    }
}

fn cable_stroke(path: &CablePath) -> ColorToken {
    let single_subnet = match path.subnet_ids.as_slice() {
        [id] => Some(*id),
        _ => None,
    };
    match (path.kind, single_subnet) {
        (CableKind::Management, _) => ColorToken::CableMgmt,
        (CableKind::Storage | CableKind::Peer | CableKind::Trunk, Some(id)) => {
            ColorToken::subnet(id)
        }
        (CableKind::Storage | CableKind::Peer, None) => ColorToken::CableStorage,
        (CableKind::Trunk | CableKind::Lag | CableKind::Bus, _) => ColorToken::CableTrunk,
        (CableKind::Uplink, _) => ColorToken::CableUplink,
    }
}

fn text(x: f64, y: f64, s: &str, font_size: f64, anchor: TextAnchor, fill: ColorToken) -> Shape {
    Shape::Text {
        x,
        y,
        text: s.to_string(),
        font_size,
        bold: false,
        anchor,
        fill,
    }
}

fn push_box(out: &mut Vec<Shape>, b: &LayoutBox, cfg: &LayoutConfig) {
    let fs = cfg.font_size;
    let (fill, stroke, rx, dashed) = match b.kind {
        BoxKind::Room => (ColorToken::RoomFill, ColorToken::RoomStroke, 8.0, false),
        BoxKind::Router | BoxKind::Tor => (ColorToken::SwitchFill, ColorToken::SwitchStroke, 4.0, false),
        BoxKind::StorageBus => (ColorToken::CableTrunk, ColorToken::None, 2.0, false),
        BoxKind::Node => (ColorToken::NodeFill, ColorToken::NodeStroke, 6.0, false),
        BoxKind::RoleGroup => (ColorToken::None, ColorToken::GroupStroke, 4.0, true),
        BoxKind::Overflow => (ColorToken::OverflowFill, ColorToken::GroupStroke, 4.0, true),
    };
    out.push(Shape::Rect {
        x: b.x,
        y: b.y,
        width: b.width,
        height: b.height,
        rx,
        fill,
        stroke,
        stroke_width: 1.0,
        dashed,
    });

    match b.kind {
        BoxKind::Room => out.push(text(
            b.x + cfg.room_padding,
            b.y + cfg.room_title_height / 2.0,
            &b.label,
            fs,
            TextAnchor::Start,
            ColorToken::MutedText,
        )),
        BoxKind::Node => out.push(Shape::Text {
            x: b.center_x(),
            y: b.y + cfg.node_header_height / 2.0,
            text: b.label.clone(),
            font_size: fs + 2.0,
            bold: true,
            anchor: TextAnchor::Middle,
            fill: ColorToken::Text,
        }),
        BoxKind::RoleGroup => out.push(text(
            b.x + cfg.group_padding,
            b.y + cfg.group_title_height / 2.0,
            &b.label,
            fs - 1.0,
            TextAnchor::Start,
            ColorToken::MutedText,
        )),
        BoxKind::StorageBus => out.push(text(
            b.center_x(),
            b.y - fs,
            &b.label,
            fs - 1.0,
            TextAnchor::Middle,
            ColorToken::MutedText,
        )),
        BoxKind::Router | BoxKind::Tor | BoxKind::Overflow => out.push(text(
            b.center_x(),
            b.y + b.height / 2.0,
            &b.label,
            fs,
            TextAnchor::Middle,
            ColorToken::Text,
        )),
    }
}

fn push_tile(out: &mut Vec<Shape>, t: &PortTile, cfg: &LayoutConfig) {
    out.push(Shape::Rect {
        x: t.x,
        y: t.y,
        width: t.width,
        height: t.height,
        rx: 3.0,
        fill: tile_fill(&t.role),
        stroke: ColorToken::TileStroke,
        stroke_width: 1.0,
        dashed: false,
    });
    out.push(text(
        t.x + t.width / 2.0,
        t.y + t.height / 2.0,
        &t.name,
        cfg.font_size - 1.0,
        TextAnchor::Middle,
        ColorToken::Text,
    ));
}

/// Flattens a layout into shapes, back to front, with the legend appended below the diagram.
pub fn build_shapes(
    layout: &CablingLayout,
    legend: &[LegendRow],
    options: &LayoutOptions,
) -> ShapeList {
    let cfg = LayoutConfig::from_config(&options.config);
    let measurer = options.text_measurer.as_ref();
    let fs = cfg.font_size;
    let mut shapes = Vec::new();

    shapes.push(Shape::Text {
        x: cfg.margin,
        y: cfg.margin + cfg.title_height / 2.0,
        text: layout.title.clone(),
        font_size: fs + 4.0,
        bold: true,
        anchor: TextAnchor::Start,
        fill: ColorToken::Text,
    });

    for b in &layout.boxes {
        push_box(&mut shapes, b, &cfg);
    }
    for p in &layout.paths {
        shapes.push(Shape::Polyline {
            id: p.id.clone(),
            points: p.points.clone(),
            stroke: cable_stroke(p),
            stroke_width: if p.kind == CableKind::Lag { 3.0 } else { 1.5 },
            dashed: p.kind == CableKind::Uplink,
        });
    }
    for t in &layout.tiles {
        push_tile(&mut shapes, t, &cfg);
    }
    for p in &layout.paths {
        if !matches!(p.kind, CableKind::Lag | CableKind::Trunk | CableKind::Peer) {
            continue;
        }
        let (Some(label), Some(at)) = (p.label.as_deref(), p.label_anchor()) else {
            continue;
        };
        shapes.push(text(
            at.x,
            at.y - fs * 0.6,
            label,
            fs - 2.0,
            TextAnchor::Middle,
            ColorToken::MutedText,
        ));
    }

    let mut width = layout.bounds.max_x;
    let mut height = layout.bounds.max_y;

    if !legend.is_empty() {
        let style = TextStyle {
            font_size: fs,
            bold: false,
        };
        let row_height = fs * 1.8;
        let swatch = fs;
        let column = |values: Vec<String>, header: &str| -> f64 {
            values
                .iter()
                .map(|v| measurer.measure(v, &style).width)
                .fold(measurer.measure(header, &style).width, f64::max)
                + fs * 2.0
        };
        let id_col = column(
            legend.iter().map(|r| format!("Subnet {}", r.subnet_id)).collect(),
            "Subnet",
        );
        let pair_col = column(legend.iter().map(|r| r.pair_label.clone()).collect(), "Nodes");
        let cidr_col = column(legend.iter().map(|r| r.cidr.clone()).collect(), "Address block");

        let x0 = cfg.margin;
        let top = layout.bounds.max_y;
        shapes.push(Shape::Text {
            x: x0,
            y: top + row_height / 2.0,
            text: "Storage subnets".to_string(),
            font_size: fs + 1.0,
            bold: true,
            anchor: TextAnchor::Start,
            fill: ColorToken::Text,
        });
        let header_y = top + row_height * 1.5;
        let text_x = x0 + swatch * 2.0;
        for (label, x) in [
            ("Subnet", text_x),
            ("Nodes", text_x + id_col),
            ("Address block", text_x + id_col + pair_col),
        ] {
            shapes.push(text(x, header_y, label, fs, TextAnchor::Start, ColorToken::MutedText));
        }
        for (i, row) in legend.iter().enumerate() {
            let y = header_y + row_height * (i as f64 + 1.0);
            shapes.push(Shape::Rect {
                x: x0,
                y: y - swatch / 2.0,
                width: swatch,
                height: swatch,
                rx: 2.0,
                fill: ColorToken::subnet(row.subnet_id),
                stroke: ColorToken::None,
                stroke_width: 0.0,
                dashed: false,
            });
            shapes.push(text(
                text_x,
                y,
                &format!("Subnet {}", row.subnet_id),
                fs,
                TextAnchor::Start,
                ColorToken::Text,
            ));
            shapes.push(text(
                text_x + id_col,
                y,
                &row.pair_label,
                fs,
                TextAnchor::Start,
                ColorToken::Text,
            ));
            shapes.push(text(
                text_x + id_col + pair_col,
                y,
                &row.cidr,
                fs,
                TextAnchor::Start,
                ColorToken::Text,
            ));
        }
        let legend_width = text_x + id_col + pair_col + cidr_col + cfg.margin;
        width = width.max(legend_width);
        height = header_y + row_height * (legend.len() as f64 + 0.5) + cfg.margin;
    }

    ShapeList {
        width,
        height,
        title: layout.title.clone(),
        shapes,
        legend: legend.to_vec(),
    }
}
