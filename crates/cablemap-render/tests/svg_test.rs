use cablemap_core::{PlannedTopology, TopologyInput, plan_topology};
use cablemap_render::svg::{SvgRenderOptions, render_svg_document, render_svg_fragment};
use cablemap_render::{LayoutOptions, Theme, layout_and_shape};
use rustc_hash::FxHashSet;
use serde_json::{Value, json};

fn planned(raw: Value) -> PlannedTopology {
    let input = TopologyInput::from_value(&raw).expect("input");
    plan_topology(&input).expect("planned")
}

fn document(raw: Value, theme: Theme) -> String {
    let (_, shapes) = layout_and_shape(&planned(raw), &LayoutOptions::default());
    render_svg_document(
        &shapes,
        &SvgRenderOptions {
            theme,
            diagram_id: None,
        },
    )
}

fn fragment(raw: Value) -> String {
    let (_, shapes) = layout_and_shape(&planned(raw), &LayoutOptions::default());
    render_svg_fragment(&shapes, &SvgRenderOptions::default())
}

fn switchless_three() -> Value {
    json!({ "nodeCount": 3, "portsPerNode": 6, "storageMode": "switchless" })
}

fn background_fill(svg: &str) -> Option<String> {
    let doc = roxmltree::Document::parse(svg).expect("well-formed svg");
    doc.descendants()
        .find(|n| n.has_tag_name("rect") && n.attribute("class") == Some("background"))
        .and_then(|n| n.attribute("fill").map(str::to_string))
}

#[test]
fn document_paints_the_theme_background() {
    assert_eq!(
        background_fill(&document(switchless_three(), Theme::Light)).as_deref(),
        Some("#ffffff")
    );
    assert_eq!(
        background_fill(&document(switchless_three(), Theme::Dark)).as_deref(),
        Some("#111827")
    );
}

#[test]
fn document_uses_literal_colors_only() {
    let svg = document(switchless_three(), Theme::Dark);
    assert!(svg.starts_with("<?xml"));
    assert!(!svg.contains("var(--"));
}

#[test]
fn fragment_is_themeable_and_transparent() {
    let svg = fragment(switchless_three());
    assert!(background_fill(&svg).is_none());
    assert!(!svg.starts_with("<?xml"));
    assert!(svg.contains("var(--cablemap-node-fill, #f9fafb)"));
    assert!(svg.contains("var(--cablemap-subnet-1,"));
}

#[test]
fn rendering_is_idempotent() {
    for raw in [
        switchless_three(),
        json!({ "nodeCount": 4, "portsPerNode": 6, "torSwitchCount": 2 }),
        json!({ "nodeCount": 6, "portsPerNode": 4, "architectureOption": "A" }),
    ] {
        assert_eq!(document(raw.clone(), Theme::Light), document(raw.clone(), Theme::Light));
        assert_eq!(fragment(raw.clone()), fragment(raw));
    }
}

#[test]
fn every_cable_is_drawn_once() {
    let topology = planned(json!({ "nodeCount": 4, "portsPerNode": 4, "architectureOption": "A" }));
    let (layout, shapes) = layout_and_shape(&topology, &LayoutOptions::default());
    let svg = render_svg_document(&shapes, &SvgRenderOptions::default());
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let ids: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("polyline"))
        .filter_map(|n| n.attribute("data-id"))
        .collect();
    assert_eq!(ids.len(), layout.paths.len());
    let unique: FxHashSet<&str> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
}

#[test]
fn legend_lists_every_subnet_in_order() {
    let svg = document(switchless_three(), Theme::Light);
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let texts: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter_map(|n| n.text())
        .collect();
    let rows: Vec<&str> = texts
        .iter()
        .copied()
        .filter(|t| t.starts_with("Subnet "))
        .collect();
    assert_eq!(
        rows,
        vec!["Subnet 1", "Subnet 2", "Subnet 3", "Subnet 4", "Subnet 5", "Subnet 6"]
    );
    assert!(texts.contains(&"Storage subnets"));
    assert!(texts.contains(&"10.0.6.0/24"));
}

#[test]
fn single_room_switched_has_no_legend() {
    let svg = document(json!({ "nodeCount": 3, "portsPerNode": 4 }), Theme::Light);
    assert!(!svg.contains("Storage subnets"));
}

#[test]
fn labels_are_escaped() {
    let svg = document(
        json!({
            "nodeCount": 2,
            "portsPerNode": 4,
            "intentAssignment": "custom",
            "portRoles": { "1": "mgmt_compute", "2": "Backup & <Replica>", "3": "storage", "4": "storage" },
            "portNames": [null, "\"B1\""]
        }),
        Theme::Light,
    );
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let texts: Vec<&str> = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter_map(|n| n.text())
        .collect();
    assert!(texts.contains(&"Backup & <Replica>"));
    assert!(texts.contains(&"\"B1\""));
}

#[test]
fn canvas_covers_the_legend() {
    let (_, shapes) = layout_and_shape(&planned(switchless_three()), &LayoutOptions::default());
    let svg = render_svg_document(&shapes, &SvgRenderOptions::default());
    let doc = roxmltree::Document::parse(&svg).expect("well-formed svg");
    let root = doc.root_element();
    let height: f64 = root.attribute("height").expect("height").parse().expect("number");
    let lowest = doc
        .descendants()
        .filter(|n| n.has_tag_name("text"))
        .filter_map(|n| n.attribute("y"))
        .filter_map(|y| y.parse::<f64>().ok())
        .fold(f64::MIN, f64::max);
    assert!(lowest < height);
    assert_eq!(root.attribute("viewBox"), Some(format!("0 0 {} {}", root.attribute("width").unwrap(), root.attribute("height").unwrap()).as_str()));
}
