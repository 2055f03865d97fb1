//! Switch-to-switch cabling in the channel above the TOR row.
//!
//! Lane 0 is nearest the TORs. TOR-to-TOR links take the lowest lanes in architecture order, the
//! option B storage bus takes the next one, and router uplinks the rest. A router drop never shares
//! an x with a TOR rise.

use super::{LayoutConfig, clear_of};
use crate::model::{BoxKind, CableKind, CablePath, CableSource, LayoutBox, LayoutPoint};
use cablemap_core::{Architecture, ArchitectureLink, Carries, LinkEndpoint, LinkKind};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

enum Route {
    Pair(u8, u8),
    Bus(u8),
    Uplink(u8),
}

fn route_of(link: &ArchitectureLink) -> Option<Route> {
    match (link.from, link.to) {
        (LinkEndpoint::Tor { index: a }, LinkEndpoint::Tor { index: b }) => Some(Route::Pair(a, b)),
        (LinkEndpoint::Tor { index }, LinkEndpoint::StorageBus) => Some(Route::Bus(index)),
        (LinkEndpoint::Tor { index }, LinkEndpoint::Router) => Some(Route::Uplink(index)),
        _ => None,
    }
}

/// Number of distinct heights the channel needs.
pub(crate) fn channel_lanes(arch: &Architecture) -> u32 {
    let mut pairs = 0u32;
    let mut bus = false;
    let mut uplinks = 0u32;
    for link in arch.switch_links() {
        match route_of(link) {
            Some(Route::Pair(..)) => pairs += 1,
            Some(Route::Bus(_)) => bus = true,
            Some(Route::Uplink(_)) => uplinks += 1,
            None => {}
        }
    }
    pairs + u32::from(bus) + uplinks
}

/// Distributes `count` slots over `[start, start + width]`, excluding the ends.
fn slot(start: f64, width: f64, ordinal: usize, count: usize) -> f64 {
    start + width * (ordinal as f64 + 1.0) / (count as f64 + 1.0)
}

pub(crate) struct TrunkRouting {
    pub paths: Vec<CablePath>,
    pub bus: Option<LayoutBox>,
}

/// Routes the switch links. Lane `j` sits at `channel_bottom - j * trunk_lane_step`.
pub(crate) fn route_trunks(
    arch: &Architecture,
    tor_boxes: &IndexMap<u8, LayoutBox>,
    router: Option<&LayoutBox>,
    channel_bottom: f64,
    cfg: &LayoutConfig,
) -> TrunkRouting {
    let routed: Vec<(usize, &ArchitectureLink, Route)> = arch
        .links
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind != LinkKind::Access)
        .filter_map(|(i, l)| route_of(l).map(|r| (i, l, r)))
        .collect();

    // Top-edge slots: every TOR spreads its switch links over its width in link order.
    let mut touching: FxHashMap<u8, Vec<usize>> = FxHashMap::default();
    for (i, _, route) in &routed {
        match route {
            Route::Pair(a, b) => {
                touching.entry(*a).or_default().push(*i);
                touching.entry(*b).or_default().push(*i);
            }
            Route::Bus(t) | Route::Uplink(t) => touching.entry(*t).or_default().push(*i),
        }
    }
    let top_slot = |tor: u8, link: usize| -> Option<LayoutPoint> {
        let b = tor_boxes.get(&tor)?;
        let links = touching.get(&tor)?;
        let ordinal = links.iter().position(|l| *l == link)?;
        Some(LayoutPoint::new(
            slot(b.x, b.width, ordinal, links.len()),
            b.y,
        ))
    };

    let rises: Vec<f64> = touching
        .iter()
        .filter_map(|(tor, links)| {
            let b = tor_boxes.get(tor)?;
            Some((0..links.len()).map(move |k| slot(b.x, b.width, k, links.len())))
        })
        .flatten()
        .collect();

    let pair_count = routed
        .iter()
        .filter(|(_, _, r)| matches!(r, Route::Pair(..)))
        .count() as u32;
    let has_bus = routed.iter().any(|(_, _, r)| matches!(r, Route::Bus(_)));
    let uplink_count = routed
        .iter()
        .filter(|(_, _, r)| matches!(r, Route::Uplink(_)))
        .count();
    let lane_y = |lane: u32| channel_bottom - f64::from(lane) * cfg.trunk_lane_step;
    let bus_lane = pair_count;
    let first_uplink_lane = pair_count + u32::from(has_bus);

    let mut paths = Vec::with_capacity(routed.len());
    let mut bus_xs: Vec<f64> = Vec::new();
    let mut bus_label = String::new();
    let mut next_pair = 0u32;
    let mut next_uplink = 0usize;

    for (index, link, route) in &routed {
        let subnet_ids = match &link.carries {
            Carries::Subnets(ids) => ids.clone(),
            Carries::Role(_) => Vec::new(),
        };
        let (kind, lane, points) = match route {
            Route::Pair(a, b) => {
                let (Some(pa), Some(pb)) = (top_slot(*a, *index), top_slot(*b, *index)) else {
                    continue;
                };
                let lane = next_pair;
                next_pair += 1;
                let y = lane_y(lane);
                let kind = match link.kind {
                    LinkKind::Lag => CableKind::Lag,
                    _ => CableKind::Trunk,
                };
                (
                    kind,
                    lane,
                    vec![
                        pa,
                        LayoutPoint::new(pa.x, y),
                        LayoutPoint::new(pb.x, y),
                        pb,
                    ],
                )
            }
            Route::Bus(t) => {
                let Some(p) = top_slot(*t, *index) else {
                    continue;
                };
                bus_xs.push(p.x);
                if bus_label.is_empty() {
                    bus_label = link.label.clone();
                }
                (
                    CableKind::Bus,
                    bus_lane,
                    vec![p, LayoutPoint::new(p.x, lane_y(bus_lane))],
                )
            }
            Route::Uplink(t) => {
                let (Some(p), Some(r)) = (top_slot(*t, *index), router) else {
                    continue;
                };
                let ordinal = next_uplink;
                next_uplink += 1;
                let lane = first_uplink_lane + ordinal as u32;
                let y = lane_y(lane);
                let pitch = r.width / (uplink_count as f64 + 1.0);
                let rx = clear_of(slot(r.x, r.width, ordinal, uplink_count), &rises, pitch);
                (
                    CableKind::Uplink,
                    lane,
                    vec![
                        p,
                        LayoutPoint::new(p.x, y),
                        LayoutPoint::new(rx, y),
                        LayoutPoint::new(rx, r.bottom()),
                    ],
                )
            }
        };
        paths.push(CablePath {
            id: format!("link-{index}"),
            kind,
            source: CableSource::SwitchLink { index: *index },
            lane,
            bucket: None,
            landing_x: None,
            points,
            label: (kind != CableKind::Bus).then(|| link.label.clone()),
            subnet_ids,
        });
    }

    let bus = bus_xs
        .iter()
        .copied()
        .reduce(f64::min)
        .zip(bus_xs.iter().copied().reduce(f64::max))
        .map(|(lo, hi)| {
            let thickness = cfg.bus_thickness;
            LayoutBox {
                id: "storage-bus".to_string(),
                kind: BoxKind::StorageBus,
                x: lo - cfg.band_inset,
                y: lane_y(bus_lane) - thickness / 2.0,
                width: hi - lo + cfg.band_inset * 2.0,
                height: thickness,
                label: bus_label,
                role: None,
            }
        });
    TrunkRouting { paths, bus }
}
