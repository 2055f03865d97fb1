//! Lane assignment for node-port to TOR cables.
//!
//! Paths are bucketed by `(room, tor, side)`, where the side is the half of the TOR's bottom edge
//! the port sits under. Inside a bucket management/compute paths land on the outer band and
//! storage paths on the inner band, each at `(k + 1) / (count + 1)` of its band. Every path also
//! gets its own approach level: levels are numbered across the whole TOR row, so no two
//! horizontal segments share a height. A landing that would drop along another cable's tile rise
//! is shifted within its slot.

use super::{LayoutConfig, clear_of};
use crate::model::{
    CableKind, CablePath, CableSource, LaneBucket, LayoutBox, LayoutPoint, PortTile, Side,
};
use cablemap_core::{Architecture, Carries};
use indexmap::IndexMap;

#[derive(Debug, Clone)]
pub(crate) struct AccessRequest<'a> {
    pub node: u32,
    pub port: u32,
    pub tor: u8,
    pub kind: CableKind,
    pub anchor: LayoutPoint,
    pub label: &'a str,
    pub subnet_ids: Vec<u32>,
}

/// Collects the access links whose port tile is on the canvas, in architecture order.
pub(crate) fn access_requests<'a>(
    arch: &'a Architecture,
    tiles: &[PortTile],
) -> Vec<AccessRequest<'a>> {
    arch.access_links()
        .filter_map(|link| {
            let port = link.node_port()?;
            let tor = link.target_tor()?;
            let tile = tiles
                .iter()
                .find(|t| t.node == port.node && t.port == port.port)?;
            let (kind, subnet_ids) = match &link.carries {
                Carries::Subnets(ids) => (CableKind::Storage, ids.clone()),
                Carries::Role(role) if role.is_storage_like() => (CableKind::Storage, Vec::new()),
                Carries::Role(_) => (CableKind::Management, Vec::new()),
            };
            Some(AccessRequest {
                node: port.node,
                port: port.port,
                tor,
                kind,
                anchor: tile.anchor,
                label: link.label.as_str(),
                subnet_ids,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Band {
    start: f64,
    end: f64,
}

impl Band {
    fn at(&self, ordinal: usize, count: usize) -> f64 {
        self.start + (self.end - self.start) * (ordinal as f64 + 1.0) / (count as f64 + 1.0)
    }
}

fn bands(tor: &LayoutBox, side: Side, inset: f64) -> (Band, Band) {
    let left = tor.x;
    let right = tor.right();
    let center = tor.center_x();
    let quarter = tor.width / 4.0;
    let inset = inset.min(quarter / 2.0);
    match side {
        Side::Left => (
            Band {
                start: left + inset,
                end: left + quarter,
            },
            Band {
                start: left + quarter,
                end: center - inset,
            },
        ),
        Side::Right => (
            Band {
                start: right - inset,
                end: right - quarter,
            },
            Band {
                start: right - quarter,
                end: center + inset,
            },
        ),
    }
}

/// Routes every request to its TOR. `tor_room` maps a TOR index to its room.
///
/// Level `j` sits at `approach_bottom - j * lane_step`; callers size the approach zone from the
/// request count.
pub(crate) fn route_access(
    requests: &[AccessRequest<'_>],
    tor_boxes: &IndexMap<u8, LayoutBox>,
    tor_room: impl Fn(u8) -> u8,
    approach_bottom: f64,
    cfg: &LayoutConfig,
) -> Vec<CablePath> {
    let mut buckets: IndexMap<LaneBucket, Vec<&AccessRequest<'_>>> = IndexMap::new();
    for req in requests {
        let Some(tor) = tor_boxes.get(&req.tor) else {
            continue;
        };
        let side = if req.anchor.x < tor.center_x() {
            Side::Left
        } else {
            Side::Right
        };
        let bucket = LaneBucket {
            room: tor_room(req.tor),
            tor: req.tor,
            side,
        };
        buckets.entry(bucket).or_default().push(req);
    }
    buckets.sort_by(|a, _, b, _| a.tor.cmp(&b.tor).then(a.side.cmp(&b.side)));

    // Vertical runs already in the approach zone: every tile rise, then each landing drop.
    let mut verticals: Vec<f64> = requests.iter().map(|r| r.anchor.x).collect();
    let mut paths = Vec::with_capacity(requests.len());
    let mut level = 0u32;
    for (bucket, reqs) in &buckets {
        let Some(tor) = tor_boxes.get(&bucket.tor) else {
            continue;
        };
        let (outside, inside) = bands(tor, bucket.side, cfg.band_inset);
        for (kind, band) in [(CableKind::Management, outside), (CableKind::Storage, inside)] {
            let mut same: Vec<&&AccessRequest<'_>> = reqs.iter().filter(|r| r.kind == kind).collect();
            // Outer ports take the outer slots so paths inside a band do not cross.
            same.sort_by(|a, b| {
                let ord = a.anchor.x.total_cmp(&b.anchor.x);
                let ord = match bucket.side {
                    Side::Left => ord,
                    Side::Right => ord.reverse(),
                };
                ord.then(a.node.cmp(&b.node)).then(a.port.cmp(&b.port))
            });
            let count = same.len();
            let pitch = (band.end - band.start) / (count as f64 + 1.0);
            for (k, req) in same.into_iter().enumerate() {
                let landing_x = clear_of(band.at(k, count), &verticals, pitch);
                verticals.push(landing_x);
                let y = approach_bottom - f64::from(level) * cfg.lane_step;
                paths.push(CablePath {
                    id: format!("access-n{}-p{}-tor{}", req.node, req.port, req.tor),
                    kind,
                    source: CableSource::Access {
                        node: req.node,
                        port: req.port,
                        tor: req.tor,
                    },
                    lane: level,
                    bucket: Some(*bucket),
                    landing_x: Some(landing_x),
                    points: vec![
                        req.anchor,
                        LayoutPoint::new(req.anchor.x, y),
                        LayoutPoint::new(landing_x, y),
                        LayoutPoint::new(landing_x, tor.bottom()),
                    ],
                    label: Some(req.label.to_string()),
                    subnet_ids: req.subnet_ids.clone(),
                });
                level += 1;
            }
        }
    }
    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BoxKind;

    fn tor_box(index: u8, x: f64) -> LayoutBox {
        LayoutBox {
            id: format!("tor-{index}"),
            kind: BoxKind::Tor,
            x,
            y: 0.0,
            width: 160.0,
            height: 40.0,
            label: format!("TOR{index}"),
            role: None,
        }
    }

    fn req(node: u32, port: u32, tor: u8, kind: CableKind, x: f64) -> AccessRequest<'static> {
        AccessRequest {
            node,
            port,
            tor,
            kind,
            anchor: LayoutPoint::new(x, 300.0),
            label: "",
            subnet_ids: Vec::new(),
        }
    }

    #[test]
    fn bands_split_each_half_of_the_tor() {
        let tor = tor_box(1, 0.0);
        let (out_l, in_l) = bands(&tor, Side::Left, 8.0);
        let (out_r, in_r) = bands(&tor, Side::Right, 8.0);
        assert!(out_l.start < out_l.end && out_l.end <= in_l.start);
        assert!(in_l.end < 80.0 && in_r.end > 80.0);
        assert!(out_r.start > out_r.end && in_r.start >= out_r.end);
    }

    #[test]
    fn outer_ports_land_outermost() {
        let cfg = LayoutConfig::default();
        let mut tors = IndexMap::new();
        tors.insert(1, tor_box(1, 100.0));
        let requests = vec![
            req(1, 1, 1, CableKind::Management, 40.0),
            req(1, 2, 1, CableKind::Management, 10.0),
            req(2, 1, 1, CableKind::Management, 400.0),
            req(2, 2, 1, CableKind::Management, 450.0),
        ];
        let paths = route_access(&requests, &tors, |_| 1, 200.0, &cfg);
        let landing = |node: u32, port: u32| {
            paths
                .iter()
                .find(|p| p.source == CableSource::Access { node, port, tor: 1 })
                .and_then(|p| p.landing_x)
                .unwrap()
        };
        assert!(landing(1, 2) < landing(1, 1));
        assert!(landing(2, 2) > landing(2, 1));
        let lanes: Vec<u32> = paths.iter().map(|p| p.lane).collect();
        assert_eq!(lanes, vec![0, 1, 2, 3]);
    }

    #[test]
    fn landings_avoid_tile_rises() {
        let cfg = LayoutConfig::default();
        let mut tors = IndexMap::new();
        tors.insert(1, tor_box(1, 100.0));
        // Outer band of the left half is 108..140, so a lone cable's slot sits at 124.
        let requests = vec![req(1, 1, 1, CableKind::Management, 124.0)];
        let paths = route_access(&requests, &tors, |_| 1, 200.0, &cfg);
        assert_eq!(paths[0].landing_x, Some(126.0));
        assert_eq!(paths[0].points[2].x, 126.0);
    }
}
