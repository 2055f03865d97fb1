use cablemap_core::PortRole;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Bounds {
    pub fn from_points(points: impl IntoIterator<Item = (f64, f64)>) -> Option<Self> {
        let mut it = points.into_iter();
        let (x0, y0) = it.next()?;
        let mut b = Self {
            min_x: x0,
            min_y: y0,
            max_x: x0,
            max_y: y0,
        };
        for (x, y) in it {
            b.min_x = b.min_x.min(x);
            b.min_y = b.min_y.min(y);
            b.max_x = b.max_x.max(x);
            b.max_y = b.max_y.max(y);
        }
        Some(b)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoxKind {
    Node,
    /// Dashed container around the tiles of one role.
    RoleGroup,
    Tor,
    Router,
    Room,
    StorageBus,
    /// "+N more" tile or "+N more nodes" summary.
    Overflow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    pub id: String,
    pub kind: BoxKind,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub label: String,
    /// Role of the container, set for role groups only.
    #[serde(default)]
    pub role: Option<PortRole>,
}

impl LayoutBox {
    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortTile {
    pub node: u32,
    pub port: u32,
    pub name: String,
    pub role: PortRole,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Top-center of the tile, where switch-bound cables leave.
    pub anchor: LayoutPoint,
}

impl PortTile {
    /// Bottom-center of the tile, where switchless storage cables leave.
    pub fn bottom_anchor(&self) -> LayoutPoint {
        LayoutPoint::new(self.anchor.x, self.y + self.height)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
}

/// Access paths sharing one half of one TOR's bottom edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LaneBucket {
    pub room: u8,
    pub tor: u8,
    pub side: Side,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CableKind {
    /// Management, compute or custom-role port to TOR.
    Management,
    /// Switched storage port to TOR.
    Storage,
    /// Switchless point-to-point storage subnet.
    Peer,
    Lag,
    Trunk,
    /// Drop from a TOR to the shared storage bus.
    Bus,
    Uplink,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum CableSource {
    Access { node: u32, port: u32, tor: u8 },
    StorageEdge { subnet_id: u32 },
    /// Index into `Architecture::links`.
    SwitchLink { index: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CablePath {
    pub id: String,
    pub kind: CableKind,
    pub source: CableSource,
    /// Routing tier; unique among paths that share a channel.
    pub lane: u32,
    pub bucket: Option<LaneBucket>,
    /// Where an access path meets the TOR's bottom edge.
    pub landing_x: Option<f64>,
    pub points: Vec<LayoutPoint>,
    pub label: Option<String>,
    #[serde(default)]
    pub subnet_ids: Vec<u32>,
}

impl CablePath {
    /// Midpoint of the longest horizontal segment; used for label placement.
    pub fn label_anchor(&self) -> Option<LayoutPoint> {
        self.points
            .windows(2)
            .filter(|w| (w[0].y - w[1].y).abs() < 1e-9)
            .max_by(|a, b| {
                let la = (a[1].x - a[0].x).abs();
                let lb = (b[1].x - b[0].x).abs();
                la.total_cmp(&lb)
            })
            .map(|w| LayoutPoint::new((w[0].x + w[1].x) / 2.0, w[0].y))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CablingLayout {
    pub title: String,
    /// Topology slug, e.g. `switchless-3node-dual-link`.
    pub kind: String,
    pub bounds: Bounds,
    pub boxes: Vec<LayoutBox>,
    pub tiles: Vec<PortTile>,
    pub paths: Vec<CablePath>,
}

impl CablingLayout {
    pub fn tile(&self, node: u32, port: u32) -> Option<&PortTile> {
        self.tiles.iter().find(|t| t.node == node && t.port == port)
    }

    pub fn boxes_of(&self, kind: BoxKind) -> impl Iterator<Item = &LayoutBox> {
        self.boxes.iter().filter(move |b| b.kind == kind)
    }

    pub fn paths_of(&self, kind: CableKind) -> impl Iterator<Item = &CablePath> {
        self.paths.iter().filter(move |p| p.kind == kind)
    }
}
