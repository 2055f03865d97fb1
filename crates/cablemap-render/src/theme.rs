use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }

    /// Literal color for a token in this theme.
    pub fn color(self, token: ColorToken) -> &'static str {
        let (light, dark) = token.literals();
        match self {
            Self::Light => light,
            Self::Dark => dark,
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" | "default" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme {other:?}")),
        }
    }
}

const SUBNET_COLORS: [(&str, &str); 8] = [
    ("#2563eb", "#60a5fa"),
    ("#db2777", "#f472b6"),
    ("#059669", "#34d399"),
    ("#d97706", "#fbbf24"),
    ("#7c3aed", "#a78bfa"),
    ("#0891b2", "#22d3ee"),
    ("#dc2626", "#f87171"),
    ("#65a30d", "#a3e635"),
];

/// Named colors used by the shape list. Resolved to literals (standalone export) or to CSS
/// custom properties with literal fallbacks (embeddable fragment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ColorToken {
    Background,
    Text,
    MutedText,
    NodeFill,
    NodeStroke,
    GroupStroke,
    TileStroke,
    TileMgmt,
    TileStorage,
    TileCustom,
    TileUnused,
    SwitchFill,
    SwitchStroke,
    RoomFill,
    RoomStroke,
    OverflowFill,
    CableMgmt,
    CableStorage,
    CableTrunk,
    CableUplink,
    /// Per-subnet cable color, cycling through a fixed palette.
    Subnet(u32),
    None,
}

impl ColorToken {
    pub fn subnet(subnet_id: u32) -> Self {
        Self::Subnet(subnet_id.saturating_sub(1) % SUBNET_COLORS.len() as u32)
    }

    /// CSS custom property name, without the leading `--`.
    pub fn css_name(self) -> String {
        let name = match self {
            Self::Background => "background",
            Self::Text => "text",
            Self::MutedText => "muted-text",
            Self::NodeFill => "node-fill",
            Self::NodeStroke => "node-stroke",
            Self::GroupStroke => "group-stroke",
            Self::TileStroke => "tile-stroke",
            Self::TileMgmt => "tile-mgmt",
            Self::TileStorage => "tile-storage",
            Self::TileCustom => "tile-custom",
            Self::TileUnused => "tile-unused",
            Self::SwitchFill => "switch-fill",
            Self::SwitchStroke => "switch-stroke",
            Self::RoomFill => "room-fill",
            Self::RoomStroke => "room-stroke",
            Self::OverflowFill => "overflow-fill",
            Self::CableMgmt => "cable-mgmt",
            Self::CableStorage => "cable-storage",
            Self::CableTrunk => "cable-trunk",
            Self::CableUplink => "cable-uplink",
            Self::Subnet(i) => return format!("cablemap-subnet-{}", i + 1),
            Self::None => "none",
        };
        format!("cablemap-{name}")
    }

    fn literals(self) -> (&'static str, &'static str) {
        match self {
            Self::Background => ("#ffffff", "#111827"),
            Self::Text => ("#111827", "#f3f4f6"),
            Self::MutedText => ("#4b5563", "#9ca3af"),
            Self::NodeFill => ("#f9fafb", "#1f2937"),
            Self::NodeStroke => ("#374151", "#d1d5db"),
            Self::GroupStroke => ("#9ca3af", "#6b7280"),
            Self::TileStroke => ("#1f2937", "#e5e7eb"),
            Self::TileMgmt => ("#dbeafe", "#1e3a8a"),
            Self::TileStorage => ("#fce7f3", "#831843"),
            Self::TileCustom => ("#ede9fe", "#4c1d95"),
            Self::TileUnused => ("#f3f4f6", "#374151"),
            Self::SwitchFill => ("#e0f2fe", "#0c4a6e"),
            Self::SwitchStroke => ("#0369a1", "#7dd3fc"),
            Self::RoomFill => ("#fafaf9", "#18181b"),
            Self::RoomStroke => ("#a8a29e", "#57534e"),
            Self::OverflowFill => ("#fef3c7", "#78350f"),
            Self::CableMgmt => ("#2563eb", "#60a5fa"),
            Self::CableStorage => ("#db2777", "#f472b6"),
            Self::CableTrunk => ("#7c3aed", "#c4b5fd"),
            Self::CableUplink => ("#4b5563", "#9ca3af"),
            Self::Subnet(i) => SUBNET_COLORS[i as usize % SUBNET_COLORS.len()],
            Self::None => ("none", "none"),
        }
    }
}
