//! Storage subnet addressing: CIDR parsing, legend address blocks and per-adapter IPs.

use crate::plan::CablingPlan;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Default subnet family used by Network ATC when storage auto IP is enabled.
pub const AUTO_IP_SECOND_OCTET: u8 = 71;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cidr {
    pub addr: Ipv4Addr,
    pub prefix: u8,
}

impl Cidr {
    pub fn network(&self) -> Ipv4Addr {
        let mask = prefix_mask(self.prefix);
        Ipv4Addr::from(u32::from(self.addr) & mask)
    }

    /// Returns the `index`-th address after the network address, if it is a usable host.
    ///
    /// `/31` and `/32` have no network or broadcast address, so every address counts.
    pub fn host(&self, index: u32) -> Option<Ipv4Addr> {
        let host_bits = 32 - u32::from(self.prefix);
        let size: u64 = 1u64 << host_bits;
        let network = u32::from(self.network());
        if self.prefix >= 31 {
            return (u64::from(index) < size).then(|| Ipv4Addr::from(network + index));
        }
        if index == 0 || u64::from(index) >= size - 1 {
            return None;
        }
        Some(Ipv4Addr::from(network + index))
    }

    /// Adds `increment` to the third octet, keeping the rest of the address and the prefix.
    pub fn increment_third_octet(&self, increment: i32) -> Option<Cidr> {
        let [a, b, c, d] = self.addr.octets();
        let next = i32::from(c) + increment;
        let next = u8::try_from(next).ok()?;
        Some(Cidr {
            addr: Ipv4Addr::new(a, b, next, d),
            prefix: self.prefix,
        })
    }
}

fn prefix_mask(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        u32::MAX << (32 - u32::from(prefix.min(32)))
    }
}

impl FromStr for Cidr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let Some((ip, prefix)) = trimmed.split_once('/') else {
            return Err(Error::invalid(format!(
                "storage subnet {trimmed:?} is not in a.b.c.d/prefix form"
            )));
        };
        let addr: Ipv4Addr = ip.trim().parse().map_err(|_| {
            Error::invalid(format!("storage subnet {trimmed:?} has an invalid IPv4 address"))
        })?;
        let prefix: u8 = prefix
            .trim()
            .parse()
            .ok()
            .filter(|p| *p <= 32)
            .ok_or_else(|| {
                Error::invalid(format!("storage subnet {trimmed:?} has a prefix outside 0-32"))
            })?;
        Ok(Self { addr, prefix })
    }
}

impl fmt::Display for Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.addr, self.prefix)
    }
}

/// Expands the first custom subnet into `count` subnets by stepping the third octet.
pub fn autofill_subnets(first: &str, count: usize) -> Result<Vec<Cidr>> {
    let base: Cidr = first.parse()?;
    (0..count)
        .map(|i| {
            i32::try_from(i)
                .ok()
                .and_then(|step| base.increment_third_octet(step))
                .ok_or_else(|| {
                    Error::invalid(format!(
                        "cannot derive {count} storage subnets from {base}: third octet overflows"
                    ))
                })
        })
        .collect()
}

/// Where legend address blocks come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "subnets")]
pub enum AddressPlan {
    /// `10.0.<id>.0/24`
    Placeholder,
    /// Network ATC defaults, `10.71.<id>.0/24`.
    AutoIp,
    /// User-supplied CIDRs, one per subnet index; missing or blank indexes fall back to the placeholder.
    Custom(Vec<String>),
}

impl AddressPlan {
    pub fn block_for(&self, subnet_id: u32) -> String {
        match self {
            Self::Placeholder => placeholder_block(subnet_id),
            Self::AutoIp => format!("10.{AUTO_IP_SECOND_OCTET}.{subnet_id}.0/24"),
            Self::Custom(list) => subnet_id
                .checked_sub(1)
                .and_then(|idx| list.get(idx as usize))
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| placeholder_block(subnet_id)),
        }
    }
}

fn placeholder_block(subnet_id: u32) -> String {
    format!("10.0.{subnet_id}.0/24")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdapterAddress {
    pub subnet_id: u32,
    pub node: u32,
    pub port: u32,
    pub port_name: String,
    /// `None` when the block is too small to hold the node's host index.
    pub address: Option<Ipv4Addr>,
    pub prefix: u8,
}

/// Per-adapter IPs for switchless storage subnets: node `k` takes host `k` of each subnet.
pub fn adapter_addresses(plan: &CablingPlan, addresses: &AddressPlan) -> Result<Vec<AdapterAddress>> {
    let mut out = Vec::with_capacity(plan.storage_edges.len() * 2);
    for edge in &plan.storage_edges {
        let block: Cidr = addresses.block_for(edge.subnet_id).parse()?;
        for (node, port) in [(edge.node_a, edge.port_a), (edge.node_b, edge.port_b)] {
            out.push(AdapterAddress {
                subnet_id: edge.subnet_id,
                node,
                port,
                port_name: plan.port_name(node, port).unwrap_or_default().to_string(),
                address: block.host(node),
                prefix: block.prefix,
            });
        }
    }
    Ok(out)
}
