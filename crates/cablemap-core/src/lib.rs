#![forbid(unsafe_code)]

//! Cabling assignment for small clustered appliances (headless).
//!
//! Pipeline, leaves first:
//! - [`TopologyInput::resolve`] validates raw wizard fields into a [`TopologySpec`]
//! - [`plan_cabling`] assigns port roles and the switchless full-mesh subnets
//! - [`plan_architecture`] lands node ports on TOR switches and adds rack-aware trunks/LAGs
//!
//! Every stage is a pure function of its inputs; results are never mutated downstream.

pub mod addressing;
pub mod architecture;
pub mod config;
pub mod error;
pub mod plan;
pub mod topology;

pub use addressing::{AddressPlan, AdapterAddress, Cidr, adapter_addresses, autofill_subnets};
pub use architecture::{
    Architecture, ArchitectureLink, ArchitectureOption, Carries, LinkEndpoint, LinkKind,
    TorSwitch, plan_architecture,
};
pub use config::DiagramConfig;
pub use error::{Error, Result};
pub use plan::{CablingPlan, PortRef, RoleGroup, StorageEdge, StorageNetwork, plan_cabling};
pub use topology::{
    IntentAssignment, LinkMode, PortRole, RackLayout, StorageMode, TopologyInput, TopologySpec,
};

/// Output of the planning stages for one topology.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PlannedTopology {
    pub spec: TopologySpec,
    pub plan: CablingPlan,
    pub architecture: Architecture,
}

/// Runs resolver, cabling planner and architecture planner in order.
pub fn plan_topology(input: &TopologyInput) -> Result<PlannedTopology> {
    let spec = input.resolve()?;
    let plan = plan_cabling(&spec)?;
    let architecture = plan_architecture(&spec, &plan)?;
    Ok(PlannedTopology {
        spec,
        plan,
        architecture,
    })
}
