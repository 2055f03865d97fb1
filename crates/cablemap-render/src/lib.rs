#![forbid(unsafe_code)]

//! Layout and rendering for planned cabling topologies.
//!
//! [`layout::layout_topology`] turns a [`PlannedTopology`] into absolute geometry,
//! [`shapes::build_shapes`] flattens that into primitive shapes plus a subnet legend, and
//! [`svg`]/[`mermaid`] serialize the result.

pub mod layout;
pub mod mermaid;
pub mod model;
pub mod shapes;
pub mod svg;
pub mod text;
pub mod theme;

use crate::model::CablingLayout;
use crate::shapes::ShapeList;
use crate::text::{DeterministicTextMeasurer, TextMeasurer};
use cablemap_core::{DiagramConfig, PlannedTopology};
use std::sync::Arc;

pub use layout::{LayoutConfig, layout_topology};
pub use theme::Theme;

#[derive(Clone)]
pub struct LayoutOptions {
    pub text_measurer: Arc<dyn TextMeasurer + Send + Sync>,
    /// `layout.*` overrides; see [`LayoutConfig::from_config`].
    pub config: DiagramConfig,
}

impl Default for LayoutOptions {
    fn default() -> Self {
        Self {
            text_measurer: Arc::new(DeterministicTextMeasurer::default()),
            config: DiagramConfig::default(),
        }
    }
}

impl LayoutOptions {
    pub fn with_config(mut self, config: DiagramConfig) -> Self {
        self.config = config;
        self
    }
}

/// Lays out a topology and builds its shape list in one step.
pub fn layout_and_shape(
    topology: &PlannedTopology,
    options: &LayoutOptions,
) -> (CablingLayout, ShapeList) {
    let layout = layout_topology(topology, options);
    let legend = shapes::build_legend(topology);
    let shapes = shapes::build_shapes(&layout, &legend, options);
    (layout, shapes)
}
