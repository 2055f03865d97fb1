#![forbid(unsafe_code)]

//! `cablemap` plans the physical cabling of small clustered appliances and draws it.
//!
//! Planning (topology validation, port roles, switchless full-mesh subnets, TOR and rack-aware
//! trunk cabling) lives in `cablemap-core` and is re-exported here unchanged.
//!
//! # Features
//!
//! - `render`: enable layout, SVG and Mermaid output (`cablemap::render`)

pub use cablemap_core::*;

#[cfg(feature = "render")]
pub mod render {
    pub use cablemap_render::mermaid::to_mermaid;
    pub use cablemap_render::model::CablingLayout;
    pub use cablemap_render::shapes::{LegendRow, ShapeList, build_legend};
    pub use cablemap_render::svg::{
        SvgRenderOptions, export_filename, render_svg_document, render_svg_fragment,
    };
    pub use cablemap_render::text::{DeterministicTextMeasurer, TextMeasurer};
    pub use cablemap_render::{LayoutConfig, LayoutOptions, Theme, layout_and_shape, layout_topology};

    use cablemap_core::{DiagramConfig, PlannedTopology, TopologyInput, plan_topology};
    use chrono::{DateTime, TimeZone};

    #[derive(Debug, thiserror::Error)]
    pub enum HeadlessError {
        #[error(transparent)]
        Plan(#[from] cablemap_core::Error),
    }

    pub type Result<T> = std::result::Result<T, HeadlessError>;

    /// Converts an arbitrary string into a conservative SVG `id` token, so several diagrams can
    /// be inlined in one page.
    ///
    /// Unsupported characters become `-`, runs of `-` collapse, and ids that do not start with an
    /// ASCII letter get a `c-` prefix.
    pub fn sanitize_svg_id(raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return "cablemap".to_string();
        }

        let mut out = String::with_capacity(raw.len() + 2);
        for ch in raw.chars() {
            let ok = ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' || ch == '.';
            out.push(if ok { ch } else { '-' });
        }
        if !out.starts_with(|c: char| c.is_ascii_alphabetic()) {
            out.insert_str(0, "c-");
        }
        while out.contains("--") {
            out = out.replace("--", "-");
        }
        let out = out.trim_matches('-');
        if out.is_empty() || out == "c" {
            return "cablemap".to_string();
        }
        out.to_string()
    }

    /// A rendered standalone export and the filename it should be saved under.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct SvgExport {
        pub filename: String,
        pub svg: String,
    }

    /// Plans and lays out one topology input.
    pub fn layout_input(
        input: &TopologyInput,
        layout_options: &LayoutOptions,
    ) -> Result<(PlannedTopology, CablingLayout, ShapeList)> {
        let topology = plan_topology(input)?;
        let (layout, shapes) = layout_and_shape(&topology, layout_options);
        Ok((topology, layout, shapes))
    }

    /// Embeddable SVG for a topology input.
    pub fn render_svg(
        input: &TopologyInput,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
    ) -> Result<String> {
        let (_, _, shapes) = layout_input(input, layout_options)?;
        Ok(render_svg_fragment(&shapes, svg_options))
    }

    /// Standalone SVG document plus its `cabling-<kind>-<theme>-<timestamp>.svg` filename.
    pub fn export_svg<Tz: TimeZone>(
        input: &TopologyInput,
        layout_options: &LayoutOptions,
        svg_options: &SvgRenderOptions,
        at: &DateTime<Tz>,
    ) -> Result<SvgExport>
    where
        Tz::Offset: std::fmt::Display,
    {
        let (_, layout, shapes) = layout_input(input, layout_options)?;
        Ok(SvgExport {
            filename: export_filename(&layout.kind, svg_options.theme, at),
            svg: render_svg_document(&shapes, svg_options),
        })
    }

    pub fn render_mermaid(input: &TopologyInput) -> Result<String> {
        Ok(to_mermaid(&plan_topology(input)?))
    }

    /// Bundles layout and SVG options so integrations pass one value around.
    ///
    /// All work is CPU-bound and synchronous; nothing here performs I/O.
    #[derive(Clone, Default)]
    pub struct HeadlessRenderer {
        pub layout: LayoutOptions,
        pub svg: SvgRenderOptions,
    }

    impl HeadlessRenderer {
        pub fn new() -> Self {
            Self::default()
        }

        /// Applies `layout.*` overrides and, when present, the top-level `theme` key.
        pub fn with_config(mut self, config: DiagramConfig) -> Self {
            if let Some(theme) = config.get_str("theme") {
                match theme.parse::<Theme>() {
                    Ok(theme) => self.svg.theme = theme,
                    Err(err) => tracing::warn!(%err, "ignoring theme override"),
                }
            }
            self.layout = self.layout.with_config(config);
            self
        }

        pub fn with_theme(mut self, theme: Theme) -> Self {
            self.svg.theme = theme;
            self
        }

        pub fn plan(&self, input: &TopologyInput) -> Result<PlannedTopology> {
            Ok(plan_topology(input)?)
        }

        pub fn layout(&self, input: &TopologyInput) -> Result<CablingLayout> {
            let (_, layout, _) = layout_input(input, &self.layout)?;
            Ok(layout)
        }

        pub fn render_svg(&self, input: &TopologyInput) -> Result<String> {
            render_svg(input, &self.layout, &self.svg)
        }

        pub fn render_svg_with_diagram_id(
            &self,
            input: &TopologyInput,
            diagram_id: &str,
        ) -> Result<String> {
            let mut svg = self.svg.clone();
            svg.diagram_id = Some(sanitize_svg_id(diagram_id));
            render_svg(input, &self.layout, &svg)
        }

        /// Decodes a wizard JSON record and renders it.
        pub fn render_svg_json(&self, text: &str) -> Result<String> {
            self.render_svg(&TopologyInput::from_json_str(text)?)
        }

        pub fn export_svg<Tz: TimeZone>(
            &self,
            input: &TopologyInput,
            at: &DateTime<Tz>,
        ) -> Result<SvgExport>
        where
            Tz::Offset: std::fmt::Display,
        {
            export_svg(input, &self.layout, &self.svg, at)
        }

        pub fn render_mermaid(&self, input: &TopologyInput) -> Result<String> {
            render_mermaid(input)
        }
    }
}
