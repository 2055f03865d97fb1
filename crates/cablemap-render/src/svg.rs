//! SVG serialization of a [`ShapeList`].
//!
//! Two channels share one writer:
//! - the embeddable fragment styles every element through `--cablemap-*` CSS custom properties
//!   (falling back to the selected theme), so a host page can restyle it;
//! - the standalone document paints a solid background and uses literal colors only.

use crate::model::LayoutPoint;
use crate::shapes::{Shape, ShapeList, TextAnchor};
use crate::theme::{ColorToken, Theme};
use chrono::{DateTime, TimeZone};
use std::fmt::Write as _;

const FONT_FAMILY: &str = "ui-sans-serif, system-ui, -apple-system, 'Segoe UI', sans-serif";

#[derive(Debug, Clone)]
pub struct SvgRenderOptions {
    pub theme: Theme,
    /// Root `id`; defaults to `cablemap`. Give each inlined diagram its own.
    pub diagram_id: Option<String>,
}

impl Default for SvgRenderOptions {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            diagram_id: None,
        }
    }
}

#[derive(Clone, Copy)]
enum Paint {
    Vars(Theme),
    Literal(Theme),
}

impl Paint {
    fn value(self, token: ColorToken) -> String {
        match (self, token) {
            (_, ColorToken::None) => "none".to_string(),
            (Self::Literal(theme), _) => theme.color(token).to_string(),
            (Self::Vars(theme), _) => format!("var(--{}, {})", token.css_name(), theme.color(token)),
        }
    }

    /// `fill`/`stroke` as attributes (literal) or a `style` declaration (custom properties;
    /// `var()` is not valid in SVG presentation attributes).
    fn write(self, out: &mut String, fill: ColorToken, stroke: Option<(ColorToken, f64)>) {
        match self {
            Self::Literal(_) => {
                let _ = write!(out, r#" fill="{}""#, self.value(fill));
                if let Some((color, width)) = stroke {
                    let _ = write!(
                        out,
                        r#" stroke="{}" stroke-width="{}""#,
                        self.value(color),
                        fmt(width)
                    );
                }
            }
            Self::Vars(_) => {
                let _ = write!(out, r#" style="fill: {}"#, self.value(fill));
                if let Some((color, width)) = stroke {
                    let _ = write!(
                        out,
                        "; stroke: {}; stroke-width: {}",
                        self.value(color),
                        fmt(width)
                    );
                }
                out.push('"');
            }
        }
    }
}

/// Embeddable SVG: no background, colors through CSS custom properties.
pub fn render_svg_fragment(shapes: &ShapeList, options: &SvgRenderOptions) -> String {
    let mut out = String::new();
    write_svg(&mut out, shapes, options, Paint::Vars(options.theme), false);
    out
}

/// Standalone SVG document: XML prolog, solid theme background, literal colors.
pub fn render_svg_document(shapes: &ShapeList, options: &SvgRenderOptions) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    write_svg(&mut out, shapes, options, Paint::Literal(options.theme), true);
    out
}

/// `cabling-<kind>-<theme>-<YYYYMMDD-HHMMSS>.svg`
pub fn export_filename<Tz: TimeZone>(kind: &str, theme: Theme, at: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "cabling-{}-{}-{}.svg",
        kind,
        theme.as_str(),
        at.format("%Y%m%d-%H%M%S")
    )
}

fn write_svg(
    out: &mut String,
    shapes: &ShapeList,
    options: &SvgRenderOptions,
    paint: Paint,
    background: bool,
) {
    let w = fmt(shapes.width.max(1.0));
    let h = fmt(shapes.height.max(1.0));
    let id = options.diagram_id.as_deref().unwrap_or("cablemap");
    let _ = write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" id="{id}" class="cablemap" width="{w}" height="{h}" viewBox="0 0 {w} {h}" role="img" aria-label="{title}" font-family="{FONT_FAMILY}">"#,
        id = escape_xml(id),
        title = escape_xml(&shapes.title),
    );
    let _ = write!(out, "<title>{}</title>", escape_xml(&shapes.title));
    if background {
        out.push_str(r#"<rect class="background" x="0" y="0" width="100%" height="100%""#);
        paint.write(out, ColorToken::Background, None);
        out.push_str("/>");
    }
    out.push('\n');

    for shape in &shapes.shapes {
        write_shape(out, shape, paint);
        out.push('\n');
    }
    out.push_str("</svg>\n");
}

fn write_shape(out: &mut String, shape: &Shape, paint: Paint) {
    match shape {
        Shape::Rect {
            x,
            y,
            width,
            height,
            rx,
            fill,
            stroke,
            stroke_width,
            dashed,
        } => {
            let _ = write!(
                out,
                r#"<rect x="{}" y="{}" width="{}" height="{}" rx="{}""#,
                fmt(*x),
                fmt(*y),
                fmt(width.max(0.0)),
                fmt(height.max(0.0)),
                fmt(*rx)
            );
            let stroke = (*stroke != ColorToken::None).then_some((*stroke, *stroke_width));
            paint.write(out, *fill, stroke);
            if *dashed {
                out.push_str(r#" stroke-dasharray="4 3""#);
            }
            out.push_str("/>");
        }
        Shape::Polyline {
            id,
            points,
            stroke,
            stroke_width,
            dashed,
        } => {
            let _ = write!(
                out,
                r#"<polyline class="cable" data-id="{}" points="{}" stroke-linejoin="round""#,
                escape_xml(id),
                points_attr(points)
            );
            paint.write(out, ColorToken::None, Some((*stroke, *stroke_width)));
            if *dashed {
                out.push_str(r#" stroke-dasharray="6 4""#);
            }
            out.push_str("/>");
        }
        Shape::Text {
            x,
            y,
            text,
            font_size,
            bold,
            anchor,
            fill,
        } => {
            let anchor = match anchor {
                TextAnchor::Start => "start",
                TextAnchor::Middle => "middle",
                TextAnchor::End => "end",
            };
            let _ = write!(
                out,
                r#"<text x="{}" y="{}" font-size="{}" text-anchor="{anchor}" dominant-baseline="central""#,
                fmt(*x),
                fmt(*y),
                fmt(*font_size)
            );
            if *bold {
                out.push_str(r#" font-weight="bold""#);
            }
            paint.write(out, *fill, None);
            let _ = write!(out, ">{}</text>", escape_xml(text));
        }
    }
}

fn points_attr(points: &[LayoutPoint]) -> String {
    let mut s = String::new();
    for (i, p) in points.iter().enumerate() {
        if i > 0 {
            s.push(' ');
        }
        let _ = write!(&mut s, "{},{}", fmt(p.x), fmt(p.y));
    }
    s
}

/// Shortest round-trippable decimal after snapping to 1/1000, without `-0`.
fn fmt(v: f64) -> String {
    if !v.is_finite() {
        return "0".to_string();
    }
    let mut v = (v * 1000.0).round() / 1000.0;
    if v == 0.0 {
        v = 0.0;
    }
    let mut buf = ryu_js::Buffer::new();
    buf.format_finite(v).to_string()
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn numbers_are_short_and_stable() {
        assert_eq!(fmt(12.0), "12");
        assert_eq!(fmt(-0.0), "0");
        assert_eq!(fmt(0.1 + 0.2), "0.3");
        assert_eq!(fmt(f64::NAN), "0");
        assert_eq!(fmt(3.14159), "3.142");
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_xml("A & <B>"), "A &amp; &lt;B&gt;");
    }

    #[test]
    fn filename_encodes_kind_theme_and_time() {
        let at = Utc.with_ymd_and_hms(2026, 3, 7, 9, 5, 1).unwrap();
        assert_eq!(
            export_filename("switchless-3node-dual-link", Theme::Dark, &at),
            "cabling-switchless-3node-dual-link-dark-20260307-090501.svg"
        );
    }
}
