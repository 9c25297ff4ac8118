//! SVG import.
//!
//! Maps a supported subset of SVG onto the document schema. The conversion is
//! lossy: anything outside the subset is dropped, never an error, and every
//! drop is listed in [`SvgConversion::dropped`] so callers can show it.
//!
//! | SVG | document element |
//! |-----|------------------|
//! | `rect`, `circle`, `ellipse` | `figure` |
//! | `line` | `line` |
//! | `text` (with `tspan` content) | `text` |
//! | `image` | `image` |
//! | `path`, `polygon`, `polyline` | `svg` (embedded data URI, full-page frame) |
//! | `g`, `a` | `group` |
//!
//! Transforms are limited to `translate` and `scale`; elements using any other
//! transform are dropped.

use std::fmt::Write;

use base64::Engine as _;
use roxmltree::{Node, ParsingOptions};
use serde::{Deserialize, Serialize};

use super::{escape_xml, CandidateDocument};
use crate::element::{FigureShape, TextAlign, VerticalAlign};
use crate::error::ConversionError;
use crate::{Document, Element, ElementKind, Page};

/// Canvas size used when the SVG declares neither a usable size nor a viewBox.
pub const DEFAULT_SVG_SIZE: f64 = 1080.0;

const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const SVG_NS: &str = "http://www.w3.org/2000/svg";

/// Non-visual elements skipped without being reported.
const METADATA_TAGS: &[&str] = &["title", "desc", "metadata"];

/// Font size assumed for text without one.
const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Why a primitive was left out of the converted document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// The element type has no document counterpart.
    UnsupportedElement,
    /// The element uses a transform other than translate/scale.
    UnsupportedTransform,
    /// Required attributes are missing or degenerate.
    MissingAttributes,
}

/// A primitive omitted by the lossy conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedPrimitive {
    /// SVG tag name.
    pub tag: String,
    /// Why it was dropped.
    pub reason: DropReason,
}

/// Result of converting an SVG file.
#[derive(Debug, Clone, PartialEq)]
pub struct SvgConversion {
    /// Candidate document JSON.
    pub candidate: CandidateDocument,
    /// Primitives that were left out.
    pub dropped: Vec<DroppedPrimitive>,
}

/// Convert SVG markup into document JSON.
///
/// # Errors
///
/// Returns [`ConversionError`] if the input is not UTF-8, not well-formed XML,
/// or its root is not `<svg>`.
pub fn vector_graphics_to_document_json(bytes: &[u8]) -> Result<SvgConversion, ConversionError> {
    let text = std::str::from_utf8(bytes).map_err(|_| ConversionError::NotUtf8)?;

    let mut options = ParsingOptions::default();
    options.allow_dtd = true;
    let tree = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| ConversionError::Xml(e.to_string()))?;

    let root = tree.root_element();
    let namespace_ok = root.tag_name().namespace().map_or(true, |ns| ns == SVG_NS);
    if root.tag_name().name() != "svg" || !namespace_ok {
        return Err(ConversionError::NotSvg(root.tag_name().name().to_string()));
    }

    let view_box = root.attribute("viewBox").and_then(parse_view_box);
    let width = root
        .attribute("width")
        .and_then(parse_length)
        .filter(|w| *w > 0.0)
        .or(view_box.map(|vb| vb.width))
        .unwrap_or(DEFAULT_SVG_SIZE);
    let height = root
        .attribute("height")
        .and_then(parse_length)
        .filter(|h| *h > 0.0)
        .or(view_box.map(|vb| vb.height))
        .unwrap_or(DEFAULT_SVG_SIZE);

    let base = view_box.map_or(Affine::IDENTITY, |vb| {
        let sx = width / vb.width;
        let sy = height / vb.height;
        Affine {
            sx,
            sy,
            tx: -vb.min_x * sx,
            ty: -vb.min_y * sy,
        }
    });

    let mut converter = Converter {
        width,
        height,
        next_id: 0,
        dropped: Vec::new(),
    };
    let root_style = Style::default().inherit(root);
    let children = converter.convert_children(root, base, &root_style);

    let mut page = Page::with_id("svg-page-1");
    page.children = children;
    let document = Document {
        pages: vec![page],
        ..Document::new(width, height)
    };

    let candidate = serde_json::to_value(&document)
        .map_err(|e| ConversionError::Encode(e.to_string()))?;

    Ok(SvgConversion {
        candidate: CandidateDocument::new(candidate),
        dropped: converter.dropped,
    })
}

/// Scale + translate transform: `x' = x * sx + tx`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Affine {
    sx: f64,
    sy: f64,
    tx: f64,
    ty: f64,
}

impl Affine {
    const IDENTITY: Self = Self {
        sx: 1.0,
        sy: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// `self` applied after `inner`.
    fn compose(self, inner: Self) -> Self {
        Self {
            sx: self.sx * inner.sx,
            sy: self.sy * inner.sy,
            tx: self.sx * inner.tx + self.tx,
            ty: self.sy * inner.ty + self.ty,
        }
    }

    fn apply(self, x: f64, y: f64) -> (f64, f64) {
        (x * self.sx + self.tx, y * self.sy + self.ty)
    }

    fn mean_scale(self) -> f64 {
        (self.sx.abs() + self.sy.abs()) / 2.0
    }

    /// Map an axis-aligned box, normalizing flipped axes.
    fn map_box(self, x: f64, y: f64, w: f64, h: f64) -> (f64, f64, f64, f64) {
        let (x0, y0) = self.apply(x, y);
        let (x1, y1) = self.apply(x + w, y + h);
        (x0.min(x1), y0.min(y1), (x1 - x0).abs(), (y1 - y0).abs())
    }
}

#[derive(Debug, Clone, Copy)]
struct ViewBox {
    min_x: f64,
    min_y: f64,
    width: f64,
    height: f64,
}

/// Inherited presentation attributes.
#[derive(Debug, Clone)]
struct Style {
    fill: Option<String>,
    stroke: Option<String>,
    stroke_width: Option<f64>,
    font_size: Option<f64>,
    font_family: Option<String>,
    opacity: f64,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            fill: None,
            stroke: None,
            stroke_width: None,
            font_size: None,
            font_family: None,
            opacity: 1.0,
        }
    }
}

impl Style {
    /// Style of `node`, inheriting from `self`. Opacity is not inherited.
    fn inherit(&self, node: Node<'_, '_>) -> Self {
        let mut style = Self {
            opacity: 1.0,
            ..self.clone()
        };
        for name in ["fill", "stroke", "stroke-width", "font-size", "font-family", "opacity"] {
            if let Some(value) = node.attribute(name) {
                style.set(name, value);
            }
        }
        if let Some(inline) = node.attribute("style") {
            for declaration in inline.split(';') {
                if let Some((name, value)) = declaration.split_once(':') {
                    style.set(name.trim(), value.trim());
                }
            }
        }
        style
    }

    fn set(&mut self, name: &str, value: &str) {
        let value = value.trim();
        match name {
            "fill" => self.fill = Some(value.to_string()),
            "stroke" => self.stroke = Some(value.to_string()),
            "stroke-width" => self.stroke_width = parse_length(value),
            "font-size" => self.font_size = parse_length(value),
            "font-family" => {
                let family = value.split(',').next().unwrap_or(value);
                self.font_family = Some(family.trim_matches(|c| c == '"' || c == '\'').trim().to_string());
            }
            "opacity" => {
                if let Ok(opacity) = value.parse::<f64>() {
                    self.opacity = opacity.clamp(0.0, 1.0);
                }
            }
            _ => {}
        }
    }

    fn fill_color(&self) -> String {
        match self.fill.as_deref() {
            None => "black".to_string(),
            Some("none") => "transparent".to_string(),
            Some(color) => color.to_string(),
        }
    }

    fn stroke_color(&self) -> Option<String> {
        self.stroke.clone().filter(|s| s != "none")
    }
}

struct Converter {
    width: f64,
    height: f64,
    next_id: usize,
    dropped: Vec<DroppedPrimitive>,
}

impl Converter {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        format!("svg-{}", self.next_id)
    }

    fn drop_node(&mut self, tag: &str, reason: DropReason) {
        tracing::debug!("Dropping SVG <{tag}>: {reason:?}");
        self.dropped.push(DroppedPrimitive {
            tag: tag.to_string(),
            reason,
        });
    }

    fn convert_children(&mut self, parent: Node<'_, '_>, ctm: Affine, style: &Style) -> Vec<Element> {
        parent
            .children()
            .filter(Node::is_element)
            .filter_map(|child| self.convert_node(child, ctm, style))
            .collect()
    }

    fn convert_node(&mut self, node: Node<'_, '_>, parent_ctm: Affine, parent_style: &Style) -> Option<Element> {
        let tag = node.tag_name().name();
        if METADATA_TAGS.contains(&tag) {
            return None;
        }

        let local = match node.attribute("transform").map(parse_transform) {
            None => Affine::IDENTITY,
            Some(Some(local)) => local,
            Some(None) => {
                self.drop_node(tag, DropReason::UnsupportedTransform);
                return None;
            }
        };
        let ctm = parent_ctm.compose(local);
        let style = parent_style.inherit(node);

        let element = match tag {
            "g" | "a" => self.convert_group(node, ctm, &style),
            "rect" => self.convert_rect(node, ctm, &style),
            "circle" | "ellipse" => self.convert_ellipse(node, ctm, &style),
            "line" => self.convert_line(node, ctm, &style),
            "text" => self.convert_text(node, ctm, &style),
            "image" => self.convert_image(node, ctm),
            "path" | "polygon" | "polyline" => self.convert_vector(node, ctm, &style),
            _ => {
                self.drop_node(tag, DropReason::UnsupportedElement);
                return None;
            }
        };

        match element {
            Some(element) => Some(element.with_opacity(style.opacity)),
            None => {
                self.drop_node(tag, DropReason::MissingAttributes);
                None
            }
        }
    }

    fn convert_group(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let children = self.convert_children(node, ctm, style);
        if children.is_empty() {
            return None;
        }
        let min_x = children.iter().map(|c| c.x).fold(f64::INFINITY, f64::min);
        let min_y = children.iter().map(|c| c.y).fold(f64::INFINITY, f64::min);
        let max_x = children.iter().map(|c| c.x + c.width).fold(f64::NEG_INFINITY, f64::max);
        let max_y = children.iter().map(|c| c.y + c.height).fold(f64::NEG_INFINITY, f64::max);
        let id = self.next_id();
        Some(
            Element::new(id, ElementKind::Group { children })
                .with_frame(min_x, min_y, max_x - min_x, max_y - min_y),
        )
    }

    fn convert_rect(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let w = number(node, "width").filter(|w| *w > 0.0)?;
        let h = number(node, "height").filter(|h| *h > 0.0)?;
        let (x, y, width, height) = ctm.map_box(
            number(node, "x").unwrap_or(0.0),
            number(node, "y").unwrap_or(0.0),
            w,
            h,
        );
        let corner = number(node, "rx").or_else(|| number(node, "ry")).unwrap_or(0.0);
        Some(self.figure(FigureShape::Rect, style, ctm, corner * ctm.mean_scale()).with_frame(x, y, width, height))
    }

    fn convert_ellipse(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let cx = number(node, "cx").unwrap_or(0.0);
        let cy = number(node, "cy").unwrap_or(0.0);
        let (rx, ry) = if node.tag_name().name() == "circle" {
            let r = number(node, "r")?;
            (r, r)
        } else {
            (number(node, "rx")?, number(node, "ry")?)
        };
        if rx <= 0.0 || ry <= 0.0 {
            return None;
        }
        let (x, y, width, height) = ctm.map_box(cx - rx, cy - ry, rx * 2.0, ry * 2.0);
        let shape = if (width - height).abs() < 1e-9 {
            FigureShape::Circle
        } else {
            FigureShape::Ellipse
        };
        Some(self.figure(shape, style, ctm, 0.0).with_frame(x, y, width, height))
    }

    fn figure(&mut self, sub_type: FigureShape, style: &Style, ctm: Affine, corner_radius: f64) -> Element {
        let stroke = style.stroke_color();
        let stroke_width = if stroke.is_some() {
            style.stroke_width.unwrap_or(1.0) * ctm.mean_scale()
        } else {
            0.0
        };
        let id = self.next_id();
        Element::new(
            id,
            ElementKind::Figure {
                sub_type,
                fill: style.fill_color(),
                stroke,
                stroke_width,
                corner_radius,
            },
        )
    }

    fn convert_line(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let (x1, y1) = ctm.apply(number(node, "x1").unwrap_or(0.0), number(node, "y1").unwrap_or(0.0));
        let (x2, y2) = ctm.apply(number(node, "x2").unwrap_or(0.0), number(node, "y2").unwrap_or(0.0));
        let (dx, dy) = (x2 - x1, y2 - y1);
        let length = dx.hypot(dy);
        if length <= 0.0 {
            return None;
        }
        let thickness = (style.stroke_width.unwrap_or(1.0) * ctm.mean_scale()).max(1.0);
        let color = style.stroke_color().unwrap_or_else(|| "black".to_string());
        let id = self.next_id();
        let mut element = Element::new(id, ElementKind::Line { color }).with_frame(x1, y1, length, thickness);
        element.rotation = dy.atan2(dx).to_degrees();
        Some(element)
    }

    fn convert_text(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let content = node
            .descendants()
            .filter(Node::is_text)
            .filter_map(|n| n.text())
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ");
        if content.is_empty() {
            return None;
        }
        let font_size = style.font_size.unwrap_or(DEFAULT_FONT_SIZE) * ctm.mean_scale();
        let (x, baseline) = ctm.apply(first_number(node, "x"), first_number(node, "y"));
        #[allow(clippy::cast_precision_loss)]
        let width = content.chars().count() as f64 * font_size * 0.6;
        let id = self.next_id();
        Some(
            Element::new(
                id,
                ElementKind::Text {
                    text: content,
                    font_size,
                    font_family: style.font_family.clone().unwrap_or_else(|| "Roboto".to_string()),
                    fill: style.fill_color(),
                    align: TextAlign::Left,
                    vertical_align: VerticalAlign::Top,
                },
            )
            .with_frame(x, baseline - font_size, width, font_size * 1.2),
        )
    }

    fn convert_image(&mut self, node: Node<'_, '_>, ctm: Affine) -> Option<Element> {
        let src = node
            .attribute("href")
            .or_else(|| node.attribute((XLINK_NS, "href")))?
            .to_string();
        let w = number(node, "width").filter(|w| *w > 0.0)?;
        let h = number(node, "height").filter(|h| *h > 0.0)?;
        let (x, y, width, height) = ctm.map_box(
            number(node, "x").unwrap_or(0.0),
            number(node, "y").unwrap_or(0.0),
            w,
            h,
        );
        let id = self.next_id();
        Some(Element::new(id, ElementKind::Image { src }).with_frame(x, y, width, height))
    }

    /// Embed a path-like element as a standalone SVG covering the whole page.
    fn convert_vector(&mut self, node: Node<'_, '_>, ctm: Affine, style: &Style) -> Option<Element> {
        let required = if node.tag_name().name() == "path" { "d" } else { "points" };
        if node.attribute(required).map_or(true, |v| v.trim().is_empty()) {
            return None;
        }

        let (w, h) = (self.width, self.height);
        let mut markup = String::with_capacity(256);
        let _ = write!(
            markup,
            "<svg xmlns=\"{SVG_NS}\" width=\"{w}\" height=\"{h}\" viewBox=\"0 0 {w} {h}\">"
        );
        let _ = write!(
            markup,
            "<g transform=\"matrix({} 0 0 {} {} {})\"",
            ctm.sx, ctm.sy, ctm.tx, ctm.ty
        );
        if let Some(fill) = &style.fill {
            let _ = write!(markup, " fill=\"{}\"", escape_xml(fill));
        }
        if let Some(stroke) = &style.stroke {
            let _ = write!(markup, " stroke=\"{}\"", escape_xml(stroke));
        }
        if let Some(stroke_width) = style.stroke_width {
            let _ = write!(markup, " stroke-width=\"{stroke_width}\"");
        }
        markup.push('>');
        write_shape(&mut markup, node);
        markup.push_str("</g></svg>");

        let src = format!(
            "data:image/svg+xml;base64,{}",
            base64::engine::general_purpose::STANDARD.encode(markup.as_bytes())
        );
        let id = self.next_id();
        Some(Element::new(id, ElementKind::Svg { src }).with_frame(0.0, 0.0, w, h))
    }
}

/// Write a path-like element from the parsed tree: local tag name, resolved
/// attribute values, no `transform` (already folded into the wrapper), no
/// namespaced attributes and no children.
fn write_shape(markup: &mut String, node: Node<'_, '_>) {
    let _ = write!(markup, "<{}", node.tag_name().name());
    for attribute in node.attributes() {
        if attribute.namespace().is_some() || attribute.name() == "transform" {
            continue;
        }
        let _ = write!(markup, " {}=\"{}\"", attribute.name(), escape_xml(attribute.value()));
    }
    markup.push_str("/>");
}

fn number(node: Node<'_, '_>, name: &str) -> Option<f64> {
    node.attribute(name).and_then(parse_length)
}

/// First value of a coordinate list attribute such as `x="10 20 30"`.
fn first_number(node: Node<'_, '_>, name: &str) -> f64 {
    node.attribute(name)
        .and_then(|v| v.split(|c: char| c == ',' || c.is_whitespace()).find(|s| !s.is_empty()))
        .and_then(parse_length)
        .unwrap_or(0.0)
}

/// Parse a plain or `px` length; other units are not supported.
fn parse_length(value: &str) -> Option<f64> {
    let value = value.trim();
    let number = value.strip_suffix("px").unwrap_or(value).trim();
    number.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn parse_numbers(value: &str) -> Option<Vec<f64>> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect()
}

fn parse_view_box(value: &str) -> Option<ViewBox> {
    match parse_numbers(value)?.as_slice() {
        [min_x, min_y, width, height] if *width > 0.0 && *height > 0.0 => Some(ViewBox {
            min_x: *min_x,
            min_y: *min_y,
            width: *width,
            height: *height,
        }),
        _ => None,
    }
}

/// Parse a transform list made of `translate` and `scale` functions.
fn parse_transform(value: &str) -> Option<Affine> {
    let mut result = Affine::IDENTITY;
    let mut rest = value.trim();
    while !rest.is_empty() {
        let open = rest.find('(')?;
        let close = rest.find(')')?;
        if close < open {
            return None;
        }
        let name = rest[..open].trim().trim_start_matches(',').trim();
        let args = parse_numbers(&rest[open + 1..close])?;
        let step = match (name, args.as_slice()) {
            ("translate", [tx]) => Affine { tx: *tx, ty: 0.0, ..Affine::IDENTITY },
            ("translate", [tx, ty]) => Affine { tx: *tx, ty: *ty, ..Affine::IDENTITY },
            ("scale", [s]) => Affine { sx: *s, sy: *s, ..Affine::IDENTITY },
            ("scale", [sx, sy]) => Affine { sx: *sx, sy: *sy, ..Affine::IDENTITY },
            _ => return None,
        };
        result = result.compose(step);
        rest = rest[close + 1..].trim_start();
    }
    Some(result)
}
